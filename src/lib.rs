//! streamvault: IPTV/VOD catalog backend with an HLS stream proxy.
//!
//! The crate ingests M3U8 playlists into an in-memory catalog, classifies
//! entries, normalizes provider credentials on stream URLs, and serves a
//! REST API whose stream proxy rewrites HLS manifests so third-party IPTV
//! streams play in a browser.

pub mod config;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod services;
pub mod storage;
pub mod web;
