//! Error type definitions for the streamvault application
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that maps cleanly onto the
//! fallback behaviour each failure requires: total-failure ingestion
//! errors, per-item skips, resolver fallbacks and proxy degradation.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the
/// application. It uses `thiserror` to provide automatic error trait
/// implementations and proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Playlist ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Direct-stream resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Stream proxy errors
    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Playlist ingestion errors.
///
/// `Source` aborts the whole parse with no partial results; individual
/// malformed playlist entries never raise here, they are skipped and
/// counted by the import pipeline instead.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Local playlist file could not be read
    #[error("Failed to read playlist file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote playlist could not be fetched
    #[error("Failed to fetch playlist from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Provider returned HTTP 429; callers substitute demo content
    #[error("Playlist provider rate limited the request")]
    RateLimited,

    /// Response body was not usable playlist text
    #[error("Invalid playlist payload: {message}")]
    InvalidPayload { message: String },
}

/// Direct-stream resolution errors.
///
/// Every variant has a defined fallback: `NotFound` and `Failed` fall back
/// to proxying the original URL, `RateLimited` makes the import pipeline
/// load demo content instead of retrying.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No direct stream URL found for stream id {stream_id}")]
    NotFound { stream_id: String },

    #[error("Provider API rate limited the request")]
    RateLimited,

    #[error("Stream resolution failed: {message}")]
    Failed { message: String },
}

/// Stream proxy errors.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Upstream fetch failed; the handler answers with the fallback stream
    #[error("Upstream fetch failed for {url}: {message}")]
    Upstream { url: String, message: String },

    /// Manifest exceeded the configured size ceiling
    #[error("Manifest from {url} exceeds size limits ({detail})")]
    ManifestTooLarge { url: String, detail: String },

    /// The url query parameter was missing or not a valid URL
    #[error("Invalid proxy request: {message}")]
    InvalidRequest { message: String },
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl IngestError {
    /// Create a fetch error from a transport failure
    pub fn fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl ProxyError {
    /// Create an upstream error
    pub fn upstream<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Upstream {
            url: url.into(),
            message: message.into(),
        }
    }
}
