//! Core data types shared across the catalog, ingestion and proxy layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of catalog entry, inferred from playlist metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
    Channel,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Movie
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::Series => write!(f, "series"),
            ContentType::Channel => write!(f, "channel"),
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "series" => Ok(ContentType::Series),
            "channel" => Ok(ContentType::Channel),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

/// Transient item produced while scanning a playlist.
///
/// A draft is only complete once a non-comment URL line has been consumed;
/// the parser never emits a draft without a stream URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftMediaItem {
    pub title: String,
    pub thumbnail_url: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub category: String,
    pub description: String,
    pub is_featured: bool,
    pub stream_url: String,
}

/// Persisted catalog record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub category: String,
    pub description: String,
    pub is_featured: bool,
    pub stream_url: String,
    pub added_at: DateTime<Utc>,
}

/// Episode attached to a series item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub media_id: Uuid,
    pub title: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub stream_url: String,
    pub thumbnail_url: Option<String>,
    pub description: String,
}

/// Request body for creating an episode by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeCreateRequest {
    pub title: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub stream_url: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Outcome of a playlist import, including partial-failure counts.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    /// EXTINF blocks that never saw a URL line and were discarded.
    pub dropped_entries: usize,
    pub message: String,
}

/// Metadata returned by the provider's live-stream listing API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectStreamInfo {
    pub stream_url: String,
    pub name: Option<String>,
    pub stream_type: Option<String>,
    pub epg_channel_id: Option<String>,
    pub added: Option<String>,
    pub category_id: Option<String>,
    pub custom_sid: Option<String>,
}
