//! Direct-stream resolution against the provider's player API.
//!
//! The provider's catalog URLs point at a manifest endpoint that often
//! rejects browser traffic; its `player_api.php` listing returns a
//! short-lived direct source URL for the same stream id. Resolution is an
//! optimization with a strict fallback contract: every failure mode maps to
//! "use the original URL", except rate limiting which the import pipeline
//! handles by loading demo content.

use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::errors::{AppError, ResolveError};
use crate::models::DirectStreamInfo;

/// Extract the numeric stream identifier from a provider manifest URL,
/// e.g. `http://host/live/12345.m3u8` -> `12345`.
pub fn extract_stream_id(url: &str) -> Option<&str> {
    static STREAM_ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = STREAM_ID_RE.get_or_init(|| {
        Regex::new(r"/(\d+)\.m3u8").expect("stream id pattern is valid")
    });
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[derive(Clone)]
pub struct DirectStreamResolver {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl DirectStreamResolver {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.proxy.resolver_timeout_secs))
            .user_agent(config.proxy.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.provider.base_url.clone(),
            username: config.provider.username.clone(),
            password: config.provider.password.clone(),
        })
    }

    /// Provider listing URL for a stream id. Credentials go through the
    /// query-pair encoder so passwords with `&`, `%` or `#` stay intact.
    fn api_url(&self, stream_id: &str) -> Result<Url, ResolveError> {
        let mut api_url = Url::parse(&format!("{}/player_api.php", self.base_url)).map_err(
            |e| ResolveError::Failed {
                message: format!("invalid provider base URL {}: {}", self.base_url, e),
            },
        )?;
        api_url
            .query_pairs_mut()
            .append_pair("username", &self.username)
            .append_pair("password", &self.password)
            .append_pair("action", "get_live_streams")
            .append_pair("stream_id", stream_id);
        Ok(api_url)
    }

    /// Look up the direct source URL for a stream id.
    pub async fn resolve(&self, stream_id: &str) -> Result<DirectStreamInfo, ResolveError> {
        let api_url = self.api_url(stream_id)?;
        debug!("Resolving direct stream for id {}", stream_id);

        let response = self.client.get(api_url).send().await.map_err(|e| {
            ResolveError::Failed {
                message: e.to_string(),
            }
        })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ResolveError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(ResolveError::Failed {
                message: format!("provider returned HTTP {}", response.status()),
            });
        }

        let payload: Value = response.json().await.map_err(|e| ResolveError::Failed {
            message: format!("invalid JSON from provider: {}", e),
        })?;

        Self::first_stream_info(&payload).ok_or_else(|| ResolveError::NotFound {
            stream_id: stream_id.to_string(),
        })
    }

    /// Resolve, falling back to `original_url` on any failure except rate
    /// limiting. Used by the stream proxy's pre-resolution step.
    pub async fn resolve_or_original(&self, stream_id: &str, original_url: &str) -> String {
        match self.resolve(stream_id).await {
            Ok(info) => {
                debug!("Substituting direct stream URL for id {}", stream_id);
                info.stream_url
            }
            Err(e) => {
                warn!("Direct stream resolution failed for id {}: {}", stream_id, e);
                original_url.to_string()
            }
        }
    }

    fn first_stream_info(payload: &Value) -> Option<DirectStreamInfo> {
        let first = payload.as_array()?.first()?;
        let stream_url = non_empty_string(&first["direct_source"])
            .or_else(|| non_empty_string(&first["stream_url"]))?;

        Some(DirectStreamInfo {
            stream_url,
            name: non_empty_string(&first["name"]),
            stream_type: non_empty_string(&first["stream_type"]),
            epg_channel_id: non_empty_string(&first["epg_channel_id"]),
            added: non_empty_string(&first["added"]),
            category_id: non_empty_string(&first["category_id"]),
            custom_sid: non_empty_string(&first["custom_sid"]),
        })
    }
}

/// Xtream-style APIs mix strings and numbers for the same field between
/// providers, so coerce scalars to strings.
fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_url_encodes_credential_metacharacters() {
        let mut config = Config::default();
        config.provider.username = "user 1".to_string();
        config.provider.password = "p&ss%wd#1".to_string();
        let resolver = DirectStreamResolver::new(&config).unwrap();

        let url = resolver.api_url("42").unwrap().to_string();
        assert!(url.contains("username=user+1"));
        assert!(url.contains("password=p%26ss%25wd%231"));
        assert!(url.contains("action=get_live_streams"));
        assert!(url.contains("stream_id=42"));
    }

    #[test]
    fn extracts_numeric_stream_id() {
        assert_eq!(
            extract_stream_id("http://main.cdnfs.top/live/12345.m3u8"),
            Some("12345")
        );
        assert_eq!(extract_stream_id("http://host/movie/film.m3u8"), None);
        assert_eq!(extract_stream_id("http://host/segment.ts"), None);
    }

    #[test]
    fn prefers_direct_source_over_stream_url() {
        let payload = json!([{
            "direct_source": "http://direct/a.m3u8",
            "stream_url": "http://public/a.m3u8",
            "name": "Canal A",
            "stream_type": "live",
            "category_id": 7
        }]);
        let info = DirectStreamResolver::first_stream_info(&payload).unwrap();
        assert_eq!(info.stream_url, "http://direct/a.m3u8");
        assert_eq!(info.name.as_deref(), Some("Canal A"));
        assert_eq!(info.category_id.as_deref(), Some("7"));
    }

    #[test]
    fn falls_back_to_stream_url_field() {
        let payload = json!([{
            "direct_source": "",
            "stream_url": "http://public/a.m3u8"
        }]);
        let info = DirectStreamResolver::first_stream_info(&payload).unwrap();
        assert_eq!(info.stream_url, "http://public/a.m3u8");
    }

    #[test]
    fn empty_array_is_not_found() {
        assert!(DirectStreamResolver::first_stream_info(&json!([])).is_none());
        assert!(DirectStreamResolver::first_stream_info(&json!({})).is_none());
        assert!(DirectStreamResolver::first_stream_info(&json!([{ "name": "x" }])).is_none());
    }
}
