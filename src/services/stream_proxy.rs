//! Upstream stream fetching and HLS manifest rewriting.
//!
//! The browser player cannot talk to IPTV origins directly (CORS, referer
//! checks, path-embedded auth), so every stream flows through the proxy
//! endpoint. Manifests are rewritten line by line so each segment or
//! variant reference routes back through the proxy; segments are piped
//! through untouched.

use reqwest::header::{ACCEPT, REFERER};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::config::Config;
use crate::errors::{AppError, ProxyError};

/// Route the rewritten manifest references back through.
pub const PROXY_ENDPOINT: &str = "/api/stream-proxy";

/// Result of an upstream fetch. Manifests are buffered so they can be
/// rewritten; everything else keeps the response for streaming.
pub enum ProxiedUpstream {
    Manifest { status: u16, body: String },
    Segment { response: reqwest::Response },
}

#[derive(Clone)]
pub struct StreamProxyService {
    manifest_client: reqwest::Client,
    segment_client: reqwest::Client,
    referer: String,
    max_manifest_bytes: usize,
    max_manifest_lines: usize,
}

impl StreamProxyService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let manifest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.proxy.manifest_timeout_secs))
            .user_agent(config.proxy.user_agent.clone())
            .build()?;
        let segment_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.proxy.segment_timeout_secs))
            .user_agent(config.proxy.user_agent.clone())
            .build()?;

        Ok(Self {
            manifest_client,
            segment_client,
            referer: config.provider_referer(),
            max_manifest_bytes: config.proxy.max_manifest_bytes,
            max_manifest_lines: config.proxy.max_manifest_lines,
        })
    }

    /// Fetch `url` from upstream, buffering manifests for rewriting and
    /// leaving everything else as a byte stream.
    pub async fn fetch(&self, url: &str) -> Result<ProxiedUpstream, ProxyError> {
        let is_manifest = is_manifest_url(url);
        let client = if is_manifest {
            &self.manifest_client
        } else {
            &self.segment_client
        };

        debug!("Proxy request for stream: {}", url);
        let response = client
            .get(url)
            .header(REFERER, &self.referer)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| ProxyError::upstream(url, e.to_string()))?;

        if is_manifest {
            let status = response.status().as_u16();
            if !response.status().is_success() {
                return Err(ProxyError::upstream(
                    url,
                    format!("upstream returned HTTP {}", status),
                ));
            }
            if let Some(length) = response.content_length() {
                if length as usize > self.max_manifest_bytes {
                    return Err(ProxyError::ManifestTooLarge {
                        url: url.to_string(),
                        detail: format!("{} bytes", length),
                    });
                }
            }
            let body = response
                .text()
                .await
                .map_err(|e| ProxyError::upstream(url, e.to_string()))?;
            if body.len() > self.max_manifest_bytes {
                return Err(ProxyError::ManifestTooLarge {
                    url: url.to_string(),
                    detail: format!("{} bytes", body.len()),
                });
            }
            Ok(ProxiedUpstream::Manifest { status, body })
        } else {
            // Non-success segment statuses take the fallback path like any
            // other upstream failure; 2xx (including 206 for Range requests)
            // passes through.
            if !response.status().is_success() {
                return Err(ProxyError::upstream(
                    url,
                    format!("upstream returned HTTP {}", response.status().as_u16()),
                ));
            }
            Ok(ProxiedUpstream::Segment { response })
        }
    }

    /// Rewrite every media-reference line of a manifest so it routes back
    /// through the proxy endpoint. Directive lines pass through untouched.
    pub fn rewrite_manifest(
        &self,
        manifest: &str,
        manifest_url: &str,
    ) -> Result<String, ProxyError> {
        let base = Url::parse(manifest_url).map_err(|e| ProxyError::InvalidRequest {
            message: format!("manifest URL {} is not a valid URL: {}", manifest_url, e),
        })?;

        let line_count = manifest.lines().count();
        if line_count > self.max_manifest_lines {
            return Err(ProxyError::ManifestTooLarge {
                url: manifest_url.to_string(),
                detail: format!("{} lines", line_count),
            });
        }

        let rewritten: Vec<String> = manifest
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return line.to_string();
                }
                match resolve_reference(&base, trimmed) {
                    Some(absolute) => {
                        format!("{}?url={}", PROXY_ENDPOINT, urlencoding::encode(&absolute))
                    }
                    None => {
                        error!("Failed to resolve manifest reference: {}", trimmed);
                        line.to_string()
                    }
                }
            })
            .collect();

        Ok(rewritten.join("\n"))
    }
}

/// Whether a URL points at an HLS manifest, judged by the path extension so
/// query parameters (e.g. injected credentials) do not confuse the check.
pub fn is_manifest_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with(".m3u8"),
        Err(_) => url.ends_with(".m3u8"),
    }
}

/// Content type forced for well-known HLS extensions; `None` means the
/// upstream content type passes through.
pub fn content_type_for(url: &str) -> Option<&'static str> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    if path.ends_with(".m3u8") {
        Some("application/vnd.apple.mpegurl")
    } else if path.ends_with(".ts") {
        Some("video/mp2t")
    } else {
        None
    }
}

/// Resolve a manifest reference line to an absolute URL. Absolute lines are
/// kept; root-relative lines keep the manifest origin; purely relative
/// lines resolve against the manifest's directory.
fn resolve_reference(base: &Url, line: &str) -> Option<String> {
    if line.starts_with("http://") || line.starts_with("https://") {
        return Some(line.to_string());
    }
    base.join(line).ok().map(|resolved| resolved.to_string())
}
