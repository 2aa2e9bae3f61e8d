use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::errors::IngestError;
use crate::errors::ResolveError;
use crate::ingestor::ImportOptions;
use crate::models::{ContentType, Episode, EpisodeCreateRequest};
use crate::services::resolver::extract_stream_id;
use crate::services::stream_proxy::{content_type_for, is_manifest_url, ProxiedUpstream};

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// Playlist ingestion API

/// Parse the configured remote playlist without persisting anything.
pub async fn parse_playlist(State(state): State<AppState>) -> Response {
    let source = state.ingestor.remote_source();
    match state.ingestor.parse_source(&source).await {
        Ok(parsed) => Json(json!({
            "success": true,
            "count": parsed.items.len(),
            "dropped": parsed.dropped,
            "media": parsed.items,
        }))
        .into_response(),
        Err(e) => {
            error!("Error fetching playlist: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Import the remote playlist into the store. Rate-limited providers fall
/// back to the demo dataset rather than failing the request.
pub async fn import_playlist(State(state): State<AppState>) -> Response {
    let _session = state.import_lock.lock().await;

    let source = state.ingestor.remote_source();
    match state.ingestor.parse_source(&source).await {
        Ok(parsed) => {
            let summary = state
                .ingestor
                .import(&state.store, parsed, ImportOptions::default())
                .await;
            Json(summary).into_response()
        }
        Err(IngestError::RateLimited) => {
            warn!("Playlist provider rate limited, loading demo content instead");
            let mut summary = state.ingestor.import_demo(&state.store).await;
            summary.message = "IPTV provider rate limited. Demo content loaded instead.".to_string();
            Json(summary).into_response()
        }
        Err(e) => {
            error!("Error importing playlist: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocalImportParams {
    pub clear: Option<bool>,
    pub limit: Option<usize>,
}

/// Import the local playlist file, capped per content type so oversized
/// provider playlists cannot swamp the store.
pub async fn import_local_playlist(
    State(state): State<AppState>,
    Query(params): Query<LocalImportParams>,
) -> Response {
    let _session = state.import_lock.lock().await;

    let source = state.ingestor.local_source();
    if !source.exists() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Local playlist file not found" })),
        )
            .into_response();
    }

    match state.ingestor.parse_source(&source).await {
        Ok(parsed) => {
            let options = ImportOptions {
                clear: params.clear.unwrap_or(false),
                limit: params.limit,
                cap_per_type: Some(state.ingestor.default_type_cap()),
            };
            let summary = state.ingestor.import(&state.store, parsed, options).await;
            Json(summary).into_response()
        }
        Err(e) => {
            error!("Error importing local playlist: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Replace the catalog with the built-in demo dataset.
pub async fn create_demo_content(State(state): State<AppState>) -> Response {
    let _session = state.import_lock.lock().await;
    let summary = state.ingestor.import_demo(&state.store).await;
    info!("Loaded {} demo items", summary.imported);
    Json(summary).into_response()
}

// Catalog API

pub async fn list_media(State(state): State<AppState>) -> Response {
    Json(state.store.get_all_media().await).into_response()
}

pub async fn list_featured_media(State(state): State<AppState>) -> Response {
    Json(state.store.get_featured_media().await).into_response()
}

pub async fn get_media(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.store.get_media(id).await {
        Some(media) => Json(media).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Media not found" })),
        )
            .into_response(),
    }
}

pub async fn list_movies(State(state): State<AppState>) -> Response {
    Json(state.store.get_media_by_type(ContentType::Movie).await).into_response()
}

pub async fn list_series(State(state): State<AppState>) -> Response {
    Json(state.store.get_media_by_type(ContentType::Series).await).into_response()
}

pub async fn list_channels(State(state): State<AppState>) -> Response {
    Json(state.store.get_media_by_type(ContentType::Channel).await).into_response()
}

pub async fn list_episodes(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let media = match state.store.get_media(id).await {
        Some(media) => media,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Media not found" })),
            )
                .into_response()
        }
    };
    if media.content_type != ContentType::Series {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Media is not a series" })),
        )
            .into_response();
    }
    Json(state.store.get_episodes(id).await).into_response()
}

pub async fn create_episode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EpisodeCreateRequest>,
) -> Response {
    let media = match state.store.get_media(id).await {
        Some(media) => media,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Media not found" })),
            )
                .into_response()
        }
    };
    if media.content_type != ContentType::Series {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Media is not a series" })),
        )
            .into_response();
    }

    let episode = state
        .store
        .create_episode(Episode {
            id: Uuid::new_v4(),
            media_id: id,
            title: payload.title,
            season_number: payload.season_number,
            episode_number: payload.episode_number,
            stream_url: payload.stream_url,
            thumbnail_url: payload.thumbnail_url,
            description: payload.description,
        })
        .await;
    (StatusCode::CREATED, Json(episode)).into_response()
}

// Playback API

pub async fn get_direct_stream(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> Response {
    match state.resolver.resolve(&stream_id).await {
        Ok(info) => Json(json!({
            "success": true,
            "streamUrl": info.stream_url,
            "name": info.name,
            "streamType": info.stream_type,
            "epgChannelId": info.epg_channel_id,
            "added": info.added,
            "categoryId": info.category_id,
            "customSid": info.custom_sid,
        }))
        .into_response(),
        Err(ResolveError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "message": "No direct stream URL found for this stream ID",
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Error getting direct stream URL: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Failed to get direct stream URL",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamProxyParams {
    pub url: Option<String>,
}

/// Proxy an upstream stream URL, rewriting manifests so the player keeps
/// coming back through this endpoint. Any upstream failure degrades to the
/// configured fallback stream instead of stalling the player.
pub async fn stream_proxy(
    State(state): State<AppState>,
    Query(params): Query<StreamProxyParams>,
    headers: HeaderMap,
) -> Response {
    let url = match params.url {
        Some(url) if !url.is_empty() => url,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "No URL provided" })),
            )
                .into_response()
        }
    };

    // Provider manifest URLs can often be swapped for a short-lived direct
    // source; failure here silently keeps the original URL.
    let mut target = url;
    if is_provider_url(&state, &target) && is_manifest_url(&target) {
        if let Some(stream_id) = extract_stream_id(&target) {
            let stream_id = stream_id.to_string();
            target = state.resolver.resolve_or_original(&stream_id, &target).await;
        }
    }

    let fallback_url = state.config.proxy.fallback_stream_url.clone();
    match state.proxy.fetch(&target).await {
        Ok(ProxiedUpstream::Manifest { status, body }) => {
            match state.proxy.rewrite_manifest(&body, &target) {
                Ok(rewritten) => manifest_response(status, rewritten),
                Err(e) => {
                    error!("Manifest rewrite failed for {}: {}", target, e);
                    fallback_response(&headers, &fallback_url, &e.to_string())
                }
            }
        }
        Ok(ProxiedUpstream::Segment { response }) => {
            segment_response(&target, response, &headers, &fallback_url)
        }
        Err(e) => {
            error!("Stream proxy error for {}: {}", target, e);
            fallback_response(&headers, &fallback_url, &e.to_string())
        }
    }
}

fn is_provider_url(state: &AppState, url: &str) -> bool {
    state
        .config
        .provider
        .host_markers
        .iter()
        .any(|marker| url.contains(marker))
}

fn manifest_response(status: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/vnd.apple.mpegurl"),
    );
    insert_cors_headers(headers);
    response
}

fn segment_response(
    target: &str,
    upstream: reqwest::Response,
    request_headers: &HeaderMap,
    fallback_url: &str,
) -> Response {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = content_type_for(target).map(str::to_string).or_else(|| {
        upstream
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder = builder
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS")
        .header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Origin, X-Requested-With, Content-Type, Accept, Range",
        );

    // Bytes flow straight through; no buffering of segment payloads.
    match builder.body(Body::from_stream(upstream.bytes_stream())) {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build segment response: {}", e);
            fallback_response(request_headers, fallback_url, &e.to_string())
        }
    }
}

fn insert_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept, Range"),
    );
}

/// Never leave the player stalled: JSON callers get a structured error with
/// a known-good fallback stream, everyone else is redirected to it.
fn fallback_response(headers: &HeaderMap, fallback_url: &str, error: &str) -> Response {
    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false);

    if wants_json {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "message": "Failed to proxy stream",
                "error": error,
                "fallbackUrl": fallback_url,
            })),
        )
            .into_response()
    } else {
        Redirect::temporary(fallback_url).into_response()
    }
}
