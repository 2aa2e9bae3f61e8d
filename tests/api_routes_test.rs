use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use streamvault::{
    config::Config,
    ingestor::PlaylistIngestor,
    services::{DirectStreamResolver, StreamProxyService},
    storage::MediaStore,
    web::{AppState, WebServer},
};

fn test_app() -> (Router, MediaStore) {
    let mut config = Config::default();
    // Point the local playlist at a path that never exists in tests.
    config.playlist.local_path = std::path::PathBuf::from("/nonexistent/playlist.m3u");

    let store = MediaStore::new();
    let state = AppState {
        ingestor: PlaylistIngestor::new(&config).unwrap(),
        resolver: DirectStreamResolver::new(&config).unwrap(),
        proxy: StreamProxyService::new(&config).unwrap(),
        import_lock: Arc::new(tokio::sync::Mutex::new(())),
        store: store.clone(),
        config,
    };
    (WebServer::create_router(state), store)
}

async fn send_request(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _store) = test_app();
    let (status, body) = send_request(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body.get("timestamp").is_some());
}

#[tokio::test]
async fn demo_content_populates_catalog_endpoints() {
    let (app, _store) = test_app();

    let (status, body) = send_request(&app, Method::POST, "/api/create-demo-content").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["imported"], 10);
    assert_eq!(body["failed"], 0);

    let (status, media) = send_request(&app, Method::GET, "/api/media").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(media.as_array().unwrap().len(), 10);

    let (status, movies) = send_request(&app, Method::GET, "/api/movies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movies.as_array().unwrap().len(), 4);

    let (status, series) = send_request(&app, Method::GET, "/api/series").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series.as_array().unwrap().len(), 3);

    let (status, channels) = send_request(&app, Method::GET, "/api/channels").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(channels.as_array().unwrap().len(), 3);

    let (status, featured) = send_request(&app, Method::GET, "/api/media/featured").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!featured.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn series_expose_placeholder_episodes() {
    let (app, _store) = test_app();
    send_request(&app, Method::POST, "/api/create-demo-content").await;

    let (_, series) = send_request(&app, Method::GET, "/api/series").await;
    let series_id = series[0]["id"].as_str().unwrap().to_string();

    let (status, episodes) =
        send_request(&app, Method::GET, &format!("/api/media/{}/episodes", series_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(episodes.as_array().unwrap().len(), 5);
    assert_eq!(episodes[0]["season_number"], 1);

    // Episodes on a movie are a client error.
    let (_, movies) = send_request(&app, Method::GET, "/api/movies").await;
    let movie_id = movies[0]["id"].as_str().unwrap().to_string();
    let (status, body) =
        send_request(&app, Method::GET, &format!("/api/media/{}/episodes", movie_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Media is not a series");
}

#[tokio::test]
async fn unknown_media_id_is_not_found() {
    let (app, _store) = test_app();
    let (status, body) = send_request(
        &app,
        Method::GET,
        "/api/media/123e4567-e89b-12d3-a456-426614174000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Media not found");
}

/// Upstream that answers 500 to every segment request.
async fn spawn_failing_upstream() -> String {
    let app = Router::new().route(
        "/seg.ts",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/seg.ts", addr)
}

#[tokio::test]
async fn failing_segment_upstream_redirects_to_fallback() {
    let (app, _store) = test_app();
    let upstream = spawn_failing_upstream().await;

    let uri = format!("/api/stream-proxy?url={}", urlencoding::encode(&upstream));
    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(location.contains("tears-of-steel"));
}

#[tokio::test]
async fn failing_segment_upstream_returns_json_fallback() {
    let (app, _store) = test_app();
    let upstream = spawn_failing_upstream().await;

    let uri = format!("/api/stream-proxy?url={}", urlencoding::encode(&upstream));
    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(body["message"], "Failed to proxy stream");
    assert!(!body["fallbackUrl"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn stream_proxy_requires_url_parameter() {
    let (app, _store) = test_app();
    let (status, body) = send_request(&app, Method::GET, "/api/stream-proxy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No URL provided");
}

#[tokio::test]
async fn missing_local_playlist_yields_not_found() {
    let (app, _store) = test_app();
    let (status, body) = send_request(&app, Method::POST, "/api/playlist/import-local").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Local playlist file not found");
}
