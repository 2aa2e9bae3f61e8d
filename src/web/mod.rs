//! Web layer module
//!
//! HTTP interface for the catalog, import pipeline, direct-stream resolver
//! and stream proxy. Handlers stay thin and delegate to the service layer;
//! shared state is an [`AppState`] cloned into every handler.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    ingestor::PlaylistIngestor,
    services::{DirectStreamResolver, StreamProxyService},
    storage::MediaStore,
};

pub mod api;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config, store: MediaStore) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        let state = AppState {
            ingestor: PlaylistIngestor::new(&config)?,
            resolver: DirectStreamResolver::new(&config)?,
            proxy: StreamProxyService::new(&config)?,
            import_lock: Arc::new(tokio::sync::Mutex::new(())),
            store,
            config,
        };

        Ok(Self {
            app: Self::create_router(state),
            addr,
        })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(api::health_check))
            .nest("/api", Self::api_routes())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    fn api_routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(api::health_check))
            // Playlist ingestion
            .route("/playlist/parse", get(api::parse_playlist))
            .route("/playlist/import", post(api::import_playlist))
            .route("/playlist/import-local", post(api::import_local_playlist))
            .route("/create-demo-content", post(api::create_demo_content))
            // Catalog
            .route("/media", get(api::list_media))
            .route("/media/featured", get(api::list_featured_media))
            .route("/media/:id", get(api::get_media))
            .route(
                "/media/:id/episodes",
                get(api::list_episodes).post(api::create_episode),
            )
            .route("/movies", get(api::list_movies))
            .route("/series", get(api::list_series))
            .route("/channels", get(api::list_channels))
            // Playback
            .route("/direct-stream/:stream_id", get(api::get_direct_stream))
            .route("/stream-proxy", get(api::stream_proxy))
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: MediaStore,
    pub ingestor: PlaylistIngestor,
    pub resolver: DirectStreamResolver,
    pub proxy: StreamProxyService,
    /// Serializes import sessions; concurrent imports against the same
    /// collection would interleave destructively.
    pub import_lock: Arc<tokio::sync::Mutex<()>>,
}
