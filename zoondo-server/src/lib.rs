//! Zoondo Server - WebSocket game server
//!
//! This crate embeds the engine:
//! - Room registry, one exclusively locked game per room
//! - Connection registry routing filtered states and notices
//! - Matchmaking on register
//! - Settle delay after each combat outcome
//! - Status endpoint and optional static file serving

pub mod dispatch;
pub mod protocol;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use zoondo_core::{Capabilities, CardCatalog, Catalog, GameConfig};

pub use state::{Outgoing, Room, ServerState};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for every path outside the API
    pub static_dir: Option<String>,
    /// Card catalog JSON; the bundled sample catalog when unset
    pub catalog_path: Option<PathBuf>,
    /// Time given to clients to show a combat outcome
    pub settle_delay: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8003,
            static_dir: None,
            catalog_path: None,
            settle_delay: Duration::from_secs(5),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the configured catalog
    pub fn load_catalog(&self) -> anyhow::Result<Arc<dyn CardCatalog>> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::sample()?,
        };
        Ok(Arc::new(catalog))
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let router = Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Game socket
        .route("/ws", get(routes::ws::ws_handler))
        // Shared state
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Static file serving (must be last)
    match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let catalog = config.load_catalog()?;
    let state = Arc::new(ServerState::new(config.clone(), catalog, Capabilities::builtin()));
    let router = create_router(&config, state);

    tracing::info!("Zoondo server starting on http://0.0.0.0:{}", config.port);
    match &config.static_dir {
        Some(dir) => tracing::info!("Static files served from: {}", dir),
        None => tracing::info!("No static directory configured"),
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
