//! Chat API - HTTP front end for the orchestrator
//!
//! # Endpoints
//!
//! - `POST /chat` - Route a message and answer it
//! - `GET /health` - Health check with catalog and registry sizes

mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;

pub use routes::{ChatReply, HealthResponse};
pub use state::AppState;

/// Create the API router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until the process exits
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Starting Switchboard chat API");

    axum::serve(listener, router).await?;
    Ok(())
}
