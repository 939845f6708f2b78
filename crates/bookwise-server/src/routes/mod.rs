//! HTTP route handlers.

pub mod chat;
pub mod ingest;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ingest::routes())
        .merge(chat::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
