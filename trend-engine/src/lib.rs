//! trend-engine library interface
//!
//! Hosts the data-exploration pipeline (group synthesis, filtering,
//! aggregation, accuracy correction, export) behind a small HTTP API.
//! Exposed as a library for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod loader;
pub mod services;

pub use crate::error::{ApiError, ApiResult};
pub use crate::loader::TrendEngine;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The immutable engine built once at startup
    pub engine: Arc<TrendEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: TrendEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState, static_assets: Option<&Path>) -> Router {
    let router = Router::new()
        .merge(api::data_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Front-end assets are served when a folder is configured
    match static_assets {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}
