//! trend-engine - Trend Data Exploration Service
//!
//! Loads a schema-described dataset at startup, synthesizes group records,
//! and serves aggregated weighted-statistics series (with optional
//! error-matrix accuracy correction) over HTTP.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trend_engine::config::EngineSettings;
use trend_engine::{build_router, AppState, TrendEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting trend-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = EngineSettings::resolve();
    info!("Data folder: {}", settings.data_dir.display());

    let engine = TrendEngine::initialize(&settings).await?;
    info!(
        strata = engine.configuration.strata.len(),
        variables = engine.configuration.variables.len(),
        records = engine.records.len(),
        "engine initialized"
    );

    let state = AppState::new(engine);
    let app = build_router(state, settings.static_assets.as_deref());

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Listening on http://{}", settings.bind_addr);
    info!("Health check: http://{}/health", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
