//! HTTP API handlers for trend-engine

pub mod export;
pub mod health;
pub mod series;

pub use export::export_routes;
pub use health::health_routes;
pub use series::data_routes;
