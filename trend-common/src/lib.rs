//! # Trend Common Library
//!
//! Shared code for the trend data-exploration workspace including:
//! - Domain model (field descriptors, records, series, selections)
//! - Raw schema JSON types
//! - Error types
//! - Service configuration loading

pub mod config;
pub mod error;
pub mod model;

pub use error::{Error, Result};
