//! Aggregation pipeline services
//!
//! Stateless services taking all inputs as parameters; selection state is
//! passed explicitly. Data flows configuration → group synthesis → record
//! filtering → aggregation → (optional) accuracy correction → export.

pub mod accuracy;
pub mod aggregator;
pub mod configuration;
pub mod exporter;
pub mod group_synthesizer;
pub mod record_filter;

pub use accuracy::{CorrectionOutput, ErrorMatrix};
pub use configuration::Configuration;
