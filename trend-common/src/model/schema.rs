//! Raw schema JSON types
//!
//! The schema file declares the dataset location, the typed fields, the
//! low-area warning thresholds, and (optionally) the accuracy-assessment
//! reference dataset. Field names are camelCase on disk.

use serde::Deserialize;

/// Top-level schema document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    /// Dataset filename, relative to the data folder
    #[serde(rename = "fn")]
    pub dataset: String,
    pub variables: Vec<RawVariable>,
    /// Series with minimum weight below this raise a low-area warning
    pub warning_area_threshold: f64,
    /// Series with minimum weight below this are hidden entirely
    pub minimum_area_threshold: f64,
    #[serde(default)]
    pub olofsson: Option<RawOlofsson>,
}

/// One declared field of the dataset
#[derive(Debug, Clone, Deserialize)]
pub struct RawVariable {
    pub key: String,
    pub alias: String,
    /// One of: categorical, continuous, weight, total, time
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub units: Option<String>,
    /// Leaf categories; categorical fields only
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    /// Named unions of leaf categories; categorical fields only
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCategory {
    pub key: String,
    pub alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    pub key: String,
    pub alias: String,
    pub items: Vec<String>,
}

/// Accuracy-assessment reference configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RawOlofsson {
    /// Reference dataset filename, relative to the data folder
    #[serde(rename = "fn")]
    pub dataset: String,
    /// Stratum keys with `<key>_OBS` / `<key>_PRD` reference columns
    pub fields: Vec<String>,
}
