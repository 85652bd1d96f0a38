//! The user's current selection
//!
//! `SelectionRequest` is the wire-level shape the front end submits;
//! `Selection` is the resolved, typed form every pipeline service consumes.
//! Resolution (key validation, time-window clamping) lives with the
//! configuration service.

use crate::model::fields::{CategoryEntry, SeriesField, TimeField, VariableField, WeightField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deep copy of the entries currently enabled for one stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedStratum {
    pub key: String,
    pub alias: String,
    /// The selected subset of the stratum's categories and groups
    pub categories: Vec<CategoryEntry>,
}

impl SelectedStratum {
    /// Selected keys verbatim (groups not expanded)
    pub fn selected_keys(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.key()).collect()
    }

    /// Selected keys with groups expanded to their leaf items, deduplicated
    /// in first-seen order
    pub fn expanded_keys(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.categories {
            for key in entry.expanded_keys() {
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        seen
    }
}

/// Fully resolved selection state driving one aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub strata: Vec<SelectedStratum>,
    pub series_field: SeriesField,
    pub variable_field: VariableField,
    pub time_field: TimeField,
    pub weight_field: WeightField,
    pub min_time: f64,
    pub max_time: f64,
}

impl Selection {
    pub fn stratum(&self, key: &str) -> Option<&SelectedStratum> {
        self.strata.iter().find(|s| s.key == key)
    }
}

/// Wire-level selection submitted by the front end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    /// Key of the stratum splitting the chart into series
    pub series_field: String,
    /// Key of the variable to plot
    pub variable_field: String,
    /// Selected category/group keys per stratum key; a stratum absent from
    /// the map keeps all of its entries selected
    #[serde(default)]
    pub strata: HashMap<String, Vec<String>>,
    /// Time window; either bound absent means the observed extreme
    #[serde(default)]
    pub min_time: Option<f64>,
    #[serde(default)]
    pub max_time: Option<f64>,
}
