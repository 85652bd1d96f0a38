//! Aggregated series output
//!
//! `SeriesModel` carries `[time, value]` pairs from the aggregator;
//! `SeriesAndErrorsModel` carries `[time, value, lower, upper]` tuples from
//! the accuracy corrector. Both expose chart-ready view rows through the
//! `SeriesData` trait; they differ only in how raw tuples map to bounds.

use serde::Serialize;

/// One chart-ready point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
    pub min: f64,
    pub max: f64,
}

/// Common view of an aggregated series
pub trait SeriesData {
    fn label(&self) -> &str;
    fn color(&self) -> &str;
    /// Minimum total weight observed across this series' time buckets;
    /// NaN when the series has no in-window buckets
    fn min_weight(&self) -> f64;
    fn view_data(&self) -> Vec<ViewPoint>;
}

/// Aggregated output for one series value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesModel {
    pub label: String,
    pub color: String,
    pub min_weight: f64,
    /// `[time, value]` pairs in ascending time order
    pub data: Vec<(f64, f64)>,
}

impl SeriesData for SeriesModel {
    fn label(&self) -> &str {
        &self.label
    }

    fn color(&self) -> &str {
        &self.color
    }

    fn min_weight(&self) -> f64 {
        self.min_weight
    }

    fn view_data(&self) -> Vec<ViewPoint> {
        self.data
            .iter()
            .map(|&(x, y)| ViewPoint { x, y, min: y, max: y })
            .collect()
    }
}

/// Aggregated output with confidence bounds per point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesAndErrorsModel {
    pub label: String,
    pub color: String,
    pub min_weight: f64,
    /// `[time, value, lower, upper]` tuples in ascending time order
    pub data: Vec<(f64, f64, f64, f64)>,
}

impl SeriesData for SeriesAndErrorsModel {
    fn label(&self) -> &str {
        &self.label
    }

    fn color(&self) -> &str {
        &self.color
    }

    fn min_weight(&self) -> f64 {
        self.min_weight
    }

    fn view_data(&self) -> Vec<ViewPoint> {
        self.data
            .iter()
            .map(|&(x, y, min, max)| ViewPoint { x, y, min, max })
            .collect()
    }
}
