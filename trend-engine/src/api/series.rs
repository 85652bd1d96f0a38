//! Configuration and aggregation endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use trend_common::model::{
    Selection, SelectionRequest, SeriesData, StratumField, TimeField, VariableField, ViewPoint,
    WeightField,
};

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/config response: the loaded schema plus the default selection
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub strata: Vec<StratumField>,
    pub variables: Vec<VariableField>,
    pub time: TimeField,
    pub weight: WeightField,
    pub warning_area_threshold: f64,
    pub minimum_area_threshold: f64,
    /// Observed `[min, max]` of the time field
    pub time_range: (f64, f64),
    pub selected: Selection,
}

/// One chart-ready series
#[derive(Debug, Serialize)]
pub struct SeriesPayload {
    pub label: String,
    pub color: String,
    /// NaN serializes as null
    pub min_weight: f64,
    pub points: Vec<ViewPoint>,
}

impl SeriesPayload {
    fn from_series(series: &dyn SeriesData) -> Self {
        Self {
            label: series.label().to_string(),
            color: series.color().to_string(),
            min_weight: series.min_weight(),
            points: series.view_data(),
        }
    }
}

/// POST /api/series response
#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub series: Vec<SeriesPayload>,
    /// Number of records matching the selection filters
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_matrix: Option<crate::services::ErrorMatrix>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrected: Vec<SeriesPayload>,
}

/// GET /api/config
///
/// The field descriptors the front end needs to build its controls, plus
/// the selection the engine starts with.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let configuration = &state.engine.configuration;
    Json(ConfigResponse {
        strata: configuration.strata.clone(),
        variables: configuration.variables.clone(),
        time: configuration.time.clone(),
        weight: configuration.weight.clone(),
        warning_area_threshold: configuration.warning_area_threshold,
        minimum_area_threshold: configuration.minimum_area_threshold,
        time_range: configuration.time_range,
        selected: state.engine.default_selection(),
    })
}

/// POST /api/series
///
/// Resolve the submitted selection and run one aggregation pass.
pub async fn post_series(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<Json<SeriesResponse>> {
    let selection = state.engine.resolve_selection(&request)?;
    let output = state.engine.run(&selection)?;

    let series = output
        .series
        .iter()
        .map(|s| SeriesPayload::from_series(s))
        .collect();
    let (error_matrix, corrected) = match output.corrected {
        Some(correction) => (
            Some(correction.error_matrix),
            correction
                .series_data
                .iter()
                .map(|s| SeriesPayload::from_series(s))
                .collect(),
        ),
        None => (None, Vec::new()),
    };

    Ok(Json(SeriesResponse {
        series,
        count: output.count,
        error_matrix,
        corrected,
    }))
}

/// Build configuration and aggregation routes
pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/series", post(post_series))
}
