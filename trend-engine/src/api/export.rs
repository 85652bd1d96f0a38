//! CSV export endpoint

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use trend_common::model::SelectionRequest;

use crate::error::ApiResult;
use crate::AppState;

const DEFAULT_EXPORT_FILENAME: &str = "trend_export.csv";

/// POST /api/export request body: a selection plus an optional filename
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub selection: SelectionRequest,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Keep only characters safe inside a Content-Disposition filename
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_EXPORT_FILENAME.to_string()
    } else if cleaned.ends_with(".csv") {
        cleaned
    } else {
        format!("{}.csv", cleaned)
    }
}

/// POST /api/export
///
/// Run the pipeline for the submitted selection and return the sectioned
/// CSV text as a file attachment.
pub async fn post_export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Response> {
    let selection = state.engine.resolve_selection(&request.selection)?;
    let csv_text = state.engine.export(&selection)?;

    let filename = request
        .filename
        .as_deref()
        .map(sanitize_filename)
        .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv_text,
    )
        .into_response())
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export", post(post_export))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_unsafe_characters() {
        assert_eq!(sanitize_filename("my report.csv"), "myreport.csv");
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd.csv");
        assert_eq!(sanitize_filename("areas_2020"), "areas_2020.csv");
    }

    #[test]
    fn test_sanitize_filename_falls_back_when_empty() {
        assert_eq!(sanitize_filename("///"), DEFAULT_EXPORT_FILENAME);
    }
}
