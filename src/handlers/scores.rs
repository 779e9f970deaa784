// src/handlers/scores.rs

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    error::AppError, models::score::SubmitScoreRequest, service::ScoreService,
    utils::csv::scores_to_csv,
};

/// Query parameters for the export endpoint.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}

/// Lists all stored scores, oldest first.
///
/// * `?format=csv` returns a downloadable CSV with a fixed column order.
/// * Backend failures degrade to an empty list.
pub async fn list_scores(
    State(service): State<ScoreService>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let scores = service.list_all().await;

    match params.format.as_deref() {
        None | Some("json") => Ok(Json(scores).into_response()),
        Some("csv") => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"scores.csv\""),
            ],
            scores_to_csv(&scores),
        )
            .into_response()),
        Some(other) => Err(AppError::BadRequest(format!(
            "Unsupported export format '{}'",
            other
        ))),
    }
}

/// Submits a quiz result.
pub async fn submit_score(
    State(service): State<ScoreService>,
    Json(payload): Json<SubmitScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = service.submit(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "id": record.id,
        })),
    ))
}

/// Deletes every stored score and resets completion state.
pub async fn clear_scores(
    State(service): State<ScoreService>,
) -> Result<impl IntoResponse, AppError> {
    service.clear_all().await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
