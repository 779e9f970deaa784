// src/handlers/status.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{models::score::QuizStatus, service::ScoreService};

/// Reports whether `name` has already submitted a result.
pub async fn quiz_status(
    State(service): State<ScoreService>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let completed = service.has_completed(&name).await;
    Json(QuizStatus { completed })
}

pub async fn health(State(service): State<ScoreService>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "backend": service.repository().backend_kind().as_str(),
    }))
}
