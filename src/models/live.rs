// src/models/live.rs

use serde::Serialize;

use crate::models::score::ScoreRecord;

/// Envelope pushed to live observers.
///
/// Serialized as `{"type": "new-score", "payload": {...}}` or `{"type": "clear-scores"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum LiveEvent {
    NewScore(ScoreRecord),
    ClearScores,
}
