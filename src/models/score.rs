// src/models/score.rs

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identifier of a score.
/// Clients may send either a number or a string; generated ids are numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreId {
    Number(i64),
    Text(String),
}

impl ScoreId {
    /// Id derived from the submission time in milliseconds.
    pub fn generate(now: DateTime<Utc>) -> Self {
        ScoreId::Number(now.timestamp_millis())
    }

    /// Key used for uniqueness on every backend. `42` and `"42"` share a key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScoreId::Number(_))
    }

    /// Rebuilds an id from its stored key and the JSON type it was submitted with.
    pub fn from_key(key: &str, numeric: bool) -> Self {
        match key.parse::<i64>() {
            Ok(n) if numeric => ScoreId::Number(n),
            _ => ScoreId::Text(key.to_string()),
        }
    }
}

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreId::Number(n) => write!(f, "{}", n),
            ScoreId::Text(s) => f.write_str(s),
        }
    }
}

/// One persisted quiz result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: ScoreId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_questions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
    /// Why the quiz ended early (tab switch, timeout, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Client-side timestamp, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// DTO for submitting a quiz result.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub id: Option<ScoreId>,
    #[validate(
        required(message = "name is required"),
        length(min = 1, message = "name must not be empty")
    )]
    pub name: Option<String>,
    pub email: Option<String>,
    pub score: Option<i64>,
    pub answered_questions: Option<i64>,
    pub total_questions: Option<i64>,
    pub time_taken: Option<String>,
    pub reason: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub date: Option<String>,
}

impl SubmitScoreRequest {
    /// Builds the record to persist, filling in `id` and `receivedAt` when absent.
    /// Returns `None` when `name` is missing or blank.
    pub fn into_record(self, now: DateTime<Utc>) -> Option<ScoreRecord> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let now = now.trunc_subsecs(3);

        Some(ScoreRecord {
            id: self.id.unwrap_or_else(|| ScoreId::generate(now)),
            name,
            email: self.email,
            score: self.score,
            answered_questions: self.answered_questions,
            total_questions: self.total_questions,
            time_taken: self.time_taken,
            reason: self.reason,
            received_at: self.received_at.unwrap_or(now),
            date: self.date,
        })
    }
}

/// Response for the quiz status check.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizStatus {
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_accepts_number_and_string() {
        let n: ScoreId = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(n, ScoreId::Number(1_700_000_000_000));
        let s: ScoreId = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(s, ScoreId::Text("abc-1".to_string()));
    }

    #[test]
    fn from_key_keeps_submitted_type() {
        for id in [
            ScoreId::Number(42),
            ScoreId::Text("42".to_string()),
            ScoreId::Text("0042".to_string()),
            ScoreId::Text("x42".to_string()),
        ] {
            assert_eq!(ScoreId::from_key(&id.key(), id.is_numeric()), id);
        }
    }

    #[test]
    fn number_and_numeric_text_share_a_key() {
        assert_eq!(ScoreId::Number(42).key(), ScoreId::Text("42".to_string()).key());
        assert_ne!(ScoreId::Number(42).key(), ScoreId::Text("0042".to_string()).key());
    }

    #[test]
    fn long_names_pass_validation() {
        let req = SubmitScoreRequest {
            name: Some("a".repeat(1_000)),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
        assert!(req.into_record(Utc::now()).is_some());
    }

    #[test]
    fn into_record_fills_defaults() {
        let now = Utc::now();
        let req = SubmitScoreRequest {
            name: Some("Alice".to_string()),
            score: Some(18),
            ..Default::default()
        };
        let record = req.into_record(now).unwrap();
        assert_eq!(record.id, ScoreId::Number(now.trunc_subsecs(3).timestamp_millis()));
        assert_eq!(record.received_at, now.trunc_subsecs(3));
        assert_eq!(record.score, Some(18));
    }

    #[test]
    fn into_record_keeps_supplied_identity() {
        let received_at = "2024-05-01T10:00:00Z".parse().unwrap();
        let req = SubmitScoreRequest {
            id: Some(ScoreId::Text("custom".to_string())),
            name: Some("Bob".to_string()),
            received_at: Some(received_at),
            ..Default::default()
        };
        let record = req.into_record(Utc::now()).unwrap();
        assert_eq!(record.id, ScoreId::Text("custom".to_string()));
        assert_eq!(record.received_at, received_at);
    }

    #[test]
    fn blank_name_yields_no_record() {
        let req = SubmitScoreRequest {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(req.into_record(Utc::now()).is_none());
        assert!(SubmitScoreRequest::default().into_record(Utc::now()).is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = ScoreRecord {
            id: ScoreId::Number(1),
            name: "Alice".to_string(),
            email: None,
            score: Some(3),
            answered_questions: Some(4),
            total_questions: Some(5),
            time_taken: Some("1:02".to_string()),
            reason: None,
            received_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            date: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["answeredQuestions"], 4);
        assert_eq!(value["totalQuestions"], 5);
        assert_eq!(value["timeTaken"], "1:02");
        assert!(value.get("email").is_none());
        assert!(value["receivedAt"].as_str().unwrap().starts_with("2024-05-01T10:00:00"));
    }
}
