// src/storage/snapshot.rs

//! Helpers for backends that keep every record in one serialized JSON array
//! (object store and local file).

use super::backend::StorageError;
use crate::models::score::ScoreRecord;

/// Decodes a stored array. Empty input is an empty set, not an error.
pub fn decode(bytes: &[u8]) -> Result<Vec<ScoreRecord>, StorageError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).map_err(|e| StorageError::Malformed(e.to_string()))
}

pub fn encode(records: &[ScoreRecord]) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(records).map_err(|e| StorageError::Malformed(e.to_string()))
}

/// Stable sort by `received_at`, keeping insertion order for ties.
pub fn sort_by_received(records: &mut [ScoreRecord]) {
    records.sort_by_key(|r| r.received_at);
}

/// Pushes `record` unless a stored record has the same id key.
pub fn push_unique(
    records: &mut Vec<ScoreRecord>,
    record: &ScoreRecord,
) -> Result<(), StorageError> {
    let key = record.id.key();
    if records.iter().any(|r| r.id.key() == key) {
        return Err(StorageError::Duplicate(record.id.clone()));
    }
    records.push(record.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::ScoreId;

    fn record(id: i64, at: &str) -> ScoreRecord {
        ScoreRecord {
            id: ScoreId::Number(id),
            name: format!("user{}", id),
            email: None,
            score: None,
            answered_questions: None,
            total_questions: None,
            time_taken: None,
            reason: None,
            received_at: at.parse().unwrap(),
            date: None,
        }
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn corrupt_input_is_malformed() {
        assert!(matches!(decode(b"[{oops"), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut records = vec![
            record(3, "2024-01-02T00:00:00Z"),
            record(1, "2024-01-01T00:00:00Z"),
            record(2, "2024-01-01T00:00:00Z"),
        ];
        sort_by_received(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(
            ids,
            vec![ScoreId::Number(1), ScoreId::Number(2), ScoreId::Number(3)]
        );
    }

    #[test]
    fn push_unique_rejects_collisions() {
        let mut records = vec![record(1, "2024-01-01T00:00:00Z")];
        let err = push_unique(&mut records, &record(1, "2024-02-01T00:00:00Z")).unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(ScoreId::Number(1))));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn push_unique_compares_numbers_and_strings_by_key() {
        let mut records = vec![record(42, "2024-01-01T00:00:00Z")];
        let mut text = record(0, "2024-01-02T00:00:00Z");
        text.id = ScoreId::Text("42".to_string());
        assert!(matches!(
            push_unique(&mut records, &text),
            Err(StorageError::Duplicate(_))
        ));

        text.id = ScoreId::Text("0042".to_string());
        push_unique(&mut records, &text).unwrap();
        assert_eq!(records.len(), 2);
    }
}
