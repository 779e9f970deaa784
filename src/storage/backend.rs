// src/storage/backend.rs

use async_trait::async_trait;
use std::fmt;

use crate::models::score::{ScoreId, ScoreRecord};

/// Failures reported by a score backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection, auth or transport failure. Reads degrade, writes surface it.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("malformed stored data: {0}")]
    Malformed(String),

    /// A record with this id is already stored.
    #[error("duplicate score id: {0}")]
    Duplicate(ScoreId),
}

/// Which durable store is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Relational,
    Document,
    Object,
    File,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Document => "document",
            BackendKind::Object => "object",
            BackendKind::File => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable store for score records.
///
/// Implementations return raw errors; degradation to empty results and the
/// local-file read fallback live in [`ScoreRepository`](super::ScoreRepository).
#[async_trait]
pub trait ScoreBackend: Send + Sync {
    /// All records, ascending by `received_at`.
    async fn list_all(&self) -> Result<Vec<ScoreRecord>, StorageError>;

    /// Persists one record. Fails with `Duplicate` if the id is taken.
    async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError>;

    /// Removes every record.
    async fn clear_all(&self) -> Result<(), StorageError>;

    /// Whether any record carries this name.
    async fn contains_name(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.list_all().await?.iter().any(|r| r.name == name))
    }

    fn kind(&self) -> BackendKind;
}
