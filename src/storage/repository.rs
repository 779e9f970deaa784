// src/storage/repository.rs

use std::sync::Arc;
use tracing::warn;

use super::backend::{BackendKind, ScoreBackend, StorageError};
use super::file::FileBackend;
use crate::models::score::ScoreRecord;

/// Uniform access to whichever backend was selected at startup.
///
/// Reads never fail: a remote backend that errors is answered from the local
/// file instead, and corrupt data reads as empty. Writes report failure.
#[derive(Clone)]
pub struct ScoreRepository {
    active: Arc<dyn ScoreBackend>,
    fallback: FileBackend,
}

impl ScoreRepository {
    pub fn new(active: Arc<dyn ScoreBackend>, fallback: FileBackend) -> Self {
        Self { active, fallback }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.active.kind()
    }

    /// All records ascending by `receivedAt`. Empty when nothing can be read.
    pub async fn list_all(&self) -> Vec<ScoreRecord> {
        match self.active.list_all().await {
            Ok(records) => records,
            Err(StorageError::Malformed(e)) => {
                warn!("Stored scores are malformed, treating as empty: {}", e);
                Vec::new()
            }
            Err(e) if self.active.kind() != BackendKind::File => {
                warn!(
                    "Reading scores from {} backend failed, falling back to local file: {}",
                    self.active.kind(),
                    e
                );
                self.fallback.list_all().await.unwrap_or_else(|e| {
                    warn!("Local file fallback failed, returning no scores: {}", e);
                    Vec::new()
                })
            }
            Err(e) => {
                warn!("Reading scores failed, returning no scores: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        self.active.append(record).await
    }

    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.active.clear_all().await
    }

    /// Whether any stored record has this name. Degrades like `list_all`.
    pub async fn contains_name(&self, name: &str) -> bool {
        match self.active.contains_name(name).await {
            Ok(found) => found,
            Err(StorageError::Malformed(e)) => {
                warn!("Stored scores are malformed during status check: {}", e);
                false
            }
            Err(e) if self.active.kind() != BackendKind::File => {
                warn!(
                    "Status check on {} backend failed, falling back to local file: {}",
                    self.active.kind(),
                    e
                );
                self.fallback.contains_name(name).await.unwrap_or(false)
            }
            Err(e) => {
                warn!("Status check failed: {}", e);
                false
            }
        }
    }
}
