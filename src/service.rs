// src/service.rs

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use crate::{
    completion::CompletionIndex,
    error::AppError,
    live::ObserverRegistry,
    models::score::{ScoreRecord, SubmitScoreRequest},
    storage::ScoreRepository,
};

/// Accepts quiz submissions and owns the clear-all workflow.
#[derive(Clone)]
pub struct ScoreService {
    repository: ScoreRepository,
    completion: Arc<CompletionIndex>,
    observers: Arc<ObserverRegistry>,
}

impl ScoreService {
    pub fn new(
        repository: ScoreRepository,
        completion: Arc<CompletionIndex>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        Self {
            repository,
            completion,
            observers,
        }
    }

    pub fn repository(&self) -> &ScoreRepository {
        &self.repository
    }

    pub fn completion(&self) -> &CompletionIndex {
        &self.completion
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Validates and stores a submission.
    ///
    /// * Rejects a missing or blank `name` before any backend call.
    /// * Fills in `id` (ms timestamp) and `receivedAt` when absent.
    /// * Marks the name completed before the write; the mark is kept even if
    ///   the write fails.
    /// * Publishes the stored record to live observers.
    pub async fn submit(&self, payload: SubmitScoreRequest) -> Result<ScoreRecord, AppError> {
        if let Err(validation_errors) = payload.validate() {
            return Err(AppError::BadRequest(validation_errors.to_string()));
        }

        let record = payload
            .into_record(Utc::now())
            .ok_or_else(|| AppError::BadRequest("name must not be blank".to_string()))?;

        self.completion.mark_completed(&record.name);

        if let Err(e) = self.repository.append(&record).await {
            error!("Failed to store score {} for '{}': {}", record.id, record.name, e);
            return Err(e.into());
        }

        info!(
            "Stored score {} for '{}' in {} backend",
            record.id,
            record.name,
            self.repository.backend_kind()
        );
        self.observers.publish_new_score(&record);

        Ok(record)
    }

    /// Empties the active backend, forgets completions and notifies observers.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        self.repository.clear_all().await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to clear scores: {}", e))
        })?;

        self.completion.reset();
        let notified = self.observers.publish_cleared();
        info!("Cleared all scores, notified {} observers", notified);
        Ok(())
    }

    pub async fn list_all(&self) -> Vec<ScoreRecord> {
        self.repository.list_all().await
    }

    pub async fn has_completed(&self, name: &str) -> bool {
        self.completion.has_completed(name).await
    }
}
