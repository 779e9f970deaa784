// src/storage/selector.rs

use std::sync::Arc;
use tracing::{info, warn};

use super::backend::ScoreBackend;
use super::document::DocumentBackend;
use super::file::FileBackend;
use super::object::ObjectBackend;
use super::relational::RelationalBackend;
use super::repository::ScoreRepository;
use crate::config::Config;

/// Picks the durable backend once at startup.
pub struct BackendSelector;

impl BackendSelector {
    /// Tries relational, document and object stores in that order, activating
    /// the first one that is configured and initializes. Falls back to the
    /// local file, so selection never fails.
    pub async fn select(config: &Config) -> Arc<dyn ScoreBackend> {
        if let Some(database_url) = &config.database_url {
            match RelationalBackend::connect(database_url).await {
                Ok(backend) => return Self::activate(Arc::new(backend)),
                Err(e) => warn!("Relational backend unavailable, trying next: {}", e),
            }
        }

        if let Some(service_account) = &config.firebase_service_account {
            match DocumentBackend::from_service_account(
                service_account,
                config.firestore_emulator_host.as_deref(),
            ) {
                Ok(backend) => return Self::activate(Arc::new(backend)),
                Err(e) => warn!("Document backend unavailable, trying next: {}", e),
            }
        }

        if let Some(s3) = &config.s3 {
            match ObjectBackend::new(s3) {
                Ok(backend) => return Self::activate(Arc::new(backend)),
                Err(e) => warn!("Object backend unavailable, trying next: {}", e),
            }
        }

        Self::activate(Arc::new(FileBackend::new(&config.scores_file)))
    }

    /// Selects the backend and wraps it in a repository with the local-file
    /// read fallback.
    pub async fn repository(config: &Config) -> ScoreRepository {
        let active = Self::select(config).await;
        ScoreRepository::new(active, FileBackend::new(&config.scores_file))
    }

    fn activate(backend: Arc<dyn ScoreBackend>) -> Arc<dyn ScoreBackend> {
        info!("Using {} backend for scores", backend.kind());
        backend
    }
}
