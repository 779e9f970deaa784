// src/storage/object.rs

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::{BackendKind, ScoreBackend, StorageError};
use super::snapshot;
use crate::config::{OBJECT_STORE_KEY, S3Settings};
use crate::models::score::ScoreRecord;

/// Keeps all scores as one JSON array object in an S3-compatible bucket.
///
/// Same read-modify-write pattern as the file backend, with the same lost
/// update hazard under concurrent appends.
#[derive(Clone)]
pub struct ObjectBackend {
    store: Arc<dyn ObjectStore>,
    key: ObjectPath,
}

impl ObjectBackend {
    /// Builds an S3 client from the configured bucket, region and keys.
    pub fn new(settings: &S3Settings) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region)
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key);

        // Custom endpoint for S3-compatible services (MinIO)
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Unavailable(format!("failed to create S3 client: {}", e)))?;

        info!(
            "Initializing object backend at s3://{}/{}",
            settings.bucket, OBJECT_STORE_KEY
        );
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Wraps an existing store (used by tests with an in-memory store).
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key: ObjectPath::from(OBJECT_STORE_KEY),
        }
    }

    async fn read_records(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let result = match self.store.get(&self.key).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(map_error(e)),
        };
        let bytes = result.bytes().await.map_err(map_error)?;
        snapshot::decode(&bytes)
    }

    async fn write_records(&self, records: &[ScoreRecord]) -> Result<(), StorageError> {
        let bytes = snapshot::encode(records)?;
        self.store
            .put(&self.key, PutPayload::from(bytes))
            .await
            .map_err(map_error)?;
        debug!("Wrote {} records to object {}", records.len(), self.key);
        Ok(())
    }
}

fn map_error(err: object_store::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

impl std::fmt::Debug for ObjectBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBackend")
            .field("key", &self.key)
            .finish()
    }
}

#[async_trait]
impl ScoreBackend for ObjectBackend {
    async fn list_all(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let mut records = self.read_records().await?;
        snapshot::sort_by_received(&mut records);
        Ok(records)
    }

    async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        let mut records = match self.read_records().await {
            Ok(records) => records,
            Err(StorageError::Malformed(e)) => {
                tracing::warn!("Stored score object is corrupt ({}), starting a new array", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        snapshot::push_unique(&mut records, record)?;
        self.write_records(&records).await
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.write_records(&[]).await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Object
    }
}
