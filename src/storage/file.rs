// src/storage/file.rs

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::backend::{BackendKind, ScoreBackend, StorageError};
use super::snapshot;
use crate::models::score::ScoreRecord;

/// Distinguishes temp files of concurrent writers.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Keeps all scores as one JSON array in a local file.
///
/// Always available without configuration. Appends are read-modify-write, so
/// two concurrent appends can lose one of the records.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Initializing file backend at: {}", path.display());
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) => snapshot::decode(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::Unavailable(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Writes the whole array to a sibling temp file, then renames it over the
    /// target so readers never observe a partial array. Concurrent writers
    /// each rename their own file; the last rename wins.
    async fn write_records(&self, records: &[ScoreRecord]) -> Result<(), StorageError> {
        let bytes = snapshot::encode(records)?;
        let unavailable =
            |e: std::io::Error| StorageError::Unavailable(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .path
            .with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        let written = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove temp file {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(unavailable(e));
        }
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ScoreBackend for FileBackend {
    async fn list_all(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let mut records = self.read_records().await?;
        snapshot::sort_by_received(&mut records);
        Ok(records)
    }

    async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        let mut records = match self.read_records().await {
            Ok(records) => records,
            // A corrupt file is replaced rather than blocking every submission.
            Err(StorageError::Malformed(e)) => {
                warn!(
                    "Scores file {} is corrupt ({}), starting a new array",
                    self.path.display(),
                    e
                );
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
        BackendKind::File
    }
}
