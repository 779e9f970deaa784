// src/storage/relational.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use super::backend::{BackendKind, ScoreBackend, StorageError};
use crate::models::score::{ScoreId, ScoreRecord};

/// Row shape of the `scores` table.
#[derive(sqlx::FromRow)]
struct ScoreRow {
    id: String,
    id_is_numeric: bool,
    name: String,
    email: Option<String>,
    score: Option<i64>,
    answered_questions: Option<i64>,
    total_questions: Option<i64>,
    time_taken: Option<String>,
    reason: Option<String>,
    received_at: DateTime<Utc>,
    date: Option<String>,
}

impl From<ScoreRow> for ScoreRecord {
    fn from(row: ScoreRow) -> Self {
        ScoreRecord {
            id: ScoreId::from_key(&row.id, row.id_is_numeric),
            name: row.name,
            email: row.email,
            score: row.score,
            answered_questions: row.answered_questions,
            total_questions: row.total_questions,
            time_taken: row.time_taken,
            reason: row.reason,
            received_at: row.received_at,
            date: row.date,
        }
    }
}

/// PostgreSQL-backed scores. Each record is one row keyed by the id's string
/// form; `id_is_numeric` remembers whether it was submitted as a number.
#[derive(Debug, Clone)]
pub struct RelationalBackend {
    pool: PgPool,
}

impl RelationalBackend {
    /// Connects and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(unavailable)?;

        let backend = Self::from_pool(pool);
        backend.ensure_schema().await?;
        info!("Database connected, scores table ready");
        Ok(backend)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the table and the name index if missing.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id TEXT PRIMARY KEY,
                id_is_numeric BOOLEAN NOT NULL DEFAULT FALSE,
                name TEXT NOT NULL,
                email TEXT,
                score BIGINT,
                answered_questions BIGINT,
                total_questions BIGINT,
                time_taken TEXT,
                reason TEXT,
                received_at TIMESTAMPTZ NOT NULL,
                date TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        // Tables created before the id type was tracked.
        sqlx::query(
            "ALTER TABLE scores ADD COLUMN IF NOT EXISTS id_is_numeric BOOLEAN NOT NULL DEFAULT FALSE",
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS scores_name_idx ON scores (name)")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

fn unavailable(err: sqlx::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

#[async_trait]
impl ScoreBackend for RelationalBackend {
    async fn list_all(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT
                id, id_is_numeric, name, email, score, answered_questions, total_questions,
                time_taken, reason, received_at, date
            FROM scores
            ORDER BY received_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO scores (
                id, id_is_numeric, name, email, score, answered_questions,
                total_questions, time_taken, reason, received_at, date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id.key())
        .bind(record.id.is_numeric())
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.score)
        .bind(record.answered_questions)
        .bind(record.total_questions)
        .bind(&record.time_taken)
        .bind(&record.reason)
        .bind(record.received_at)
        .bind(&record.date)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                StorageError::Duplicate(record.id.clone())
            }
            _ => unavailable(e),
        })?;

        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM scores")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn contains_name(&self, name: &str) -> Result<bool, StorageError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM scores WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }
}
