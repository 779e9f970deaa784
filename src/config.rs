// src/config.rs

use std::env;
use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use dotenvy::dotenv;

/// Local file used when no remote backend is configured.
pub const DEFAULT_SCORES_FILE: &str = "data/scores.json";

/// Key of the single serialized array in the object store.
pub const OBJECT_STORE_KEY: &str = "scores.json";

/// Firestore collection holding one document per score.
pub const SCORES_COLLECTION: &str = "scores";

pub const DEFAULT_PORT: u16 = 3000;

/// S3 settings. Only considered when bucket, region and both keys are present.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub database_url: Option<String>,
    /// Raw or base64-encoded service account JSON.
    pub firebase_service_account: Option<String>,
    pub firestore_emulator_host: Option<String>,
    pub s3: Option<S3Settings>,
    pub scores_file: PathBuf,
    /// When set, export and clear endpoints require `Authorization: Bearer <token>`.
    pub admin_token: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let port = optional("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let s3 = match (
            optional("S3_BUCKET"),
            optional("S3_REGION").or_else(|| optional("AWS_REGION")),
            optional("AWS_ACCESS_KEY_ID"),
            optional("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(bucket), Some(region), Some(access_key_id), Some(secret_access_key)) => {
                Some(S3Settings {
                    bucket,
                    region,
                    access_key_id,
                    secret_access_key,
                    endpoint: optional("S3_ENDPOINT"),
                })
            }
            _ => None,
        };

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            port,
            rust_log,
            database_url: optional("DATABASE_URL"),
            firebase_service_account: optional("FIREBASE_SERVICE_ACCOUNT"),
            firestore_emulator_host: optional("FIRESTORE_EMULATOR_HOST"),
            s3,
            scores_file: optional("SCORES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORES_FILE)),
            admin_token: optional("ADMIN_TOKEN"),
            allowed_origins,
        }
    }

    /// Configuration with every remote backend disabled, writing to `scores_file`.
    pub fn local(scores_file: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            rust_log: "info".to_string(),
            database_url: None,
            firebase_service_account: None,
            firestore_emulator_host: None,
            s3: None,
            scores_file: scores_file.into(),
            admin_token: None,
            allowed_origins: Vec::new(),
        }
    }
}

/// Reads an env var, treating empty values as absent.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Decodes a service account given either as JSON or as base64-encoded JSON.
pub fn decode_service_account(raw: &str) -> Result<serde_json::Value, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).map_err(|e| format!("invalid service account JSON: {e}"));
    }

    let bytes = BASE64
        .decode(trimmed)
        .map_err(|e| format!("service account is neither JSON nor base64: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid decoded service account JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_accepts_raw_json() {
        let value = decode_service_account(r#" {"project_id": "quiz"} "#).unwrap();
        assert_eq!(value["project_id"], "quiz");
    }

    #[test]
    fn service_account_accepts_base64() {
        let encoded = BASE64.encode(r#"{"project_id":"quiz-b64"}"#);
        let value = decode_service_account(&encoded).unwrap();
        assert_eq!(value["project_id"], "quiz-b64");
    }

    #[test]
    fn service_account_rejects_garbage() {
        assert!(decode_service_account("not base64 !!").is_err());
    }

    #[test]
    fn local_config_has_no_remote_backends() {
        let config = Config::local("/tmp/scores.json");
        assert!(config.database_url.is_none());
        assert!(config.firebase_service_account.is_none());
        assert!(config.s3.is_none());
        assert_eq!(config.scores_file, PathBuf::from("/tmp/scores.json"));
    }
}
