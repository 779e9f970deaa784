// src/storage/document.rs

//! Cloud Firestore backend over the REST API.
//!
//! Each score is one document in the `scores` collection, keyed by the string
//! form of its id. Requests are authorized with an OAuth access token obtained
//! by exchanging a service-account-signed JWT.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{BackendKind, ScoreBackend, StorageError};
use crate::config::{SCORES_COLLECTION, decode_service_account};
use crate::models::score::{ScoreId, ScoreRecord};

const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Firestore rejects commits with more than 500 writes.
pub const MAX_BATCH_WRITES: usize = 500;

/// Fields of a Google service account key file that the backend needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Issues and caches access tokens for a service account.
struct TokenSource {
    account: ServiceAccount,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    fn new(account: ServiceAccount) -> Result<Self, StorageError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| StorageError::Unavailable(format!("invalid service account key: {}", e)))?;
        Ok(Self {
            account,
            key,
            cached: Mutex::new(None),
        })
    }

    async fn token(&self, client: &Client) -> Result<String, StorageError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = (*cached).as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FIRESTORE_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StorageError::Unavailable(format!("failed to sign assertion: {}", e)))?;

        let response = client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport)?;

        // Expire a minute early.
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!("Obtained Firestore access token for {}", self.account.client_email);
        Ok(token.access_token)
    }
}

/// Firestore-backed scores.
pub struct DocumentBackend {
    client: Client,
    /// `.../projects/{project}/databases/(default)/documents`
    documents_url: String,
    auth: Option<TokenSource>,
}

impl DocumentBackend {
    /// Builds a backend from raw or base64 service account JSON.
    /// With `emulator_host` set, requests go to the local emulator unauthenticated.
    pub fn from_service_account(
        raw: &str,
        emulator_host: Option<&str>,
    ) -> Result<Self, StorageError> {
        let value = decode_service_account(raw).map_err(StorageError::Unavailable)?;
        let account: ServiceAccount = serde_json::from_value(value)
            .map_err(|e| StorageError::Unavailable(format!("incomplete service account: {}", e)))?;

        let (base, auth) = match emulator_host {
            Some(host) => (format!("http://{}/v1", host), None),
            None => (
                "https://firestore.googleapis.com/v1".to_string(),
                Some(TokenSource::new(account.clone())?),
            ),
        };

        info!("Initializing document backend for project {}", account.project_id);
        Ok(Self {
            client: build_client()?,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base, account.project_id
            ),
            auth,
        })
    }

    /// Unauthenticated backend against an explicit documents URL.
    pub fn with_endpoint(documents_url: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            client: build_client()?,
            documents_url: documents_url.into(),
            auth: None,
        })
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StorageError> {
        match &self.auth {
            Some(source) => Ok(request.bearer_auth(source.token(&self.client).await?)),
            None => Ok(request),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        self.authorize(request)
            .await?
            .send()
            .await
            .map_err(transport)
    }

    /// Runs a structured query over the scores collection, returning documents.
    async fn run_query(&self, structured_query: Value) -> Result<Vec<Value>, StorageError> {
        let request = self
            .client
            .post(format!("{}:runQuery", self.documents_url))
            .json(&json!({ "structuredQuery": structured_query }));
        let results: Vec<Value> = ensure_success(self.send(request).await?)
            .await?
            .json()
            .await
            .map_err(transport)?;

        // Each element may be a progress marker without a document.
        Ok(results
            .into_iter()
            .filter_map(|mut r| r.get_mut("document").map(Value::take))
            .collect())
    }
}

fn build_client() -> Result<Client, StorageError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(transport)
}

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Unavailable(format!("HTTP {}: {}", status, body)))
}

fn collection_query() -> Value {
    json!({ "from": [{ "collectionId": SCORES_COLLECTION }] })
}

#[async_trait]
impl ScoreBackend for DocumentBackend {
    async fn list_all(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let mut query = collection_query();
        query["orderBy"] = json!([{ "field": { "fieldPath": "receivedAt" }, "direction": "ASCENDING" }]);

        // One undecodable document is skipped, not the whole listing.
        let records = self
            .run_query(query)
            .await?
            .iter()
            .filter_map(|document| match from_document(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Skipping score document {}: {}",
                        document["name"].as_str().unwrap_or("<unnamed>"),
                        e
                    );
                    None
                }
            })
            .collect();
        Ok(records)
    }

    async fn append(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        let document_id = record.id.key();
        let request = self
            .client
            .post(format!("{}/{}", self.documents_url, SCORES_COLLECTION))
            .query(&[("documentId", document_id.as_str())])
            .json(&json!({ "fields": to_fields(record) }));

        let response = self.send(request).await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(StorageError::Duplicate(record.id.clone()));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut query = collection_query();
        query["select"] = json!({ "fields": [{ "fieldPath": "__name__" }] });

        let names: Vec<String> = self
            .run_query(query)
            .await?
            .iter()
            .filter_map(|doc| doc["name"].as_str().map(str::to_string))
            .collect();

        for chunk in names.chunks(MAX_BATCH_WRITES) {
            let writes: Vec<Value> = chunk.iter().map(|name| json!({ "delete": name })).collect();
            let request = self
                .client
                .post(format!("{}:commit", self.documents_url))
                .json(&json!({ "writes": writes }));
            ensure_success(self.send(request).await?).await?;
        }

        debug!("Deleted {} score documents", names.len());
        Ok(())
    }

    async fn contains_name(&self, name: &str) -> Result<bool, StorageError> {
        let mut query = collection_query();
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": "name" },
                "op": "EQUAL",
                "value": { "stringValue": name }
            }
        });
        query["limit"] = json!(1);

        Ok(!self.run_query(query).await?.is_empty())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }
}

/// Encodes a record as Firestore typed fields. Absent optionals are omitted.
pub fn to_fields(record: &ScoreRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    let id = match &record.id {
        ScoreId::Number(n) => json!({ "integerValue": n.to_string() }),
        ScoreId::Text(s) => json!({ "stringValue": s }),
    };
    fields.insert("id".to_string(), id);
    fields.insert("name".to_string(), json!({ "stringValue": record.name }));
    fields.insert(
        "receivedAt".to_string(),
        json!({ "timestampValue": record.received_at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true) }),
    );

    let strings = [
        ("email", &record.email),
        ("timeTaken", &record.time_taken),
        ("reason", &record.reason),
        ("date", &record.date),
    ];
    for (key, value) in strings {
        if let Some(v) = value {
            fields.insert(key.to_string(), json!({ "stringValue": v }));
        }
    }

    let integers = [
        ("score", record.score),
        ("answeredQuestions", record.answered_questions),
        ("totalQuestions", record.total_questions),
    ];
    for (key, value) in integers {
        if let Some(v) = value {
            fields.insert(key.to_string(), json!({ "integerValue": v.to_string() }));
        }
    }

    fields
}

/// Decodes a Firestore document into a record.
pub fn from_document(document: &Value) -> Result<ScoreRecord, StorageError> {
    let empty = Map::new();
    let fields = document["fields"].as_object().unwrap_or(&empty);

    let string = |key: &str| fields.get(key).and_then(|v| v["stringValue"].as_str()).map(str::to_string);
    let integer = |key: &str| fields.get(key).map(|v| integer_value(key, v)).transpose();

    let id = match fields.get("id") {
        Some(v) if v.get("stringValue").is_some() => {
            v["stringValue"].as_str().map(|s| ScoreId::Text(s.to_string()))
        }
        Some(_) => integer("id")?.map(ScoreId::Number),
        None => document["name"]
            .as_str()
            .and_then(|n| n.rsplit('/').next())
            .map(|key| ScoreId::Text(key.to_string())),
    }
    .ok_or_else(|| StorageError::Malformed("document without id".to_string()))?;

    let name = string("name")
        .ok_or_else(|| StorageError::Malformed(format!("document {} without name", id)))?;

    let received_at = fields
        .get("receivedAt")
        .and_then(|v| v["timestampValue"].as_str().or_else(|| v["stringValue"].as_str()))
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| StorageError::Malformed(format!("document {} without receivedAt", id)))?;

    Ok(ScoreRecord {
        id,
        name,
        email: string("email"),
        score: integer("score")?,
        answered_questions: integer("answeredQuestions")?,
        total_questions: integer("totalQuestions")?,
        time_taken: string("timeTaken"),
        reason: string("reason"),
        received_at,
        date: string("date"),
    })
}

/// Reads an `integerValue`, or a `doubleValue` that holds a whole number.
fn integer_value(key: &str, value: &Value) -> Result<i64, StorageError> {
    let malformed = || StorageError::Malformed(format!("field {} is not an integer: {}", key, value));
    match (&value["integerValue"], &value["doubleValue"]) {
        (Value::String(s), _) => s.parse().map_err(|_| malformed()),
        (Value::Number(n), _) => n.as_i64().ok_or_else(malformed),
        (_, Value::Number(n)) => {
            let f = n.as_f64().ok_or_else(malformed)?;
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
                return Err(malformed());
            }
            Ok(f as i64)
        }
        _ => Err(malformed()),
    }
}
