use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::schema_file::SelectedFile;

/// A single result row: column name to value, in server order
pub type Row = Map<String, Value>;

const UPLOAD_FALLBACK: &str = "Upload failed";
const GENERATE_FALLBACK: &str = "Failed to generate SQL";
const RUN_FALLBACK: &str = "Failed to run SQL";
const UPLOAD_SUCCESS_FALLBACK: &str = "File uploaded successfully!";

/// Errors surfaced by the assistant backend client
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// Non-2xx response; `message` comes from the error body when present
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response
    #[error("{0}")]
    Transport(String),

    /// A 2xx response whose body did not have the expected shape
    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// The local schema file could not be read
    #[error("Could not read {path}: {reason}")]
    File { path: String, reason: String },
}

impl RequestError {
    fn transport(err: reqwest::Error) -> Self {
        RequestError::Transport(err.to_string())
    }
}

/// SQL and schema context produced by the generation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub question: String,
    pub sql_query: String,
    pub schema_text: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    sql: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    data: GeneratedPayload,
}

#[derive(Debug, Deserialize)]
struct GeneratedPayload {
    question: String,
    sql_query: String,
    schema: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    data: Option<Vec<Row>>,
}

/// Error body shapes emitted by the backend
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.detail
            .and_then(non_empty_message)
            .or_else(|| self.error.and_then(non_empty_message))
    }
}

fn non_empty_message(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Operations offered by the natural-language-to-SQL backend
#[async_trait]
pub trait SqlAssistantApi: Send + Sync {
    /// Upload a schema file into the named database, returning the server message
    async fn upload_schema(
        &self,
        file: &SelectedFile,
        database_name: &str,
    ) -> Result<String, RequestError>;

    /// Turn an English question into SQL
    async fn generate_sql(&self, question: &str) -> Result<GeneratedQuery, RequestError>;

    /// Execute SQL on the backend and return its rows
    async fn run_sql(&self, sql: &str) -> Result<Vec<Row>, RequestError>;

    /// Probe backend reachability
    async fn health(&self) -> Result<(), RequestError>;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RequestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RequestError::transport)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-success response into a `RequestError::Server`
    async fn check(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<reqwest::Response, RequestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| fallback.to_string());

        warn!(target: "api", "Request failed with {}: {}", status, message);
        Err(RequestError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SqlAssistantApi for ApiClient {
    async fn upload_schema(
        &self,
        file: &SelectedFile,
        database_name: &str,
    ) -> Result<String, RequestError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| RequestError::File {
                path: file.path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(
            target: "api",
            "Uploading {} ({} bytes) into database '{}'",
            file.name,
            bytes.len(),
            database_name
        );

        let part = multipart::Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str("application/sql")
            .map_err(RequestError::transport)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload-schema"))
            .query(&[("database", database_name)])
            .multipart(form)
            .send()
            .await
            .map_err(RequestError::transport)?;
        let response = Self::check(response, UPLOAD_FALLBACK).await?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))?;

        Ok(body
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| UPLOAD_SUCCESS_FALLBACK.to_string()))
    }

    async fn generate_sql(&self, question: &str) -> Result<GeneratedQuery, RequestError> {
        debug!(target: "api", "POST /generate-sql: {}", question);

        let response = self
            .client
            .post(self.endpoint("generate-sql"))
            .json(&GenerateRequest { question })
            .send()
            .await
            .map_err(RequestError::transport)?;
        let response = Self::check(response, GENERATE_FALLBACK).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))?;

        Ok(GeneratedQuery {
            question: body.data.question,
            sql_query: body.data.sql_query,
            schema_text: body.data.schema,
        })
    }

    async fn run_sql(&self, sql: &str) -> Result<Vec<Row>, RequestError> {
        debug!(target: "api", "POST /run-sql: {}", sql);

        let response = self
            .client
            .post(self.endpoint("run-sql"))
            .json(&RunRequest { sql })
            .send()
            .await
            .map_err(RequestError::transport)?;
        let response = Self::check(response, RUN_FALLBACK).await?;

        let body: RunResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))?;

        Ok(body.data.unwrap_or_default())
    }

    async fn health(&self) -> Result<(), RequestError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(RequestError::transport)?;
        Self::check(response, "Backend unhealthy").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_prefers_detail() {
        let body: ErrorBody =
            serde_json::from_value(json!({"detail": "model unavailable", "error": "x"})).unwrap();
        assert_eq!(body.message(), Some("model unavailable".to_string()));
    }

    #[test]
    fn test_error_body_falls_back_to_error_field() {
        let body: ErrorBody = serde_json::from_value(json!({"error": "unsafe sql"})).unwrap();
        assert_eq!(body.message(), Some("unsafe sql".to_string()));
    }

    #[test]
    fn test_error_body_renders_structured_detail() {
        let body: ErrorBody =
            serde_json::from_value(json!({"detail": [{"msg": "field required"}]})).unwrap();
        assert_eq!(
            body.message(),
            Some(r#"[{"msg":"field required"}]"#.to_string())
        );
    }

    #[test]
    fn test_error_body_empty_detail_is_absent() {
        let body: ErrorBody = serde_json::from_value(json!({"detail": ""})).unwrap();
        assert_eq!(body.message(), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint("run-sql"), "http://localhost:8000/run-sql");
    }

    #[test]
    fn test_run_response_missing_data_is_empty() {
        let body: RunResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.data.unwrap_or_default().is_empty());
    }
}
