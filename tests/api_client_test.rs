mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use nlsql_cli::api_client::{ApiClient, RequestError, SqlAssistantApi};
use nlsql_cli::schema_file::SelectedFile;
use serde_json::json;
use std::time::Duration;

use common::{happy_backend, spawn_backend, CUSTOMERS_SQL};

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

fn schema_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> SelectedFile {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    SelectedFile::from_path(&path).unwrap()
}

#[tokio::test]
async fn test_upload_sends_file_part_and_database_param() {
    let base = spawn_backend(happy_backend()).await;
    let dir = tempfile::tempdir().unwrap();
    let file = schema_file(&dir, "sales.sql", "CREATE TABLE t (id INT);");

    let message = client(&base).upload_schema(&file, "sales").await.unwrap();
    assert_eq!(
        message,
        "Loaded sales.sql (24 bytes, application/sql) into sales"
    );
}

#[tokio::test]
async fn test_upload_without_message_uses_default_text() {
    let app = Router::new().route("/upload-schema", post(|| async { Json(json!({})) }));
    let base = spawn_backend(app).await;
    let dir = tempfile::tempdir().unwrap();
    let file = schema_file(&dir, "a.sql", "x");

    let message = client(&base).upload_schema(&file, "a").await.unwrap();
    assert_eq!(message, "File uploaded successfully!");
}

#[tokio::test]
async fn test_upload_error_detail_becomes_message() {
    let app = Router::new().route(
        "/upload-schema",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Invalid SQL file"})),
            )
        }),
    );
    let base = spawn_backend(app).await;
    let dir = tempfile::tempdir().unwrap();
    let file = schema_file(&dir, "bad.sql", "not sql");

    let err = client(&base).upload_schema(&file, "bad").await.unwrap_err();
    assert_eq!(
        err,
        RequestError::Server {
            status: 400,
            message: "Invalid SQL file".to_string()
        }
    );
    assert_eq!(err.to_string(), "Invalid SQL file");
}

#[tokio::test]
async fn test_upload_missing_file_is_reported_before_sending() {
    let base = spawn_backend(happy_backend()).await;
    let file = SelectedFile::new("/definitely/not/here/schema.sql", 10);

    let err = client(&base).upload_schema(&file, "schema").await.unwrap_err();
    assert!(matches!(err, RequestError::File { .. }));
}

#[tokio::test]
async fn test_generate_maps_schema_to_schema_text() {
    let base = spawn_backend(happy_backend()).await;

    let generated = client(&base).generate_sql("Top 10 customers").await.unwrap();
    assert_eq!(generated.question, "Top 10 customers");
    assert_eq!(generated.sql_query, CUSTOMERS_SQL);
    assert!(generated.schema_text.starts_with("CREATE TABLE orders"));
}

#[tokio::test]
async fn test_generate_error_field_and_fallback() {
    let app = Router::new().route(
        "/generate-sql",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "Question too vague"})),
            )
        }),
    );
    let base = spawn_backend(app).await;
    let err = client(&base).generate_sql("stuff").await.unwrap_err();
    assert_eq!(err.to_string(), "Question too vague");

    let app = Router::new().route(
        "/generate-sql",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_backend(app).await;
    let err = client(&base).generate_sql("stuff").await.unwrap_err();
    assert_eq!(
        err,
        RequestError::Server {
            status: 500,
            message: "Failed to generate SQL".to_string()
        }
    );
}

#[tokio::test]
async fn test_generate_malformed_success_body_is_decode_error() {
    let app = Router::new().route(
        "/generate-sql",
        post(|| async { Json(json!({"data": {"question": "q"}})) }),
    );
    let base = spawn_backend(app).await;
    let err = client(&base).generate_sql("q").await.unwrap_err();
    assert!(matches!(err, RequestError::Decode(_)));
}

#[tokio::test]
async fn test_run_sql_keeps_server_column_order() {
    let base = spawn_backend(happy_backend()).await;

    let rows = client(&base).run_sql(CUSTOMERS_SQL).await.unwrap();
    assert_eq!(rows.len(), 2);
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["company_name", "total_spent", "region"]);
}

#[tokio::test]
async fn test_run_sql_rejection_uses_error_field() {
    let base = spawn_backend(happy_backend()).await;

    let err = client(&base).run_sql("DROP TABLE orders").await.unwrap_err();
    assert_eq!(err.to_string(), "Only SELECT queries are allowed");
}

#[tokio::test]
async fn test_health_reachable_and_unreachable() {
    let base = spawn_backend(happy_backend()).await;
    assert!(client(&base).health().await.is_ok());

    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = client(&format!("http://{}", addr)).health().await.unwrap_err();
    assert!(matches!(err, RequestError::Transport(_)));
}
