//! Fake assistant backend served by axum on an ephemeral port

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const CUSTOMERS_SQL: &str =
    "SELECT company_name, SUM(total) AS total_spent FROM orders GROUP BY company_name ORDER BY total_spent DESC LIMIT 10;";

/// Serve `app` on 127.0.0.1 and return its base URL
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake backend");
    });
    format!("http://{}", addr)
}

/// Echo what arrived so tests can check the multipart body and query string
async fn upload_schema(
    Query(params): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let database = params.get("database").cloned().unwrap_or_default();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        return (
            StatusCode::OK,
            Json(json!({
                "message": format!(
                    "Loaded {} ({} bytes, {}) into {}",
                    file_name, bytes, content_type, database
                )
            })),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "No file part in request"})),
    )
}

async fn generate_sql(Json(body): Json<Value>) -> Json<Value> {
    let question = body["question"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "data": {
            "question": question,
            "sql_query": CUSTOMERS_SQL,
            "schema": "CREATE TABLE orders (company_name TEXT, total REAL);"
        }
    }))
}

async fn run_sql(Json(body): Json<Value>) -> impl IntoResponse {
    if body["sql"].as_str() != Some(CUSTOMERS_SQL) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Only SELECT queries are allowed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                {"company_name": "Alfreds Futterkiste", "total_spent": 4273.5, "region": null},
                {"company_name": "Ernst, \"Handel\"", "total_spent": 1200}
            ]
        })),
    )
}

/// A backend where every endpoint succeeds
pub fn happy_backend() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/upload-schema", post(upload_schema))
        .route("/generate-sql", post(generate_sql))
        .route("/run-sql", post(run_sql))
}

/// A backend whose generator is down
pub fn generator_down_backend() -> Router {
    Router::new()
        .route("/upload-schema", post(upload_schema))
        .route(
            "/generate-sql",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "model unavailable"})),
                )
            }),
        )
}

/// A backend whose database is missing the generated query's table
pub fn missing_table_backend() -> Router {
    Router::new()
        .route("/generate-sql", post(generate_sql))
        .route(
            "/run-sql",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "no such table: orders"})),
                )
            }),
        )
}
