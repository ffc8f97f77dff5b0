//! Fixture NKO backend.
//!
//! Serves the Backend Search API from an [`InMemoryDirectory`] loaded from
//! a JSON file, for local development and integration tests:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/ping` | Liveness probe |
//! | `GET` | `/nko` | Filtered listing (`city`, `category`*, `regex`, `favorite`, `jwt_token`) |
//! | `GET` | `/nko/{id}` | One record, 404 when absent |
//! | `GET` | `/city` | Cities, optional `regex` |
//!
//! Errors use the backend's `{"detail": "..."}` body.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use nko_assistant_core::directory::memory::InMemoryDirectory;
use nko_assistant_core::directory::{DirectoryError, NkoDirectory};
use nko_assistant_core::models::{CityRecord, FilterSet, NkoRecord};

/// Reads a fixture JSON file.
pub fn load_fixture(path: &std::path::Path) -> Result<InMemoryDirectory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
    InMemoryDirectory::from_json_str(&raw)
        .with_context(|| format!("Failed to parse fixture: {}", path.display()))
}

pub fn router(directory: Arc<InMemoryDirectory>) -> Router {
    Router::new()
        .route("/ping", get(handle_ping))
        .route("/nko", get(handle_list_nko))
        .route("/nko/{id}", get(handle_get_nko))
        .route("/city", get(handle_cities))
        .with_state(directory)
}

/// Serves `directory` on `bind` until Ctrl-C.
pub async fn run_fixture_backend(bind: &str, directory: InMemoryDirectory) -> Result<()> {
    let records = directory.len();
    let app = router(Arc::new(directory));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind = %bind, records, "fixture backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::server::shutdown_signal())
        .await?;
    Ok(())
}

struct BackendError(DirectoryError);

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let (status, detail) = match self.0 {
            DirectoryError::NotFound { body } => (StatusCode::NOT_FOUND, body),
            DirectoryError::InvalidFilter(message) => (StatusCode::BAD_REQUEST, message),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<DirectoryError> for BackendError {
    fn from(e: DirectoryError) -> Self {
        Self(e)
    }
}

async fn handle_ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_list_nko(
    State(directory): State<Arc<InMemoryDirectory>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<NkoRecord>>, BackendError> {
    let filters = FilterSet::from_query_pairs(&pairs)?;
    Ok(Json(directory.list_nko(&filters).await?))
}

async fn handle_get_nko(
    State(directory): State<Arc<InMemoryDirectory>>,
    Path(id): Path<i64>,
) -> Result<Json<NkoRecord>, BackendError> {
    Ok(Json(directory.get_nko(id).await?))
}

#[derive(Deserialize)]
struct CityParams {
    regex: Option<String>,
}

async fn handle_cities(
    State(directory): State<Arc<InMemoryDirectory>>,
    Query(params): Query<CityParams>,
) -> Result<Json<Vec<CityRecord>>, BackendError> {
    let regex = params.regex.filter(|r| !r.is_empty());
    Ok(Json(directory.list_cities(regex.as_deref()).await?))
}
