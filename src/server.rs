//! HTTP server for the assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Answer a natural-language query |
//! | `GET`  | `/tools/list` | List the directory tools with schemas |
//! | `POST` | `/tools/{name}` | Call a directory tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `*`    | `/mcp` | MCP Streamable HTTP endpoint (same tools) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "config_error", "message": "OpenRouter API key not configured" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `config_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use nko_assistant_core::models::{Query, QueryResponse};

use crate::app::AppContext;
use crate::mcp::McpBridge;
use crate::orchestrator::Orchestrator;
use crate::tools::{self, ToolContext, ToolInfo, ToolRegistry};

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    /// `None` without a completion provider; `/query` then answers 500.
    orchestrator: Option<Orchestrator>,
    tools: Arc<ToolRegistry>,
    tool_ctx: ToolContext,
}

/// Builds the router for `ctx`.
pub fn router(ctx: &AppContext) -> Router {
    let state = AppState {
        orchestrator: ctx.orchestrator(),
        tools: ctx.tools.clone(),
        tool_ctx: ctx.tool_context(),
    };

    let bridge = McpBridge::new(ctx.tools.clone(), ctx.tool_context());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
pub async fn run_server(ctx: AppContext) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();
    let app = router(&ctx);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "NKO assistant listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "config_error",
        message: message.into(),
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    jwt_token: Option<String>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let orchestrator = state
        .orchestrator
        .as_ref()
        .ok_or_else(|| config_error("OpenRouter API key not configured"))?;

    let response = orchestrator
        .answer(Query::new(req.query, req.jwt_token))
        .await;
    Ok(Json(response))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

/// Unified tool dispatch.
///
/// Backend failures are part of the tool's text result and come back as
/// 200. Returns `404` for an unknown tool and `400` when the tool rejects
/// its arguments.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    match tools::call_tool(&state.tools, &state.tool_ctx, &name, params).await {
        Some((text, false)) => Ok(Json(serde_json::json!({ "result": text }))),
        Some((text, true)) => Err(bad_request(text)),
        None => Err(not_found(format!("Unknown tool: {}", name))),
    }
}
