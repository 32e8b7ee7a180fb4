//! Hook receiver HTTP server.
//!
//! The CMS delivers its after-change and after-delete notifications here.
//! Each request is routed into [`ChangeHooks`] and answered with the
//! document it carried, so the CMS can use the response as the hook's
//! return value.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/hooks/collections/{collection}/change` | Create or update in a watched collection |
//! | `POST` | `/hooks/collections/{collection}/delete` | Delete in a watched collection |
//! | `POST` | `/hooks/globals/{global}/change` | Update of a watched global |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "collection 'tags' is not watched" } }
//! ```
//!
//! A failure while logging a change never shows up in a response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::change_log::ChangeLogger;
use crate::collections;
use crate::config::Config;
use crate::hooks::{ChangeHooks, Operation};

/// Shared state for all request handlers.
#[derive(Clone)]
struct AppState {
    /// Hook entry points; cloning shares the one underlying [`ChangeLogger`].
    hooks: ChangeHooks,
}

/// Start the hook receiver and run until the process exits.
///
/// # Arguments
///
/// * `config` - Supplies `[server].bind` and the `[change_log]` tuning.
///   No `[targets]` are needed.
///
/// # Returns
///
/// Only returns on a bind or serve error.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let logger = Arc::new(ChangeLogger::new(&config.change_log));
    let hooks = ChangeHooks::new(logger);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        cooldown_ms = config.change_log.cooldown_ms,
        "Hook receiver listening"
    );
    println!("Hook receiver listening on http://{}", config.server.bind);

    serve(listener, hooks).await
}

/// Serve the hook routes on an already-bound listener.
///
/// Tests bind `127.0.0.1:0` and pass the listener here with hooks built on
/// a manual clock and an in-memory sink.
pub async fn serve(listener: TcpListener, hooks: ChangeHooks) -> anyhow::Result<()> {
    axum::serve(listener, router(hooks)).await?;
    Ok(())
}

/// Build the router with tracing and permissive CORS layers.
pub fn router(hooks: ChangeHooks) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/hooks/collections/{collection}/change",
            post(handle_collection_change),
        )
        .route(
            "/hooks/collections/{collection}/delete",
            post(handle_collection_delete),
        )
        .route("/hooks/globals/{global}/change", post(handle_global_change))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { hooks })
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn watched_collection(slug: &str) -> Result<(), AppError> {
    match collections::find(slug) {
        Some(c) if c.hooks_enabled => Ok(()),
        Some(_) => Err(not_found(format!("collection '{}' is not watched", slug))),
        None => Err(not_found(format!("unknown collection '{}'", slug))),
    }
}

// ============ Payloads ============

#[derive(Deserialize)]
struct ChangeRequest {
    doc: Value,
    operation: Operation,
}

#[derive(Deserialize)]
struct DeleteRequest {
    #[serde(default)]
    doc: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Deserialize)]
struct GlobalChangeRequest {
    doc: Value,
}

#[derive(Serialize)]
struct DocResponse {
    doc: Option<Value>,
}

// ============ Handlers ============

async fn handle_collection_change(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(req): Json<ChangeRequest>,
) -> Result<Json<DocResponse>, AppError> {
    watched_collection(&collection)?;
    let doc = state.hooks.after_change(req.doc, req.operation, &collection);
    Ok(Json(DocResponse { doc: Some(doc) }))
}

async fn handle_collection_delete(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<DocResponse>, AppError> {
    watched_collection(&collection)?;
    let doc = state
        .hooks
        .after_delete(req.doc, req.id.as_ref(), &collection);
    Ok(Json(DocResponse { doc }))
}

async fn handle_global_change(
    State(state): State<AppState>,
    Path(global): Path<String>,
    Json(req): Json<GlobalChangeRequest>,
) -> Result<Json<DocResponse>, AppError> {
    if collections::find_watched_global(&global).is_none() {
        return Err(not_found(format!("global '{}' is not watched", global)));
    }
    let doc = state.hooks.after_change_global(req.doc, &global);
    Ok(Json(DocResponse { doc: Some(doc) }))
}

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
