//! Container management routes, registered only when a runtime was detected.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::AppState;
use crate::containers::{ContainerDetails, ContainerRuntime, ContainerSummary, LogLine};
use crate::error::ApiError;

pub const DEFAULT_LOG_TAIL: u32 = 100;
pub const MAX_LOG_TAIL: u32 = 5000;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_all")]
    pub all: bool,
}

fn default_all() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_tail")]
    pub tail: u32,
}

fn default_tail() -> u32 {
    DEFAULT_LOG_TAIL
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub id: String,
    pub action: &'static str,
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub id: String,
    pub tail: u32,
    pub lines: Vec<LogLine>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/containers", get(list_containers))
        .route("/api/containers/:id", get(get_container))
        .route("/api/containers/:id/start", post(start_container))
        .route("/api/containers/:id/stop", post(stop_container))
        .route("/api/containers/:id/restart", post(restart_container))
        .route("/api/containers/:id/logs", get(container_logs))
}

fn runtime(state: &AppState) -> Result<&Arc<dyn ContainerRuntime>, ApiError> {
    state
        .containers
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Docker integration is not available".to_string()))
}

/// GET /api/containers
pub async fn list_containers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContainerSummary>>, ApiError> {
    Ok(Json(runtime(&state)?.list(query.all).await?))
}

/// GET /api/containers/:id
pub async fn get_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerDetails>, ApiError> {
    Ok(Json(runtime(&state)?.inspect(&id).await?))
}

/// POST /api/containers/:id/start
pub async fn start_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    runtime(&state)?.start(&id).await?;
    Ok(action_done(id, "start"))
}

/// POST /api/containers/:id/stop
pub async fn stop_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    runtime(&state)?.stop(&id).await?;
    Ok(action_done(id, "stop"))
}

/// POST /api/containers/:id/restart
pub async fn restart_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    runtime(&state)?.restart(&id).await?;
    Ok(action_done(id, "restart"))
}

/// GET /api/containers/:id/logs
pub async fn container_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let tail = query.tail.clamp(1, MAX_LOG_TAIL);
    let lines = runtime(&state)?.logs(&id, tail).await?;
    Ok(Json(LogsResponse { id, tail, lines }))
}

fn action_done(id: String, action: &'static str) -> Json<ActionResponse> {
    tracing::info!(container = %id, action, "Container action completed");
    Json(ActionResponse {
        id,
        action,
        ok: true,
    })
}
