//! Session HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/sessions        - List stored sessions
//! - GET    /api/v1/sessions/{key}  - Live or stored summary of one session
//! - DELETE /api/v1/sessions/{key}  - Close and delete a session

use axum::Json;
use axum::extract::{Path, State};

use relaybot_types::session::SessionInfo;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/v1/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, AppError> {
    let timer = RequestTimer::start();
    let sessions = state.registry.list().await?;
    Ok(Json(timer.finish(sessions).with_link("self", "/api/v1/sessions")))
}

/// GET /api/v1/sessions/{key}
pub async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let timer = RequestTimer::start();
    let info = state
        .registry
        .info(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(key.clone()))?;

    Ok(Json(
        timer
            .finish(info)
            .with_link("self", &format!("/api/v1/sessions/{key}")),
    ))
}

/// DELETE /api/v1/sessions/{key}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    if !state.registry.evict(&key).await? {
        return Err(AppError::NotFound(key));
    }

    tracing::info!(session_key = %key, "session deleted via API");
    Ok(Json(timer.finish(serde_json::json!({ "deleted": key }))))
}
