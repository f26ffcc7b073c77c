//! Inbound message webhook.
//!
//! - POST /api/v1/messages - Dispatch one message, return the reply (if any)

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use relaybot_types::message::InboundMessage;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Reply for the bridge to deliver. `reply` is null when the message was ignored.
#[derive(Debug, Serialize)]
pub struct MessageReply {
    pub recipient: String,
    pub reply: Option<String>,
}

/// POST /api/v1/messages
pub async fn post_message(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> Result<Json<ApiResponse<MessageReply>>, AppError> {
    let timer = RequestTimer::start();

    if message.sender_id.trim().is_empty() {
        return Err(AppError::Validation("sender_id must not be empty".into()));
    }

    let cancel = state.shutdown.child_token();
    let reply = state.dispatcher.handle(&message, &cancel).await?;

    let body = MessageReply {
        recipient: message.sender_id.clone(),
        reply: reply.map(|r| r.text),
    };
    let resp = timer
        .finish(body)
        .with_link("session", &format!("/api/v1/sessions/{}", message.sender_id));

    Ok(Json(resp))
}
