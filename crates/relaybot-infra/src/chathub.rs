//! Chat-hub connector over HTTP and websocket.
//!
//! Conversations are created with a cookie-authenticated `GET`; each ask
//! then opens its own websocket to the hub. Frame encoding and the ask state
//! machine live in `relaybot_core::protocol`; this module only moves text.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use relaybot_core::protocol::{ChatHubConnector, FrameChannel};
use relaybot_types::config::StreamingConfig;
use relaybot_types::conversation::ConversationContext;
use relaybot_types::error::ProtocolError;

use crate::credentials::CookieJar;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

/// Newer hub deployments return the signature as a response header only.
const SIGNATURE_HEADER: &str = "x-sydney-encryptedconversationsignature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    #[serde(default)]
    conversation_id: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    conversation_signature: Option<String>,
    result: CreateResult,
}

#[derive(Debug, Deserialize)]
struct CreateResult {
    value: String,
    #[serde(default)]
    message: Option<String>,
}

/// `ChatHubConnector` for the Bing chat hub.
pub struct BingConnector {
    http: reqwest::Client,
    cookies: Arc<CookieJar>,
    create_url: String,
    chathub_url: String,
}

impl BingConnector {
    pub fn new(config: &StreamingConfig, cookies: Arc<CookieJar>) -> Result<Self, ProtocolError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            cookies,
            create_url: config.create_url.clone(),
            chathub_url: config.chathub_url.clone(),
        })
    }
}

/// Resolve a create response into a context, or an authentication error.
fn parse_create(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Result<ConversationContext, ProtocolError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProtocolError::Authentication(format!(
            "conversation create was refused ({status})"
        )));
    }
    if !status.is_success() {
        return Err(ProtocolError::Authentication(format!(
            "conversation create failed ({status})"
        )));
    }

    let response: CreateResponse = serde_json::from_str(body)
        .map_err(|e| ProtocolError::Protocol(format!("invalid create response: {e}")))?;

    if response.result.value != "Success" {
        let detail = response.result.message.unwrap_or_default();
        return Err(ProtocolError::Authentication(format!(
            "{}: {detail}",
            response.result.value
        )));
    }

    let signature = response
        .conversation_signature
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| {
            ProtocolError::Protocol("create response carried no conversation signature".into())
        })?;

    Ok(ConversationContext::new(
        response.conversation_id,
        response.client_id,
        signature,
    ))
}

impl ChatHubConnector for BingConnector {
    async fn create_conversation(&self) -> Result<ConversationContext, ProtocolError> {
        let cookie = self.cookies.header_value().ok_or_else(|| {
            ProtocolError::Authentication("no chat-hub cookies configured".to_string())
        })?;

        let response = self
            .http
            .get(&self.create_url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        parse_create(status, &headers, &body)
    }

    async fn open_channel(&self) -> Result<FrameChannel, ProtocolError> {
        let (socket, _) = connect_async(self.chathub_url.as_str())
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;
        tracing::debug!(url = %self.chathub_url, "chat-hub websocket open");

        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| ProtocolError::Transport(e.to_string()))
            .with(|text: String| async move { Ok::<_, ProtocolError>(Message::Text(text)) });

        let stream = stream.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(Ok),
                Ok(_) => None,
                Err(e) => Some(Err(ProtocolError::Transport(e.to_string()))),
            }
        });

        Ok(FrameChannel::new(sink, stream))
    }
}
