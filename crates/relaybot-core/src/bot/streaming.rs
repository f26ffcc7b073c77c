//! Streaming variant: a bot backed by a remote chat-hub conversation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use relaybot_types::conversation::ConversationContext;
use relaybot_types::engine::{ConversationStyle, Engine};
use relaybot_types::error::BotError;

use crate::protocol::{ProtocolSession, StreamingClient};

pub struct StreamingBot {
    session_key: String,
    style: ConversationStyle,
    turn_count: u32,
    client: Arc<StreamingClient>,
    /// `None` until the first ask authenticates, and again after a reset.
    session: Option<ProtocolSession>,
}

impl StreamingBot {
    pub fn new(
        session_key: impl Into<String>,
        style: ConversationStyle,
        client: Arc<StreamingClient>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            style,
            turn_count: 0,
            client,
            session: None,
        }
    }

    /// Rebuild from persisted fields; the context is resumed without contacting the hub.
    pub fn restore(
        session_key: impl Into<String>,
        style: ConversationStyle,
        turn_count: u32,
        context: Option<ConversationContext>,
        client: Arc<StreamingClient>,
    ) -> Self {
        let session = context.map(|ctx| client.resume(ctx));
        Self {
            session_key: session_key.into(),
            style,
            turn_count,
            client,
            session,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn engine(&self) -> Engine {
        Engine::Bing
    }

    pub fn style(&self) -> ConversationStyle {
        self.style
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn context(&self) -> Option<&ConversationContext> {
        self.session.as_ref().map(|s| s.context())
    }

    pub fn set_style(&mut self, style: ConversationStyle) {
        self.style = style;
    }

    pub async fn ask(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, BotError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.client.authenticate().await?,
        };
        let session = self.session.insert(session);

        let answer = self
            .client
            .ask(session, prompt, self.style, cancel)
            .await?;
        self.turn_count += 1;
        Ok(answer)
    }

    /// Drop the remote conversation; the next ask starts a new one at sequence 0.
    pub async fn reset(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.client.close(&mut session).await;
        }
        self.turn_count = 0;
    }

    /// Release the transport but keep the context so it can still be persisted.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.client.close(session).await;
        }
    }
}
