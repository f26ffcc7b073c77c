//! Streaming protocol client.
//!
//! `StreamingClient` owns the connector and the time bounds; the per-user
//! `ProtocolSession` owns the conversation context and, while an ask is in
//! flight, the open frame channel. Every ask opens a channel, runs the
//! handshake and one invocation, and closes the channel again whatever the
//! outcome. The invocation sequence only advances once a final answer has
//! been received.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use relaybot_types::conversation::ConversationContext;
use relaybot_types::engine::ConversationStyle;
use relaybot_types::error::ProtocolError;

use super::connector::{BoxChatHubConnector, FrameChannel};
use super::frame::{self, HubFrame};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time bounds applied by the client.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolTimeouts {
    /// Conversation creation and channel open.
    pub connect: Duration,
    /// Whole ask, from channel open to final frame.
    pub ask: Duration,
}

impl Default for ProtocolTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            ask: Duration::from_secs(120),
        }
    }
}

/// Lifecycle of a protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    StreamOpen,
    PartialReceived,
    FinalReceived,
    Closed,
}

/// One remote conversation: its context plus the transport of the ask in flight.
#[derive(Debug)]
pub struct ProtocolSession {
    context: ConversationContext,
    state: SessionState,
    channel: Option<FrameChannel>,
}

impl ProtocolSession {
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sequence number the next ask will carry.
    pub fn sequence(&self) -> u32 {
        self.context.invocation_sequence
    }
}

pub struct StreamingClient {
    connector: BoxChatHubConnector,
    timeouts: ProtocolTimeouts,
}

impl StreamingClient {
    pub fn new(connector: BoxChatHubConnector, timeouts: ProtocolTimeouts) -> Self {
        Self {
            connector,
            timeouts,
        }
    }

    /// Create a new remote conversation starting at sequence 0.
    #[tracing::instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<ProtocolSession, ProtocolError> {
        let context =
            tokio::time::timeout(self.timeouts.connect, self.connector.create_conversation())
                .await
                .map_err(|_| ProtocolError::Timeout(self.timeouts.connect))??;

        tracing::info!(
            conversation_id = %context.conversation_id,
            "created chat-hub conversation"
        );

        Ok(ProtocolSession {
            context,
            state: SessionState::Authenticated,
            channel: None,
        })
    }

    /// Rebuild a session from a persisted context without contacting the hub.
    pub fn resume(&self, context: ConversationContext) -> ProtocolSession {
        ProtocolSession {
            context,
            state: SessionState::Authenticated,
            channel: None,
        }
    }

    /// Send one prompt and wait for its final answer.
    ///
    /// Bounded by the ask timeout and aborted when `cancel` fires. The
    /// channel is closed on every path; on failure the sequence is left
    /// untouched so a retry reuses it.
    #[tracing::instrument(
        skip(self, session, prompt, cancel),
        fields(sequence = session.sequence(), prompt_len = prompt.len())
    )]
    pub async fn ask(
        &self,
        session: &mut ProtocolSession,
        prompt: &str,
        style: ConversationStyle,
        cancel: &CancellationToken,
    ) -> Result<String, ProtocolError> {
        let limit = self.timeouts.ask;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProtocolError::Cancelled),
            outcome = tokio::time::timeout(limit, self.exchange(session, prompt, style)) => {
                outcome.unwrap_or(Err(ProtocolError::Timeout(limit)))
            }
        };

        self.release_channel(session).await;

        match result {
            Ok(answer) => {
                session.context.invocation_sequence += 1;
                session.state = SessionState::FinalReceived;
                tracing::debug!(
                    next_sequence = session.context.invocation_sequence,
                    answer_len = answer.len(),
                    "received final answer"
                );
                Ok(answer)
            }
            Err(e) => {
                session.state = SessionState::Closed;
                tracing::warn!(error = %e, "ask failed");
                Err(e)
            }
        }
    }

    /// Release the transport. Safe to call repeatedly.
    pub async fn close(&self, session: &mut ProtocolSession) {
        self.release_channel(session).await;
        session.state = SessionState::Closed;
    }

    async fn exchange(
        &self,
        session: &mut ProtocolSession,
        prompt: &str,
        style: ConversationStyle,
    ) -> Result<String, ProtocolError> {
        let sequence = session.context.invocation_sequence;
        let request = frame::chat_request(&session.context, prompt, style);

        let opened = tokio::time::timeout(self.timeouts.connect, self.connector.open_channel())
            .await
            .map_err(|_| ProtocolError::Timeout(self.timeouts.connect))??;
        let channel = session.channel.insert(opened);
        session.state = SessionState::StreamOpen;

        channel.sink.send(frame::handshake()).await?;

        let mut request_sent = false;
        let mut partials = 0usize;

        while let Some(message) = channel.stream.next().await {
            let message = message?;
            for text in frame::split_frames(&message) {
                match frame::parse_frame(text)? {
                    HubFrame::HandshakeAck => {
                        if !request_sent {
                            channel.sink.send(request.clone()).await?;
                            request_sent = true;
                        }
                    }
                    HubFrame::Partial => {
                        partials += 1;
                        session.state = SessionState::PartialReceived;
                    }
                    HubFrame::Final(item) => {
                        tracing::debug!(partials, "final frame received");
                        return item.into_answer(sequence);
                    }
                    HubFrame::Completion { error } => {
                        return Err(ProtocolError::Protocol(error.unwrap_or_else(|| {
                            "stream completed without a final answer".to_string()
                        })));
                    }
                    HubFrame::KeepAlive => {}
                    HubFrame::Other(kind) => {
                        tracing::debug!(kind, "ignoring unexpected frame type");
                    }
                }
            }
        }

        Err(ProtocolError::Transport(
            "connection closed before the final answer".to_string(),
        ))
    }

    async fn release_channel(&self, session: &mut ProtocolSession) {
        if let Some(mut channel) = session.channel.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, channel.sink.close())
                .await
                .is_err()
            {
                tracing::debug!("timed out closing chat-hub channel");
            }
        }
    }
}
