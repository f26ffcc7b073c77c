use std::time::Duration;

use thiserror::Error;

use crate::engine::{ConversationStyle, Engine};

/// Errors from the streaming chat-hub protocol.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no final answer within {0:?}")]
    Timeout(Duration),

    #[error("final answer contained no assistant messages")]
    EmptyAnswer,

    #[error("conversation rejected invocation {sequence} ({reason}), send /reset to start over")]
    SequenceRejected { sequence: u32, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ProtocolError {
    /// Whether the session stays unusable until credentials are refreshed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Authentication(_))
    }
}

/// Errors from the stateless memory-engine backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("context length exceeded: max {max}, requested {requested}")]
    ContextLengthExceeded { max: u32, requested: u32 },

    #[error("backend returned an empty answer")]
    EmptyResponse,
}

/// Errors surfaced by a bot operation.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("conversation is too long ({requested} of {limit} tokens), send /reset to clear my memory")]
    CapacityExceeded { limit: u32, requested: u32 },

    #[error("the {engine} engine does not support {operation}")]
    UnsupportedOperation {
        engine: Engine,
        operation: &'static str,
    },
}

/// User input errors from the command surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("invalid command [{0}], send /help for the list of commands")]
    InvalidCommand(String),

    #[error("invalid conversation style [{value}], valid choices are: {}", ConversationStyle::choices())]
    InvalidStyle { value: String },

    #[error("invalid engine [{value}], valid choices are: {}", Engine::choices())]
    InvalidEngine { value: String },
}

/// Errors from repository operations (used by trait definitions in relaybot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors that abort handling of an inbound message.
///
/// Ask-path failures never show up here: they become warning replies.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to persist session: {0}")]
    Repository(#[from] RepositoryError),

    #[error("session '{0}' is busy")]
    SessionBusy(String),
}
