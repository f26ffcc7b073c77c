//! Persisted per-user session state.
//!
//! A `SessionRecord` is the durable snapshot of one user's bot: which engine
//! it runs, its style, how many asks completed, and the engine-specific state
//! needed to continue the dialogue after a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::conversation::ConversationContext;
use crate::engine::{ConversationStyle, Engine};

/// Role of a turn in a locally buffered conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// One (role, text) entry of the memory engine's conversation buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Engine-specific continuation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineState {
    /// Remote conversation handle; `None` until the first ask authenticates.
    Streaming {
        #[serde(default)]
        context: Option<ConversationContext>,
    },
    /// Ordered, append-only turn history.
    Memory {
        #[serde(default)]
        turns: Vec<Turn>,
    },
}

/// Durable unit of persisted state per user.
///
/// Every field added after the first release carries a serde default so
/// older rows keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_key: String,
    pub engine: Engine,
    #[serde(default)]
    pub style: Option<ConversationStyle>,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub state: Option<EngineState>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// User-visible summary of a bot, as reported by `/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_key: String,
    pub engine: Engine,
    pub style: Option<ConversationStyle>,
    pub turn_count: u32,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_key: record.session_key.clone(),
            engine: record.engine,
            style: record.style,
            turn_count: record.turn_count,
        }
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "session_key:{}", self.session_key)?;
        writeln!(f, "engine:{}", self.engine)?;
        if let Some(style) = self.style {
            writeln!(f, "style:{style}")?;
        }
        write!(f, "turn_count:{}", self.turn_count)
    }
}
