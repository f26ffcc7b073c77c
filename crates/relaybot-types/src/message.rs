//! Messages exchanged with the messaging-platform bridge.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One inbound text message event from the messaging platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform user id of the sender; the session key derives from it.
    pub sender_id: String,
    /// Display name, used for the mention prefix on group replies.
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    /// Whether the bot was mentioned (group messages only).
    #[serde(default)]
    pub mentioned: bool,
    pub body: String,
    /// Creation time on the platform, in unix seconds on the wire.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// A direct (non-group) message created now.
    pub fn direct(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            is_group: false,
            mentioned: false,
            body: body.into(),
            timestamp: Utc::now(),
        }
    }

    /// Age of the message relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Plain-text reply addressed back to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub recipient: String,
    pub text: String,
}
