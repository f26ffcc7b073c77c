//! Remote conversation handle for the streaming engine.

use serde::{Deserialize, Serialize};

/// Opaque handle to one resumable dialogue on the chat hub, plus the local
/// invocation counter.
///
/// `invocation_sequence` starts at 0 and is incremented exactly once per
/// completed ask. The value sent on a resumed connection must equal the last
/// persisted value; the hub rejects stale or skipped numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub client_id: String,
    pub conversation_signature: String,
    #[serde(default)]
    pub invocation_sequence: u32,
}

impl ConversationContext {
    pub fn new(conversation_id: String, client_id: String, conversation_signature: String) -> Self {
        Self {
            conversation_id,
            client_id,
            conversation_signature,
            invocation_sequence: 0,
        }
    }

    /// Whether the next ask opens the conversation on the hub side.
    pub fn is_start_of_session(&self) -> bool {
        self.invocation_sequence == 0
    }
}
