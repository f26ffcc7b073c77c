//! Frame codec for the chat-hub websocket protocol.
//!
//! Every frame is a JSON object terminated by the ASCII record separator
//! (`0x1e`); one websocket message may carry several frames. The exchange is:
//!
//! 1. client sends the handshake `{"protocol":"json","version":1}`
//! 2. hub acknowledges with an empty `{}` frame
//! 3. client sends one `type: 4` invocation carrying the prompt and sequence number
//! 4. hub sends zero or more `type: 1` partial updates, then one `type: 2`
//!    final frame with the complete answer, then a `type: 3` completion
//! 5. `type: 6` keep-alives may appear anywhere

use serde::Deserialize;
use serde_json::json;

use relaybot_types::conversation::ConversationContext;
use relaybot_types::engine::ConversationStyle;
use relaybot_types::error::ProtocolError;

pub const RECORD_SEPARATOR: char = '\u{1e}';

const BASE_OPTIONS: &[&str] = &[
    "nlu_direct_response_filter",
    "deepleo",
    "disable_emoji_spoken_text",
    "responsible_ai_policy_235",
    "enablemm",
    "dv3sugg",
    "e2ecachewrite",
    "cachewriteext",
    "nodlcpcwrite",
    "travelansgnd",
];

/// A decoded hub frame.
#[derive(Debug)]
pub enum HubFrame {
    HandshakeAck,
    Partial,
    Final(FinalItem),
    Completion { error: Option<String> },
    KeepAlive,
    Other(u8),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<u8>,
    item: Option<FinalItem>,
    error: Option<String>,
}

/// Payload of the final (`type: 2`) frame.
#[derive(Debug, Deserialize)]
pub struct FinalItem {
    #[serde(default)]
    pub messages: Vec<HubMessage>,
    #[serde(default)]
    pub result: Option<HubResult>,
}

#[derive(Debug, Deserialize)]
pub struct HubMessage {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HubResult {
    pub value: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl FinalItem {
    /// Resolve the final frame into the answer text.
    ///
    /// The answer is every non-user message segment, in order, joined with
    /// newlines. `sequence` is the invocation this frame answers.
    pub fn into_answer(self, sequence: u32) -> Result<String, ProtocolError> {
        if let Some(result) = &self.result {
            check_result(result, sequence)?;
        }

        let segments: Vec<String> = self
            .messages
            .into_iter()
            .filter(|m| m.author != "user")
            .filter_map(|m| m.text)
            .collect();

        if segments.is_empty() {
            return Err(ProtocolError::EmptyAnswer);
        }
        Ok(segments.join("\n"))
    }
}

fn check_result(result: &HubResult, sequence: u32) -> Result<(), ProtocolError> {
    let reason = result
        .message
        .clone()
        .unwrap_or_else(|| result.value.clone());
    match result.value.as_str() {
        "Success" => Ok(()),
        "InvalidSession" => Err(ProtocolError::SequenceRejected { sequence, reason }),
        "UnauthorizedRequest" | "Forbidden" => Err(ProtocolError::Authentication(reason)),
        other => Err(ProtocolError::Protocol(format!("{other}: {reason}"))),
    }
}

/// Append the record separator to a JSON value.
pub fn encode(value: &serde_json::Value) -> String {
    format!("{value}{RECORD_SEPARATOR}")
}

/// The protocol negotiation frame sent right after the socket opens.
pub fn handshake() -> String {
    encode(&json!({"protocol": "json", "version": 1}))
}

/// Build the `type: 4` chat invocation for the context's current sequence.
pub fn chat_request(
    context: &ConversationContext,
    prompt: &str,
    style: ConversationStyle,
) -> String {
    encode(&json!({
        "arguments": [{
            "source": "cib",
            "optionsSets": options_sets(style),
            "isStartOfSession": context.is_start_of_session(),
            "message": {
                "author": "user",
                "inputMethod": "Keyboard",
                "text": prompt,
                "messageType": "Chat",
            },
            "conversationSignature": context.conversation_signature,
            "participant": {"id": context.client_id},
            "conversationId": context.conversation_id,
        }],
        "invocationId": context.invocation_sequence.to_string(),
        "target": "chat",
        "type": 4,
    }))
}

fn options_sets(style: ConversationStyle) -> Vec<&'static str> {
    let tone = match style {
        ConversationStyle::Creative => "h3imaginative",
        ConversationStyle::Balanced => "galileo",
        ConversationStyle::Precise => "h3precise",
    };
    let mut options = BASE_OPTIONS.to_vec();
    options.push(tone);
    options
}

/// Split one websocket message into its non-empty frames.
pub fn split_frames(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(RECORD_SEPARATOR).filter(|s| !s.trim().is_empty())
}

/// Decode a single frame (without the trailing separator).
pub fn parse_frame(text: &str) -> Result<HubFrame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)
        .map_err(|e| ProtocolError::Protocol(format!("malformed frame: {e}")))?;

    match raw.kind {
        None => Ok(HubFrame::HandshakeAck),
        Some(1) => Ok(HubFrame::Partial),
        Some(2) => raw
            .item
            .map(HubFrame::Final)
            .ok_or_else(|| ProtocolError::Protocol("final frame without item".to_string())),
        Some(3) => Ok(HubFrame::Completion { error: raw.error }),
        Some(6) => Ok(HubFrame::KeepAlive),
        Some(other) => Ok(HubFrame::Other(other)),
    }
}
