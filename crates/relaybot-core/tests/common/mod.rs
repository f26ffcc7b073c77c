//! Shared fixtures for relaybot-core integration tests.
//!
//! Provides an in-memory `SessionStore`, a simulated chat hub implementing
//! `ChatHubConnector`, and a scripted `ChatBackend`, plus a helper that
//! wires them into a `Dispatcher`.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use serde_json::json;

use relaybot_core::backend::{BoxChatBackend, ChatBackend, HistoryBudget};
use relaybot_core::bot::Backends;
use relaybot_core::dispatch::Dispatcher;
use relaybot_core::protocol::{
    BoxChatHubConnector, ChatHubConnector, FrameChannel, ProtocolTimeouts, StreamingClient,
};
use relaybot_core::session::SessionRegistry;
use relaybot_core::storage::SessionStore;
use relaybot_types::config::BusyPolicy;
use relaybot_types::conversation::ConversationContext;
use relaybot_types::engine::{ConversationStyle, Engine};
use relaybot_types::error::{BackendError, ProtocolError, RepositoryError};
use relaybot_types::session::{SessionRecord, Turn};

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, SessionRecord>>,
    pub writes: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl MemoryStore {
    pub fn record(&self, key: &str) -> Option<SessionRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, session_key: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.record(session_key))
    }

    async fn put(&self, record: &SessionRecord) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .insert(record.session_key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, session_key: &str) -> Result<(), RepositoryError> {
        self.records.lock().unwrap().remove(session_key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, RepositoryError> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulated chat hub
// ---------------------------------------------------------------------------

/// How the hub answers the next ask.
#[derive(Debug, Clone)]
pub enum HubReply {
    Answer(String),
    /// Final frame rejecting the invocation.
    Reject,
    /// Handshake acknowledged, then the stream ends without a final frame.
    Drop,
}

#[derive(Default)]
pub struct HubState {
    pub replies: Mutex<VecDeque<HubReply>>,
    /// Request frames received, in order.
    pub requests: Mutex<Vec<serde_json::Value>>,
    pub conversations_created: AtomicUsize,
}

impl HubState {
    pub fn push(&self, reply: HubReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn answer(&self, text: &str) {
        self.push(HubReply::Answer(text.to_string()));
    }

    /// `invocationId` of every request received.
    pub fn invocation_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["invocationId"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn conversations_created(&self) -> usize {
        self.conversations_created.load(Ordering::SeqCst)
    }
}

pub struct SimulatedHub {
    pub state: Arc<HubState>,
}

fn final_frame(text: &str) -> String {
    let frame = json!({
        "type": 2,
        "invocationId": "0",
        "item": {
            "messages": [
                {"author": "user", "text": "prompt"},
                {"author": "bot", "text": text},
            ],
            "result": {"value": "Success"},
        },
    });
    format!("{frame}\u{1e}")
}

impl ChatHubConnector for SimulatedHub {
    async fn create_conversation(&self) -> Result<ConversationContext, ProtocolError> {
        let n = self.state.conversations_created.fetch_add(1, Ordering::SeqCst);
        Ok(ConversationContext::new(
            format!("conv-{n}"),
            "client-1".to_string(),
            format!("sig-{n}"),
        ))
    }

    async fn open_channel(&self) -> Result<FrameChannel, ProtocolError> {
        let reply = self
            .state
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(HubReply::Drop);

        let mut messages = vec!["{}\u{1e}".to_string()];
        match reply {
            HubReply::Answer(text) => {
                messages.push("{\"type\":1,\"target\":\"update\",\"arguments\":[]}\u{1e}".into());
                messages.push(final_frame(&text) + "{\"type\":3,\"invocationId\":\"0\"}\u{1e}");
            }
            HubReply::Reject => {
                messages.push(
                    "{\"type\":2,\"item\":{\"result\":{\"value\":\"InvalidSession\",\"message\":\"bad sequence\"}}}\u{1e}"
                        .into(),
                );
            }
            HubReply::Drop => {}
        }

        let state = Arc::clone(&self.state);
        let sink = futures_util::sink::unfold((), move |_, frame: String| {
            let state = Arc::clone(&state);
            async move {
                let body = frame.trim_end_matches('\u{1e}');
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
                    if value["type"] == 4 {
                        state.requests.lock().unwrap().push(value);
                    }
                }
                Ok::<_, ProtocolError>(())
            }
        });
        let stream = stream::iter(messages).map(Ok::<String, ProtocolError>);
        Ok(FrameChannel::new(sink, stream))
    }
}

// ---------------------------------------------------------------------------
// Scripted memory backend
// ---------------------------------------------------------------------------

/// Answers `"echo: {prompt} ({n} prior turns)"`.
pub struct EchoBackend {
    pub max_input_tokens: u32,
}

impl ChatBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn max_input_tokens(&self) -> u32 {
        self.max_input_tokens
    }

    async fn complete(&self, history: &[Turn], prompt: &str) -> Result<String, BackendError> {
        Ok(format!("echo: {prompt} ({} prior turns)", history.len()))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dispatcher: Dispatcher<MemoryStore>,
    pub registry: Arc<SessionRegistry<MemoryStore>>,
    pub hub: Arc<HubState>,
}

impl Harness {
    pub fn store(&self) -> &MemoryStore {
        self.registry.store()
    }
}

pub fn backends(hub: Arc<HubState>) -> Backends {
    let client = StreamingClient::new(
        BoxChatHubConnector::new(SimulatedHub { state: hub }),
        ProtocolTimeouts {
            connect: Duration::from_secs(1),
            ask: Duration::from_secs(2),
        },
    );
    Backends {
        streaming: Arc::new(client),
        memory: Arc::new(BoxChatBackend::new(EchoBackend {
            max_input_tokens: 4096,
        })),
        default_style: ConversationStyle::Balanced,
        budget: HistoryBudget::new(4096, 1024),
    }
}

pub fn harness_with(store: MemoryStore, default_engine: Engine, busy_policy: BusyPolicy) -> Harness {
    let hub = Arc::new(HubState::default());
    let registry = Arc::new(SessionRegistry::new(
        store,
        backends(Arc::clone(&hub)),
        default_engine,
        busy_policy,
    ));
    let dispatcher = Dispatcher::new(Arc::clone(&registry), Duration::from_secs(300));
    Harness {
        dispatcher,
        registry,
        hub,
    }
}

pub fn harness() -> Harness {
    harness_with(MemoryStore::default(), Engine::Bing, BusyPolicy::Queue)
}
