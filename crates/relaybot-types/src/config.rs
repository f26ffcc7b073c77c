//! Relay configuration types.
//!
//! `RelayConfig` represents the top-level `config.toml` that selects default
//! engines, timeouts and backend endpoints. All fields have sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{ConversationStyle, Engine};

/// What to do when a message arrives for a session that is already mid-ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait for the in-flight request, then handle the message.
    #[default]
    Queue,
    /// Fail fast with `SessionBusy`.
    Reject,
}

/// Top-level configuration for the relay.
///
/// Loaded from `~/.relaybot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Engine for users without a stored session.
    #[serde(default = "default_engine")]
    pub default_engine: Engine,

    /// Style given to new streaming bots.
    #[serde(default)]
    pub default_style: ConversationStyle,

    /// Messages older than this are dropped (restart replay guard).
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    #[serde(default)]
    pub busy_policy: BusyPolicy,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_engine() -> Engine {
    Engine::Bing
}

fn default_stale_after_secs() -> u64 {
    5 * 60
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_engine: default_engine(),
            default_style: ConversationStyle::default(),
            stale_after_secs: default_stale_after_secs(),
            busy_policy: BusyPolicy::default(),
            streaming: StreamingConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Chat-hub endpoints and timeouts for the streaming engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Cookie export file, relative to the data directory unless absolute.
    #[serde(default = "default_cookie_file")]
    pub cookie_file: String,

    #[serde(default = "default_create_url")]
    pub create_url: String,

    #[serde(default = "default_chathub_url")]
    pub chathub_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_ask_timeout_secs")]
    pub ask_timeout_secs: u64,
}

fn default_cookie_file() -> String {
    "cookie.json".to_string()
}

fn default_create_url() -> String {
    "https://edgeservices.bing.com/edgesvc/turing/conversation/create".to_string()
}

fn default_chathub_url() -> String {
    "wss://sydney.bing.com/sydney/ChatHub".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_ask_timeout_secs() -> u64 {
    120
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            cookie_file: default_cookie_file(),
            create_url: default_create_url(),
            chathub_url: default_chathub_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            ask_timeout_secs: default_ask_timeout_secs(),
        }
    }
}

impl StreamingConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_secs(self.ask_timeout_secs)
    }
}

/// OpenAI-compatible chat completion settings for the memory engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Backend input-size limit in tokens.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u32,

    /// Tokens held back from the limit for the reply.
    #[serde(default = "default_reply_reserve_tokens")]
    pub reply_reserve_tokens: u32,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_input_tokens() -> u32 {
    4_096
}

fn default_reply_reserve_tokens() -> u32 {
    1_024
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            max_input_tokens: default_max_input_tokens(),
            reply_reserve_tokens: default_reply_reserve_tokens(),
        }
    }
}
