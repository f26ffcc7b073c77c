//! Infrastructure layer for relaybot.
//!
//! Contains implementations of the ports defined in `relaybot-core`:
//! the SQLite session store, the chat-hub connector (HTTP conversation
//! creation plus websocket frames), the OpenAI-compatible memory backend,
//! cookie credential loading, and config/data-dir resolution.

pub mod chathub;
pub mod config;
pub mod credentials;
pub mod llm;
pub mod sqlite;
