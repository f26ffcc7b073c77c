//! The bot abstraction: one closed set of engine variants behind a uniform
//! ask / reset / close / describe / serialize contract.
//!
//! The engine tag stored in each `SessionRecord` selects the variant on
//! restore, so switching engines is a plain match rather than open-ended
//! dynamic dispatch.

pub mod memory;
pub mod streaming;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use relaybot_types::engine::{ConversationStyle, Engine};
use relaybot_types::error::BotError;
use relaybot_types::session::{EngineState, SessionInfo, SessionRecord};

use crate::backend::{BoxChatBackend, HistoryBudget};
use crate::protocol::StreamingClient;

pub use memory::MemoryBot;
pub use streaming::StreamingBot;

/// Shared, process-wide handles every bot is built from.
#[derive(Clone)]
pub struct Backends {
    pub streaming: Arc<StreamingClient>,
    pub memory: Arc<BoxChatBackend>,
    pub default_style: ConversationStyle,
    pub budget: HistoryBudget,
}

impl Backends {
    /// Construct a fresh bot of `engine` for `session_key`.
    pub fn create(&self, session_key: &str, engine: Engine) -> Bot {
        match engine {
            Engine::Bing => Bot::Streaming(StreamingBot::new(
                session_key,
                self.default_style,
                Arc::clone(&self.streaming),
            )),
            Engine::Gpt35Turbo => Bot::Memory(MemoryBot::new(
                session_key,
                Arc::clone(&self.memory),
                self.budget,
            )),
        }
    }
}

pub enum Bot {
    Streaming(StreamingBot),
    Memory(MemoryBot),
}

impl Bot {
    pub fn session_key(&self) -> &str {
        match self {
            Bot::Streaming(bot) => bot.session_key(),
            Bot::Memory(bot) => bot.session_key(),
        }
    }

    pub fn engine(&self) -> Engine {
        match self {
            Bot::Streaming(bot) => bot.engine(),
            Bot::Memory(bot) => bot.engine(),
        }
    }

    pub fn turn_count(&self) -> u32 {
        match self {
            Bot::Streaming(bot) => bot.turn_count(),
            Bot::Memory(bot) => bot.turn_count(),
        }
    }

    pub fn style(&self) -> Option<ConversationStyle> {
        match self {
            Bot::Streaming(bot) => Some(bot.style()),
            Bot::Memory(_) => None,
        }
    }

    pub async fn ask(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, BotError> {
        match self {
            Bot::Streaming(bot) => bot.ask(prompt, cancel).await,
            Bot::Memory(bot) => bot.ask(prompt, cancel).await,
        }
    }

    pub async fn reset(&mut self) {
        tracing::info!(session_key = %self.session_key(), engine = %self.engine(), "resetting bot");
        match self {
            Bot::Streaming(bot) => bot.reset().await,
            Bot::Memory(bot) => bot.reset(),
        }
    }

    /// Release transport resources. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Bot::Streaming(bot) = self {
            bot.close().await;
        }
    }

    pub fn set_style(&mut self, style: ConversationStyle) -> Result<(), BotError> {
        match self {
            Bot::Streaming(bot) => {
                bot.set_style(style);
                Ok(())
            }
            Bot::Memory(bot) => Err(BotError::UnsupportedOperation {
                engine: bot.engine(),
                operation: "conversation styles",
            }),
        }
    }

    pub fn describe(&self) -> SessionInfo {
        SessionInfo {
            session_key: self.session_key().to_string(),
            engine: self.engine(),
            style: self.style(),
            turn_count: self.turn_count(),
        }
    }

    pub fn serialize(&self) -> SessionRecord {
        let state = match self {
            Bot::Streaming(bot) => EngineState::Streaming {
                context: bot.context().cloned(),
            },
            Bot::Memory(bot) => EngineState::Memory {
                turns: bot.turns().to_vec(),
            },
        };
        SessionRecord {
            session_key: self.session_key().to_string(),
            engine: self.engine(),
            style: self.style(),
            turn_count: self.turn_count(),
            state: Some(state),
            updated_at: Utc::now(),
        }
    }

    /// Rebuild the variant named by `record.engine`.
    ///
    /// Older records without state keep their style and turn count and start
    /// with no conversation. State belonging to another engine yields a fresh
    /// bot of the recorded engine; only the style carries over.
    pub fn deserialize(record: SessionRecord, backends: &Backends) -> Bot {
        let SessionRecord {
            session_key,
            engine,
            style,
            turn_count,
            state,
            ..
        } = record;

        match (engine, state) {
            (Engine::Bing, state @ (None | Some(EngineState::Streaming { .. }))) => {
                let context = match state {
                    Some(EngineState::Streaming { context }) => context,
                    _ => None,
                };
                Bot::Streaming(StreamingBot::restore(
                    session_key,
                    style.unwrap_or(backends.default_style),
                    turn_count,
                    context,
                    Arc::clone(&backends.streaming),
                ))
            }
            (Engine::Gpt35Turbo, state @ (None | Some(EngineState::Memory { .. }))) => {
                let turns = match state {
                    Some(EngineState::Memory { turns }) => turns,
                    _ => Vec::new(),
                };
                Bot::Memory(MemoryBot::restore(
                    session_key,
                    turn_count,
                    turns,
                    Arc::clone(&backends.memory),
                    backends.budget,
                ))
            }
            (engine, _) => {
                tracing::warn!(
                    session_key = %session_key,
                    engine = %engine,
                    "stored engine state does not match engine, starting fresh"
                );
                let mut bot = backends.create(&session_key, engine);
                if let (Bot::Streaming(streaming), Some(style)) = (&mut bot, style) {
                    streaming.set_style(style);
                }
                bot
            }
        }
    }
}
