//! Dispatcher -- turns one inbound message into at most one reply.
//!
//! Flow per message: staleness and mention gates, mention stripping,
//! quoted-reply filter, command parsing, then the command or ask runs
//! against the session's bot under its lock. State is persisted before the
//! reply is returned, so a crash can repeat an answer but never lose one
//! the user already saw.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use relaybot_types::engine::Engine;
use relaybot_types::error::{BotError, DispatchError};
use relaybot_types::message::{InboundMessage, OutboundReply};

use super::command::{self, Command, Input};
use super::mention;
use crate::session::SessionRegistry;
use crate::storage::SessionStore;

const WARN_PREFIX: &str = "[WARN] ";

pub struct Dispatcher<S: SessionStore> {
    registry: Arc<SessionRegistry<S>>,
    stale_after: chrono::Duration,
}

impl<S: SessionStore> Dispatcher<S> {
    pub fn new(registry: Arc<SessionRegistry<S>>, stale_after: std::time::Duration) -> Self {
        let stale_after =
            chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
        Self {
            registry,
            stale_after,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<S>> {
        &self.registry
    }

    /// Handle one inbound message.
    ///
    /// `Ok(None)` means the message was ignored. Bot failures become warning
    /// replies; only persistence failures and busy sessions are errors.
    #[tracing::instrument(
        skip(self, message, cancel),
        fields(sender = %message.sender_id, group = message.is_group)
    )]
    pub async fn handle(
        &self,
        message: &InboundMessage,
        cancel: &CancellationToken,
    ) -> Result<Option<OutboundReply>, DispatchError> {
        let age = message.age(Utc::now());
        if age > self.stale_after {
            tracing::info!(age_secs = age.num_seconds(), "ignoring stale message");
            return Ok(None);
        }

        let content = if message.is_group {
            if !message.mentioned {
                return Ok(None);
            }
            mention::strip_mention(&message.body)
        } else {
            message.body.as_str()
        };

        if mention::is_quoted_reply(content) {
            tracing::info!("ignoring quoted reply");
            return Ok(None);
        }
        if content.trim().is_empty() {
            return Ok(None);
        }

        let text = match command::parse(content) {
            Ok(input) => self.execute(&message.sender_id, input, cancel).await?,
            Err(e) => {
                tracing::warn!(error = %e, "invalid command");
                format!("{WARN_PREFIX}{e}")
            }
        };

        Ok(Some(OutboundReply {
            recipient: message.sender_id.clone(),
            text: reply_prefix(message) + &text,
        }))
    }

    async fn execute(
        &self,
        session_key: &str,
        input: Input,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        let mut bot = self.registry.acquire(session_key).await?;

        let text = match input {
            Input::Prompt(prompt) => {
                let text = match bot.ask(&prompt, cancel).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        if matches!(&e, BotError::Protocol(p) if p.is_fatal()) {
                            tracing::error!(
                                session_key,
                                error = %e,
                                "chat hub rejected credentials, refresh the cookie file"
                            );
                        } else {
                            tracing::warn!(
                                session_key,
                                engine = %bot.engine(),
                                error = %e,
                                "ask failed"
                            );
                        }
                        format!("{WARN_PREFIX}{e}")
                    }
                };
                self.registry.persist(&bot).await?;
                text
            }
            Input::Command(Command::Reset) => {
                bot.reset().await;
                self.registry.persist(&bot).await?;
                "Done, I have reset my memory for a new conversation. What would you like to talk about?"
                    .to_string()
            }
            Input::Command(Command::Style(style)) => match bot.set_style(style) {
                Ok(()) => {
                    self.registry.persist(&bot).await?;
                    format!("Done, conversation style is now [{style}].")
                }
                Err(e) => format!("{WARN_PREFIX}{e}"),
            },
            Input::Command(Command::Engine(engine)) => {
                self.registry.switch_engine(&mut bot, engine).await;
                self.registry.persist(&bot).await?;
                engine_switched(engine)
            }
            Input::Command(Command::Info) => bot.describe().to_string(),
            Input::Command(Command::Help) => command::help_text(),
        };

        Ok(text)
    }
}

fn engine_switched(engine: Engine) -> String {
    format!("Done, chat engine is now [{engine}]. Note that I have forgotten our previous conversation.")
}

fn reply_prefix(message: &InboundMessage) -> String {
    if !message.is_group {
        return String::new();
    }
    let name = message
        .sender_name
        .as_deref()
        .unwrap_or(message.sender_id.as_str());
    format!("[bot]@{name}\u{2005}\n\n")
}
