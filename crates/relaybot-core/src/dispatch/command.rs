//! Slash command parsing.
//!
//! A leading `/` marks a control command; anything else is a prompt passed
//! verbatim to the bot.

use relaybot_types::engine::{ConversationStyle, Engine};
use relaybot_types::error::CommandError;

/// Control commands understood by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new conversation with the same engine.
    Reset,
    /// Change the conversation style (streaming engine only).
    Style(ConversationStyle),
    /// Report the session summary.
    Info,
    /// List the commands.
    Help,
    /// Switch to another engine, discarding the conversation.
    Engine(Engine),
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Prompt(String),
}

/// Parse message content into a command or a prompt.
pub fn parse(content: &str) -> Result<Input, CommandError> {
    let trimmed = content.trim();
    if !trimmed.starts_with('/') {
        return Ok(Input::Prompt(content.to_string()));
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or_default();

    let command = match cmd.as_str() {
        "/reset" => Command::Reset,
        "/info" => Command::Info,
        "/help" => Command::Help,
        "/style" => Command::Style(arg.parse().map_err(|_| CommandError::InvalidStyle {
            value: arg.to_string(),
        })?),
        "/engine" => Command::Engine(arg.parse().map_err(|_| CommandError::InvalidEngine {
            value: arg.to_string(),
        })?),
        _ => return Err(CommandError::InvalidCommand(trimmed.to_string())),
    };
    Ok(Input::Command(command))
}

/// Help text listing every command with its valid choices.
pub fn help_text() -> String {
    [
        "/info: show this session's engine, style and turn count.".to_string(),
        format!(
            "/style <value>: set the conversation style (streaming engine only), valid choices are: {}.",
            ConversationStyle::choices()
        ),
        format!(
            "/engine <value>: switch the chat engine, valid choices are: {}.",
            Engine::choices()
        ),
        "/reset: forget the conversation and start over.".to_string(),
        "/help: show this message.".to_string(),
    ]
    .join("\n")
}
