//! Conversational engines and conversation styles.
//!
//! The engine tag is stored in every `SessionRecord` and selects which bot
//! variant the registry instantiates. Names match the `/engine` and `/style`
//! command arguments users type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported conversational backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    /// Stateful chat hub reached over a websocket; supports styles.
    #[serde(rename = "bing")]
    Bing,
    /// Stateless chat completion fed the full local turn history.
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Bing, Engine::Gpt35Turbo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Bing => "bing",
            Engine::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    /// Whether this engine has a conversation style parameter.
    pub fn supports_style(&self) -> bool {
        matches!(self, Engine::Bing)
    }

    /// Comma-separated list of valid engine names, for user-facing messages.
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(Engine::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bing" => Ok(Engine::Bing),
            "gpt-3.5-turbo" => Ok(Engine::Gpt35Turbo),
            other => Err(format!("invalid engine: '{other}'")),
        }
    }
}

/// Tone requested from the streaming engine on every ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStyle {
    Creative,
    #[default]
    Balanced,
    Precise,
}

impl ConversationStyle {
    pub const ALL: [ConversationStyle; 3] = [
        ConversationStyle::Creative,
        ConversationStyle::Balanced,
        ConversationStyle::Precise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStyle::Creative => "creative",
            ConversationStyle::Balanced => "balanced",
            ConversationStyle::Precise => "precise",
        }
    }

    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(ConversationStyle::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ConversationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "creative" => Ok(ConversationStyle::Creative),
            "balanced" => Ok(ConversationStyle::Balanced),
            "precise" => Ok(ConversationStyle::Precise),
            other => Err(format!("invalid conversation style: '{other}'")),
        }
    }
}
