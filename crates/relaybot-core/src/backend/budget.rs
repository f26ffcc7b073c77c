//! Token budget for the memory engine's turn buffer.
//!
//! Token counts are estimated at ~4 characters per token plus a fixed
//! per-message overhead for role markers. The usable input is the model
//! window minus the tokens reserved for the reply.

use relaybot_types::session::Turn;

const CHARS_PER_TOKEN: f64 = 4.0;
const MESSAGE_OVERHEAD_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct HistoryBudget {
    pub max_input_tokens: u32,
    pub reply_reserve_tokens: u32,
}

impl HistoryBudget {
    pub fn new(max_input_tokens: u32, reply_reserve_tokens: u32) -> Self {
        Self {
            max_input_tokens,
            reply_reserve_tokens,
        }
    }

    /// Tokens available to history plus the new prompt.
    pub fn limit(&self) -> u32 {
        self.max_input_tokens.saturating_sub(self.reply_reserve_tokens)
    }

    pub fn estimate_text(text: &str) -> u32 {
        let chars = text.chars().count();
        (chars as f64 / CHARS_PER_TOKEN).ceil() as u32 + MESSAGE_OVERHEAD_TOKENS
    }

    /// Estimated input size of sending `prompt` after `history`.
    pub fn estimate(history: &[Turn], prompt: &str) -> u32 {
        history
            .iter()
            .map(|t| Self::estimate_text(&t.content))
            .sum::<u32>()
            + Self::estimate_text(prompt)
    }

    /// `Err(requested)` when the request would not fit.
    pub fn check(&self, history: &[Turn], prompt: &str) -> Result<u32, u32> {
        let requested = Self::estimate(history, prompt);
        if requested > self.limit() {
            Err(requested)
        } else {
            Ok(requested)
        }
    }
}

impl Default for HistoryBudget {
    fn default() -> Self {
        Self::new(4096, 1024)
    }
}
