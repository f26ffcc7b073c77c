//! Memory variant: a bot that keeps the whole dialogue locally and replays
//! it to a stateless backend on every ask.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use relaybot_types::engine::Engine;
use relaybot_types::error::{BotError, ProtocolError};
use relaybot_types::session::Turn;

use crate::backend::{BoxChatBackend, HistoryBudget};

pub struct MemoryBot {
    session_key: String,
    turn_count: u32,
    turns: Vec<Turn>,
    backend: Arc<BoxChatBackend>,
    budget: HistoryBudget,
}

impl MemoryBot {
    pub fn new(
        session_key: impl Into<String>,
        backend: Arc<BoxChatBackend>,
        budget: HistoryBudget,
    ) -> Self {
        Self::restore(session_key, 0, Vec::new(), backend, budget)
    }

    pub fn restore(
        session_key: impl Into<String>,
        turn_count: u32,
        turns: Vec<Turn>,
        backend: Arc<BoxChatBackend>,
        budget: HistoryBudget,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            turn_count,
            turns,
            backend,
            budget,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn engine(&self) -> Engine {
        Engine::Gpt35Turbo
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub async fn ask(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, BotError> {
        let limit = self.budget.limit();
        self.budget
            .check(&self.turns, prompt)
            .map_err(|requested| BotError::CapacityExceeded { limit, requested })?;

        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProtocolError::Cancelled.into()),
            result = self.backend.complete(&self.turns, prompt) => result?,
        };

        self.turns.push(Turn::user(prompt));
        self.turns.push(Turn::assistant(answer.clone()));
        self.turn_count += 1;
        tracing::debug!(
            backend = self.backend.name(),
            turns = self.turns.len(),
            "memory bot answered"
        );
        Ok(answer)
    }

    pub fn reset(&mut self) {
        self.turns.clear();
        self.turn_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use relaybot_types::error::BackendError;

    use super::*;
    use crate::backend::ChatBackend;

    struct Counting;

    impl ChatBackend for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn max_input_tokens(&self) -> u32 {
            4096
        }

        async fn complete(&self, history: &[Turn], prompt: &str) -> Result<String, BackendError> {
            Ok(format!("#{} {prompt}", history.len() / 2 + 1))
        }
    }

    fn bot(budget: HistoryBudget) -> MemoryBot {
        MemoryBot::new("alice", Arc::new(BoxChatBackend::new(Counting)), budget)
    }

    #[tokio::test]
    async fn test_ask_appends_turns() {
        let mut bot = bot(HistoryBudget::default());
        let cancel = CancellationToken::new();
        assert_eq!(bot.ask("one", &cancel).await.unwrap(), "#1 one");
        assert_eq!(bot.ask("two", &cancel).await.unwrap(), "#2 two");
        assert_eq!(bot.turn_count(), 2);
        assert_eq!(bot.turns().len(), 4);
        assert_eq!(bot.turns()[2], Turn::user("two"));
    }

    #[tokio::test]
    async fn test_capacity_exceeded_leaves_history() {
        let mut bot = bot(HistoryBudget::new(40, 10));
        let cancel = CancellationToken::new();
        bot.ask("short", &cancel).await.unwrap();

        let err = bot.ask(&"x".repeat(200), &cancel).await.unwrap_err();
        assert!(matches!(err, BotError::CapacityExceeded { limit: 30, .. }));
        assert_eq!(bot.turn_count(), 1);
        assert_eq!(bot.turns().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_ask_changes_nothing() {
        let mut bot = bot(HistoryBudget::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bot.ask("hi", &cancel).await.unwrap_err();
        assert!(matches!(err, BotError::Protocol(ProtocolError::Cancelled)));
        assert!(bot.turns().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_turns() {
        let mut bot = bot(HistoryBudget::default());
        bot.ask("hi", &CancellationToken::new()).await.unwrap();
        bot.reset();
        assert_eq!(bot.turn_count(), 0);
        assert!(bot.turns().is_empty());
    }
}
