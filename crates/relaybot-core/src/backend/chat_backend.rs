//! ChatBackend trait definition.

use relaybot_types::error::BackendError;
use relaybot_types::session::Turn;

/// A stateless chat-completion service.
///
/// The caller owns the conversation: every call receives the full prior
/// history plus the new prompt, and nothing is retained between calls.
/// Implementations live in relaybot-infra (e.g., `OpenAiChatBackend`).
pub trait ChatBackend: Send + Sync {
    /// Model identifier reported in logs (e.g., "gpt-3.5-turbo").
    fn name(&self) -> &str;

    /// Input window of the model, in tokens.
    fn max_input_tokens(&self) -> u32;

    /// Produce the assistant reply to `prompt` given the earlier turns.
    fn complete(
        &self,
        history: &[Turn],
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send;
}
