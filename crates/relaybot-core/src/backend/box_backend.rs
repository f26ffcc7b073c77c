//! BoxChatBackend -- object-safe dynamic dispatch wrapper for ChatBackend.

use std::future::Future;
use std::pin::Pin;

use relaybot_types::error::BackendError;
use relaybot_types::session::Turn;

use super::chat_backend::ChatBackend;

/// Object-safe version of [`ChatBackend`] with boxed futures.
pub trait ChatBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn max_input_tokens(&self) -> u32;

    fn complete_boxed<'a>(
        &'a self,
        history: &'a [Turn],
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;
}

impl<T: ChatBackend> ChatBackendDyn for T {
    fn name(&self) -> &str {
        ChatBackend::name(self)
    }

    fn max_input_tokens(&self) -> u32 {
        ChatBackend::max_input_tokens(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        history: &'a [Turn],
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        Box::pin(self.complete(history, prompt))
    }
}

/// Type-erased chat backend, so the engine can be picked from config at runtime.
pub struct BoxChatBackend {
    inner: Box<dyn ChatBackendDyn>,
}

impl BoxChatBackend {
    pub fn new<T: ChatBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn max_input_tokens(&self) -> u32 {
        self.inner.max_input_tokens()
    }

    pub async fn complete(&self, history: &[Turn], prompt: &str) -> Result<String, BackendError> {
        self.inner.complete_boxed(history, prompt).await
    }
}
