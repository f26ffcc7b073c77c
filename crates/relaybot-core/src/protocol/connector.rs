//! ChatHubConnector port and its object-safe wrapper.
//!
//! The infrastructure layer implements `ChatHubConnector` over HTTP and a
//! websocket; tests implement it over in-memory scripted channels. Because
//! the trait uses RPITIT it is not object safe, so `BoxChatHubConnector`
//! erases it the same way `BoxChatBackend` does for backends.

use std::future::Future;
use std::pin::Pin;

use futures_util::{Sink, Stream};

use relaybot_types::conversation::ConversationContext;
use relaybot_types::error::ProtocolError;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = ProtocolError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ProtocolError>> + Send>>;

/// A bidirectional text-frame channel to the chat hub.
///
/// Each item on `stream` is one raw websocket text message, which may carry
/// several record-separated frames. Dropping the channel releases the
/// underlying transport.
pub struct FrameChannel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl FrameChannel {
    pub fn new(
        sink: impl Sink<String, Error = ProtocolError> + Send + 'static,
        stream: impl Stream<Item = Result<String, ProtocolError>> + Send + 'static,
    ) -> Self {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl std::fmt::Debug for FrameChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameChannel").finish_non_exhaustive()
    }
}

/// Transport to the remote chat hub.
pub trait ChatHubConnector: Send + Sync {
    /// Establish a new remote conversation using the configured credentials.
    ///
    /// Must fail with `ProtocolError::Authentication` when the credentials
    /// are missing or refused.
    fn create_conversation(
        &self,
    ) -> impl Future<Output = Result<ConversationContext, ProtocolError>> + Send;

    /// Open a fresh frame channel for one ask.
    fn open_channel(&self) -> impl Future<Output = Result<FrameChannel, ProtocolError>> + Send;
}

/// Object-safe version of [`ChatHubConnector`] with boxed futures.
pub trait ChatHubConnectorDyn: Send + Sync {
    fn create_conversation_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ConversationContext, ProtocolError>> + Send + '_>>;

    fn open_channel_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<FrameChannel, ProtocolError>> + Send + '_>>;
}

impl<T: ChatHubConnector> ChatHubConnectorDyn for T {
    fn create_conversation_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ConversationContext, ProtocolError>> + Send + '_>> {
        Box::pin(self.create_conversation())
    }

    fn open_channel_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<FrameChannel, ProtocolError>> + Send + '_>> {
        Box::pin(self.open_channel())
    }
}

/// Type-erased chat-hub connector.
pub struct BoxChatHubConnector {
    inner: Box<dyn ChatHubConnectorDyn>,
}

impl BoxChatHubConnector {
    pub fn new<T: ChatHubConnector + 'static>(connector: T) -> Self {
        Self {
            inner: Box::new(connector),
        }
    }

    pub async fn create_conversation(&self) -> Result<ConversationContext, ProtocolError> {
        self.inner.create_conversation_boxed().await
    }

    pub async fn open_channel(&self) -> Result<FrameChannel, ProtocolError> {
        self.inner.open_channel_boxed().await
    }
}
