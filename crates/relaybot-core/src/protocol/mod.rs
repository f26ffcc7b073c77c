//! Streaming chat-hub protocol.
//!
//! - `frame`: record-separated JSON frame codec (handshake, request, partial/final frames)
//! - `connector`: `ChatHubConnector` port the infrastructure implements (create + open channel)
//! - `client`: `StreamingClient` driving authenticate / ask / close over a connector

pub mod client;
pub mod connector;
pub mod frame;

pub use client::{ProtocolSession, ProtocolTimeouts, SessionState, StreamingClient};
pub use connector::{BoxChatHubConnector, ChatHubConnector, FrameChannel};
