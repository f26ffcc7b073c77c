//! Memory-engine backends.

pub mod openai;

pub use openai::OpenAiChatBackend;
