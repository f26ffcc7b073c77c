//! Stateless completion backends used by the memory engine.
//!
//! - `chat_backend`: `ChatBackend` trait (RPITIT)
//! - `box_backend`: `BoxChatBackend` type-erased wrapper
//! - `budget`: `HistoryBudget` token estimate for the turn buffer

pub mod box_backend;
pub mod budget;
pub mod chat_backend;

pub use box_backend::BoxChatBackend;
pub use budget::HistoryBudget;
pub use chat_backend::ChatBackend;
