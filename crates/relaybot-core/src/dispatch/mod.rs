//! Inbound message handling.
//!
//! - `mention`: strip the mention prefix from group messages
//! - `command`: parse slash commands
//! - `dispatcher`: run a message against the session registry and build the reply

pub mod command;
pub mod dispatcher;
pub mod mention;

pub use command::{Command, Input};
pub use dispatcher::Dispatcher;
