//! Shared domain types for relaybot.
//!
//! This crate contains the core domain types used across the relay:
//! engines, conversation styles, remote conversation contexts, persisted
//! session records, inbound/outbound messages, configuration and the error
//! taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod message;
pub mod session;
