//! Storage abstractions for relaybot.
//!
//! Defines the durable session store port. Implementations live in
//! relaybot-infra.

pub mod session_store;

pub use session_store::SessionStore;
