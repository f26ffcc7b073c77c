//! Session subsystem and port trait definitions for relaybot.
//!
//! This crate defines the "ports" (store, chat-hub connector, chat backend)
//! that the infrastructure layer implements, plus everything that runs on top
//! of them: the streaming protocol client, the two bot variants, the session
//! registry and the command dispatcher. It depends only on `relaybot-types`
//! -- never on `relaybot-infra` or any database/IO crate.

pub mod backend;
pub mod bot;
pub mod dispatch;
pub mod protocol;
pub mod session;
pub mod storage;
