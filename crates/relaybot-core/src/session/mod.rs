//! Session registry: one live bot per session key, backed by the durable store.

pub mod registry;

pub use registry::{SessionGuard, SessionRegistry};
