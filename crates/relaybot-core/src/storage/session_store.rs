//! Durable session store trait.

use relaybot_types::error::RepositoryError;
use relaybot_types::session::SessionRecord;

/// Crash-safe mapping from session key to its persisted record.
///
/// Once `put` returns `Ok`, the record must survive a process restart.
/// Writes to different keys must not block each other's reads, and a reader
/// never observes a partially written record.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Get a record by key. Returns None if the key does not exist.
    fn get(
        &self,
        session_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, RepositoryError>> + Send;

    /// Insert or replace the record for `record.session_key`.
    fn put(
        &self,
        record: &SessionRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a record. No-op if the key does not exist.
    fn delete(
        &self,
        session_key: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List every stored record, ordered by key.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<SessionRecord>, RepositoryError>> + Send;

    /// Push buffered writes to stable storage. Called on shutdown.
    fn flush(&self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
