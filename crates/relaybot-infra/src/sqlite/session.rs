//! SQLite session store implementation.
//!
//! Implements `SessionStore` from `relaybot-core` using sqlx with split
//! read/write pools. Each record is stored as one JSON document, so an upsert
//! replaces it atomically and a reader sees either the old or the new record.

use chrono::Utc;
use sqlx::Row;

use relaybot_core::storage::SessionStore;
use relaybot_types::error::RepositoryError;
use relaybot_types::session::SessionRecord;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

/// Pool and I/O failures mean the database is unreachable; everything else is a query error.
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            tracing::warn!(error = %e, "session database unavailable");
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

fn decode_record(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, RepositoryError> {
    let json: String = row
        .try_get("record")
        .map_err(map_sqlx_error)?;
    serde_json::from_str(&json)
        .map_err(|e| RepositoryError::Serialization(format!("invalid session record: {e}")))
}

impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_key: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        let row = sqlx::query("SELECT record FROM sessions WHERE session_key = ?")
            .bind(session_key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(decode_record).transpose()
    }

    async fn put(&self, record: &SessionRecord) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO sessions (session_key, engine, record, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (session_key) DO UPDATE SET
                   engine = excluded.engine,
                   record = excluded.record,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&record.session_key)
        .bind(record.engine.as_str())
        .bind(&json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!(
            session_key = %record.session_key,
            engine = %record.engine,
            turn_count = record.turn_count,
            "persisted session"
        );
        Ok(())
    }

    async fn delete(&self, session_key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE session_key = ?")
            .bind(session_key)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT record FROM sessions ORDER BY session_key")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(decode_record).collect()
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        tracing::info!("session store checkpointed");
        Ok(())
    }
}
