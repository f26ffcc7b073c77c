//! SessionRegistry -- owns the live bots and their persistence.
//!
//! Live bots sit in a `DashMap` keyed by session key, each behind its own
//! async mutex. The mutex serializes work on one session while different
//! sessions run fully concurrently; the map shard locks are never held
//! across an await.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use relaybot_types::config::BusyPolicy;
use relaybot_types::engine::Engine;
use relaybot_types::error::{DispatchError, RepositoryError};
use relaybot_types::session::SessionInfo;

use crate::bot::{Backends, Bot};
use crate::storage::SessionStore;

/// Exclusive access to one session's bot.
pub type SessionGuard = OwnedMutexGuard<Bot>;

pub struct SessionRegistry<S: SessionStore> {
    store: S,
    backends: Backends,
    default_engine: Engine,
    busy_policy: BusyPolicy,
    live: DashMap<String, Arc<Mutex<Bot>>>,
}

impl<S: SessionStore> SessionRegistry<S> {
    pub fn new(store: S, backends: Backends, default_engine: Engine, busy_policy: BusyPolicy) -> Self {
        Self {
            store,
            backends,
            default_engine,
            busy_policy,
            live: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_engine(&self) -> Engine {
        self.default_engine
    }

    /// Number of bots currently held in memory.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Return the live bot for `session_key`, restoring or creating it first.
    ///
    /// Lookup order: live map, then the durable store, then a fresh bot of
    /// the default engine. Concurrent callers for the same key always end up
    /// sharing a single instance.
    pub async fn get_or_create(
        &self,
        session_key: &str,
    ) -> Result<Arc<Mutex<Bot>>, RepositoryError> {
        if let Some(entry) = self.live.get(session_key) {
            return Ok(Arc::clone(entry.value()));
        }

        let bot = match self.store.get(session_key).await? {
            Some(record) => {
                tracing::debug!(session_key, engine = %record.engine, "restoring session");
                Bot::deserialize(record, &self.backends)
            }
            None => {
                tracing::info!(session_key, engine = %self.default_engine, "creating session");
                self.backends.create(session_key, self.default_engine)
            }
        };

        let handle = self
            .live
            .entry(session_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(bot)));
        Ok(Arc::clone(handle.value()))
    }

    /// Lock the session's bot according to the busy policy.
    ///
    /// A bot evicted while the caller waited on its lock is never handed out;
    /// the lookup is retried against the current map entry instead.
    pub async fn acquire(&self, session_key: &str) -> Result<SessionGuard, DispatchError> {
        loop {
            let handle = self.get_or_create(session_key).await?;
            let guard = match self.busy_policy {
                BusyPolicy::Queue => Arc::clone(&handle).lock_owned().await,
                BusyPolicy::Reject => Arc::clone(&handle)
                    .try_lock_owned()
                    .map_err(|_| DispatchError::SessionBusy(session_key.to_string()))?,
            };
            if self.is_current(session_key, &handle) {
                return Ok(guard);
            }
            tracing::debug!(session_key, "session evicted while waiting, retrying");
        }
    }

    fn is_current(&self, session_key: &str, handle: &Arc<Mutex<Bot>>) -> bool {
        self.live
            .get(session_key)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle))
    }

    /// Move `bot` to `engine`.
    ///
    /// The same engine resets the conversation in place. A different engine
    /// closes the current bot and replaces it with a fresh one under the same
    /// key; nothing from the old conversation survives.
    pub async fn switch_engine(&self, bot: &mut Bot, engine: Engine) {
        if bot.engine() == engine {
            bot.reset().await;
            return;
        }

        tracing::info!(
            session_key = %bot.session_key(),
            from = %bot.engine(),
            to = %engine,
            "switching engine"
        );
        bot.close().await;
        let replacement = self.backends.create(bot.session_key(), engine);
        *bot = replacement;
    }

    /// Write the bot's current state to the durable store.
    ///
    /// The record is taken before the returned future is created, so the
    /// future does not borrow the (non-`Sync`) bot across the await.
    pub fn persist(
        &self,
        bot: &Bot,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send + '_ {
        let record = bot.serialize();
        async move { self.store.put(&record).await }
    }

    /// Close and forget a session, live and stored. Returns whether it existed.
    ///
    /// The bot's lock is held from close until the map entry is gone, so an
    /// in-flight message finishes first and later ones start a fresh bot.
    pub async fn evict(&self, session_key: &str) -> Result<bool, RepositoryError> {
        let was_live = self.live.contains_key(session_key);
        if !was_live && self.store.get(session_key).await?.is_none() {
            return Ok(false);
        }

        let handle = self.get_or_create(session_key).await?;
        let mut bot = Arc::clone(&handle).lock_owned().await;
        bot.close().await;

        let stored = self.store.get(session_key).await?.is_some();
        if stored {
            self.store.delete(session_key).await?;
        }
        self.live
            .remove_if(session_key, |_, current| Arc::ptr_eq(current, &handle));
        drop(bot);

        tracing::info!(session_key, "evicted session");
        Ok(was_live || stored)
    }

    /// Summary of one session, preferring the live bot over the stored record.
    pub async fn info(&self, session_key: &str) -> Result<Option<SessionInfo>, RepositoryError> {
        let handle = self.live.get(session_key).map(|e| Arc::clone(e.value()));
        if let Some(handle) = handle {
            return Ok(Some(handle.lock().await.describe()));
        }
        Ok(self
            .store
            .get(session_key)
            .await?
            .map(|record| SessionInfo::from(&record)))
    }

    /// Summaries of every stored session.
    pub async fn list(&self) -> Result<Vec<SessionInfo>, RepositoryError> {
        let records = self.store.list().await?;
        Ok(records.iter().map(SessionInfo::from).collect())
    }

    /// Close every live bot, then flush the store.
    pub async fn shutdown(&self) -> Result<(), RepositoryError> {
        let handles: Vec<_> = self
            .live
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        tracing::info!(count = handles.len(), "closing live sessions");

        for handle in handles {
            handle.lock().await.close().await;
        }
        self.live.clear();
        self.store.flush().await
    }
}
