//! Application state wiring the session subsystem to its adapters.
//!
//! `AppState` holds the dispatcher and registry used by both the CLI and
//! the webhook server, pinned to the SQLite store, the Bing connector and
//! the OpenAI-compatible backend.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use relaybot_core::backend::{BoxChatBackend, HistoryBudget};
use relaybot_core::bot::Backends;
use relaybot_core::dispatch::Dispatcher;
use relaybot_core::protocol::{BoxChatHubConnector, ProtocolTimeouts, StreamingClient};
use relaybot_core::session::SessionRegistry;
use relaybot_infra::chathub::BingConnector;
use relaybot_infra::config::{load_relay_config, resolve_data_dir, resolve_in_data_dir};
use relaybot_infra::credentials::CookieJar;
use relaybot_infra::llm::OpenAiChatBackend;
use relaybot_infra::sqlite::pool::database_url;
use relaybot_infra::sqlite::{DatabasePool, SqliteSessionStore};
use relaybot_types::config::RelayConfig;

pub type ConcreteRegistry = SessionRegistry<SqliteSessionStore>;
pub type ConcreteDispatcher = Dispatcher<SqliteSessionStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub registry: Arc<ConcreteRegistry>,
    pub config: Arc<RelayConfig>,
    pub data_dir: PathBuf,
    /// Cancelled on shutdown; in-flight asks abort and leave their sequence untouched.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Resolve the data dir, load config, open the database and wire everything.
    pub async fn init(database_url_override: Option<String>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_relay_config(&data_dir).await;

        let db_url = database_url_override
            .unwrap_or_else(|| format!("{}?mode=rwc", database_url(&data_dir)));
        let pool = DatabasePool::new(&db_url).await?;

        Self::build(config, data_dir, pool)
    }

    /// Wire the state from already-resolved parts.
    pub fn build(config: RelayConfig, data_dir: PathBuf, pool: DatabasePool) -> anyhow::Result<Self> {
        let cookie_path = resolve_in_data_dir(&data_dir, &config.streaming.cookie_file);
        let cookies = Arc::new(CookieJar::load(&cookie_path)?);

        let connector = BingConnector::new(&config.streaming, cookies)?;
        let streaming = StreamingClient::new(
            BoxChatHubConnector::new(connector),
            ProtocolTimeouts {
                connect: config.streaming.connect_timeout(),
                ask: config.streaming.ask_timeout(),
            },
        );

        let memory = OpenAiChatBackend::from_env(&config.memory);

        let backends = Backends {
            streaming: Arc::new(streaming),
            memory: Arc::new(BoxChatBackend::new(memory)),
            default_style: config.default_style,
            budget: HistoryBudget::new(
                config.memory.max_input_tokens,
                config.memory.reply_reserve_tokens,
            ),
        };

        let registry = Arc::new(SessionRegistry::new(
            SqliteSessionStore::new(pool),
            backends,
            config.default_engine,
            config.busy_policy,
        ));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), config.stale_after()));

        tracing::debug!(
            data_dir = %data_dir.display(),
            default_engine = %config.default_engine,
            "application state ready"
        );

        Ok(Self {
            dispatcher,
            registry,
            config: Arc::new(config),
            data_dir,
            shutdown: CancellationToken::new(),
        })
    }
}
