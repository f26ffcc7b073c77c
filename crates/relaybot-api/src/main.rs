//! relaybot CLI and webhook server entry point.
//!
//! Binary name: `relaybot`
//!
//! Parses CLI arguments, initializes tracing, the database and the session
//! registry, then runs the requested command. Every command ends by closing
//! live bots and checkpointing the store.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use relaybot_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, SessionsAction};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    options.enable_otel = cli.otel;
    if cli.log_json {
        options.format = LogFormat::Json;
    }
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "relaybot", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.database_url.clone()).await?;

    let result = match cli.command {
        Commands::Serve { host, port } => serve(&state, &host, port).await,
        Commands::Chat { sender } => cli::chat::run(&state, &sender).await,
        Commands::Sessions { action } => match action {
            SessionsAction::List => cli::sessions::list_sessions(&state, cli.json).await,
            SessionsAction::Show { key } => cli::sessions::show_session(&state, &key, cli.json).await,
            SessionsAction::Delete { key } => {
                cli::sessions::delete_session(&state, &key, cli.json).await
            }
        },
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    state.registry.shutdown().await?;
    shutdown_tracing();
    result
}

async fn serve(state: &AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} relaybot listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight asks.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown requested");
    token.cancel();
}
