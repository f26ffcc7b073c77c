//! CLI command definitions for the `relaybot` binary.

pub mod chat;
pub mod sessions;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Relay chat messages to Bing and OpenAI-compatible engines.
#[derive(Parser)]
#[command(name = "relaybot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Database URL (defaults to `{data_dir}/relaybot.db`).
    #[arg(long, global = true, env = "RELAYBOT_DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server the messaging bridge posts to.
    Serve {
        /// Port to listen on.
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Chat from the terminal as if messages came from `--sender`.
    Chat {
        /// Sender id used as the session key.
        #[arg(long, default_value = "console")]
        sender: String,
    },

    /// Inspect stored sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List all stored sessions.
    #[command(alias = "ls")]
    List,

    /// Show one session's record.
    Show {
        /// Session key (sender id).
        key: String,
    },

    /// Close and delete a session.
    #[command(alias = "rm")]
    Delete {
        /// Session key (sender id).
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["relaybot", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, 8080);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_sessions_delete_alias() {
        let cli = Cli::try_parse_from(["relaybot", "--json", "sessions", "rm", "wxid_1"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Sessions {
                action: SessionsAction::Delete { ref key }
            } if key == "wxid_1"
        ));
    }
}
