//! Terminal chat loop.
//!
//! Reads lines from stdin and dispatches each as a direct message from
//! `sender`, so commands and both engines can be tried without a bridge.

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use relaybot_types::error::DispatchError;
use relaybot_types::message::InboundMessage;

use crate::state::AppState;

pub async fn run(state: &AppState, sender: &str) -> Result<()> {
    println!();
    println!(
        "  {} Chatting as {}. Type {} for commands, Ctrl+D to quit.",
        style("⚡").bold(),
        style(sender).cyan().bold(),
        style("/help").yellow()
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("{} ", style(">").green().bold());

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                state.shutdown.cancel();
                None
            }
        };
        let Some(line) = line else { break };

        let message = InboundMessage::direct(sender, line);
        let cancel = state.shutdown.child_token();

        // Ctrl+C during an ask cancels that ask; the bot still gets to settle.
        let handle = state.dispatcher.handle(&message, &cancel);
        tokio::pin!(handle);
        let handled = tokio::select! {
            result = &mut handle => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                handle.await
            }
        };

        match handled {
            Ok(Some(reply)) => {
                println!();
                for text_line in reply.text.lines() {
                    println!("  {text_line}");
                }
                println!();
            }
            Ok(None) => {}
            Err(DispatchError::SessionBusy(key)) => {
                println!("  {} session {key} is busy", style("!").yellow().bold());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    Ok(())
}
