//! Session inspection CLI commands: list, show, delete.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use relaybot_core::storage::SessionStore;
use relaybot_types::session::EngineState;

use crate::state::AppState;

/// List stored sessions with engine, style, turns and last update.
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let records = state.registry.store().list().await?;

    if json {
        let infos = state.registry.list().await?;
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Start one with: {}",
            style("i").blue().bold(),
            style("relaybot chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Engine").fg(Color::White),
        Cell::new("Style").fg(Color::White),
        Cell::new("Turns").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for record in &records {
        let style_cell = record
            .style
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&record.session_key).fg(Color::Cyan),
            Cell::new(record.engine),
            Cell::new(style_cell),
            Cell::new(record.turn_count),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} session(s)", style(records.len()).bold());
    Ok(())
}

/// Show one stored session in detail.
pub async fn show_session(state: &AppState, key: &str, json: bool) -> Result<()> {
    let Some(record) = state.registry.store().get(key).await? else {
        bail!("Session '{key}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!();
    println!("  {}    {}", style("Session").dim(), style(&record.session_key).cyan().bold());
    println!("  {}     {}", style("Engine").dim(), record.engine);
    if let Some(s) = record.style {
        println!("  {}      {s}", style("Style").dim());
    }
    println!("  {}      {}", style("Turns").dim(), record.turn_count);
    println!(
        "  {}    {}",
        style("Updated").dim(),
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    match &record.state {
        Some(EngineState::Streaming { context: Some(ctx) }) => {
            println!(
                "  {} {} (sequence {})",
                style("Conversation").dim(),
                ctx.conversation_id,
                ctx.invocation_sequence
            );
        }
        Some(EngineState::Memory { turns }) => {
            println!("  {}    {} turn(s) kept", style("History").dim(), turns.len());
        }
        Some(EngineState::Streaming { context: None }) | None => {
            println!("  {}      {}", style("State").dim(), style("fresh").dim());
        }
    }
    println!();
    Ok(())
}

/// Close and delete one session.
pub async fn delete_session(state: &AppState, key: &str, json: bool) -> Result<()> {
    let existed = state.registry.evict(key).await?;
    if !existed {
        bail!("Session '{key}' not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": key }));
    } else {
        println!(
            "  {} Deleted session {}",
            style("✓").green().bold(),
            style(key).cyan()
        );
    }
    Ok(())
}
