//! Request log inspection and export

use crate::cli::LogsCommand;
use crate::commands::AppContext;
use crate::error::Result;
use crate::logbook::{export_filename, truncate_text, LogKind};

use chrono::Local;
use colored::Colorize;
use std::path::PathBuf;

/// Handle logs commands
pub fn handle_logs(ctx: &AppContext, command: LogsCommand) -> Result<()> {
    match command {
        LogsCommand::Show { limit } => show(ctx, limit),
        LogsCommand::Export { output } => export(ctx, output),
        LogsCommand::Clear => clear(ctx),
    }
}

fn show(ctx: &AppContext, limit: usize) -> Result<()> {
    let entries = ctx.logs.recent(limit);
    if entries.is_empty() {
        println!(
            "{}",
            "No logs yet. Start a conversation to see request logs.".yellow()
        );
        return Ok(());
    }

    println!();
    for entry in entries {
        let kind = match entry.kind {
            LogKind::Success => entry.kind.as_str().to_uppercase().green(),
            LogKind::Error => entry.kind.as_str().to_uppercase().red(),
            LogKind::Cancelled => entry.kind.as_str().to_uppercase().yellow(),
        };
        println!("{}  {}", kind, entry.timestamp.dimmed());

        if let Some(user_message) = &entry.user_message {
            println!("  User:      {}", truncate_text(user_message, 100));
        }
        if let Some(assistant_message) = &entry.assistant_message {
            println!("  Assistant: {}", truncate_text(assistant_message, 100));
        }
        if let Some(model) = &entry.model {
            println!("  Model:     {}", model);
        }
        if let Some(error) = &entry.error {
            println!("  Error:     {}", error.red());
        }
        if let (Some(duration), Some(attempt)) = (entry.duration, entry.attempt) {
            println!("  {}ms, attempt {}", duration, attempt);
        }
        println!();
    }
    Ok(())
}

fn export(ctx: &AppContext, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(Local::now())));
    std::fs::write(&path, ctx.logs.export_text())?;
    println!("{}", format!("Logs exported to {}", path.display()).green());
    Ok(())
}

fn clear(ctx: &AppContext) -> Result<()> {
    ctx.logs.clear()?;
    println!("{}", "Logs cleared".green());
    Ok(())
}
