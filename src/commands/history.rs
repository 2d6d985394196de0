//! Saved-conversation management and table export

use crate::cli::HistoryCommand;
use crate::commands::{resolve_conversation_id, AppContext};
use crate::conversations::MessageRole;
use crate::error::{ChatwireError, Result};
use crate::render::{extract_tables, render_message, TableData};
use crate::spreadsheet;

use chrono::Local;
use colored::Colorize;
use prettytable::{format, row, Table};
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Handle history commands
pub fn handle_history(ctx: &AppContext, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => list(ctx),
        HistoryCommand::Show { id } => show(ctx, &id),
        HistoryCommand::Delete { id } => delete(ctx, &id),
        HistoryCommand::DeleteAll { yes } => delete_all(ctx, yes),
        HistoryCommand::Pin { id } => pin(ctx, &id),
        HistoryCommand::Archive { id } => archive(ctx, &id),
        HistoryCommand::Rename { id, title } => rename(ctx, &id, &title),
        HistoryCommand::ExportTable {
            id,
            message,
            output,
        } => export_table(ctx, &id, message, output),
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    let conversations = ctx.conversations.list();
    if conversations.is_empty() {
        println!("{}", "No saved conversations.".yellow());
        return Ok(());
    }

    let (active, archived): (Vec<_>, Vec<_>) =
        conversations.into_iter().partition(|c| !c.archived);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold(),
        "".bold()
    ]);

    for conversation in &active {
        let id_short = &conversation.id[..conversation.id.len().min(13)];
        let title = if conversation.title.chars().count() > 40 {
            let short: String = conversation.title.chars().take(37).collect();
            format!("{}...", short)
        } else {
            conversation.title.clone()
        };
        let updated = conversation
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let marker = if conversation.pinned { "pinned" } else { "" };

        table.add_row(row![
            id_short.cyan(),
            title,
            conversation.messages.len(),
            updated,
            marker
        ]);
    }

    println!("\nConversations:");
    table.printstd();

    if !archived.is_empty() {
        println!("\nArchived ({}):", archived.len());
        for conversation in &archived {
            let id_short = &conversation.id[..conversation.id.len().min(13)];
            println!("  {}  {}", id_short.cyan(), conversation.title);
        }
    }

    println!();
    println!("Use {} to resume a conversation.", "chatwire chat".cyan());
    println!();
    Ok(())
}

fn show(ctx: &AppContext, id_or_prefix: &str) -> Result<()> {
    let Some(conversation) = resolve_conversation_id(&ctx.conversations, id_or_prefix)
        .and_then(|id| ctx.conversations.get(&id))
    else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    println!("\n{}\n", conversation.title.bold());
    for message in &conversation.messages {
        match message.role {
            MessageRole::User => println!("{} {}", "you>".cyan(), message.content),
            MessageRole::Assistant => println!("{}", render_message(&message.content)),
        }
    }
    Ok(())
}

fn delete(ctx: &AppContext, id_or_prefix: &str) -> Result<()> {
    let Some(id) = resolve_conversation_id(&ctx.conversations, id_or_prefix) else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    ctx.conversations.delete(&id)?;
    println!("{}", format!("Deleted conversation {}", id).green());
    Ok(())
}

fn delete_all(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        let mut rl = DefaultEditor::new()?;
        let answer = rl
            .readline("Delete ALL conversations? This cannot be undone. [y/N] ")
            .unwrap_or_default();
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.conversations.delete_all()?;
    println!("{}", "All conversations deleted.".green());
    Ok(())
}

fn pin(ctx: &AppContext, id_or_prefix: &str) -> Result<()> {
    let Some(id) = resolve_conversation_id(&ctx.conversations, id_or_prefix) else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    ctx.conversations.toggle_pin(&id)?;
    let pinned = ctx.conversations.get(&id).map(|c| c.pinned).unwrap_or(false);
    println!(
        "{}",
        format!("Conversation {} {}", id, if pinned { "pinned" } else { "unpinned" }).green()
    );
    Ok(())
}

fn archive(ctx: &AppContext, id_or_prefix: &str) -> Result<()> {
    let Some(id) = resolve_conversation_id(&ctx.conversations, id_or_prefix) else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    ctx.conversations.toggle_archive(&id)?;
    let archived = ctx
        .conversations
        .get(&id)
        .map(|c| c.archived)
        .unwrap_or(false);
    println!(
        "{}",
        format!(
            "Conversation {} {}",
            id,
            if archived { "archived" } else { "unarchived" }
        )
        .green()
    );
    Ok(())
}

fn rename(ctx: &AppContext, id_or_prefix: &str, title: &str) -> Result<()> {
    let Some(id) = resolve_conversation_id(&ctx.conversations, id_or_prefix) else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    if ctx.conversations.rename(&id, title)? {
        let stored = ctx.conversations.get(&id).map(|c| c.title).unwrap_or_default();
        println!("{}", format!("Renamed to '{}'", stored).green());
    } else {
        println!("{}", "Title cannot be empty.".yellow());
    }
    Ok(())
}

fn export_table(
    ctx: &AppContext,
    id_or_prefix: &str,
    message_index: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let Some(conversation) = resolve_conversation_id(&ctx.conversations, id_or_prefix)
        .and_then(|id| ctx.conversations.get(&id))
    else {
        println!("{}", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return Ok(());
    };

    let table = find_table(&conversation.messages, message_index).ok_or_else(|| {
        ChatwireError::Config("no table found in that conversation's messages".into())
    })?;

    let path = output.unwrap_or_else(|| PathBuf::from(spreadsheet::export_filename(Local::now())));
    spreadsheet::write_table(&table, &path)?;
    println!("{}", format!("Exported table to {}", path.display()).green());
    Ok(())
}

/// Pick the table to export: from the addressed message, or the last table
/// anywhere in the conversation when no index is given.
fn find_table(
    messages: &[crate::conversations::StoredMessage],
    message_index: Option<usize>,
) -> Option<TableData> {
    match message_index {
        Some(index) => messages
            .get(index)
            .and_then(|m| extract_tables(&m.content).into_iter().last()),
        None => messages
            .iter()
            .rev()
            .find_map(|m| extract_tables(&m.content).into_iter().last()),
    }
}
