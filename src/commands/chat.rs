//! Interactive chat session
//!
//! Runs a readline loop that feeds user input through the send pipeline,
//! renders replies with simulated streaming, and supports a handful of
//! slash commands. Ctrl-C during a send cancels the in-flight request
//! cooperatively; at the prompt it is ignored.

use crate::commands::AppContext;
use crate::conversations::MessageRole;
use crate::credentials::{CredentialPrompter, Credentials, PromptedCredentials};
use crate::error::{ChatwireError, Result};
use crate::pipeline::{ChatSurface, SendPipeline, SubmitOutcome, ToastKind};
use crate::render::{extract_tables, render_table};
use crate::webhook::WebhookClient;

use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;

/// Start the interactive chat session.
pub async fn run_chat(ctx: AppContext, url_override: Option<String>) -> Result<()> {
    let mut webhook_config = ctx.config.webhook.clone();
    webhook_config.url = url_override.unwrap_or_else(|| ctx.webhook_url());

    url::Url::parse(&webhook_config.url).map_err(|e| {
        ChatwireError::Config(format!("invalid webhook URL '{}': {}", webhook_config.url, e))
    })?;

    let client = WebhookClient::new(
        webhook_config,
        ctx.credentials.clone(),
        ctx.logs.clone(),
    )?;

    let mut pipeline = SendPipeline::new(
        client,
        ctx.credentials.clone(),
        ctx.conversations.clone(),
        Arc::new(ReadlinePrompter),
        ctx.config.chat.clone(),
    );
    let mut surface = TerminalSurface::default();

    println!();
    println!("{}", "Chatwire".bold());
    println!("Type a message, or /help for commands. Ctrl-C cancels a send.\n");

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(&format!("{} ", "you>".cyan())) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed {
                    "/quit" | "/exit" => break,
                    "/help" => {
                        print_help();
                        continue;
                    }
                    "/new" => {
                        pipeline.new_chat();
                        println!("{}\n", "Started a new conversation.".green());
                        continue;
                    }
                    "/history" => {
                        print_recent(&ctx);
                        continue;
                    }
                    "/delete" => {
                        // Deleting the active conversation starts a new
                        // empty one.
                        let id = pipeline.session().conversation_id.clone();
                        if let Err(e) = ctx.conversations.delete(&id) {
                            tracing::warn!("Failed to delete conversation: {}", e);
                        }
                        pipeline.new_chat();
                        println!("{}\n", "Conversation deleted.".green());
                        continue;
                    }
                    "/retry" => {
                        let Some(last) = pipeline.last_user_message().map(str::to_string) else {
                            println!("{}\n", "Nothing to retry yet.".yellow());
                            continue;
                        };
                        submit(&mut pipeline, &last, &mut surface).await?;
                        continue;
                    }
                    _ => {}
                }

                if let Some(id) = trimmed.strip_prefix("/open ") {
                    open_conversation(&ctx, &mut pipeline, id.trim(), &mut surface);
                    continue;
                }
                if trimmed.starts_with('/') {
                    println!("{}\n", format!("Unknown command: {}", trimmed).yellow());
                    continue;
                }

                submit(&mut pipeline, trimmed, &mut surface).await?;
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "(use /quit to exit)".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Drive one submit to completion, translating Ctrl-C into a cooperative
/// cancellation of the in-flight request.
async fn submit(
    pipeline: &mut SendPipeline,
    message: &str,
    surface: &mut TerminalSurface,
) -> Result<()> {
    let cancel = pipeline.cancel_handle();
    let submit = pipeline.submit(message, surface);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome?,
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    cancel.cancel();
                }
            }
        }
    };

    if outcome == SubmitOutcome::Cancelled {
        eprintln!("{}", "Generation stopped".red());
    }
    println!();
    Ok(())
}

fn open_conversation(
    ctx: &AppContext,
    pipeline: &mut SendPipeline,
    id_or_prefix: &str,
    surface: &mut TerminalSurface,
) {
    let Some(id) = crate::commands::resolve_conversation_id(&ctx.conversations, id_or_prefix)
    else {
        println!("{}\n", format!("No conversation matches '{}'", id_or_prefix).yellow());
        return;
    };

    if !pipeline.open_conversation(&id) {
        println!("{}\n", "Could not open that conversation.".yellow());
        return;
    }

    println!();
    for message in pipeline.transcript().to_vec() {
        match message.role {
            MessageRole::User => println!("{} {}", "you>".cyan(), message.content),
            MessageRole::Assistant => {
                surface.assistant_replay(&message.content);
            }
        }
    }
    println!();
}

fn print_recent(ctx: &AppContext) {
    let conversations = ctx.conversations.list();
    if conversations.is_empty() {
        println!("{}\n", "No saved conversations.".yellow());
        return;
    }

    println!();
    for conversation in conversations.iter().take(10) {
        let marker = if conversation.pinned { "*" } else { " " };
        println!(
            "{} {}  {}",
            marker,
            conversation.id[..conversation.id.len().min(13)].cyan(),
            conversation.title
        );
    }
    println!("\nUse {} to resume one.\n", "/open <id>".cyan());
}

fn print_help() {
    println!();
    println!("  /new        start a new conversation");
    println!("  /open <id>  resume a saved conversation");
    println!("  /history    list recent conversations");
    println!("  /retry      resend the last message");
    println!("  /delete     delete this conversation and start fresh");
    println!("  /quit       exit");
    println!();
}

/// Credential prompt backed by readline.
struct ReadlinePrompter;

#[async_trait]
impl CredentialPrompter for ReadlinePrompter {
    async fn prompt(
        &self,
        existing: Option<&Credentials>,
    ) -> Result<Option<PromptedCredentials>> {
        let seed_username = existing.map(|c| c.username.clone()).unwrap_or_default();

        // Readline is blocking; keep it off the async executor.
        let prompted = tokio::task::spawn_blocking(move || prompt_blocking(&seed_username))
            .await
            .map_err(|e| ChatwireError::Config(format!("prompt task failed: {}", e)))??;

        Ok(prompted)
    }
}

fn prompt_blocking(seed_username: &str) -> Result<Option<PromptedCredentials>> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", "Webhook authentication required".bold());

    let username = match rl.readline_with_initial("Username: ", (seed_username, "")) {
        Ok(line) => line.trim().to_string(),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let password = match rl.readline("Password: ") {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if username.is_empty() || password.is_empty() {
        println!("{}", "Both username and password are required.".yellow());
        return Ok(None);
    }

    let remember = match rl.readline("Remember credentials? [Y/n] ") {
        Ok(line) => !line.trim().eq_ignore_ascii_case("n"),
        Err(_) => false,
    };

    Ok(Some(PromptedCredentials {
        credentials: Credentials::new(username, password),
        remember,
    }))
}

/// Terminal frontend for the pipeline.
#[derive(Default)]
struct TerminalSurface {
    streamed_bytes: usize,
    typing_visible: bool,
}

impl TerminalSurface {
    /// Print a stored assistant message when replaying history.
    fn assistant_replay(&mut self, content: &str) {
        println!("{}", crate::render::render_message(content));
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

impl ChatSurface for TerminalSurface {
    fn user_message(&mut self, _content: &str, _timestamp: &str) {
        // The user's line is already on screen from readline.
    }

    fn typing_started(&mut self) {
        print!("{}", "…".dimmed());
        self.flush();
        self.typing_visible = true;
    }

    fn typing_cleared(&mut self) {
        if self.typing_visible {
            print!("\r\x1b[2K");
            self.flush();
            self.typing_visible = false;
        }
    }

    fn stream_frame(&mut self, visible: &str) {
        if visible.len() >= self.streamed_bytes {
            print!("{}", &visible[self.streamed_bytes..]);
            self.flush();
            self.streamed_bytes = visible.len();
        }
    }

    fn assistant_message(&mut self, content: &str, _timestamp: &str) {
        println!();
        self.streamed_bytes = 0;

        // Tables are unreadable as raw pipes; print the rendered grid too.
        let tables = extract_tables(content);
        if !tables.is_empty() {
            println!();
            for table in &tables {
                print!("{}", render_table(table));
            }
        }
    }

    fn toast(&mut self, message: &str, kind: ToastKind) {
        match kind {
            ToastKind::Error => eprintln!("{} {}", "✖".red(), message.red()),
            ToastKind::Success => eprintln!("{} {}", "✔".green(), message.green()),
        }
    }

    fn input_enabled(&mut self, _enabled: bool) {
        // The readline prompt only reappears once submit returns, which is
        // exactly the terminal Idle transition.
    }
}
