//! Credential management
//!
//! The stored blob is reversibly encoded, not encrypted; `login` says so.

use crate::cli::AuthCommand;
use crate::commands::AppContext;
use crate::credentials::Credentials;
use crate::error::Result;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Handle auth commands
pub fn handle_auth(ctx: &AppContext, command: AuthCommand) -> Result<()> {
    match command {
        AuthCommand::Login { no_remember } => login(ctx, !no_remember),
        AuthCommand::Logout => {
            ctx.credentials.clear();
            println!("{}", "Credentials cleared.".green());
            Ok(())
        }
        AuthCommand::Status => {
            match ctx.credentials.get() {
                Some(credentials) => println!(
                    "Credentials configured for {}",
                    credentials.username.cyan()
                ),
                None => println!("{}", "No credentials configured.".yellow()),
            }
            Ok(())
        }
    }
}

fn login(ctx: &AppContext, remember: bool) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let username = match rl.readline("Username: ") {
        Ok(line) => line.trim().to_string(),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Aborted.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let password = match rl.readline("Password: ") {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Aborted.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if username.is_empty() || password.is_empty() {
        println!("{}", "Both username and password are required.".yellow());
        return Ok(());
    }

    ctx.credentials
        .store(Credentials::new(username, password), remember)?;

    if remember {
        println!("{}", "Credentials saved.".green());
        println!(
            "{}",
            "Note: stored credentials are obfuscated, not encrypted.".dimmed()
        );
    } else {
        println!("{}", "Credentials set for this session only.".green());
    }
    Ok(())
}
