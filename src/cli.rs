//! Command-line interface definition for Chatwire
//!
//! This module defines the CLI structure using clap's derive API, providing
//! commands for the interactive chat, history management, request logs,
//! credentials, and persisted settings.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatwire - terminal chat client for webhook-backed assistants
#[derive(Parser, Debug, Clone)]
#[command(name = "chatwire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the store directory (also honored as CHATWIRE_STORE_DIR)
    #[arg(long, env = "CHATWIRE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatwire
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Override the webhook URL for this session
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Manage saved conversations
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Inspect and export request logs
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },

    /// Manage webhook credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage persisted settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Conversation management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List saved conversations (pinned first, most recent next)
    List,

    /// Print a conversation's messages
    Show {
        /// Conversation id or unique prefix
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id or unique prefix
        id: String,
    },

    /// Delete every saved conversation
    DeleteAll {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Pin or unpin a conversation
    Pin {
        /// Conversation id or unique prefix
        id: String,
    },

    /// Archive or unarchive a conversation
    Archive {
        /// Conversation id or unique prefix
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation id or unique prefix
        id: String,
        /// New title (title-cased on save)
        title: String,
    },

    /// Export a table from a conversation as a styled spreadsheet
    ExportTable {
        /// Conversation id or unique prefix
        id: String,

        /// Zero-based message index; defaults to the last message with a table
        #[arg(short, long)]
        message: Option<usize>,

        /// Output path; defaults to QueryResults_<stamp>.xlsx
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Log inspection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LogsCommand {
    /// Print recent log entries, newest first
    Show {
        /// Maximum entries to print
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Export the full log as plain text
    Export {
        /// Output path; defaults to ChatLogs_<stamp>.txt
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all log entries
    Clear,
}

/// Credential subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Prompt for and store webhook credentials
    Login {
        /// Keep the credentials in memory only, without persisting them
        #[arg(long)]
        no_remember: bool,
    },

    /// Clear stored credentials
    Logout,

    /// Show whether credentials are configured
    Status,
}

/// Persisted settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Set the webhook URL override
    SetUrl {
        /// Webhook endpoint URL
        url: String,
    },

    /// Remove the webhook URL override
    ClearUrl,

    /// Set the display theme
    SetTheme {
        /// "light" or "dark"
        theme: String,
    },

    /// Set whether the history sidebar starts open
    SetSidebar {
        /// "true" or "false"
        open: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_chat_with_url() {
        let cli = Cli::try_parse_from(["chatwire", "chat", "--url", "http://localhost:1234/hook"])
            .expect("parse failed");
        match cli.command {
            Commands::Chat { url } => {
                assert_eq!(url.as_deref(), Some("http://localhost:1234/hook"))
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_cli_parses_history_list() {
        let cli = Cli::try_parse_from(["chatwire", "history", "list"]).expect("parse failed");
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::List
            }
        ));
    }

    #[test]
    fn test_cli_parses_logs_show_with_limit() {
        let cli = Cli::try_parse_from(["chatwire", "logs", "show", "--limit", "10"])
            .expect("parse failed");
        match cli.command {
            Commands::Logs {
                command: LogsCommand::Show { limit },
            } => assert_eq!(limit, 10),
            _ => panic!("expected logs show"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["chatwire", "frobnicate"]).is_err());
    }

    #[test]
    fn test_cli_default_config_path() {
        let cli = Cli::try_parse_from(["chatwire", "logs", "clear"]).expect("parse failed");
        assert_eq!(cli.config, "config/config.yaml");
        assert!(!cli.verbose);
    }
}
