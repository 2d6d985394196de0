//! Chatwire - terminal chat client for webhook-backed assistants
//!
//! This library provides the core functionality for the Chatwire client:
//! the send pipeline, the webhook client, conversation and log persistence,
//! credential handling, and terminal rendering.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `pipeline`: The send state machine orchestrating a chat session
//! - `webhook`: The HTTP client with timeout, retry, and cancellation
//! - `conversations`: Conversation records and CRUD over the store
//! - `logbook`: Request log persistence and plain-text export
//! - `credentials`: Credential storage and interactive acquisition
//! - `store`: Flat keyed persistence and settings
//! - `render`: Terminal markup, tables, and simulated streaming
//! - `spreadsheet`: Styled `.xlsx` export of rendered tables
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatwire::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load("config/config.yaml")?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod conversations;
pub mod credentials;
pub mod error;
pub mod logbook;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod spreadsheet;
pub mod store;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use conversations::{Conversation, ConversationManager, StoredMessage};
pub use credentials::{CredentialStore, Credentials};
pub use error::{ChatwireError, Result};
pub use logbook::{LogEntry, LogStore};
pub use pipeline::{PipelineState, SendPipeline, SubmitOutcome};
pub use session::SessionContext;
pub use webhook::{ChatRequest, SendOutcome, WebhookClient};
