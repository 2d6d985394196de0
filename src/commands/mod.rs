/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`     — Interactive chat session
- `history`  — Saved-conversation management and table export
- `logs`     — Request log inspection and plain-text export
- `auth`     — Credential management
- `settings` — Persisted settings

The handlers are intentionally small and use the library components: the
store, the conversation manager, the log book, and the send pipeline.
*/

use crate::config::Config;
use crate::conversations::ConversationManager;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::logbook::LogStore;
use crate::store::{KvStore, Settings};

pub mod auth;
pub mod chat;
pub mod history;
pub mod logs;
pub mod settings;

/// Shared handles threaded through every command handler.
pub struct AppContext {
    pub config: Config,
    pub settings: Settings,
    pub credentials: CredentialStore,
    pub conversations: ConversationManager,
    pub logs: LogStore,
}

impl AppContext {
    /// Open the store and build all component handles.
    pub fn initialize(config: Config) -> Result<Self> {
        let store = KvStore::open_default()?;
        Ok(Self::with_store(config, store))
    }

    /// Build a context over an already-open store (used by tests).
    pub fn with_store(config: Config, store: KvStore) -> Self {
        Self {
            config,
            settings: Settings::new(store.clone()),
            credentials: CredentialStore::new(store.clone()),
            conversations: ConversationManager::new(store.clone()),
            logs: LogStore::new(store),
        }
    }

    /// Effective webhook URL: persisted override first, then the config.
    pub fn webhook_url(&self) -> String {
        self.settings
            .webhook_url()
            .unwrap_or_else(|| self.config.webhook.url.clone())
    }
}

/// Resolve a conversation id or unique id prefix to a full id.
///
/// Returns `None` when nothing matches or the prefix is ambiguous.
pub(crate) fn resolve_conversation_id(
    conversations: &ConversationManager,
    id_or_prefix: &str,
) -> Option<String> {
    let all = conversations.list();
    if all.iter().any(|c| c.id == id_or_prefix) {
        return Some(id_or_prefix.to_string());
    }

    let matches: Vec<&str> = all
        .iter()
        .filter(|c| c.id.starts_with(id_or_prefix))
        .map(|c| c.id.as_str())
        .collect();

    match matches.as_slice() {
        [only] => Some((*only).to_string()),
        _ => None,
    }
}
