//! Conversation records and CRUD over the key-value store
//!
//! A conversation is a titled, ordered list of messages persisted as one
//! record under the `conversations` key. Saves are always full replacements
//! of the message list, never incremental diffs, so `save` must tolerate
//! being handed a complete replacement set on every call.

use crate::error::Result;
use crate::session::now_rfc3339;
use crate::store::{keys, KvStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum derived title length before truncation.
const TITLE_MAX_CHARS: usize = 50;

/// Words kept lowercase when title-casing, unless they lead the title.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "for", "nor", "on", "at", "to", "by", "of", "in", "is",
    "with",
];

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message as persisted inside a conversation record.
///
/// `content` is the authoritative source for re-render and export; any
/// rendered form is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(rename = "type")]
    pub role: MessageRole,
    pub content: String,
    /// RFC-3339 creation timestamp.
    pub timestamp: String,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: now_rfc3339(),
        }
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
}

/// CRUD over the persisted conversation list.
///
/// Every operation is a full read-modify-write of the record set under the
/// `conversations` key.
#[derive(Debug, Clone)]
pub struct ConversationManager {
    store: KvStore,
}

impl ConversationManager {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    fn load(&self) -> Vec<Conversation> {
        match self.store.get(keys::CONVERSATIONS) {
            Ok(Some(list)) => list,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load conversations: {}", e);
                Vec::new()
            }
        }
    }

    fn persist(&self, conversations: &[Conversation]) -> Result<()> {
        self.store.put(keys::CONVERSATIONS, &conversations.to_vec())
    }

    /// Upsert a conversation by id with a complete replacement message list.
    ///
    /// An unknown id inserts a new record; a known id replaces `messages`,
    /// refreshes `updatedAt`, and re-derives the title. Saving an empty
    /// message list is a no-op, matching the original save guard.
    pub fn save(&self, id: &str, messages: &[StoredMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut conversations = self.load();
        let now = Utc::now();
        let title = derive_title(messages);

        match conversations.iter_mut().find(|c| c.id == id) {
            Some(existing) => {
                existing.messages = messages.to_vec();
                existing.updated_at = now;
                existing.title = title;
            }
            None => conversations.push(Conversation {
                id: id.to_string(),
                title,
                messages: messages.to_vec(),
                created_at: now,
                updated_at: now,
                pinned: false,
                archived: false,
            }),
        }

        self.persist(&conversations)
    }

    /// All conversations, pinned first, then most recently updated.
    pub fn list(&self) -> Vec<Conversation> {
        let mut conversations = self.load();
        conversations.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        conversations
    }

    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.load().into_iter().find(|c| c.id == id)
    }

    /// Remove the conversation with the given id.
    ///
    /// Returns `false` when the id was unknown.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut conversations = self.load();
        let before = conversations.len();
        conversations.retain(|c| c.id != id);

        if conversations.len() == before {
            return Ok(false);
        }
        self.persist(&conversations)?;
        Ok(true)
    }

    /// Remove every stored conversation.
    pub fn delete_all(&self) -> Result<()> {
        self.store.remove(keys::CONVERSATIONS)
    }

    /// Flip the pinned flag. No-op (returns `false`) when the id is unknown.
    pub fn toggle_pin(&self, id: &str) -> Result<bool> {
        self.toggle(id, |c| c.pinned = !c.pinned)
    }

    /// Flip the archived flag. No-op (returns `false`) when the id is unknown.
    pub fn toggle_archive(&self, id: &str) -> Result<bool> {
        self.toggle(id, |c| c.archived = !c.archived)
    }

    fn toggle(&self, id: &str, mutate: impl FnOnce(&mut Conversation)) -> Result<bool> {
        let mut conversations = self.load();
        let Some(conversation) = conversations.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        mutate(conversation);
        self.persist(&conversations)?;
        Ok(true)
    }

    /// Set a new title. No-op when `new_title` is empty after trimming or
    /// the id is unknown; otherwise the title is title-cased and stored.
    pub fn rename(&self, id: &str, new_title: &str) -> Result<bool> {
        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let title = title_case(trimmed);
        self.toggle(id, |c| c.title = title)
    }
}

/// Title-case a string, keeping minor words lowercase after the first word.
///
/// # Examples
///
/// ```
/// use chatwire::conversations::title_case;
///
/// assert_eq!(title_case("the state of the art"), "The State of the Art");
/// ```
pub fn title_case(input: &str) -> String {
    input
        .split(' ')
        .enumerate()
        .map(|(index, word)| {
            let lower = word.to_lowercase();
            if index > 0 && MINOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a conversation title from its first user message: title-cased and
/// truncated to 50 characters with an ellipsis. Falls back to
/// `"New Conversation"` when no user message exists.
pub fn derive_title(messages: &[StoredMessage]) -> String {
    let Some(first_user) = messages.iter().find(|m| m.role == MessageRole::User) else {
        return "New Conversation".to_string();
    };

    let title = title_case(first_user.content.trim());
    if title.chars().count() > TITLE_MAX_CHARS {
        let mut truncated: String = title.chars().take(TITLE_MAX_CHARS - 3).collect();
        truncated.push_str("...");
        truncated
    } else {
        title
    }
}
