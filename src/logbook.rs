//! Request log persistence and plain-text export
//!
//! Every terminal webhook outcome (success, exhausted-retry failure, or
//! cancellation) is appended here by the webhook client. The log is capped
//! at the 500 most recent entries; inserting beyond the cap evicts the
//! oldest entries first.

use crate::error::Result;
use crate::session::{generate_id, now_rfc3339};
use crate::store::{keys, KvStore};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of retained log entries.
pub const LOG_CAPACITY: usize = 500;

/// Terminal outcome category of a logged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Success,
    Error,
    Cancelled,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Success => "success",
            LogKind::Error => "error",
            LogKind::Cancelled => "cancelled",
        }
    }
}

/// One logged request outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    /// RFC-3339 timestamp of the terminal outcome.
    pub timestamp: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Elapsed milliseconds from first attempt to the terminal outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// 1-based attempt number at which the request concluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl LogEntry {
    /// Create an entry with a fresh id and timestamp; detail fields start
    /// empty and are filled in by the caller.
    pub fn new(kind: LogKind, session_id: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            id: generate_id("log"),
            timestamp: now_rfc3339(),
            session_id: session_id.into(),
            conversation_id,
            kind,
            user_message: None,
            assistant_message: None,
            model: None,
            error: None,
            duration: None,
            attempt: None,
        }
    }
}

/// Append-only log store with FIFO eviction.
#[derive(Debug, Clone)]
pub struct LogStore {
    store: KvStore,
}

impl LogStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// All retained entries, oldest first.
    pub fn all(&self) -> Vec<LogEntry> {
        match self.store.get(keys::CONVERSATION_LOGS) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load logs: {}", e);
                Vec::new()
            }
        }
    }

    /// The `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let mut entries = self.all();
        let start = entries.len().saturating_sub(limit);
        let mut recent = entries.split_off(start);
        recent.reverse();
        recent
    }

    /// Append an entry, evicting the oldest entries beyond [`LOG_CAPACITY`].
    pub fn append(&self, entry: LogEntry) -> Result<()> {
        let mut entries = self.all();
        entries.push(entry);
        if entries.len() > LOG_CAPACITY {
            let excess = entries.len() - LOG_CAPACITY;
            entries.drain(..excess);
        }
        self.store.put(keys::CONVERSATION_LOGS, &entries)
    }

    /// Remove all retained entries.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(keys::CONVERSATION_LOGS)
    }

    /// Render the full log as human-readable text with section banners.
    pub fn export_text(&self) -> String {
        let entries = self.all();
        let heavy = "═".repeat(65);
        let light = "─".repeat(74);

        let mut output = String::new();
        output.push_str(&heavy);
        output.push('\n');
        output.push_str("                    CHAT CONVERSATION LOGS\n");
        output.push_str(&heavy);
        output.push('\n');
        output.push_str(&format!("  Exported: {}\n", format_stamp(&now_rfc3339())));
        output.push_str(&format!("  Total Entries: {}\n", entries.len()));
        output.push_str(&heavy);
        output.push_str("\n\n");

        for (index, entry) in entries.iter().enumerate() {
            output.push_str(&light);
            output.push('\n');
            output.push_str(&format!(
                "  #{}  |  {}  |  {}\n",
                index + 1,
                entry.kind.as_str().to_uppercase(),
                format_stamp(&entry.timestamp)
            ));
            output.push_str(&light);
            output.push('\n');

            output.push_str(&format!("  Session:        {}\n", entry.session_id));
            if let Some(conversation_id) = &entry.conversation_id {
                output.push_str(&format!("  Conversation:   {}\n", conversation_id));
            }
            if let Some(model) = &entry.model {
                output.push_str(&format!("  Model:          {}\n", model));
            }
            if let Some(duration) = entry.duration {
                output.push_str(&format!("  Duration:       {}ms\n", duration));
            }
            if let Some(attempt) = entry.attempt {
                output.push_str(&format!("  Attempt:        {}\n", attempt));
            }

            if let Some(user_message) = &entry.user_message {
                output.push_str("\n  [USER]\n");
                output.push_str(&indent_lines(user_message));
            }
            if let Some(assistant_message) = &entry.assistant_message {
                output.push_str("\n  [ASSISTANT]\n");
                output.push_str(&indent_lines(assistant_message));
            }
            if let Some(error) = &entry.error {
                output.push_str("\n  [ERROR]\n");
                output.push_str(&indent_lines(error));
            }

            output.push('\n');
        }

        output.push_str(&heavy);
        output.push('\n');
        output.push_str("                        END OF LOGS\n");
        output.push_str(&heavy);
        output.push('\n');
        output
    }
}

/// Filename for a log export, stamped with the local time.
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("ChatLogs_{}.txt", now.format("%m-%d-%Y_%H%M%S"))
}

/// Truncate text for compact log display.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

fn format_stamp(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%m/%d/%Y %H:%M:%S")
            .to_string(),
        Err(_) => rfc3339.to_string(),
    }
}

fn indent_lines(text: &str) -> String {
    let mut indented = String::new();
    for line in text.lines() {
        indented.push_str("  ");
        indented.push_str(line);
        indented.push('\n');
    }
    if text.is_empty() {
        indented.push_str("  \n");
    }
    indented
}
