//! User settings persisted in the key-value store
//!
//! Covers the webhook URL override, the display theme, and the sidebar
//! state. The sidebar flag is stored as the strings `"true"`/`"false"` to
//! stay compatible with the record format of the original interface.

use crate::error::Result;
use crate::store::{keys, KvStore};

/// Display theme for rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a stored theme string; anything unrecognized falls back to light.
    pub fn parse(value: &str) -> Theme {
        match value {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

/// Typed accessor for persisted settings.
#[derive(Debug, Clone)]
pub struct Settings {
    store: KvStore,
}

impl Settings {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// User override of the configured webhook URL, if set.
    pub fn webhook_url(&self) -> Option<String> {
        self.store.get(keys::WEBHOOK_URL).unwrap_or_default()
    }

    pub fn set_webhook_url(&self, url: &str) -> Result<()> {
        self.store.put(keys::WEBHOOK_URL, &url.to_string())
    }

    pub fn clear_webhook_url(&self) -> Result<()> {
        self.store.remove(keys::WEBHOOK_URL)
    }

    pub fn theme(&self) -> Theme {
        self.store
            .get::<String>(keys::THEME)
            .unwrap_or_default()
            .map(|value| Theme::parse(&value))
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.put(keys::THEME, &theme.as_str().to_string())
    }

    /// Whether the history sidebar starts open. Defaults to open, matching
    /// the original behavior when no state has been saved.
    pub fn sidebar_open(&self) -> bool {
        self.store
            .get::<String>(keys::SIDEBAR_OPEN)
            .unwrap_or_default()
            .map(|value| value != "false")
            .unwrap_or(true)
    }

    pub fn set_sidebar_open(&self, open: bool) -> Result<()> {
        let value = if open { "true" } else { "false" };
        self.store.put(keys::SIDEBAR_OPEN, &value.to_string())
    }
}
