//! Flat keyed persistence for conversations, logs, and settings
//!
//! Records are JSON-serialized values stored under well-known string keys in
//! an embedded `sled` database. Every write is a full read-modify-write of
//! the whole record set for that key; there are no transactions, so two
//! processes sharing a store directory can clobber each other's last write.
//! That is a documented limitation of the original storage model, not
//! something this layer solves.
//!
//! A persisted value that fails to decode is treated as absent and purged.

use crate::error::{ChatwireError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

pub mod settings;
pub use settings::{Settings, Theme};

/// Well-known store keys.
pub mod keys {
    /// The full list of saved conversations.
    pub const CONVERSATIONS: &str = "conversations";
    /// Append-only request log, capped at the most recent 500 entries.
    pub const CONVERSATION_LOGS: &str = "conversation_logs";
    /// User override of the configured webhook URL.
    pub const WEBHOOK_URL: &str = "webhook_url";
    /// Reversibly-encoded credentials (obfuscation, not encryption).
    pub const WEBHOOK_CREDENTIALS: &str = "webhook_credentials";
    /// Display theme, `"light"` or `"dark"`.
    pub const THEME: &str = "theme";
    /// Whether the history sidebar starts open, stored as `"true"`/`"false"`.
    pub const SIDEBAR_OPEN: &str = "sidebarOpen";
}

/// Generic key-value store over the embedded database.
///
/// Cloning is cheap; all clones share the same underlying database handle.
#[derive(Debug, Clone)]
pub struct KvStore {
    db: sled::Db,
}

impl KvStore {
    /// Open the store in the default location.
    ///
    /// The directory can be overridden with the `CHATWIRE_STORE_DIR`
    /// environment variable, which is how tests point the binary at a
    /// temporary store.
    pub fn open_default() -> Result<Self> {
        if let Ok(override_dir) = std::env::var("CHATWIRE_STORE_DIR") {
            return Self::open(override_dir);
        }

        let proj_dirs = ProjectDirs::from("io", "chatwire", "chatwire")
            .ok_or_else(|| ChatwireError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ChatwireError::Storage(e.to_string()))?;

        Self::open(data_dir.join("store"))
    }

    /// Open or create a store at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| ChatwireError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Read and decode the record stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent. A record that fails to
    /// decode is purged and also reported as absent, so corrupt state can
    /// never wedge the application.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let bytes = match self
            .db
            .get(key)
            .map_err(|e| ChatwireError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Purging undecodable record under '{}': {}", key, e);
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Serialize `value` and store it under `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ChatwireError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(key, bytes)
            .map_err(|e| ChatwireError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatwireError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Remove the record stored under `key`. No-op when absent.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key)
            .map_err(|e| ChatwireError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatwireError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Store a raw (non-JSON) string under `key`.
    ///
    /// Used for the obfuscated credential blob, which is persisted exactly as
    /// produced by the encoder rather than as a JSON value.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key, value.as_bytes())
            .map_err(|e| ChatwireError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatwireError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Read a raw string stored with [`KvStore::put_raw`].
    ///
    /// A value that is not valid UTF-8 is purged and reported as absent.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let bytes = match self
            .db
            .get(key)
            .map_err(|e| ChatwireError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match String::from_utf8(bytes.to_vec()) {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                tracing::warn!("Purging non-UTF-8 record under '{}'", key);
                self.remove(key)?;
                Ok(None)
            }
        }
    }
}
