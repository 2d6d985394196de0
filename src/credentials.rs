//! Credential storage and acquisition
//!
//! Credentials live in memory for the session and are optionally mirrored to
//! the key-value store under `webhook_credentials` with a reversible
//! base64-of-JSON encoding. That encoding is obfuscation only — it keeps the
//! password out of casual view of the store file, nothing more. It is NOT
//! encryption and must not be treated as secure secret storage.
//!
//! A persisted value that fails to decode is purged and treated as absent.

use crate::error::Result;
use crate::store::{keys, KvStore};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// A username/password pair for the webhook's Basic auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build the `Authorization` header value: `Basic base64(user:pass)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatwire::credentials::Credentials;
    ///
    /// let credentials = Credentials::new("user", "pass");
    /// assert_eq!(credentials.basic_header(), "Basic dXNlcjpwYXNz");
    /// ```
    pub fn basic_header(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(pair.as_bytes()))
    }
}

/// Result of a credential prompt.
#[derive(Debug, Clone)]
pub struct PromptedCredentials {
    pub credentials: Credentials,
    /// Whether the user asked for the credentials to be persisted.
    pub remember: bool,
}

/// Seam for interactive credential acquisition.
///
/// The pipeline suspends on this when no credentials are cached; the CLI
/// implements it with a readline prompt. Returning `Ok(None)` means the user
/// cancelled.
#[async_trait]
pub trait CredentialPrompter: Send + Sync {
    async fn prompt(&self, existing: Option<&Credentials>) -> Result<Option<PromptedCredentials>>;
}

/// In-memory credentials with optional persisted mirror.
///
/// Cloning is cheap; all clones share the same session slot and store
/// handle, so a 401 handled deep in the webhook client clears the same
/// credentials the pipeline reads.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    session: Arc<RwLock<Option<Credentials>>>,
    store: KvStore,
}

impl CredentialStore {
    pub fn new(store: KvStore) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Return the active credentials: the in-memory value if present, else
    /// the decoded persisted value (which is then cached in memory), else
    /// `None`.
    pub fn get(&self) -> Option<Credentials> {
        if let Ok(session) = self.session.read() {
            if let Some(credentials) = session.as_ref() {
                return Some(credentials.clone());
            }
        }

        let persisted = self.load_persisted()?;
        if let Ok(mut session) = self.session.write() {
            *session = Some(persisted.clone());
        }
        Some(persisted)
    }

    /// Whether credentials are available in memory or in the store.
    pub fn has_credentials(&self) -> bool {
        self.get().is_some()
    }

    /// Install credentials for this session and mirror or purge the
    /// persisted copy according to `remember`.
    pub fn store(&self, credentials: Credentials, remember: bool) -> Result<()> {
        if remember {
            self.persist(&credentials)?;
        } else {
            self.store.remove(keys::WEBHOOK_CREDENTIALS)?;
        }

        if let Ok(mut session) = self.session.write() {
            *session = Some(credentials);
        }
        Ok(())
    }

    /// Drop both the in-memory and the persisted copies.
    ///
    /// Invoked automatically when the webhook answers 401. Best-effort on the
    /// persisted side: a store failure is logged, not propagated, so the
    /// in-memory clear always happens.
    pub fn clear(&self) {
        if let Ok(mut session) = self.session.write() {
            *session = None;
        }
        if let Err(e) = self.store.remove(keys::WEBHOOK_CREDENTIALS) {
            tracing::warn!("Failed to remove persisted credentials: {}", e);
        }
    }

    fn persist(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(credentials)?;
        let encoded = BASE64.encode(json.as_bytes());
        self.store.put_raw(keys::WEBHOOK_CREDENTIALS, &encoded)
    }

    fn load_persisted(&self) -> Option<Credentials> {
        let encoded = self.store.get_raw(keys::WEBHOOK_CREDENTIALS).ok()??;

        let decoded = match BASE64.decode(encoded.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to decode stored credentials: {}", e);
                self.purge();
                return None;
            }
        };

        match serde_json::from_slice(&decoded) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                tracing::warn!("Stored credentials are not valid JSON: {}", e);
                self.purge();
                None
            }
        }
    }

    fn purge(&self) {
        if let Err(e) = self.store.remove(keys::WEBHOOK_CREDENTIALS) {
            tracing::warn!("Failed to purge corrupt credentials: {}", e);
        }
    }
}
