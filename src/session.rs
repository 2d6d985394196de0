//! Session identity and in-flight request state
//!
//! A [`SessionContext`] owns the identifiers and the cancellation handle for
//! the active chat session. The original interface kept these as ambient
//! globals; here they are an explicit value passed to the send pipeline.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Generate a prefixed opaque identifier, e.g. `conv_9f8a…`.
///
/// # Examples
///
/// ```
/// use chatwire::session::generate_id;
///
/// let id = generate_id("session");
/// assert!(id.starts_with("session_"));
/// ```
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Get current timestamp in RFC-3339 format
///
/// Used consistently for message, conversation, and log timestamps so that
/// they survive a round-trip through the persisted JSON representation.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Clonable handle to the in-flight request's cancellation token.
///
/// The chat frontend holds one of these so it can abort the active webhook
/// call (e.g. on Ctrl-C) while the pipeline future owns the pipeline itself.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelHandle {
    /// Cancel the in-flight request, if any.
    ///
    /// Returns `true` when a request was active and has been signalled.
    /// Cancellation is cooperative: the webhook client observes the signal at
    /// the network-call boundary and at the top of each retry iteration.
    pub fn cancel(&self) -> bool {
        if let Ok(slot) = self.slot.lock() {
            if let Some(token) = slot.as_ref() {
                token.cancel();
                return true;
            }
        }
        false
    }

    /// Whether a request is currently in flight.
    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    fn disarm(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// Per-session state owned by the send pipeline.
///
/// Holds the session and active-conversation identifiers plus the abort
/// handle for the in-flight webhook request.
#[derive(Debug)]
pub struct SessionContext {
    /// Opaque session identifier, sent with every webhook request.
    pub session_id: String,
    /// Identifier of the conversation messages are appended to.
    pub conversation_id: String,
    cancel: CancelHandle,
}

impl SessionContext {
    /// Create a context with fresh session and conversation identifiers.
    pub fn new() -> Self {
        Self {
            session_id: generate_id("session"),
            conversation_id: generate_id("conv"),
            cancel: CancelHandle::default(),
        }
    }

    /// Start a new chat: rotate both the conversation and session ids.
    pub fn rotate(&mut self) {
        self.session_id = generate_id("session");
        self.conversation_id = generate_id("conv");
    }

    /// Switch to an existing conversation without rotating the session.
    pub fn switch_conversation(&mut self, conversation_id: impl Into<String>) {
        self.conversation_id = conversation_id.into();
    }

    /// Clonable abort handle for the active request.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Install a fresh cancellation token for an outgoing request.
    pub fn begin_request(&self) -> CancellationToken {
        self.cancel.arm()
    }

    /// Tear down the active request's cancellation token.
    pub fn end_request(&self) {
        self.cancel.disarm();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
