//! The send pipeline: credential acquisition, webhook call, streaming render,
//! and persistence
//!
//! States: `Idle → AwaitingCredentials → Sending(attempt) → Retrying →
//! Streaming → Idle`, with `Cancelled` absorbing from `Sending`/`Retrying`.
//! One send may be in flight at a time; a submit while the pipeline is not
//! idle is rejected outright, with no queueing. The input control is
//! disabled from entry until the terminal `Idle` transition and re-enabled
//! on every exit path.
//!
//! The pipeline talks to its frontend exclusively through [`ChatSurface`],
//! so the core has no UI dependency.

use crate::config::ChatConfig;
use crate::conversations::{ConversationManager, StoredMessage};
use crate::credentials::{CredentialPrompter, CredentialStore};
use crate::error::{ChatwireError, Result};
use crate::render::streaming;
use crate::session::SessionContext;
use crate::webhook::{ChatRequest, SendOutcome, SendProgress, WebhookClient};

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline state, observable by frontends and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AwaitingCredentials,
    /// A webhook attempt (0-based) is in flight.
    Sending(u32),
    /// Waiting out a retry delay between attempts.
    Retrying,
    /// Revealing a received reply.
    Streaming,
    /// Absorbing state entered on user abort, exits to `Idle`.
    Cancelled,
}

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Success,
}

/// Presentation seam. The pipeline never touches a UI directly; frontends
/// implement this and decide how to show each event.
pub trait ChatSurface: Send {
    /// A user message was accepted and appended to the transcript.
    fn user_message(&mut self, content: &str, timestamp: &str);
    /// A transient "typing" placeholder should appear.
    fn typing_started(&mut self);
    /// The placeholder should be removed (reply, failure, or cancel).
    fn typing_cleared(&mut self);
    /// A simulated-streaming frame: the visible prefix of the reply so far.
    fn stream_frame(&mut self, visible: &str);
    /// The complete assistant message, after streaming finishes.
    fn assistant_message(&mut self, content: &str, timestamp: &str);
    /// A toast notification.
    fn toast(&mut self, message: &str, kind: ToastKind);
    /// Input control enablement; `false` for the whole duration of a send.
    fn input_enabled(&mut self, enabled: bool);
}

/// How a submit call concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Reply received, streamed, and persisted.
    Sent,
    /// Rejected: another send was already in flight.
    Busy,
    /// Rejected: the trimmed input was empty.
    Empty,
    /// No credentials obtainable; no network call was made.
    AuthRequired,
    /// The webhook rejected the credentials (401).
    AuthRejected,
    /// Transient failure after the full retry budget.
    Failed,
    /// The user aborted the send.
    Cancelled,
}

/// Orchestrates a single chat session's sends.
pub struct SendPipeline {
    state: Arc<Mutex<PipelineState>>,
    session: SessionContext,
    transcript: Vec<StoredMessage>,
    client: WebhookClient,
    credentials: CredentialStore,
    conversations: ConversationManager,
    prompter: Arc<dyn CredentialPrompter>,
    chat_config: ChatConfig,
}

impl SendPipeline {
    pub fn new(
        client: WebhookClient,
        credentials: CredentialStore,
        conversations: ConversationManager,
        prompter: Arc<dyn CredentialPrompter>,
        chat_config: ChatConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            session: SessionContext::new(),
            transcript: Vec::new(),
            client,
            credentials,
            conversations,
            prompter,
            chat_config,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PipelineState::Idle)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn transcript(&self) -> &[StoredMessage] {
        &self.transcript
    }

    /// Last submitted user message, used by the retry command.
    pub fn last_user_message(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|m| m.role == crate::conversations::MessageRole::User)
            .map(|m| m.content.as_str())
    }

    /// Start a new chat: clear the transcript and rotate identifiers.
    /// No-op while a send is in flight.
    pub fn new_chat(&mut self) -> bool {
        if self.state() != PipelineState::Idle {
            return false;
        }
        self.transcript.clear();
        self.session.rotate();
        true
    }

    /// Switch to a stored conversation, replacing the transcript.
    /// No-op while a send is in flight or when the id is unknown.
    pub fn open_conversation(&mut self, id: &str) -> bool {
        if self.state() != PipelineState::Idle {
            return false;
        }
        let Some(conversation) = self.conversations.get(id) else {
            return false;
        };
        self.transcript = conversation.messages;
        self.session.switch_conversation(id);
        true
    }

    /// Submit a user message through the full pipeline.
    ///
    /// The returned outcome is informational; user-facing feedback has
    /// already been delivered through the surface by the time this returns.
    pub async fn submit(
        &mut self,
        input: &str,
        surface: &mut dyn ChatSurface,
    ) -> Result<SubmitOutcome> {
        let message = input.trim().to_string();
        if message.is_empty() {
            return Ok(SubmitOutcome::Empty);
        }

        // Entry guard: no queueing, no concurrent sends. Nothing may change
        // when the pipeline is busy.
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| ChatwireError::Storage("pipeline state poisoned".into()))?;
            if *state != PipelineState::Idle {
                return Ok(SubmitOutcome::Busy);
            }
            *state = PipelineState::AwaitingCredentials;
        }
        surface.input_enabled(false);

        if self.credentials.get().is_none() {
            match self.prompter.prompt(None).await {
                Ok(Some(prompted)) => {
                    if let Err(e) = self
                        .credentials
                        .store(prompted.credentials, prompted.remember)
                    {
                        tracing::warn!("Failed to persist credentials: {}", e);
                    }
                }
                Ok(None) => {
                    surface.toast("Authentication required to send messages", ToastKind::Error);
                    self.finish(surface);
                    return Ok(SubmitOutcome::AuthRequired);
                }
                Err(e) => {
                    tracing::warn!("Credential prompt failed: {}", e);
                    surface.toast("Authentication required to send messages", ToastKind::Error);
                    self.finish(surface);
                    return Ok(SubmitOutcome::AuthRequired);
                }
            }
        }

        let user = StoredMessage::user(&message);
        surface.user_message(&user.content, &user.timestamp);
        self.transcript.push(user);
        self.persist_transcript();
        surface.typing_started();

        let cancel = self.session.begin_request();
        self.set_state(PipelineState::Sending(0));

        let request = ChatRequest::new(
            &self.session.session_id,
            &self.session.conversation_id,
            &message,
        );

        let observer_state = Arc::clone(&self.state);
        let outcome = self
            .client
            .send_observed(&request, &cancel, move |progress| {
                if let Ok(mut state) = observer_state.lock() {
                    *state = match progress {
                        SendProgress::Attempt(n) => PipelineState::Sending(n),
                        SendProgress::RetryWait { .. } => PipelineState::Retrying,
                    };
                }
            })
            .await;

        surface.typing_cleared();

        match outcome {
            Ok(SendOutcome::Reply(reply)) => {
                self.set_state(PipelineState::Streaming);
                self.stream_reply(&reply.text, surface).await;

                let assistant = StoredMessage::assistant(&reply.text);
                surface.assistant_message(&assistant.content, &assistant.timestamp);
                self.transcript.push(assistant);
                self.persist_transcript();

                self.finish(surface);
                Ok(SubmitOutcome::Sent)
            }
            Ok(SendOutcome::Cancelled) => {
                // Distinct from failure: no error toast.
                self.set_state(PipelineState::Cancelled);
                self.finish(surface);
                Ok(SubmitOutcome::Cancelled)
            }
            Err(error) => {
                let outcome = match error.downcast_ref::<ChatwireError>() {
                    Some(ChatwireError::AuthRejected(_)) => SubmitOutcome::AuthRejected,
                    _ => SubmitOutcome::Failed,
                };
                let framing = match outcome {
                    SubmitOutcome::AuthRejected => error.to_string(),
                    _ => format!("Failed to send message. {}", error),
                };
                surface.toast(&framing, ToastKind::Error);
                self.finish(surface);
                Ok(outcome)
            }
        }
    }

    /// Abort handle for the in-flight request.
    pub fn cancel_handle(&self) -> crate::session::CancelHandle {
        self.session.cancel_handle()
    }

    async fn stream_reply(&self, text: &str, surface: &mut dyn ChatSurface) {
        // Very long replies skip the cosmetic reveal entirely.
        if text.chars().count() > self.chat_config.skip_stream_over_chars {
            surface.stream_frame(text);
            return;
        }

        let chunk_tokens = self.chat_config.stream_chunk_tokens;
        let total = streaming::frame_count(text, chunk_tokens);
        for chunk in 1..=total {
            surface.stream_frame(streaming::frame(text, chunk, chunk_tokens));
            if chunk < total {
                tokio::time::sleep(Duration::from_millis(self.chat_config.stream_delay_ms)).await;
            }
        }
    }

    fn persist_transcript(&self) {
        // Best-effort: a storage failure must not abort the send.
        if let Err(e) = self
            .conversations
            .save(&self.session.conversation_id, &self.transcript)
        {
            tracing::warn!("Failed to save conversation: {}", e);
        }
    }

    fn set_state(&self, next: PipelineState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Terminal transition back to `Idle`: tears down the cancellation
    /// handle and re-enables input. Every exit path funnels through here.
    fn finish(&self, surface: &mut dyn ChatSurface) {
        self.session.end_request();
        self.set_state(PipelineState::Idle);
        surface.input_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credentials, PromptedCredentials};
    use crate::store::KvStore;
    use async_trait::async_trait;

    /// Surface that records every event for assertions.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub events: Vec<String>,
        pub input_enabled: Option<bool>,
    }

    impl ChatSurface for RecordingSurface {
        fn user_message(&mut self, content: &str, _timestamp: &str) {
            self.events.push(format!("user:{}", content));
        }
        fn typing_started(&mut self) {
            self.events.push("typing".into());
        }
        fn typing_cleared(&mut self) {
            self.events.push("typing-cleared".into());
        }
        fn stream_frame(&mut self, visible: &str) {
            self.events.push(format!("frame:{}", visible));
        }
        fn assistant_message(&mut self, content: &str, _timestamp: &str) {
            self.events.push(format!("assistant:{}", content));
        }
        fn toast(&mut self, message: &str, kind: ToastKind) {
            self.events.push(format!("toast:{:?}:{}", kind, message));
        }
        fn input_enabled(&mut self, enabled: bool) {
            self.input_enabled = Some(enabled);
            self.events.push(format!("input:{}", enabled));
        }
    }

    struct StaticPrompter {
        reply: Option<PromptedCredentials>,
    }

    #[async_trait]
    impl CredentialPrompter for StaticPrompter {
        async fn prompt(
            &self,
            _existing: Option<&Credentials>,
        ) -> crate::error::Result<Option<PromptedCredentials>> {
            Ok(self.reply.clone())
        }
    }

    fn build_pipeline(prompter_reply: Option<PromptedCredentials>) -> (SendPipeline, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = KvStore::open(dir.path().join("store")).expect("failed to open store");
        let credentials = CredentialStore::new(store.clone());
        let logs = crate::logbook::LogStore::new(store.clone());
        let conversations = ConversationManager::new(store);
        let client = WebhookClient::new(
            crate::config::WebhookConfig {
                url: "http://127.0.0.1:9/unreachable".to_string(),
                timeout_seconds: 1,
                retry_attempts: 0,
                retry_delay_ms: 1,
            },
            credentials.clone(),
            logs,
        )
        .expect("client build failed");

        let pipeline = SendPipeline::new(
            client,
            credentials,
            conversations,
            Arc::new(StaticPrompter {
                reply: prompter_reply,
            }),
            ChatConfig::default(),
        );
        (pipeline, dir)
    }

    #[tokio::test]
    async fn test_submit_empty_input_is_noop() {
        let (mut pipeline, _dir) = build_pipeline(None);
        let mut surface = RecordingSurface::default();

        let outcome = pipeline
            .submit("   ", &mut surface)
            .await
            .expect("submit failed");

        assert_eq!(outcome, SubmitOutcome::Empty);
        assert!(surface.events.is_empty());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_submit_while_busy_is_rejected() {
        let (mut pipeline, _dir) = build_pipeline(None);
        pipeline.set_state(PipelineState::Sending(1));

        let mut surface = RecordingSurface::default();
        let outcome = pipeline
            .submit("hello", &mut surface)
            .await
            .expect("submit failed");

        assert_eq!(outcome, SubmitOutcome::Busy);
        // No session, transcript, or surface changes whatsoever.
        assert!(surface.events.is_empty());
        assert!(pipeline.transcript().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Sending(1));
    }

    #[tokio::test]
    async fn test_cancelled_prompt_returns_to_idle_without_network() {
        let (mut pipeline, _dir) = build_pipeline(None);
        let mut surface = RecordingSurface::default();

        let outcome = pipeline
            .submit("hello", &mut surface)
            .await
            .expect("submit failed");

        assert_eq!(outcome, SubmitOutcome::AuthRequired);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(surface.input_enabled, Some(true));
        assert!(surface
            .events
            .iter()
            .any(|e| e.contains("Authentication required")));
        // The user message was never rendered or persisted.
        assert!(pipeline.transcript().is_empty());
        assert!(!surface.events.iter().any(|e| e.starts_with("user:")));
    }

    #[tokio::test]
    async fn test_failed_send_reenables_input_and_toasts() {
        let (mut pipeline, _dir) = build_pipeline(Some(PromptedCredentials {
            credentials: Credentials::new("user", "pass"),
            remember: false,
        }));
        let mut surface = RecordingSurface::default();

        let outcome = pipeline
            .submit("hello", &mut surface)
            .await
            .expect("submit failed");

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(surface.input_enabled, Some(true));
        assert!(surface
            .events
            .iter()
            .any(|e| e.contains("Failed to send message")));
        // Placeholder appeared and was removed.
        assert!(surface.events.contains(&"typing".to_string()));
        assert!(surface.events.contains(&"typing-cleared".to_string()));
        // The user message is kept in the transcript even on failure.
        assert_eq!(pipeline.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_new_chat_rotates_ids_and_clears_transcript() {
        let (mut pipeline, _dir) = build_pipeline(None);
        let old_conversation = pipeline.session().conversation_id.clone();

        assert!(pipeline.new_chat());
        assert_ne!(pipeline.session().conversation_id, old_conversation);
        assert!(pipeline.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_new_chat_rejected_while_busy() {
        let (mut pipeline, _dir) = build_pipeline(None);
        pipeline.set_state(PipelineState::Streaming);
        assert!(!pipeline.new_chat());
    }

    #[tokio::test]
    async fn test_open_conversation_unknown_id() {
        let (mut pipeline, _dir) = build_pipeline(None);
        assert!(!pipeline.open_conversation("conv_missing"));
    }
}
