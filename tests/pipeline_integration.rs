//! End-to-end pipeline behavior: prompt, send, stream, persist, and the
//! terminal-state invariants on every exit path.

mod common;

use common::{create_client, create_test_store, RecordingSurface, TestStore};

use async_trait::async_trait;
use chatwire::config::ChatConfig;
use chatwire::conversations::MessageRole;
use chatwire::credentials::{
    CredentialPrompter, CredentialStore, Credentials, PromptedCredentials,
};
use chatwire::pipeline::{PipelineState, SendPipeline, SubmitOutcome, ToastKind};
use chatwire::store::KvStore;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Prompter that hands out fixed credentials and counts invocations.
struct CountingPrompter {
    reply: Option<PromptedCredentials>,
    calls: AtomicUsize,
}

impl CountingPrompter {
    fn with(credentials: Credentials, remember: bool) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(PromptedCredentials {
                credentials,
                remember,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn cancelling() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompter for CountingPrompter {
    async fn prompt(
        &self,
        _existing: Option<&Credentials>,
    ) -> chatwire::error::Result<Option<PromptedCredentials>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn build_pipeline(
    store: &TestStore,
    server_url: &str,
    prompter: Arc<CountingPrompter>,
) -> SendPipeline {
    SendPipeline::new(
        create_client(store, server_url),
        store.credentials.clone(),
        store.conversations.clone(),
        prompter,
        ChatConfig::default(),
    )
}

async fn mount_reply(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_happy_path_prompts_sends_streams_and_persists() {
    let server = MockServer::start().await;
    mount_reply(&server, json!({"output": "hello human", "model": "claude"})).await;

    let store = create_test_store();
    let prompter = CountingPrompter::with(Credentials::new("user", "pass"), true);
    let mut pipeline = build_pipeline(&store, &server.uri(), Arc::clone(&prompter));
    let mut surface = RecordingSurface::default();

    let outcome = pipeline
        .submit("hello world", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::Sent);
    assert_eq!(prompter.calls(), 1);
    assert_eq!(pipeline.state(), PipelineState::Idle);

    // Input disabled at entry and re-enabled at the terminal transition.
    assert_eq!(surface.input_states.first(), Some(&false));
    assert_eq!(surface.input_states.last(), Some(&true));

    // Typing placeholder appeared and was removed before streaming.
    assert_eq!(surface.typing_events, vec!["started", "cleared"]);

    // Frames are cumulative prefixes ending in the full text.
    assert!(!surface.frames.is_empty());
    for pair in surface.frames.windows(2) {
        assert!(pair[1].starts_with(&pair[0]));
    }
    assert_eq!(surface.frames.last().map(String::as_str), Some("hello human"));
    assert_eq!(surface.assistant_messages, vec!["hello human"]);

    // Transcript and persisted conversation agree.
    assert_eq!(pipeline.transcript().len(), 2);
    let saved = store
        .conversations
        .get(&pipeline.session().conversation_id)
        .expect("conversation persisted");
    assert_eq!(saved.title, "Hello World");
    assert_eq!(saved.messages.len(), 2);
    assert_eq!(saved.messages[0].role, MessageRole::User);
    assert_eq!(saved.messages[1].content, "hello human");

    // No error toast on success.
    assert!(surface
        .toasts
        .iter()
        .all(|(kind, _)| *kind != ToastKind::Error));
}

#[tokio::test]
async fn test_cached_credentials_skip_prompt() {
    let server = MockServer::start().await;
    mount_reply(&server, json!({"output": "again"})).await;

    let store = create_test_store();
    common::seed_credentials(&store);
    let prompter = CountingPrompter::with(Credentials::new("other", "other"), false);
    let mut pipeline = build_pipeline(&store, &server.uri(), Arc::clone(&prompter));
    let mut surface = RecordingSurface::default();

    let outcome = pipeline
        .submit("hi", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::Sent);
    assert_eq!(prompter.calls(), 0);
}

#[tokio::test]
async fn test_remembered_credentials_survive_restart_without_prompt() {
    let server = MockServer::start().await;
    mount_reply(&server, json!({"output": "ok"})).await;

    let store = create_test_store();
    let prompter = CountingPrompter::with(Credentials::new("user", "pass"), true);

    {
        let mut pipeline = build_pipeline(&store, &server.uri(), Arc::clone(&prompter));
        let mut surface = RecordingSurface::default();
        pipeline
            .submit("first message", &mut surface)
            .await
            .expect("submit failed");
        assert_eq!(prompter.calls(), 1);
    }

    // Simulated page reload: a fresh credential store over the same data.
    let reopened = KvStore::open(store.dir.path().join("store")).expect("reopen failed");
    let fresh_credentials = CredentialStore::new(reopened);
    assert_eq!(
        fresh_credentials.get(),
        Some(Credentials::new("user", "pass"))
    );
}

#[tokio::test]
async fn test_cancelled_prompt_aborts_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = create_test_store();
    let mut pipeline = build_pipeline(&store, &server.uri(), CountingPrompter::cancelling());
    let mut surface = RecordingSurface::default();

    let outcome = pipeline
        .submit("hello", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::AuthRequired);
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(surface.input_states.last(), Some(&true));
    assert!(surface
        .toasts
        .iter()
        .any(|(kind, message)| *kind == ToastKind::Error
            && message.contains("Authentication required")));
}

#[tokio::test]
async fn test_401_surfaces_auth_rejection_and_purges_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_test_store();
    common::seed_credentials(&store);
    let prompter = CountingPrompter::with(Credentials::new("x", "x"), false);
    let mut pipeline = build_pipeline(&store, &server.uri(), prompter);
    let mut surface = RecordingSurface::default();

    let outcome = pipeline
        .submit("hello", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::AuthRejected);
    assert!(store.credentials.get().is_none());
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(surface.input_states.last(), Some(&true));
    assert!(surface
        .toasts
        .iter()
        .any(|(_, message)| message.contains("Authentication failed")));
}

#[tokio::test]
async fn test_user_cancel_midflight_no_error_toast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"output": "slow"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = create_test_store();
    common::seed_credentials(&store);
    let prompter = CountingPrompter::with(Credentials::new("x", "x"), false);
    let mut pipeline = build_pipeline(&store, &server.uri(), prompter);
    let mut surface = RecordingSurface::default();

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let outcome = pipeline
        .submit("hello", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::Cancelled);
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(surface.input_states.last(), Some(&true));
    // Cancellation is a distinct outcome, never an error toast.
    assert!(surface.toasts.is_empty());
    // The typing placeholder was removed on the way out.
    assert_eq!(surface.typing_events, vec!["started", "cleared"]);

    // A distinct cancelled log entry was written.
    let logs = store.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].kind, chatwire::logbook::LogKind::Cancelled);
}

#[tokio::test]
async fn test_streaming_skipped_for_very_long_reply() {
    let server = MockServer::start().await;
    let long_reply = "word ".repeat(600);
    mount_reply(&server, json!({ "output": long_reply.clone() })).await;

    let store = create_test_store();
    common::seed_credentials(&store);
    let prompter = CountingPrompter::with(Credentials::new("x", "x"), false);
    let mut pipeline = build_pipeline(&store, &server.uri(), prompter);
    let mut surface = RecordingSurface::default();

    let outcome = pipeline
        .submit("talk a lot", &mut surface)
        .await
        .expect("submit failed");

    assert_eq!(outcome, SubmitOutcome::Sent);
    // One frame containing the entire (trimmed) reply, no progressive reveal.
    assert_eq!(surface.frames.len(), 1);
    assert_eq!(surface.frames[0], long_reply.trim());
}

#[tokio::test]
async fn test_consecutive_sends_replace_conversation_record() {
    let server = MockServer::start().await;
    mount_reply(&server, json!({"output": "reply"})).await;

    let store = create_test_store();
    common::seed_credentials(&store);
    let prompter = CountingPrompter::with(Credentials::new("x", "x"), false);
    let mut pipeline = build_pipeline(&store, &server.uri(), prompter);

    let mut surface = RecordingSurface::default();
    pipeline
        .submit("first question", &mut surface)
        .await
        .expect("submit failed");
    pipeline
        .submit("second question", &mut surface)
        .await
        .expect("submit failed");

    // One record for the whole session, holding the full transcript.
    let all = store.conversations.list();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].messages.len(), 4);
    assert_eq!(all[0].title, "First Question");
}
