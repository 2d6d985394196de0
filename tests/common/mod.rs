use chatwire::config::WebhookConfig;
use chatwire::conversations::ConversationManager;
use chatwire::credentials::{CredentialStore, Credentials};
use chatwire::logbook::LogStore;
use chatwire::pipeline::{ChatSurface, ToastKind};
use chatwire::store::KvStore;
use chatwire::webhook::WebhookClient;
use tempfile::TempDir;

#[allow(dead_code)]
pub struct TestStore {
    pub kv: KvStore,
    pub credentials: CredentialStore,
    pub conversations: ConversationManager,
    pub logs: LogStore,
    // Keeps the directory alive for the duration of the test.
    pub dir: TempDir,
}

#[allow(dead_code)]
pub fn create_test_store() -> TestStore {
    let dir = TempDir::new().expect("failed to create tempdir");
    let kv = KvStore::open(dir.path().join("store")).expect("failed to open store");
    TestStore {
        credentials: CredentialStore::new(kv.clone()),
        conversations: ConversationManager::new(kv.clone()),
        logs: LogStore::new(kv.clone()),
        kv,
        dir,
    }
}

/// Webhook config pointing at a mock server, with fast retries for tests.
#[allow(dead_code)]
pub fn test_webhook_config(url: &str) -> WebhookConfig {
    WebhookConfig {
        url: url.to_string(),
        timeout_seconds: 5,
        retry_attempts: 2,
        retry_delay_ms: 10,
    }
}

#[allow(dead_code)]
pub fn create_client(store: &TestStore, url: &str) -> WebhookClient {
    WebhookClient::new(
        test_webhook_config(url),
        store.credentials.clone(),
        store.logs.clone(),
    )
    .expect("failed to create webhook client")
}

#[allow(dead_code)]
pub fn seed_credentials(store: &TestStore) {
    store
        .credentials
        .store(Credentials::new("user", "pass"), false)
        .expect("failed to seed credentials");
}

/// Surface that records pipeline events for assertions.
#[derive(Default)]
pub struct RecordingSurface {
    pub user_messages: Vec<String>,
    pub frames: Vec<String>,
    pub assistant_messages: Vec<String>,
    pub toasts: Vec<(ToastKind, String)>,
    pub input_states: Vec<bool>,
    pub typing_events: Vec<&'static str>,
}

impl ChatSurface for RecordingSurface {
    fn user_message(&mut self, content: &str, _timestamp: &str) {
        self.user_messages.push(content.to_string());
    }
    fn typing_started(&mut self) {
        self.typing_events.push("started");
    }
    fn typing_cleared(&mut self) {
        self.typing_events.push("cleared");
    }
    fn stream_frame(&mut self, visible: &str) {
        self.frames.push(visible.to_string());
    }
    fn assistant_message(&mut self, content: &str, _timestamp: &str) {
        self.assistant_messages.push(content.to_string());
    }
    fn toast(&mut self, message: &str, kind: ToastKind) {
        self.toasts.push((kind, message.to_string()));
    }
    fn input_enabled(&mut self, enabled: bool) {
        self.input_states.push(enabled);
    }
}
