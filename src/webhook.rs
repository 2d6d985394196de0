//! Webhook client: the single HTTP request the whole application depends on
//!
//! Issues `POST <url>` with a JSON chat payload and Basic authorization,
//! bounded by a per-attempt timeout, a small retry budget with a linear
//! delay schedule, and cooperative cancellation. A 401 clears the stored
//! credentials and is never retried; explicit user cancellation
//! short-circuits the loop and is reported as a distinct outcome rather
//! than an error. Every terminal outcome writes exactly one log entry with
//! the elapsed duration and the 1-based attempt number it concluded at.

use crate::config::WebhookConfig;
use crate::credentials::CredentialStore;
use crate::error::{ChatwireError, Result};
use crate::logbook::{LogEntry, LogKind, LogStore};
use crate::session::now_rfc3339;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reply used when the response body has no recognizable text field.
pub const FALLBACK_REPLY: &str = "I received your message but could not generate a response.";

/// Wire payload posted to the webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub action: String,
    pub session_id: String,
    pub chat_input: String,
    pub conversation_id: String,
    pub timestamp: String,
}

impl ChatRequest {
    pub fn new(
        session_id: impl Into<String>,
        conversation_id: impl Into<String>,
        chat_input: impl Into<String>,
    ) -> Self {
        Self {
            action: "sendMessage".to_string(),
            session_id: session_id.into(),
            chat_input: chat_input.into(),
            conversation_id: conversation_id.into(),
            timestamp: now_rfc3339(),
        }
    }
}

/// Normalized successful webhook response.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub model: Option<String>,
    /// Token usage as reported by the webhook, passed through opaquely.
    pub usage: Option<Value>,
    /// Elapsed milliseconds from the first attempt to completion.
    pub duration_ms: u64,
    /// 1-based attempt number the request succeeded at.
    pub attempts: u32,
}

/// Terminal result of a send: a reply, or a user-initiated cancellation.
///
/// Failures (exhausted retries, rejected credentials) are reported through
/// the error channel instead; cancellation is deliberately not an error.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Reply(ChatReply),
    Cancelled,
}

/// Progress notifications emitted while a send is in flight, used by the
/// pipeline to mirror attempts into its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendProgress {
    /// Attempt `n` (0-based) is about to start.
    Attempt(u32),
    /// A retry delay is being waited out before attempt `next_attempt`.
    RetryWait { next_attempt: u32, delay_ms: u64 },
}

enum AttemptError {
    Transient(String),
    AuthRejected(String),
    Cancelled,
}

/// Result of response-body normalization, before timing metadata is added.
#[derive(Debug, Clone)]
pub struct NormalizedReply {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<Value>,
}

/// HTTP client for the configured webhook endpoint.
pub struct WebhookClient {
    http: reqwest::Client,
    config: WebhookConfig,
    credentials: CredentialStore,
    logs: LogStore,
}

impl WebhookClient {
    /// Create a client for the given endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(
        config: WebhookConfig,
        credentials: CredentialStore,
        logs: LogStore,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chatwire/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatwireError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            "Webhook client ready: url={}, timeout={}s, retries={}",
            config.url,
            config.timeout_seconds,
            config.retry_attempts
        );

        Ok(Self {
            http,
            config,
            credentials,
            logs,
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Send the request, retrying transient failures up to the configured
    /// budget.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome> {
        self.send_observed(request, cancel, |_| {}).await
    }

    /// Like [`WebhookClient::send`], notifying `observe` of attempt starts
    /// and retry waits.
    pub async fn send_observed<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Result<SendOutcome>
    where
        F: FnMut(SendProgress) + Send,
    {
        let auth_header = self
            .credentials
            .get()
            .ok_or(ChatwireError::AuthRequired)?
            .basic_header();

        let started = Instant::now();

        for attempt in 0..=self.config.retry_attempts {
            // Cooperative cancellation check at the top of every iteration.
            if cancel.is_cancelled() {
                self.log_cancelled(request, started, attempt + 1);
                return Ok(SendOutcome::Cancelled);
            }

            observe(SendProgress::Attempt(attempt));
            tracing::debug!(
                "Webhook attempt {}/{}",
                attempt + 1,
                self.config.retry_attempts + 1
            );

            match self.attempt(request, &auth_header, cancel).await {
                Ok(reply) => {
                    let duration_ms = elapsed_ms(started);
                    self.log_success(request, &reply, duration_ms, attempt + 1);
                    return Ok(SendOutcome::Reply(ChatReply {
                        text: reply.text,
                        model: reply.model,
                        usage: reply.usage,
                        duration_ms,
                        attempts: attempt + 1,
                    }));
                }
                Err(AttemptError::Cancelled) => {
                    self.log_cancelled(request, started, attempt + 1);
                    return Ok(SendOutcome::Cancelled);
                }
                Err(AttemptError::AuthRejected(message)) => {
                    tracing::warn!("Webhook rejected credentials: {}", message);
                    self.log_error(request, &message, started, attempt + 1);
                    return Err(ChatwireError::AuthRejected(message).into());
                }
                Err(AttemptError::Transient(message)) => {
                    if attempt < self.config.retry_attempts {
                        // Linear schedule: attempt N waits delay * (N + 1).
                        let delay = self.config.retry_delay() * (attempt + 1);
                        tracing::debug!(
                            "Webhook attempt {} failed ({}), retrying in {:?}",
                            attempt + 1,
                            message,
                            delay
                        );
                        observe(SendProgress::RetryWait {
                            next_attempt: attempt + 1,
                            delay_ms: delay.as_millis() as u64,
                        });

                        tokio::select! {
                            _ = cancel.cancelled() => {
                                self.log_cancelled(request, started, attempt + 1);
                                return Ok(SendOutcome::Cancelled);
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }

                    tracing::error!("Webhook failed after {} attempts: {}", attempt + 1, message);
                    self.log_error(request, &message, started, attempt + 1);
                    return Err(ChatwireError::Transient(message).into());
                }
            }
        }

        // The loop always returns from its final iteration.
        Err(ChatwireError::Transient("retry attempts exhausted".into()).into())
    }

    async fn attempt(
        &self,
        request: &ChatRequest,
        auth_header: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<NormalizedReply, AttemptError> {
        // Fresh cancellation scope per attempt, torn down when it returns.
        let scope = cancel.child_token();

        let pending = self
            .http
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth_header)
            .json(request)
            .send();

        let response = tokio::select! {
            _ = scope.cancelled() => return Err(AttemptError::Cancelled),
            outcome = tokio::time::timeout(self.config.timeout(), pending) => match outcome {
                Err(_) => {
                    return Err(AttemptError::Transient(format!(
                        "request timed out after {}s",
                        self.config.timeout_seconds
                    )))
                }
                Ok(Err(e)) => return Err(AttemptError::Transient(format!("network error: {}", e))),
                Ok(Ok(response)) => response,
            }
        };

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Credentials are purged immediately; a 401 is never retried.
            self.credentials.clear();
            return Err(AttemptError::AuthRejected(
                "webhook returned 401; stored credentials have been cleared".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Transient(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("failed to read response: {}", e)))?;

        normalize_reply(&body).map_err(AttemptError::Transient)
    }

    fn log_success(&self, request: &ChatRequest, reply: &NormalizedReply, duration_ms: u64, attempt: u32) {
        let mut entry = self.base_entry(LogKind::Success, request);
        entry.user_message = Some(request.chat_input.clone());
        entry.assistant_message = Some(reply.text.clone());
        entry.model = reply.model.clone();
        entry.duration = Some(duration_ms);
        entry.attempt = Some(attempt);
        self.write_entry(entry);
    }

    fn log_error(&self, request: &ChatRequest, message: &str, started: Instant, attempt: u32) {
        let mut entry = self.base_entry(LogKind::Error, request);
        entry.user_message = Some(request.chat_input.clone());
        entry.error = Some(message.to_string());
        entry.duration = Some(elapsed_ms(started));
        entry.attempt = Some(attempt);
        self.write_entry(entry);
    }

    fn log_cancelled(&self, request: &ChatRequest, started: Instant, attempt: u32) {
        let mut entry = self.base_entry(LogKind::Cancelled, request);
        entry.user_message = Some(request.chat_input.clone());
        entry.error = Some("Request cancelled by user".to_string());
        entry.duration = Some(elapsed_ms(started));
        entry.attempt = Some(attempt);
        self.write_entry(entry);
    }

    fn base_entry(&self, kind: LogKind, request: &ChatRequest) -> LogEntry {
        LogEntry::new(
            kind,
            request.session_id.clone(),
            Some(request.conversation_id.clone()),
        )
    }

    fn write_entry(&self, entry: LogEntry) {
        // Best-effort: a log write failure must never fail the send.
        if let Err(e) = self.logs.append(entry) {
            tracing::warn!("Failed to persist log entry: {}", e);
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Normalize an arbitrary response body into reply text plus optional
/// metadata.
///
/// Accepts a JSON object with a non-empty string under `output`, `message`,
/// or `response` (checked in that order), or a bare JSON string body; any
/// other JSON shape yields [`FALLBACK_REPLY`]. A body that is not valid
/// JSON at all is a transient error, surfaced as `Err` so the caller can
/// retry it.
pub fn normalize_reply(body: &str) -> std::result::Result<NormalizedReply, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("invalid JSON response: {}", e))?;

    let model = value
        .get("model")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let usage = value.get("usage").filter(|u| !u.is_null()).cloned();

    Ok(NormalizedReply {
        text: extract_text(&value),
        model,
        usage,
    })
}

fn extract_text(value: &Value) -> String {
    if let Value::String(text) = value {
        return text.trim().to_string();
    }

    if let Value::Object(map) = value {
        for key in ["output", "message", "response"] {
            if let Some(text) = map.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.trim().to_string();
                }
            }
        }
    }

    FALLBACK_REPLY.to_string()
}
