//! Remote transform: one call to a chat-completion service, with every
//! failure mode collapsed into passthrough.
//!
//! [`RemoteTransform::transform`] never returns an error. A missing
//! credential, a timeout, a non-2xx status or a response without a usable
//! message all produce [`TransformOutcome::Degraded`] carrying the original
//! content, so the page still gets written and later chunks still run.
//!
//! The service itself sits behind the [`ChatBackend`] trait.
//! [`OpenRouterBackend`] speaks the OpenAI-compatible
//! `/chat/completions` protocol; tests and library users can inject any
//! other implementation through [`crate::config::PipelineConfigBuilder::backend`].

use crate::error::TransformError;
use crate::output::TransformOutcome;
use crate::pipeline::postprocess;
use crate::prompts::render_prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default OpenRouter chat-completions endpoint.
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// A text-generation service that answers one prompt with one completion.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Send `prompt` as a single user message and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, TransformError>;
}

// ── OpenRouter / OpenAI-compatible backend ───────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 1],
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Extract the first choice's message text from a chat-completion body.
pub fn parse_completion(body: &str) -> Result<String, TransformError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TransformError::MalformedResponse {
            detail: format!("invalid JSON: {e}"),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransformError::MalformedResponse {
            detail: "no choices in response".to_string(),
        })?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| TransformError::MalformedResponse {
            detail: "first choice has no message content".to_string(),
        })?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TransformError::MalformedResponse {
            detail: "empty message content".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Chat backend for OpenRouter and any other OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenRouterBackend {
    /// Create a backend sharing `client`. `timeout` bounds each request.
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, prompt: &str) -> Result<String, TransformError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            n: 1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransformError::UpstreamFailure {
                status: e.status().map(|s| s.as_u16()),
                detail: if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransformError::UpstreamFailure {
                status: Some(status.as_u16()),
                detail: format!("failed to read body: {e}"),
            })?;

        if !status.is_success() {
            return Err(TransformError::UpstreamFailure {
                status: Some(status.as_u16()),
                detail: truncate(&body, 500),
            });
        }

        debug!(status = status.as_u16(), body_len = body.len(), "chat completion received");
        parse_completion(&body)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}\u{2026}", &s[..i]),
        None => s.to_string(),
    }
}

// ── Remote transform ─────────────────────────────────────────────────────────

/// A configured remote transform: backend, term list, and passthrough policy.
///
/// `backend = None` models a missing credential: every call degrades with
/// [`TransformError::ConfigMissing`] without touching the network.
#[derive(Clone)]
pub struct RemoteTransform {
    backend: Option<Arc<dyn ChatBackend>>,
    terms: String,
    long_content_warning: usize,
    annotate_degraded: bool,
    clean_output: bool,
}

impl std::fmt::Debug for RemoteTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTransform")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("terms_len", &self.terms.len())
            .field("long_content_warning", &self.long_content_warning)
            .field("annotate_degraded", &self.annotate_degraded)
            .field("clean_output", &self.clean_output)
            .finish()
    }
}

impl RemoteTransform {
    /// `terms` is the newline-joined do-not-translate list.
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, terms: impl Into<String>) -> Self {
        Self {
            backend,
            terms: terms.into(),
            long_content_warning: 20_000,
            annotate_degraded: true,
            clean_output: true,
        }
    }

    /// Content length (chars) above which a warning is logged.
    pub fn long_content_warning(mut self, chars: usize) -> Self {
        self.long_content_warning = chars;
        self
    }

    /// Prefix passthrough content with an explanatory note.
    pub fn annotate_degraded(mut self, v: bool) -> Self {
        self.annotate_degraded = v;
        self
    }

    /// Run [`postprocess::clean_response`] on successful responses.
    pub fn clean_output(mut self, v: bool) -> Self {
        self.clean_output = v;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Fill `template` with `content` and send it; never fails.
    pub async fn transform(&self, template: &str, content: &str, label: &str) -> TransformOutcome {
        let content_len = content.chars().count();

        let Some(backend) = self.backend.as_ref() else {
            warn!(task = label, "API key is not set. Skipping remote processing.");
            return self.degrade(content, TransformError::ConfigMissing, label);
        };

        if content.trim().is_empty() {
            warn!(task = label, content_len, "Nothing to process for {}: content is empty", label);
            return TransformOutcome::Translated(String::new());
        }

        if content_len > self.long_content_warning {
            warn!(
                task = label,
                content_len,
                "Content for {} is very long ({} characters). This might exceed API limits or take a long time.",
                label,
                content_len
            );
        }

        let prompt = render_prompt(template, content, &self.terms);
        info!(task = label, content_len, backend = backend.name(), "Processing: {}...", label);
        let start = Instant::now();

        match backend.complete(&prompt).await {
            Ok(text) => {
                let text = if self.clean_output {
                    postprocess::clean_response(&text)
                } else {
                    text.trim().to_string()
                };
                if text.is_empty() {
                    let reason = TransformError::MalformedResponse {
                        detail: "response empty after cleanup".to_string(),
                    };
                    warn!(task = label, reason = %reason, "{} returned nothing usable", label);
                    return self.degrade(content, reason, label);
                }
                info!(
                    task = label,
                    output_len = text.chars().count(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "{} successful.",
                    label
                );
                TransformOutcome::Translated(text)
            }
            Err(reason) => {
                let status = match &reason {
                    TransformError::UpstreamFailure { status, .. } => *status,
                    _ => None,
                };
                warn!(
                    task = label,
                    content_len,
                    status,
                    reason = %reason,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "{} failed; passing original content through",
                    label
                );
                self.degrade(content, reason, label)
            }
        }
    }

    fn degrade(&self, content: &str, reason: TransformError, label: &str) -> TransformOutcome {
        let note = self.annotate_degraded.then(|| reason.note(label));
        TransformOutcome::Degraded {
            original: content.to_string(),
            reason,
            note,
        }
    }
}
