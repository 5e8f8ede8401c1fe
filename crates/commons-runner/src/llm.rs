//! LLM backend abstraction, retry policy, and the scripted test double.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs, the Anthropic
//! Messages API, and a deterministic scripted backend used by tests and
//! offline demos. HTTP backends communicate via `reqwest`.
//!
//! [`Reasoner`] is what the cognition phases actually call: it renders
//! the prompt, drives the primary backend with bounded
//! exponential-backoff retries (with jitter), escalates once to the
//! fallback backend when the primary rejects a prompt as too long, and
//! scrapes the response into a field map.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::{BackendType, LlmBackendConfig, RetryConfig};
use crate::error::RunnerError;
use crate::parse::parse_fields;
use crate::prompt::{PromptEngine, RenderedPrompt};

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// Deterministic canned responses.
    Scripted(ScriptedBackend),
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] on transport or extraction
    /// failure, or [`RunnerError::PromptTooLong`] when the backend
    /// rejected the prompt for length.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
            Self::Scripted(backend) => backend.complete(prompt),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Scripted(_) => "scripted",
        }
    }
}

/// Classify an HTTP error body: context-window overflows become
/// [`RunnerError::PromptTooLong`] so the caller can escalate.
fn classify_error_body(status: reqwest::StatusCode, body: &str) -> RunnerError {
    let lowered = body.to_lowercase();
    if lowered.contains("too long")
        || lowered.contains("context length")
        || lowered.contains("context_length")
        || lowered.contains("maximum context")
    {
        RunnerError::PromptTooLong(format!("{status}: {body}"))
    } else {
        RunnerError::LlmBackend(format!("backend returned {status}: {body}"))
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Send a prompt and return the response text.
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": 512
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(classify_error_body(status, &error_body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - System prompt is a top-level field, not a message
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Send a prompt and return the response text.
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/messages", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 512,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(classify_error_body(status, &error_body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                RunnerError::LlmBackend(format!("Anthropic response parse failed: {e}"))
            })?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Scripted backend (deterministic test double)
// ---------------------------------------------------------------------------

/// Deterministic backend replaying canned responses per template id.
///
/// Responses queue FIFO per template; when a queue runs dry the optional
/// default response is returned instead, and with no default the call
/// fails like an unreachable backend would.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<BTreeMap<String, VecDeque<String>>>,
    default_response: Option<String>,
}

impl ScriptedBackend {
    /// Create an empty scripted backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scripted backend that answers every unmatched call with
    /// the same response.
    pub fn with_default(response: &str) -> Self {
        Self {
            responses: Mutex::new(BTreeMap::new()),
            default_response: Some(String::from(response)),
        }
    }

    /// Queue a response for a template id.
    pub fn push_response(&self, template_id: &str, response: &str) {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(String::from(template_id))
                .or_default()
                .push_back(String::from(response));
        }
    }

    /// Pop the next response for the prompt's template.
    fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        if let Ok(mut responses) = self.responses.lock()
            && let Some(queue) = responses.get_mut(&prompt.template_id)
            && let Some(response) = queue.pop_front()
        {
            return Ok(response);
        }
        self.default_response.clone().ok_or_else(|| {
            RunnerError::LlmBackend(format!(
                "scripted backend has no response for '{}'",
                prompt.template_id
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
        BackendType::Scripted => LlmBackend::Scripted(ScriptedBackend::new()),
    }
}

// ---------------------------------------------------------------------------
// Reasoner: retries, escalation, and field scraping
// ---------------------------------------------------------------------------

/// The reasoning collaborator the cognition phases call.
///
/// Owns the prompt engine, the primary backend, and an optional
/// higher-capacity fallback backend used exactly once per call when the
/// primary rejects a prompt as too long.
pub struct Reasoner {
    primary: LlmBackend,
    fallback: Option<LlmBackend>,
    prompts: PromptEngine,
    retry: RetryConfig,
}

impl Reasoner {
    /// Assemble a reasoner from its parts.
    pub fn new(
        primary: LlmBackend,
        fallback: Option<LlmBackend>,
        prompts: PromptEngine,
        retry: RetryConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            prompts,
            retry,
        }
    }

    /// Render a template with ordered inputs, call the model, and scrape
    /// the response into a field map.
    ///
    /// Unparseable output yields an empty map (the caller treats that as
    /// "no usable result"), so only template, transport, and exhaustion
    /// failures surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] on render failure, or the last
    /// backend error once retries and escalation are exhausted.
    pub async fn complete(
        &self,
        template_id: &str,
        inputs: &[String],
    ) -> Result<BTreeMap<String, String>, RunnerError> {
        let prompt = self.prompts.render(template_id, inputs)?;
        let raw = self.complete_raw(&prompt).await?;
        debug!(template = template_id, "collaborator responded");
        Ok(parse_fields(&raw))
    }

    /// Drive the primary backend with bounded backoff retries, escalating
    /// once to the fallback on a prompt-too-long rejection.
    async fn complete_raw(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = RunnerError::LlmBackend(String::from("no attempts made"));

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }

            match self.primary.complete(prompt).await {
                Ok(raw) => return Ok(raw),
                Err(RunnerError::PromptTooLong(detail)) => {
                    // Escalate exactly once; no point retrying the same
                    // oversized prompt against the same backend.
                    return match &self.fallback {
                        Some(fallback) => {
                            warn!(
                                template = prompt.template_id,
                                backend = fallback.name(),
                                "prompt too long, escalating to fallback backend"
                            );
                            fallback.complete(prompt).await
                        }
                        None => Err(RunnerError::PromptTooLong(detail)),
                    };
                }
                Err(e) => {
                    warn!(
                        template = prompt.template_id,
                        attempt,
                        error = %e,
                        "collaborator call failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Exponential backoff with jitter for the given attempt number.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.retry.base_delay_ms.max(1);
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = base.saturating_mul(2_u64.saturating_pow(exponent));
        let jitter = rand::rng().random_range(0..=base);
        Duration::from_millis(scaled.saturating_add(jitter))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
