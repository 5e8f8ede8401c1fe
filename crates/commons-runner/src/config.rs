//! Configuration for the agent runner.
//!
//! All configuration is loaded from environment variables with documented
//! defaults, so the demo binary runs with no environment at all (it falls
//! back to the scripted backend) while deployments point the runner at
//! real LLM endpoints.

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Primary LLM backend configuration.
    pub primary_backend: LlmBackendConfig,
    /// Higher-capacity fallback backend, used once per call when the
    /// primary rejects a prompt as too long.
    pub fallback_backend: Option<LlmBackendConfig>,
    /// Directory of prompt templates; `None` uses the builtin set.
    pub templates_dir: Option<String>,
    /// Directory for memory snapshots.
    pub snapshot_dir: String,
    /// Cognition tunables.
    pub cognition: CognitionConfig,
    /// Retry policy for model calls.
    pub retry: RetryConfig,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API.
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Deterministic scripted responses (tests and offline demos).
    Scripted,
}

/// Tunable cognition parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitionConfig {
    /// Max observations retained per tick after distance filtering.
    pub attention_bandwidth: usize,
    /// Accumulated poignancy at which a reflection fires.
    pub reflection_threshold: u32,
    /// Poignancy assigned to each perception memory.
    pub perception_poignancy: u32,
    /// Poignancy assigned to each reflection insight.
    pub reflection_poignancy: u32,
    /// Poignancy assigned to each understanding update.
    pub understanding_poignancy: u32,
    /// How many salient questions a reflection asks.
    pub reflection_question_count: usize,
    /// How many supporting memories are retrieved per question.
    pub retrieval_depth: usize,
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self {
            attention_bandwidth: 10,
            reflection_threshold: 20,
            perception_poignancy: 3,
            reflection_poignancy: 8,
            understanding_poignancy: 5,
            reflection_question_count: 3,
            retrieval_depth: 5,
        }
    }
}

/// Retry policy for transient model-call failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per call (first try included).
    pub max_attempts: u32,
    /// Base backoff delay; attempt `n` waits `base * 2^n` plus jitter.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Backend variables (`LLM_DEFAULT_*` for the primary,
    /// `LLM_FALLBACK_*` for the escalation backend):
    /// - `LLM_DEFAULT_BACKEND` -- `openai`, `anthropic`, or `scripted`
    ///   (default `scripted`)
    /// - `LLM_DEFAULT_API_URL` / `LLM_DEFAULT_API_KEY` /
    ///   `LLM_DEFAULT_MODEL` -- required for non-scripted backends
    ///
    /// Optional variables:
    /// - `TEMPLATES_DIR` -- prompt template directory (default: builtin)
    /// - `SNAPSHOT_DIR` -- memory snapshot directory (default `snapshots`)
    /// - `ATTENTION_BANDWIDTH` (default 10)
    /// - `REFLECTION_THRESHOLD` (default 20)
    /// - `PERCEPTION_POIGNANCY` (default 3)
    /// - `REFLECTION_POIGNANCY` (default 8)
    /// - `MAX_RETRY_ATTEMPTS` (default 3)
    /// - `RETRY_BASE_DELAY_MS` (default 200)
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] when a variable is present but
    /// unparseable, or a non-scripted backend is missing its URL/key.
    pub fn from_env() -> Result<Self, RunnerError> {
        let primary_backend =
            load_backend_config("LLM_DEFAULT")?.unwrap_or_else(scripted_backend);
        let fallback_backend = load_backend_config("LLM_FALLBACK")?;

        let templates_dir = std::env::var("TEMPLATES_DIR").ok();
        let snapshot_dir =
            std::env::var("SNAPSHOT_DIR").unwrap_or_else(|_| String::from("snapshots"));

        let cognition = CognitionConfig {
            attention_bandwidth: env_parse("ATTENTION_BANDWIDTH", 10)?,
            reflection_threshold: env_parse("REFLECTION_THRESHOLD", 20)?,
            perception_poignancy: env_parse("PERCEPTION_POIGNANCY", 3)?,
            reflection_poignancy: env_parse("REFLECTION_POIGNANCY", 8)?,
            ..CognitionConfig::default()
        };

        let retry = RetryConfig {
            max_attempts: env_parse("MAX_RETRY_ATTEMPTS", 3)?,
            base_delay_ms: env_parse("RETRY_BASE_DELAY_MS", 200)?,
        };

        Ok(Self {
            primary_backend,
            fallback_backend,
            templates_dir,
            snapshot_dir,
            cognition,
            retry,
        })
    }
}

/// The zero-configuration scripted backend.
fn scripted_backend() -> LlmBackendConfig {
    LlmBackendConfig {
        backend_type: BackendType::Scripted,
        api_url: String::new(),
        api_key: String::new(),
        model: String::from("scripted"),
    }
}

/// Load one backend's configuration from `<prefix>_*` variables.
///
/// Returns `Ok(None)` when `<prefix>_BACKEND` is unset.
fn load_backend_config(
    prefix: &str,
) -> Result<Option<LlmBackendConfig>, RunnerError> {
    let Ok(backend) = std::env::var(format!("{prefix}_BACKEND")) else {
        return Ok(None);
    };

    let backend_type = match backend.to_lowercase().as_str() {
        "openai" => BackendType::OpenAi,
        "anthropic" => BackendType::Anthropic,
        "scripted" => BackendType::Scripted,
        other => {
            return Err(RunnerError::Config(format!(
                "unknown backend type '{other}' in {prefix}_BACKEND"
            )));
        }
    };

    if backend_type == BackendType::Scripted {
        return Ok(Some(scripted_backend()));
    }

    let api_url = required_var(&format!("{prefix}_API_URL"))?;
    let api_key = required_var(&format!("{prefix}_API_KEY"))?;
    let model = required_var(&format!("{prefix}_MODEL"))?;

    Ok(Some(LlmBackendConfig {
        backend_type,
        api_url,
        api_key,
        model,
    }))
}

/// Read a required environment variable.
fn required_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|_missing| RunnerError::Config(format!("missing {name}")))
}

/// Read an optional environment variable with a parse and a default.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, RunnerError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_bad| RunnerError::Config(format!("invalid {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cognition = CognitionConfig::default();
        assert!(cognition.attention_bandwidth > 0);
        assert!(cognition.reflection_threshold > cognition.perception_poignancy);

        let retry = RetryConfig::default();
        assert!(retry.max_attempts >= 1);
    }

    #[test]
    fn missing_backend_env_defaults_to_scripted() {
        // Environment variables are process-global; this test relies on
        // the conventional case where no LLM_* variables are exported in
        // the test environment.
        if std::env::var("LLM_DEFAULT_BACKEND").is_ok() {
            return;
        }
        let config = RunnerConfig::from_env();
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.primary_backend.backend_type, BackendType::Scripted);
            assert!(config.fallback_backend.is_none());
        }
    }
}
