//! Error types for the agent runner.
//!
//! Uses `thiserror` for typed errors that surface through the cognition
//! pipeline: configuration, prompt rendering, LLM calls, and response
//! parsing. Note the split between [`RunnerError::LlmBackend`] (generic,
//! retried with backoff) and [`RunnerError::PromptTooLong`] (escalated
//! once to the fallback backend).

/// Errors that can occur during agent runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable. Treated as
    /// transient and retried with exponential backoff.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The prompt exceeded the backend's context window. The caller
    /// retries once against the higher-capacity fallback backend.
    #[error("prompt too long: {0}")]
    PromptTooLong(String),

    /// The response could not be parsed into the expected fields.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// A memory-store operation failed.
    #[error("memory error: {0}")]
    Memory(#[from] commons_memory::MemoryError),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
