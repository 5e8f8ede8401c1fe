//! Agent cognition runtime for the Commons simulation.
//!
//! The runner orchestrates one agent's full cognition pipeline per
//! environment tick:
//!
//! ```text
//! TickInput --> Spatial merge --> Perceive --> (Understand? Plan?)
//!           --> (Reflect?) --> Act --> Step --> one PrimitiveStep
//! ```
//!
//! Every call into the reasoning model is a suspend point: the pipeline
//! blocks on the model's answer and resumes with it. Model failures never
//! abort a tick -- each phase degrades to its prior state and the loop
//! always hands the environment exactly one primitive step (or an
//! explicit no-op).
//!
//! # Modules
//!
//! - [`error`] -- Error types for the runner pipeline.
//! - [`config`] -- Environment-variable configuration.
//! - [`llm`] -- LLM backend dispatch, retry policy, and the scripted
//!   test double.
//! - [`prompt`] -- Prompt templates (`minijinja`), builtin or on-disk.
//! - [`parse`] -- Structured-field scraping from free-text responses.
//! - [`extract`] -- Substrate-specific object/agent extraction.
//! - [`perceive`] / [`plan`] / [`reflect`] / [`act`] -- The cognition
//!   phases, implemented on [`CognitiveAgent`].
//! - [`agent`] -- The per-agent state and the tick loop.

pub mod act;
pub mod agent;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod parse;
pub mod perceive;
pub mod plan;
pub mod prompt;
pub mod reflect;

// Re-export primary types at crate root.
pub use agent::{CognitiveAgent, CognitiveAgentParams};
pub use config::{
    BackendType, CognitionConfig, LlmBackendConfig, RetryConfig, RunnerConfig,
};
pub use error::RunnerError;
pub use extract::{HarvestExtractor, ObjectExtractor};
pub use llm::{LlmBackend, Reasoner, ScriptedBackend, create_backend};
pub use parse::{parse_fields, parse_yes_no};
pub use prompt::{PromptEngine, RenderedPrompt};
