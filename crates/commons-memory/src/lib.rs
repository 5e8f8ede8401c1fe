//! Short-term and long-term agent memory for the Commons simulation.
//!
//! This crate owns the non-spatial half of an agent's state: the working
//! memory of the current decision cycle and the append-only store of
//! everything the agent has experienced and concluded.
//!
//! # Modules
//!
//! - [`error`] -- Error types for memory operations.
//! - [`short_term`] -- [`ShortTermMemory`], a typed working-memory
//!   registry with missing-key-reads-as-empty semantics.
//! - [`long_term`] -- [`LongTermMemory`], an append-only store of
//!   timestamped, poignancy-scored records with structured filters.
//! - [`retrieval`] -- The three-factor relevance ranking (recency,
//!   poignancy, embedding similarity).
//! - [`embedding`] -- The [`Embedder`] seam and the deterministic
//!   feature-hashing implementation.
//! - [`persistence`] -- Snapshot save/load for resuming a prior run.

pub mod embedding;
pub mod error;
pub mod long_term;
pub mod persistence;
pub mod retrieval;
pub mod short_term;

// Re-export primary types at crate root.
pub use embedding::{Embedder, HashingEmbedder, cosine_similarity};
pub use error::MemoryError;
pub use long_term::{
    LongTermMemory, MemoryFilter, MemoryMetadata, MemoryQueryResult, MemoryRecord,
    parse_game_time,
};
pub use persistence::{
    load_long_term, load_short_term, save_long_term, save_short_term,
};
pub use retrieval::{min_max_normalize, recency_score};
pub use short_term::{Reaction, ShortTermMemory};
