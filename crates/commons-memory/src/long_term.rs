//! Append-only long-term memory with structured filters and retrieval.
//!
//! Every record is a timestamped, poignancy-scored text with free-form
//! tags and an embedding vector computed at insert time. Records are
//! immutable once written: retrieval never mutates the store, and nothing
//! is deleted within a run (the store is recreated at agent
//! (re)initialization, optionally from a snapshot).
//!
//! Queries come in two shapes:
//!
//! - [`LongTermMemory::query`] -- structured selection by metadata
//!   ([`MemoryFilter`]), most-recent-first, truncated to a limit.
//! - [`LongTermMemory::relevant_memories`] -- ranked retrieval for a text
//!   query, scoring a bounded candidate pool by recency, poignancy, and
//!   embedding similarity (see [`retrieval`](crate::retrieval)).

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use commons_types::MemoryId;

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::MemoryError;
use crate::retrieval::{min_max_normalize, recency_score};

/// Game-time format used by created-at strings.
const GAME_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bound on how many records are scored per ranked retrieval.
const CANDIDATE_POOL: usize = 100;

/// Parse a game-time string into a numeric timestamp (seconds).
///
/// # Errors
///
/// Returns [`MemoryError::InvalidTimestamp`] when the string does not
/// match `%Y-%m-%d %H:%M:%S`.
pub fn parse_game_time(created_at: &str) -> Result<i64, MemoryError> {
    NaiveDateTime::parse_from_str(created_at, GAME_TIME_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_parse| MemoryError::InvalidTimestamp(String::from(created_at)))
}

// ---------------------------------------------------------------------------
// Records and metadata
// ---------------------------------------------------------------------------

/// Metadata stored with every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Game time the memory was created (`%Y-%m-%d %H:%M:%S`).
    pub created_at: String,
    /// Numeric timestamp derived from `created_at`, for ordering and
    /// `$gt`-style comparisons.
    pub timestamp: i64,
    /// Integer salience score.
    pub poignancy: i32,
    /// Free-form tags (e.g. `type -> perception`).
    pub tags: BTreeMap<String, String>,
}

/// One immutable long-term memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Generated unique id.
    pub id: MemoryId,
    /// The memory text.
    pub text: String,
    /// Stored metadata.
    pub metadata: MemoryMetadata,
    /// Embedding of `text`, computed at insert time.
    pub embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// A structured predicate over record metadata.
///
/// Keys `created_at`, `poignancy`, and `timestamp` address the built-in
/// metadata fields; any other key addresses a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemoryFilter {
    /// Field or tag equals the given string value. Numeric fields
    /// compare against the value parsed as an integer.
    Eq {
        /// Metadata field or tag name.
        key: String,
        /// Value to match.
        value: String,
    },
    /// Numeric field is strictly greater than the given value.
    Gt {
        /// Metadata field name (`timestamp` or `poignancy`).
        key: String,
        /// Exclusive lower bound.
        value: i64,
    },
    /// All sub-filters match.
    And(Vec<MemoryFilter>),
}

impl MemoryFilter {
    /// Evaluate the predicate against a record's metadata.
    pub fn matches(&self, metadata: &MemoryMetadata) -> bool {
        match self {
            Self::Eq { key, value } => match key.as_str() {
                "created_at" => metadata.created_at == *value,
                "poignancy" => {
                    value.parse::<i32>().ok() == Some(metadata.poignancy)
                }
                "timestamp" => {
                    value.parse::<i64>().ok() == Some(metadata.timestamp)
                }
                tag => metadata.tags.get(tag) == Some(value),
            },
            Self::Gt { key, value } => match key.as_str() {
                "timestamp" => metadata.timestamp > *value,
                "poignancy" => i64::from(metadata.poignancy) > *value,
                _ => false,
            },
            Self::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }

    /// Convenience: equality on a tag or field.
    pub fn eq(key: &str, value: &str) -> Self {
        Self::Eq {
            key: String::from(key),
            value: String::from(value),
        }
    }

    /// Convenience: strict greater-than on a numeric field.
    pub fn gt(key: &str, value: i64) -> Self {
        Self::Gt {
            key: String::from(key),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Parallel-array result of a structured query.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQueryResult {
    /// Record ids, in result order.
    pub ids: Vec<MemoryId>,
    /// Record texts, in result order.
    pub documents: Vec<String>,
    /// Record metadata, in result order.
    pub metadatas: Vec<MemoryMetadata>,
    /// Embeddings, present only when requested.
    pub embeddings: Option<Vec<Vec<f32>>>,
}

// ---------------------------------------------------------------------------
// The store
// ---------------------------------------------------------------------------

/// An agent's append-only long-term memory.
///
/// Each agent owns a disjoint store; one pipeline writes at a time and
/// batched writes are atomic per call (Rust's `&mut` receiver enforces
/// both). The embedder is injected so tests and offline runs stay
/// deterministic.
pub struct LongTermMemory {
    records: Vec<MemoryRecord>,
    embedder: Box<dyn Embedder + Send + Sync>,
}

impl core::fmt::Debug for LongTermMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LongTermMemory")
            .field("records", &self.records.len())
            .finish()
    }
}

impl LongTermMemory {
    /// Create an empty store with the given embedder.
    pub fn new(embedder: Box<dyn Embedder + Send + Sync>) -> Self {
        Self {
            records: Vec::new(),
            embedder,
        }
    }

    /// Create a store pre-populated from a snapshot.
    pub fn from_records(
        embedder: Box<dyn Embedder + Send + Sync>,
        records: Vec<MemoryRecord>,
    ) -> Self {
        Self { records, embedder }
    }

    /// Number of stored records.
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order (for snapshotting).
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Append one memory.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidTimestamp`] when `created_at` is not
    /// valid game time.
    pub fn add_memory(
        &mut self,
        text: &str,
        created_at: &str,
        poignancy: i32,
        tags: &BTreeMap<String, String>,
    ) -> Result<MemoryId, MemoryError> {
        let timestamp = parse_game_time(created_at)?;
        let id = MemoryId::new();
        let embedding = self.embedder.embed(text);
        self.records.push(MemoryRecord {
            id,
            text: String::from(text),
            metadata: MemoryMetadata {
                created_at: String::from(created_at),
                timestamp,
                poignancy,
                tags: tags.clone(),
            },
            embedding,
        });
        debug!(id = %id, poignancy, "memory stored");
        Ok(id)
    }

    /// Append a batch of memories with scalar broadcasting.
    ///
    /// `created_ats` and `poignancies` may be length 1 (broadcast across
    /// the batch) or exactly `texts.len()`. The single tag map applies to
    /// every record. The whole batch is validated before anything is
    /// written, so a failed call appends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::BatchLengthMismatch`] on inconsistent
    /// lengths, or [`MemoryError::InvalidTimestamp`] on bad game time.
    pub fn add_memories(
        &mut self,
        texts: &[String],
        created_ats: &[String],
        poignancies: &[i32],
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<MemoryId>, MemoryError> {
        let expected = texts.len();
        if created_ats.len() != 1 && created_ats.len() != expected {
            return Err(MemoryError::BatchLengthMismatch {
                field: "created_ats",
                expected,
                actual: created_ats.len(),
            });
        }
        if poignancies.len() != 1 && poignancies.len() != expected {
            return Err(MemoryError::BatchLengthMismatch {
                field: "poignancies",
                expected,
                actual: poignancies.len(),
            });
        }
        // Validate all timestamps up front: the batch is atomic.
        for created_at in created_ats {
            parse_game_time(created_at)?;
        }

        let mut ids = Vec::with_capacity(expected);
        for (i, text) in texts.iter().enumerate() {
            let created_at = created_ats
                .get(if created_ats.len() == 1 { 0 } else { i })
                .map(String::as_str)
                .unwrap_or_default();
            let poignancy = poignancies
                .get(if poignancies.len() == 1 { 0 } else { i })
                .copied()
                .unwrap_or_default();
            ids.push(self.add_memory(text, created_at, poignancy, tags)?);
        }
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Structured queries
    // -----------------------------------------------------------------------

    /// Select records by metadata, most-recent-first by insertion.
    ///
    /// `limit` truncates after filtering. With `reversed` the selected
    /// window is flipped back to chronological order (oldest of the
    /// window first) without changing which records were selected.
    pub fn query(
        &self,
        limit: usize,
        filter: Option<&MemoryFilter>,
        include_embeddings: bool,
        reversed: bool,
    ) -> MemoryQueryResult {
        let mut selected: Vec<&MemoryRecord> = self
            .records
            .iter()
            .rev()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata)))
            .take(limit)
            .collect();

        if reversed {
            selected.reverse();
        }

        MemoryQueryResult {
            ids: selected.iter().map(|r| r.id).collect(),
            documents: selected.iter().map(|r| r.text.clone()).collect(),
            metadatas: selected.iter().map(|r| r.metadata.clone()).collect(),
            embeddings: include_embeddings
                .then(|| selected.iter().map(|r| r.embedding.clone()).collect()),
        }
    }

    // -----------------------------------------------------------------------
    // Ranked retrieval
    // -----------------------------------------------------------------------

    /// Return up to `max_results` memory texts ranked by relevance to a
    /// query.
    ///
    /// The candidate pool is the most recent [`CANDIDATE_POOL`] records
    /// matching `filter`, kept in insertion order. Each candidate scores
    /// `0.99^Δhours + poignancy + similarity`, where poignancy and
    /// similarity are min-max normalized across the pool (an all-equal
    /// column normalizes to zero) and Δhours is measured against the
    /// newest candidate. Ties keep insertion order.
    pub fn relevant_memories(
        &self,
        query: &str,
        max_results: usize,
        filter: Option<&MemoryFilter>,
    ) -> Vec<String> {
        let mut candidates: Vec<&MemoryRecord> = self
            .records
            .iter()
            .rev()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata)))
            .take(CANDIDATE_POOL)
            .collect();
        candidates.reverse(); // back to insertion order for stable ties
        if candidates.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let query_embedding = self.embedder.embed(query);

        let newest_timestamp = candidates
            .iter()
            .map(|r| r.metadata.timestamp)
            .max()
            .unwrap_or(0);

        let poignancies: Vec<f64> = candidates
            .iter()
            .map(|r| f64::from(r.metadata.poignancy))
            .collect();
        let similarities: Vec<f64> = candidates
            .iter()
            .map(|r| f64::from(cosine_similarity(&query_embedding, &r.embedding)))
            .collect();
        let poignancies = min_max_normalize(&poignancies);
        let similarities = min_max_normalize(&similarities);

        let mut scored: Vec<(f64, &MemoryRecord)> = candidates
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let delta_seconds = newest_timestamp
                    .saturating_sub(r.metadata.timestamp)
                    .max(0);
                let delta_seconds =
                    u32::try_from(delta_seconds).unwrap_or(u32::MAX);
                let delta_hours = f64::from(delta_seconds) / 3600.0;
                let score = recency_score(delta_hours)
                    + poignancies.get(i).copied().unwrap_or(0.0)
                    + similarities.get(i).copied().unwrap_or(0.0);
                (score, *r)
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(max_results)
            .map(|(_, r)| r.text.clone())
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
