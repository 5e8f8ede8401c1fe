//! Scoring primitives for ranked memory retrieval.
//!
//! A candidate memory's relevance to a query is the sum of three
//! factors:
//!
//! - **recency** -- exponential decay `0.99^Δhours` since the memory was
//!   created, so fresher memories win ties;
//! - **poignancy** -- the stored salience score, min-max normalized
//!   across the candidate pool;
//! - **similarity** -- cosine similarity between the query embedding and
//!   the stored embedding, also min-max normalized across the pool.
//!
//! Normalizing per pool keeps the three factors on comparable scales
//! whatever the raw ranges happen to be. The degenerate all-equal column
//! normalizes to zero rather than dividing by zero.

/// Exponential recency factor: `0.99^Δhours`.
///
/// Monotonically decreasing in Δhours, 1.0 at zero hours. Negative
/// deltas are clamped to zero so a clock skew cannot score above 1.
pub fn recency_score(delta_hours: f64) -> f64 {
    0.99_f64.powf(delta_hours.max(0.0))
}

/// Min-max normalize a column of values into `[0, 1]`.
///
/// An empty column stays empty; an all-equal column (including a single
/// value) maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().reduce(f64::max).unwrap_or(min);
    let span = max - min;
    if span <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

// ===========================================================================
// Tests
// ===========================================================================
