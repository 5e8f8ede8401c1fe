//! Error types for the `commons-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias. Routing deliberately does not appear
//! here: an unreachable destination yields an empty step sequence, not an
//! error, so a failed route can never abort a simulation tick.

use commons_types::Position;

/// Errors that can occur during grid and spatial-memory operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An ascii map contained no rows or rows of unequal width.
    #[error("malformed ascii map: {reason}")]
    MalformedMap {
        /// Description of the defect.
        reason: String,
    },

    /// A position lies outside the grid extent.
    #[error("position {0} is outside the map")]
    OutOfBounds(Position),

    /// Arithmetic overflow during a checked coordinate calculation.
    #[error("arithmetic overflow in grid calculation")]
    ArithmeticOverflow,
}
