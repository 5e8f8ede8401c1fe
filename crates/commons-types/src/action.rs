//! High-level action descriptor parsing.
//!
//! The reasoning model chooses actions as short natural-language
//! descriptors ("go to position (3, 4)", "attack agent Kora at (2, 5)").
//! These are never executed directly: the spatial subsystem translates
//! each descriptor into a queue of primitive steps. This module owns the
//! descriptor grammar -- verb-prefix dispatch plus embedded coordinate
//! extraction.
//!
//! Parsing is total: an unrecognized or malformed descriptor degrades to
//! [`HighLevelAction::Explore`] with no target, which downstream code
//! treats as "wander somewhere reachable". A model that rambles therefore
//! costs the agent a tick of exploration, never a crash.

use crate::grid::Position;

/// A parsed high-level action descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighLevelAction {
    /// Pick up the resource at the target cell.
    Grab {
        /// The resource cell.
        target: Position,
    },
    /// Walk onto the resource at the target cell and consume it.
    Consume {
        /// The resource cell.
        target: Position,
    },
    /// Walk to the target cell.
    GoTo {
        /// The destination cell.
        target: Position,
    },
    /// Approach the named agent and fire the interaction beam.
    Attack {
        /// Display name of the target agent.
        agent: String,
        /// Last known cell of the target agent.
        target: Position,
    },
    /// Approach the named agent and immobilize them with the beam.
    Immobilize {
        /// Display name of the target agent.
        agent: String,
        /// Last known cell of the target agent.
        target: Position,
    },
    /// Approach the target cell and fire the cleaning beam at it.
    Clean {
        /// The cell to clean.
        target: Position,
    },
    /// Wander; with a target, head there, otherwise pick a random
    /// reachable cell from the current view.
    Explore {
        /// Optional explicit destination.
        target: Option<Position>,
    },
    /// Deliberately leave the resource at the target cell alone.
    AvoidConsuming {
        /// The resource cell being spared.
        target: Option<Position>,
    },
    /// Do nothing this plan step.
    StayPut,
}

impl HighLevelAction {
    /// Parse a natural-language action descriptor.
    ///
    /// Dispatch is on the (case-insensitive) verb prefix; coordinates are
    /// extracted with [`Position::parse_embedded`]. Verbs that require a
    /// target but lack one degrade to targetless exploration.
    pub fn parse(descriptor: &str) -> Self {
        let trimmed = descriptor.trim();
        let lower = trimmed.to_lowercase();
        let target = Position::parse_embedded(trimmed);

        if lower.starts_with("avoid consuming") {
            return Self::AvoidConsuming { target };
        }
        if lower.starts_with("stay put") || lower.starts_with("stay still") {
            return Self::StayPut;
        }
        if lower.starts_with("explore") {
            return Self::Explore { target };
        }
        if lower.starts_with("grab") {
            return match target {
                Some(target) => Self::Grab { target },
                None => Self::Explore { target: None },
            };
        }
        if lower.starts_with("consume") {
            return match target {
                Some(target) => Self::Consume { target },
                None => Self::Explore { target: None },
            };
        }
        if lower.starts_with("go to") {
            return match target {
                Some(target) => Self::GoTo { target },
                None => Self::Explore { target: None },
            };
        }
        if lower.starts_with("attack") {
            return match target {
                Some(target) => Self::Attack {
                    agent: extract_agent_name(trimmed),
                    target,
                },
                None => Self::Explore { target: None },
            };
        }
        if lower.starts_with("immobilize") {
            return match target {
                Some(target) => Self::Immobilize {
                    agent: extract_agent_name(trimmed),
                    target,
                },
                None => Self::Explore { target: None },
            };
        }
        if lower.starts_with("clean") {
            return match target {
                Some(target) => Self::Clean { target },
                None => Self::Explore { target: None },
            };
        }

        Self::Explore { target: None }
    }
}

/// Pull the agent display name out of an attack/immobilize descriptor.
///
/// Handles the common shapes `"attack agent Kora at (2, 5)"` and
/// `"attack Kora at (2, 5)"`. Falls back to an empty string when the
/// descriptor names nobody.
fn extract_agent_name(descriptor: &str) -> String {
    // Drop the leading verb.
    let after_verb = descriptor
        .split_once(' ')
        .map_or("", |(_, rest)| rest)
        .trim();

    // Drop an optional "agent " noun.
    let after_noun = after_verb
        .strip_prefix("agent ")
        .or_else(|| after_verb.strip_prefix("Agent "))
        .unwrap_or(after_verb);

    // Keep everything up to the positional clause.
    let name = after_noun
        .split(" at ")
        .next()
        .unwrap_or(after_noun)
        .trim();

    // Strip a trailing coordinate group if the descriptor omitted "at".
    let name = name
        .split(['(', '['])
        .next()
        .unwrap_or(name)
        .trim();

    String::from(name)
}

// ===========================================================================
// Tests
// ===========================================================================
