//! Per-tick payload delivered by the environment to an agent.
//!
//! Each simulation tick the environment hands every live agent a
//! [`TickInput`]: the raw observation strings visible from the agent's
//! window, any scene-level state changes since the last tick, the agent's
//! own scene snapshot (global position, orientation, and the ascii
//! observation window), the reward earned, and whether the agent is
//! currently removed from the arena.
//!
//! These types are plain data -- assembly happens on the environment side
//! and is out of scope here.

use serde::{Deserialize, Serialize};

use crate::grid::{Orientation, Position};

/// The agent's own view of the scene this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneUpdate {
    /// The agent's position in global map coordinates.
    pub global_position: Position,
    /// The agent's current facing.
    pub orientation: Orientation,
    /// The egocentric ascii observation window, rows separated by `\n`,
    /// rotated so the agent's forward direction points up.
    pub observation_text: String,
}

/// One environment-level state change, timestamped with game time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Human-readable description of the change.
    pub description: String,
    /// Game time at which the change happened (`%Y-%m-%d %H:%M:%S`).
    pub game_time: String,
}

/// Everything the environment tells one agent on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Raw observation strings, unordered and unfiltered.
    pub observations: Vec<String>,
    /// Scene deltas since the previous tick.
    pub changes: Vec<StateChange>,
    /// The agent's own scene snapshot.
    pub scene: SceneUpdate,
    /// Reward earned since the previous tick.
    pub reward: f64,
    /// Whether the agent is currently out of the arena (e.g. just zapped
    /// out). An inactive agent takes no step this tick.
    pub is_agent_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_input_roundtrip_serde() {
        let input = TickInput {
            observations: vec![String::from("an apple at position (1, 2)")],
            changes: vec![StateChange {
                description: String::from("apples regrew in the east orchard"),
                game_time: String::from("2024-06-01 08:00:00"),
            }],
            scene: SceneUpdate {
                global_position: Position::new(4, 4),
                orientation: Orientation::North,
                observation_text: String::from("???\n?A?\n? ?"),
            },
            reward: 1.0,
            is_agent_out: false,
        };

        let json = serde_json::to_string(&input).ok();
        assert!(json.is_some());
        let restored: Result<TickInput, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(input));
    }
}
