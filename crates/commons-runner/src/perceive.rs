//! The perception pipeline: filter, register, memorize, gate.
//!
//! Each tick the agent receives more observation strings than it can
//! attend to. [`filter_observations`] sorts them by Manhattan distance
//! from the agent and keeps the closest `attention_bandwidth` of them;
//! observations with no resolvable position are always retained and
//! appended after the distance-bounded window.
//!
//! The filtered window updates the known-agent and known-object
//! registries, is composed into one perception memory (with the executed
//! action, scene deltas, reward, and pose) appended to long-term memory,
//! and finally feeds the reactive gate: "should I re-plan this tick?".
//! An agent with no active plan always reacts; otherwise the reasoning
//! model decides, and a model failure defaults to "carry on".

use std::collections::BTreeMap;

use tracing::warn;

use commons_memory::Reaction;
use commons_types::{Orientation, Position, StateChange, TickInput};

use crate::agent::CognitiveAgent;
use crate::parse::parse_yes_no;

/// Sort observations by distance and truncate to the attention
/// bandwidth.
///
/// Observations whose text embeds a `(row, col)` position are sorted by
/// Manhattan distance from `position` (stable, so equal distances keep
/// their arrival order) and truncated to `bandwidth`. Positionless
/// observations are appended after the window, never dropped.
pub fn filter_observations(
    observations: &[String],
    position: Position,
    bandwidth: usize,
) -> Vec<String> {
    let mut located: Vec<(u32, &String)> = Vec::new();
    let mut unlocated: Vec<&String> = Vec::new();

    for observation in observations {
        match Position::parse_embedded(observation) {
            Some(p) => located.push((p.manhattan_distance(&position), observation)),
            None => unlocated.push(observation),
        }
    }

    located.sort_by_key(|&(distance, _)| distance);

    let mut filtered: Vec<String> = located
        .into_iter()
        .take(bandwidth)
        .map(|(_, observation)| observation.clone())
        .collect();
    filtered.extend(unlocated.into_iter().cloned());
    filtered
}

/// Compose the tick's perception memory text.
pub fn compose_memory_text(
    last_action: Option<&str>,
    changes: &[StateChange],
    reward: f64,
    position: Position,
    orientation: Orientation,
    observations: &[String],
) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Last action: {}",
        last_action.unwrap_or("none")
    ));
    if !changes.is_empty() {
        let described: Vec<&str> =
            changes.iter().map(|c| c.description.as_str()).collect();
        lines.push(format!("Changes: {}", described.join("; ")));
    }
    lines.push(format!("Reward earned: {reward}"));
    lines.push(format!("Standing at {position} facing {orientation}"));
    if observations.is_empty() {
        lines.push(String::from("Observed nothing of note"));
    } else {
        lines.push(format!("Observed: {}", observations.join("; ")));
    }
    lines.join("\n")
}

/// The tag set attached to perception memories.
pub(crate) fn perception_tags() -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert(String::from("type"), String::from("perception"));
    tags
}

impl CognitiveAgent {
    /// Run the perception pipeline for one tick.
    ///
    /// Returns whether the agent should re-plan (the reactive gate).
    pub(crate) async fn perceive(&mut self, input: &TickInput, game_time: &str) -> bool {
        let filtered = filter_observations(
            &input.observations,
            self.spatial.position(),
            self.config.attention_bandwidth,
        );

        // Registry updates from what made it through the window.
        let own_name = self.name().to_owned();
        for name in self.extractor.extract_agents(&filtered) {
            if name != own_name {
                self.stm.add_known_agent(&name);
            }
        }
        for (class, objects) in self.extractor.extract_objects(&filtered) {
            self.stm.record_objects(&class, objects);
        }

        // One composite perception memory per tick.
        let memory_text = compose_memory_text(
            self.stm.last_action(),
            &input.changes,
            input.reward,
            self.spatial.position(),
            self.spatial.orientation(),
            &filtered,
        );
        self.stm.set_last_observation(memory_text.clone());

        let poignancy =
            i32::try_from(self.config.perception_poignancy).unwrap_or(i32::MAX);
        match self.ltm.add_memory(
            &memory_text,
            game_time,
            poignancy,
            &perception_tags(),
        ) {
            Ok(_) => self.stm.add_poignancy(self.config.perception_poignancy),
            Err(e) => {
                warn!(agent = %own_name, error = %e, "failed to store perception memory");
            }
        }

        // Reactive gate. No plan always forces a reaction.
        let reaction = if self.stm.current_plan().is_none() {
            Reaction {
                should_react: true,
                reason: String::from("no active plan"),
            }
        } else {
            self.ask_should_react(&filtered, &input.changes).await
        };
        let should_react = reaction.should_react;
        self.stm.set_reaction(reaction);
        should_react
    }

    /// Ask the reasoning model whether the latest observations warrant
    /// re-planning. Model failure defaults to "carry on".
    async fn ask_should_react(
        &self,
        filtered: &[String],
        changes: &[StateChange],
    ) -> Reaction {
        let pending: Vec<String> = self.pending_actions.iter().cloned().collect();
        let described: Vec<&str> =
            changes.iter().map(|c| c.description.as_str()).collect();
        let inputs = vec![
            self.stm.world_context().unwrap_or("unknown world").to_owned(),
            filtered.join("; "),
            self.stm
                .current_plan()
                .unwrap_or("no current plan")
                .to_owned(),
            if pending.is_empty() {
                String::from("none pending")
            } else {
                pending.join(", ")
            },
            described.join("; "),
        ];

        match self.reasoner.complete("react", &inputs).await {
            Ok(fields) => {
                let should_react = fields
                    .get("react")
                    .and_then(|v| parse_yes_no(v))
                    .unwrap_or(false);
                let reason = fields
                    .get("reason")
                    .cloned()
                    .unwrap_or_else(|| String::from("no reason given"));
                Reaction {
                    should_react,
                    reason,
                }
            }
            Err(e) => {
                warn!(agent = self.name(), error = %e, "reactive gate unavailable");
                Reaction {
                    should_react: false,
                    reason: String::from("collaborator unavailable this cycle"),
                }
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| String::from(*t)).collect()
    }

    // -----------------------------------------------------------------------
    // Distance filtering
    // -----------------------------------------------------------------------

    #[test]
    fn closest_observations_come_first() {
        let filtered = filter_observations(
            &observations(&[
                "an apple at position (9, 9)",
                "an apple at position (1, 0)",
                "an apple at position (4, 4)",
            ]),
            Position::new(0, 0),
            10,
        );
        assert_eq!(
            filtered,
            observations(&[
                "an apple at position (1, 0)",
                "an apple at position (4, 4)",
                "an apple at position (9, 9)",
            ])
        );
    }

    #[test]
    fn bandwidth_truncates_distant_observations() {
        let filtered = filter_observations(
            &observations(&[
                "an apple at position (9, 9)",
                "an apple at position (1, 0)",
                "an apple at position (4, 4)",
            ]),
            Position::new(0, 0),
            2,
        );
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.iter().any(|o| o.contains("(9, 9)")));
    }

    #[test]
    fn positionless_observations_survive_truncation() {
        let filtered = filter_observations(
            &observations(&[
                "a commotion somewhere far away",
                "an apple at position (1, 0)",
                "an apple at position (2, 0)",
                "an apple at position (3, 0)",
            ]),
            Position::new(0, 0),
            2,
        );
        // Two located observations plus the positionless one, appended
        // after the window.
        assert_eq!(filtered.len(), 3);
        assert_eq!(
            filtered.last().map(String::as_str),
            Some("a commotion somewhere far away")
        );
    }

    #[test]
    fn equal_distances_keep_arrival_order() {
        let filtered = filter_observations(
            &observations(&[
                "first at position (0, 2)",
                "second at position (2, 0)",
            ]),
            Position::new(0, 0),
            10,
        );
        assert_eq!(
            filtered.first().map(String::as_str),
            Some("first at position (0, 2)")
        );
    }

    // -----------------------------------------------------------------------
    // Memory composition
    // -----------------------------------------------------------------------

    #[test]
    fn memory_text_mentions_all_sections() {
        let changes = vec![StateChange {
            description: String::from("apples regrew in the east orchard"),
            game_time: String::from("2024-06-01 08:00:00"),
        }];
        let text = compose_memory_text(
            Some("go to position (2, 2)"),
            &changes,
            1.5,
            Position::new(3, 4),
            Orientation::East,
            &observations(&["an apple at position (3, 5)"]),
        );
        assert!(text.contains("go to position (2, 2)"));
        assert!(text.contains("apples regrew"));
        assert!(text.contains("1.5"));
        assert!(text.contains("(3, 4)"));
        assert!(text.contains("east"));
        assert!(text.contains("an apple at position (3, 5)"));
    }

    #[test]
    fn memory_text_without_optional_sections() {
        let text = compose_memory_text(
            None,
            &[],
            0.0,
            Position::new(0, 0),
            Orientation::North,
            &[],
        );
        assert!(text.contains("Last action: none"));
        assert!(text.contains("Observed nothing of note"));
        assert!(!text.contains("Changes:"));
    }
}
