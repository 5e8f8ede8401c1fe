//! Per-agent spatial memory: the belief grid and action translation.
//!
//! An agent never sees the whole map. [`SpatialMemory`] accumulates what
//! it has seen: for every cell, the last observed symbol and when it was
//! observed. Each tick the egocentric observation window is rotated and
//! translated into the global frame and merged cell-by-cell.
//!
//! # Merge semantics
//!
//! [`SpatialMemory::update_cell_if_newer`] applies an update **iff** its
//! timestamp is strictly greater than the stored one. Last-writer-wins by
//! time (not arrival order) makes merges from overlapping observations
//! commutative and idempotent: replaying updates in any order converges
//! to the same grid.
//!
//! # Agents are not terrain
//!
//! Other agents move. After each scene merge, any cell still carrying an
//! agent marker that was not observed as occupied this tick is reset to
//! unknown, so "somebody was here ten ticks ago" never blocks a route
//! forever.
//!
//! # Action translation
//!
//! [`SpatialMemory::steps_for_action`] turns a parsed high-level action
//! into a primitive-step queue via the [`router`](crate::router). Routing
//! failures degrade to an empty sequence (logged, never fatal); a failed
//! or targetless explore samples a random reachable-looking cell from the
//! most recent observation window.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, warn};

use commons_types::{
    HighLevelAction, Orientation, Position, PrimitiveStep, SceneUpdate, Symbol,
};

use crate::grid::Grid;
use crate::router::{RouteQuery, route};
use crate::transform::{Component, connected_components, local_to_global};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for spatial memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialConfig {
    /// The observer's fixed position inside the egocentric observation
    /// window (default `(9, 5)` for the 11-wide harvest window).
    pub local_self: Position,
    /// Symbols that are never walkable.
    pub hard_blocked: Vec<Symbol>,
    /// Symbols avoided when possible but walkable as a last resort.
    pub soft_blocked: Vec<Symbol>,
    /// How many random cells an explore samples before giving up.
    pub explore_attempts: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            local_self: Position::new(9, 5),
            hard_blocked: vec![Symbol::WALL, Symbol::OUT_OF_BOUNDS],
            soft_blocked: vec![Symbol::AGENT],
            explore_attempts: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// SpatialMemory
// ---------------------------------------------------------------------------

/// An agent's persistent, partially-unknown belief about the world map.
///
/// Created once per agent at simulation start from the immutable scenario
/// map (which fixes the extent and the resource-cluster index), then
/// mutated every tick via [`update_current_scene`]. Lives for the whole
/// run.
///
/// [`update_current_scene`]: Self::update_current_scene
#[derive(Debug, Clone)]
pub struct SpatialMemory {
    /// Last known symbol per cell, initialized to unknown.
    known_map: Grid<Symbol>,
    /// Logical time of the last update per cell.
    timestamp_map: Grid<Option<u64>>,
    /// How often each cell has been updated (diagnostic).
    updated_frequency_map: Grid<u32>,
    /// Current global position.
    position: Position,
    /// Current facing.
    orientation: Orientation,
    /// Other-agent cells seen in the most recent observation.
    near_agents: Vec<Position>,
    /// Resource clusters of the immutable scenario map, labeled once.
    clusters: BTreeMap<u32, Component>,
    /// Bounding box (inclusive) of the most recent observation window,
    /// clipped to the map.
    window: Option<(Position, Position)>,
    config: SpatialConfig,
}

impl SpatialMemory {
    /// Create spatial memory for an agent spawning on the given scenario
    /// map.
    ///
    /// The scenario map fixes the belief-grid extent and is scanned once
    /// for apple/grass clusters; its cell contents are *not* copied into
    /// the belief grid -- the agent starts knowing nothing.
    pub fn new(
        scenario: &Grid<Symbol>,
        position: Position,
        orientation: Orientation,
        config: SpatialConfig,
    ) -> Self {
        let clusters =
            connected_components(scenario, &[Symbol::APPLE, Symbol::GRASS]);
        Self {
            known_map: Grid::filled(
                scenario.height(),
                scenario.width(),
                Symbol::UNKNOWN,
            ),
            timestamp_map: Grid::filled(scenario.height(), scenario.width(), None),
            updated_frequency_map: Grid::filled(scenario.height(), scenario.width(), 0),
            position,
            orientation,
            near_agents: Vec::new(),
            clusters,
            window: None,
            config,
        }
    }

    /// The agent's current global position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// The agent's current facing.
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The belief grid of last-known symbols.
    pub const fn known_map(&self) -> &Grid<Symbol> {
        &self.known_map
    }

    /// Other-agent cells seen in the most recent observation.
    pub fn near_agents(&self) -> &[Position] {
        &self.near_agents
    }

    /// Resource clusters of the scenario map, keyed by stable id.
    pub const fn resource_clusters(&self) -> &BTreeMap<u32, Component> {
        &self.clusters
    }

    /// How often the given cell has been updated.
    pub fn update_count(&self, pos: Position) -> u32 {
        self.updated_frequency_map.get(pos).copied().unwrap_or(0)
    }

    /// Fraction of the map that has been observed at least once.
    pub fn explored_ratio(&self) -> f64 {
        let total = self.known_map.positions().len();
        if total == 0 {
            return 0.0;
        }
        let seen = self
            .known_map
            .positions()
            .iter()
            .filter(|&&p| {
                self.known_map.get(p).is_some_and(|s| !s.is_unknown())
            })
            .count();
        let seen = u32::try_from(seen).unwrap_or(u32::MAX);
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        f64::from(seen) / f64::from(total)
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Apply a single cell update iff its timestamp is strictly newer
    /// than the stored one.
    ///
    /// Returns `true` when the update was applied. A strictly-older (or
    /// equal-time) update never overwrites, which makes replaying updates
    /// order-independent for distinct timestamps.
    pub fn update_cell_if_newer(
        &mut self,
        pos: Position,
        symbol: Symbol,
        timestamp: u64,
    ) -> bool {
        let Some(stored) = self.timestamp_map.get(pos).copied() else {
            return false;
        };
        if stored.is_some_and(|existing| existing >= timestamp) {
            return false;
        }
        self.known_map.set(pos, symbol);
        self.timestamp_map.set(pos, Some(timestamp));
        let count = self.update_count(pos).saturating_add(1);
        self.updated_frequency_map.set(pos, count);
        true
    }

    /// Merge one tick's egocentric observation into the belief grid.
    ///
    /// Updates position and facing, rotates every observed cell into the
    /// global frame, merges via [`update_cell_if_newer`], records which
    /// cells currently hold other agents, and resets stale agent markers
    /// elsewhere on the map to unknown.
    ///
    /// [`update_cell_if_newer`]: Self::update_cell_if_newer
    pub fn update_current_scene(&mut self, scene: &SceneUpdate, time: u64) {
        self.position = scene.global_position;
        self.orientation = scene.orientation;

        let local = match Grid::from_ascii(&scene.observation_text) {
            Ok(grid) => grid,
            Err(e) => {
                warn!(error = %e, "unreadable observation window, skipping merge");
                return;
            }
        };

        let mut near = Vec::new();
        let mut bbox: Option<(Position, Position)> = None;

        for local_pos in local.positions() {
            let Some(&symbol) = local.get(local_pos) else {
                continue;
            };
            // Out-of-bounds padding and not-visible cells carry no
            // information about the map.
            if symbol == Symbol::OUT_OF_BOUNDS || symbol.is_unknown() {
                continue;
            }
            let global = local_to_global(
                local_pos,
                self.config.local_self,
                self.position,
                scene.orientation,
            );
            if !self.known_map.contains(global) {
                continue;
            }

            self.update_cell_if_newer(global, symbol, time);

            if symbol.is_agent() && global != self.position {
                near.push(global);
            }

            bbox = Some(match bbox {
                None => (global, global),
                Some((min, max)) => (
                    Position::new(min.row.min(global.row), min.col.min(global.col)),
                    Position::new(max.row.max(global.row), max.col.max(global.col)),
                ),
            });
        }

        self.near_agents = near;
        if bbox.is_some() {
            self.window = bbox;
        }

        // Agents are transient occupants, not terrain: any cell still
        // believed occupied that was not observed as such this tick goes
        // back to unknown. Cells inside the window were just written at
        // `time`, so the strictly-greater rule leaves them alone.
        let stale: Vec<Position> = self
            .known_map
            .positions()
            .into_iter()
            .filter(|&p| {
                self.known_map.get(p).is_some_and(|s| s.is_agent())
                    && p != self.position
                    && !self.near_agents.contains(&p)
            })
            .collect();
        for p in stale {
            self.update_cell_if_newer(p, Symbol::UNKNOWN, time);
        }

        debug!(
            position = %self.position,
            near_agents = self.near_agents.len(),
            explored = self.explored_ratio(),
            "scene merged"
        );
    }

    // -----------------------------------------------------------------------
    // Action translation
    // -----------------------------------------------------------------------

    /// Translate a high-level action into a primitive-step sequence.
    ///
    /// Movement-bearing actions delegate to the router; interaction
    /// actions append their terminal primitive. A failed or targetless
    /// explore samples a random destination; any other routing failure
    /// yields an empty sequence for the caller to handle.
    pub fn steps_for_action(&self, action: &HighLevelAction) -> Vec<PrimitiveStep> {
        match action {
            HighLevelAction::GoTo { target }
            | HighLevelAction::Grab { target }
            | HighLevelAction::Consume { target } => {
                self.route_to(*target, true, true)
            }
            HighLevelAction::Attack { target, .. }
            | HighLevelAction::Immobilize { target, .. } => {
                let mut steps = self.route_to(*target, false, false);
                if !steps.is_empty() {
                    steps.push(PrimitiveStep::Attack);
                }
                steps
            }
            HighLevelAction::Clean { target } => {
                let mut steps = self.route_to(*target, false, false);
                if !steps.is_empty() {
                    steps.push(PrimitiveStep::Clean);
                }
                steps
            }
            HighLevelAction::Explore { target } => {
                let routed = target
                    .map(|t| self.route_to(t, true, true))
                    .unwrap_or_default();
                if routed.is_empty() {
                    self.explore_sequence()
                } else {
                    routed
                }
            }
            HighLevelAction::AvoidConsuming { .. } | HighLevelAction::StayPut => {
                vec![PrimitiveStep::StayPut]
            }
        }
    }

    /// Route from the current position to a target over the belief grid.
    fn route_to(
        &self,
        target: Position,
        reach_end: bool,
        include_last_pos: bool,
    ) -> Vec<PrimitiveStep> {
        let steps = route(&self.known_map, &RouteQuery {
            start: self.position,
            end: target,
            blocked: &self.config.hard_blocked,
            optional_blocked: &self.config.soft_blocked,
            orientation: self.orientation,
            reach_end,
            include_last_pos,
        });
        if steps.is_empty() {
            warn!(target = %target, "no route found");
        }
        steps
    }

    /// Pick a random reachable-looking destination from the most recent
    /// observation window and route to it.
    ///
    /// Candidate cells exclude walls, unknowns, agent cells, and the
    /// walker's own cell. After the configured number of failed samples
    /// the explore gives up and returns an empty sequence -- the caller
    /// must treat that as "no-op this tick".
    pub fn explore_sequence(&self) -> Vec<PrimitiveStep> {
        let (min, max) = self.window.unwrap_or_else(|| {
            let h = i32::try_from(self.known_map.height()).unwrap_or(0);
            let w = i32::try_from(self.known_map.width()).unwrap_or(0);
            (
                Position::new(0, 0),
                Position::new(h.saturating_sub(1), w.saturating_sub(1)),
            )
        });
        if max.row < min.row || max.col < min.col {
            return Vec::new();
        }

        let mut rng = rand::rng();
        for _ in 0..self.config.explore_attempts {
            let row = rng.random_range(min.row..=max.row);
            let col = rng.random_range(min.col..=max.col);
            let candidate = Position::new(row, col);
            if candidate == self.position {
                continue;
            }
            let Some(&symbol) = self.known_map.get(candidate) else {
                continue;
            };
            if symbol == Symbol::WALL
                || symbol == Symbol::OUT_OF_BOUNDS
                || symbol.is_unknown()
                || symbol.is_agent()
            {
                continue;
            }
            let steps = self.route_to(candidate, true, true);
            if !steps.is_empty() {
                debug!(destination = %candidate, "explore destination chosen");
                return steps;
            }
        }

        Vec::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_scenario(side: usize) -> Grid<Symbol> {
        Grid::filled(side, side, Symbol::FLOOR)
    }

    /// Config with the observer centered in a 3x3 window, for compact
    /// test observations.
    fn small_config() -> SpatialConfig {
        SpatialConfig {
            local_self: Position::new(1, 1),
            ..SpatialConfig::default()
        }
    }

    fn memory_at(pos: Position) -> SpatialMemory {
        SpatialMemory::new(
            &open_scenario(7),
            pos,
            Orientation::North,
            small_config(),
        )
    }

    fn scene(pos: Position, orientation: Orientation, text: &str) -> SceneUpdate {
        SceneUpdate {
            global_position: pos,
            orientation,
            observation_text: String::from(text),
        }
    }

    // -----------------------------------------------------------------------
    // Merge semantics
    // -----------------------------------------------------------------------

    #[test]
    fn newer_update_applies() {
        let mut memory = memory_at(Position::new(3, 3));
        assert!(memory.update_cell_if_newer(Position::new(1, 1), Symbol::APPLE, 5));
        assert_eq!(
            memory.known_map().get(Position::new(1, 1)),
            Some(&Symbol::APPLE)
        );
    }

    #[test]
    fn older_update_never_overwrites() {
        let mut memory = memory_at(Position::new(3, 3));
        assert!(memory.update_cell_if_newer(Position::new(1, 1), Symbol::APPLE, 5));
        // A strictly-older update must not win.
        assert!(!memory.update_cell_if_newer(Position::new(1, 1), Symbol::GRASS, 3));
        assert_eq!(
            memory.known_map().get(Position::new(1, 1)),
            Some(&Symbol::APPLE)
        );
    }

    #[test]
    fn equal_timestamp_does_not_overwrite() {
        let mut memory = memory_at(Position::new(3, 3));
        assert!(memory.update_cell_if_newer(Position::new(1, 1), Symbol::APPLE, 5));
        assert!(!memory.update_cell_if_newer(Position::new(1, 1), Symbol::GRASS, 5));
    }

    #[test]
    fn merge_is_order_independent() {
        let updates = [
            (Position::new(0, 0), Symbol::APPLE, 4_u64),
            (Position::new(0, 0), Symbol::GRASS, 2),
            (Position::new(0, 1), Symbol::WALL, 1),
            (Position::new(0, 1), Symbol::FLOOR, 9),
            (Position::new(2, 2), Symbol::AGENT, 7),
        ];

        let mut forward = memory_at(Position::new(3, 3));
        for &(p, s, t) in &updates {
            forward.update_cell_if_newer(p, s, t);
        }

        let mut reversed = memory_at(Position::new(3, 3));
        for &(p, s, t) in updates.iter().rev() {
            reversed.update_cell_if_newer(p, s, t);
        }

        for p in forward.known_map().positions() {
            assert_eq!(forward.known_map().get(p), reversed.known_map().get(p));
        }
    }

    #[test]
    fn out_of_range_update_ignored() {
        let mut memory = memory_at(Position::new(3, 3));
        assert!(!memory.update_cell_if_newer(Position::new(50, 50), Symbol::APPLE, 5));
    }

    #[test]
    fn update_count_tracks_applied_updates() {
        let mut memory = memory_at(Position::new(3, 3));
        memory.update_cell_if_newer(Position::new(1, 1), Symbol::APPLE, 1);
        memory.update_cell_if_newer(Position::new(1, 1), Symbol::FLOOR, 2);
        memory.update_cell_if_newer(Position::new(1, 1), Symbol::FLOOR, 1); // rejected
        assert_eq!(memory.update_count(Position::new(1, 1)), 2);
    }

    // -----------------------------------------------------------------------
    // Scene merging
    // -----------------------------------------------------------------------

    #[test]
    fn scene_merge_writes_global_cells() {
        let mut memory = memory_at(Position::new(3, 3));
        // Facing North: window rows map directly; an apple one cell ahead.
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::North, "?A?\n? ?\n???"),
            1,
        );
        assert_eq!(
            memory.known_map().get(Position::new(2, 3)),
            Some(&Symbol::APPLE)
        );
    }

    #[test]
    fn scene_merge_rotates_for_east_facing() {
        let mut memory = memory_at(Position::new(3, 3));
        // Facing East: "ahead" (window up) is global east.
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::East, "?A?\n? ?\n???"),
            1,
        );
        assert_eq!(
            memory.known_map().get(Position::new(3, 4)),
            Some(&Symbol::APPLE)
        );
    }

    #[test]
    fn near_agents_recorded_and_cleared() {
        let mut memory = memory_at(Position::new(3, 3));
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::North, "?@?\n? ?\n???"),
            1,
        );
        assert_eq!(memory.near_agents(), &[Position::new(2, 3)]);
        assert_eq!(
            memory.known_map().get(Position::new(2, 3)),
            Some(&Symbol::AGENT)
        );

        // Next tick the agent is gone: its old cell reverts to unknown.
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::North, "? ?\n? ?\n???"),
            2,
        );
        assert!(memory.near_agents().is_empty());
        assert_eq!(
            memory.known_map().get(Position::new(2, 3)),
            Some(&Symbol::FLOOR)
        );
    }

    #[test]
    fn stale_agent_outside_window_resets_to_unknown() {
        let mut memory = memory_at(Position::new(3, 3));
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::North, "?@?\n? ?\n???"),
            1,
        );
        // Move far away; the old sighting is outside the new window and
        // no agent is visible, so the marker must not persist.
        memory.update_current_scene(
            &scene(Position::new(5, 5), Orientation::North, "? ?\n? ?\n???"),
            2,
        );
        assert_eq!(
            memory.known_map().get(Position::new(2, 3)),
            Some(&Symbol::UNKNOWN)
        );
    }

    #[test]
    fn explored_ratio_grows_with_observations() {
        let mut memory = memory_at(Position::new(3, 3));
        assert!((memory.explored_ratio() - 0.0).abs() < f64::EPSILON);
        memory.update_current_scene(
            &scene(Position::new(3, 3), Orientation::North, "   \n   \n   "),
            1,
        );
        // 9 of 49 cells observed.
        assert!(memory.explored_ratio() > 0.17);
        assert!(memory.explored_ratio() < 0.20);
    }

    // -----------------------------------------------------------------------
    // Action translation
    // -----------------------------------------------------------------------

    /// Memory with the whole map observed as floor, for routing tests.
    fn surveyed_memory(pos: Position) -> SpatialMemory {
        let mut memory = memory_at(pos);
        for p in memory.known_map().positions() {
            memory.update_cell_if_newer(p, Symbol::FLOOR, 1);
        }
        memory
    }

    #[test]
    fn go_to_routes_to_target() {
        let memory = surveyed_memory(Position::new(0, 0));
        let steps = memory.steps_for_action(&HighLevelAction::GoTo {
            target: Position::new(0, 2),
        });
        let moves = steps
            .iter()
            .filter(|s| !matches!(s, PrimitiveStep::TurnLeft | PrimitiveStep::TurnRight))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn attack_stops_short_and_fires() {
        let mut memory = surveyed_memory(Position::new(0, 0));
        memory.update_cell_if_newer(Position::new(0, 2), Symbol::AGENT, 2);
        let steps = memory.steps_for_action(&HighLevelAction::Attack {
            agent: String::from("Kora"),
            target: Position::new(0, 2),
        });
        assert_eq!(steps.last(), Some(&PrimitiveStep::Attack));
        // One move (stop at (0,1)), one turn to face, then the beam.
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn clean_appends_clean_primitive() {
        let memory = surveyed_memory(Position::new(0, 0));
        let steps = memory.steps_for_action(&HighLevelAction::Clean {
            target: Position::new(2, 0),
        });
        assert_eq!(steps.last(), Some(&PrimitiveStep::Clean));
    }

    #[test]
    fn unreachable_target_yields_empty() {
        let mut memory = surveyed_memory(Position::new(0, 0));
        // Wall off the target completely.
        for p in [
            Position::new(5, 6),
            Position::new(6, 5),
        ] {
            memory.update_cell_if_newer(p, Symbol::WALL, 2);
        }
        let steps = memory.steps_for_action(&HighLevelAction::GoTo {
            target: Position::new(6, 6),
        });
        assert!(steps.is_empty());
    }

    #[test]
    fn stay_put_and_avoid_consuming_hold_position() {
        let memory = surveyed_memory(Position::new(3, 3));
        assert_eq!(
            memory.steps_for_action(&HighLevelAction::StayPut),
            vec![PrimitiveStep::StayPut]
        );
        assert_eq!(
            memory.steps_for_action(&HighLevelAction::AvoidConsuming {
                target: Some(Position::new(1, 1))
            }),
            vec![PrimitiveStep::StayPut]
        );
    }

    #[test]
    fn explore_with_invalid_cell_degrades_to_random_explore() {
        let mut memory = surveyed_memory(Position::new(3, 3));
        memory = SpatialMemory {
            config: SpatialConfig {
                explore_attempts: 200,
                ..small_config()
            },
            ..memory
        };
        // Target outside the map: routing fails, random explore kicks in.
        let steps = memory.steps_for_action(&HighLevelAction::Explore {
            target: Some(Position::new(99, 99)),
        });
        assert!(!steps.is_empty());
    }

    #[test]
    fn explore_on_unexplored_map_gives_up_empty() {
        // Nothing observed: no valid candidate cells exist.
        let memory = memory_at(Position::new(3, 3));
        assert!(memory.explore_sequence().is_empty());
    }
}
