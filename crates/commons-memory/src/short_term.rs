//! Working memory for the current decision cycle.
//!
//! [`ShortTermMemory`] is the agent's scratchpad: the active plan and
//! goals, the latest composed observation, the reactive-gate decision,
//! the world-context summary, and the registries of known agents and
//! known objects. Every read of an absent value returns a defined empty
//! default (no value, empty slice, empty set) rather than erroring, so
//! the first decision cycle works on a blank slate.
//!
//! The registry is deliberately typed per slot instead of a free-form
//! key/value map: a misspelled slot is a compile error, and each slot
//! keeps its natural type. Pending action/step queues are *not* stored
//! here -- they live on the cognitive loop's own state, which is the only
//! code that drains them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The reactive gate's latest decision and its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Whether the agent should re-plan this tick.
    pub should_react: bool,
    /// The model's (or gate's) stated reason.
    pub reason: String,
}

/// Typed working-memory registry, one instance per agent per run.
///
/// Created at agent construction (optionally seeded from a persisted
/// snapshot) and lives for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortTermMemory {
    current_plan: Option<String>,
    current_goals: Vec<String>,
    world_context: Option<String>,
    agent_bio: Option<String>,
    last_action: Option<String>,
    last_observation: Option<String>,
    reaction: Option<Reaction>,
    accumulated_poignancy: u32,
    known_agents: BTreeSet<String>,
    known_objects: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl ShortTermMemory {
    /// Create an empty working memory.
    pub const fn new() -> Self {
        Self {
            current_plan: None,
            current_goals: Vec::new(),
            world_context: None,
            agent_bio: None,
            last_action: None,
            last_observation: None,
            reaction: None,
            accumulated_poignancy: 0,
            known_agents: BTreeSet::new(),
            known_objects: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Plan and goals
    // -----------------------------------------------------------------------

    /// The active plan, if any.
    pub fn current_plan(&self) -> Option<&str> {
        self.current_plan.as_deref()
    }

    /// Replace the active plan.
    pub fn set_current_plan(&mut self, plan: String) {
        self.current_plan = Some(plan);
    }

    /// The active goals (empty when none set).
    pub fn current_goals(&self) -> &[String] {
        &self.current_goals
    }

    /// Replace the active goals.
    pub fn set_current_goals(&mut self, goals: Vec<String>) {
        self.current_goals = goals;
    }

    // -----------------------------------------------------------------------
    // Context slots
    // -----------------------------------------------------------------------

    /// The current world-context summary, if any.
    pub fn world_context(&self) -> Option<&str> {
        self.world_context.as_deref()
    }

    /// Replace the world-context summary.
    pub fn set_world_context(&mut self, context: String) {
        self.world_context = Some(context);
    }

    /// The agent's biography, if any.
    pub fn agent_bio(&self) -> Option<&str> {
        self.agent_bio.as_deref()
    }

    /// Set the agent's biography.
    pub fn set_agent_bio(&mut self, bio: String) {
        self.agent_bio = Some(bio);
    }

    /// The descriptor of the action executed last tick, if any.
    pub fn last_action(&self) -> Option<&str> {
        self.last_action.as_deref()
    }

    /// Record the action executed this tick.
    pub fn set_last_action(&mut self, action: String) {
        self.last_action = Some(action);
    }

    /// The most recent composed observation text, if any.
    pub fn last_observation(&self) -> Option<&str> {
        self.last_observation.as_deref()
    }

    /// Record the composed observation text.
    pub fn set_last_observation(&mut self, observation: String) {
        self.last_observation = Some(observation);
    }

    /// The latest reactive-gate decision, if one has been made.
    pub const fn reaction(&self) -> Option<&Reaction> {
        self.reaction.as_ref()
    }

    /// Store the reactive-gate decision.
    pub fn set_reaction(&mut self, reaction: Reaction) {
        self.reaction = Some(reaction);
    }

    // -----------------------------------------------------------------------
    // Reflection gate counter
    // -----------------------------------------------------------------------

    /// Poignancy accumulated since the last reflection.
    pub const fn accumulated_poignancy(&self) -> u32 {
        self.accumulated_poignancy
    }

    /// Add to the accumulated poignancy counter.
    pub const fn add_poignancy(&mut self, amount: u32) {
        self.accumulated_poignancy =
            self.accumulated_poignancy.saturating_add(amount);
    }

    /// Reset the counter to zero (called when a reflection fires).
    pub const fn reset_poignancy(&mut self) {
        self.accumulated_poignancy = 0;
    }

    // -----------------------------------------------------------------------
    // Known-agents set
    // -----------------------------------------------------------------------

    /// Record an agent by display name (deduplicated).
    pub fn add_known_agent(&mut self, name: &str) {
        if !name.is_empty() {
            self.known_agents.insert(String::from(name));
        }
    }

    /// All agent names seen so far.
    pub const fn known_agents(&self) -> &BTreeSet<String> {
        &self.known_agents
    }

    // -----------------------------------------------------------------------
    // Known-objects registry
    // -----------------------------------------------------------------------

    /// Merge `(id, position)` pairs into the registry under an object
    /// class key (set semantics: duplicates collapse).
    pub fn record_objects(
        &mut self,
        class: &str,
        objects: impl IntoIterator<Item = (String, String)>,
    ) {
        let entry = self
            .known_objects
            .entry(String::from(class))
            .or_default();
        entry.extend(objects);
    }

    /// Known objects of a class; empty set when the class is unseen.
    pub fn known_objects(&self, class: &str) -> BTreeSet<(String, String)> {
        self.known_objects.get(class).cloned().unwrap_or_default()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
