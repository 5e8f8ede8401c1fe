//! Per-agent cognition state and the tick loop.
//!
//! [`CognitiveAgent`] owns everything one agent knows: spatial memory,
//! short-term working memory, the long-term record store, its reasoning
//! collaborator, and the two pending queues (high-level action
//! descriptors and primitive steps). Ownership is the concurrency model:
//! nothing outside the agent's own pipeline can reach its memories, so
//! independent agents may run on separate tasks without locks.
//!
//! One call to [`CognitiveAgent::tick`] runs the full pipeline --
//! perceive, optionally understand and plan, optionally reflect, then
//! act/step -- and returns **exactly one** primitive step (or `None`
//! when the agent is out of the arena). Collaborator failures inside a
//! tick degrade phase by phase; the environment always gets its step.

use std::collections::VecDeque;

use tracing::{debug, warn};

use commons_memory::{LongTermMemory, ShortTermMemory, parse_game_time};
use commons_types::{HighLevelAction, PrimitiveStep, TickInput};
use commons_world::SpatialMemory;

use crate::config::CognitionConfig;
use crate::extract::ObjectExtractor;
use crate::llm::Reasoner;
use crate::perceive::perception_tags;

/// Everything needed to assemble a [`CognitiveAgent`].
pub struct CognitiveAgentParams {
    /// The agent's display name.
    pub name: String,
    /// A short biography fed into planning prompts.
    pub bio: String,
    /// Spatial memory seeded from the scenario map.
    pub spatial: SpatialMemory,
    /// Long-term record store (empty, or restored from a snapshot).
    pub long_term: LongTermMemory,
    /// Working memory (empty, or restored from a snapshot).
    pub short_term: ShortTermMemory,
    /// The reasoning collaborator.
    pub reasoner: Reasoner,
    /// Substrate-specific observation extraction.
    pub extractor: Box<dyn ObjectExtractor + Send + Sync>,
    /// Cognition tunables.
    pub config: CognitionConfig,
}

/// One agent's full cognition state.
pub struct CognitiveAgent {
    name: String,
    pub(crate) stm: ShortTermMemory,
    pub(crate) ltm: LongTermMemory,
    pub(crate) spatial: SpatialMemory,
    pub(crate) reasoner: Reasoner,
    pub(crate) extractor: Box<dyn ObjectExtractor + Send + Sync>,
    pub(crate) config: CognitionConfig,
    pub(crate) pending_actions: VecDeque<String>,
    pub(crate) pending_steps: VecDeque<PrimitiveStep>,
    pub(crate) last_reflection_timestamp: Option<i64>,
}

impl CognitiveAgent {
    /// Assemble an agent from its parts.
    pub fn new(params: CognitiveAgentParams) -> Self {
        let mut stm = params.short_term;
        stm.set_agent_bio(params.bio);
        Self {
            name: params.name,
            stm,
            ltm: params.long_term,
            spatial: params.spatial,
            reasoner: params.reasoner,
            extractor: params.extractor,
            config: params.config,
            pending_actions: VecDeque::new(),
            pending_steps: VecDeque::new(),
            last_reflection_timestamp: None,
        }
    }

    /// The agent's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The agent's working memory.
    pub const fn short_term(&self) -> &ShortTermMemory {
        &self.stm
    }

    /// The agent's long-term record store.
    pub const fn long_term(&self) -> &LongTermMemory {
        &self.ltm
    }

    /// The agent's spatial memory.
    pub const fn spatial(&self) -> &SpatialMemory {
        &self.spatial
    }

    /// High-level actions waiting to be translated.
    pub const fn pending_actions(&self) -> &VecDeque<String> {
        &self.pending_actions
    }

    /// Primitive steps waiting to be executed.
    pub const fn pending_steps(&self) -> &VecDeque<PrimitiveStep> {
        &self.pending_steps
    }

    // -----------------------------------------------------------------------
    // The tick loop
    // -----------------------------------------------------------------------

    /// Run one full cognition cycle and return the primitive step for
    /// this tick, or `None` when the agent is out of the arena.
    pub async fn tick(
        &mut self,
        input: &TickInput,
        game_time: &str,
    ) -> Option<PrimitiveStep> {
        if input.is_agent_out {
            self.record_out_of_arena(game_time);
            return None;
        }

        // Fold the new observation into the belief grid. Map timestamps
        // share the game-time clock so merge ordering matches memory
        // ordering.
        let logical_time = parse_game_time(game_time)
            .ok()
            .and_then(|t| u64::try_from(t).ok())
            .unwrap_or(0);
        self.spatial.update_current_scene(&input.scene, logical_time);

        let should_react = self.perceive(input, game_time).await;
        if should_react {
            self.update_understanding(input, game_time).await;
            self.plan().await;
        }
        self.reflect(game_time).await;

        Some(self.next_step().await)
    }

    /// Drain or refill the step queue and pop exactly one step.
    ///
    /// Empty step queue: pull high-level actions (asking the model for a
    /// fresh one when that queue is also empty) and translate until steps
    /// appear. A translation that yields nothing moves on to the next
    /// queued action; with every action exhausted the agent falls back to
    /// exploration, and failing even that, an explicit no-op.
    async fn next_step(&mut self) -> PrimitiveStep {
        if self.pending_steps.is_empty() {
            if self.pending_actions.is_empty() {
                match self.act().await {
                    Ok(actions) => self.pending_actions = actions,
                    Err(e) => {
                        warn!(
                            agent = %self.name,
                            error = %e,
                            "act unavailable, falling back to exploration"
                        );
                    }
                }
            }

            while self.pending_steps.is_empty() {
                let Some(descriptor) = self.pending_actions.pop_front() else {
                    break;
                };
                let action = HighLevelAction::parse(&descriptor);
                let steps = self.spatial.steps_for_action(&action);
                if steps.is_empty() {
                    debug!(
                        agent = %self.name,
                        descriptor,
                        "action produced no steps, pulling next"
                    );
                    continue;
                }
                self.stm.set_last_action(descriptor);
                self.pending_steps = VecDeque::from(steps);
            }

            if self.pending_steps.is_empty() {
                self.pending_steps =
                    VecDeque::from(self.spatial.explore_sequence());
            }
        }

        self.pending_steps
            .pop_front()
            .unwrap_or(PrimitiveStep::StayPut)
    }

    /// Record the minimal memory for a tick spent out of the arena.
    fn record_out_of_arena(&mut self, game_time: &str) {
        let poignancy =
            i32::try_from(self.config.perception_poignancy).unwrap_or(i32::MAX);
        if let Err(e) = self.ltm.add_memory(
            "Was removed from the arena this tick",
            game_time,
            poignancy,
            &perception_tags(),
        ) {
            warn!(agent = %self.name, error = %e, "failed to store removal memory");
        }
    }
}

impl core::fmt::Debug for CognitiveAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CognitiveAgent")
            .field("name", &self.name)
            .field("pending_actions", &self.pending_actions.len())
            .field("pending_steps", &self.pending_steps.len())
            .field("memories", &self.ltm.len())
            .finish()
    }
}
