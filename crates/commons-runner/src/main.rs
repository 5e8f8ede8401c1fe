//! Demo entry point for the Commons cognition runtime.
//!
//! Runs one cognitive agent against a minimal in-process environment on
//! the default orchard map for a fixed number of ticks, logging each
//! primitive step. With no `LLM_*` environment variables the reasoning
//! collaborator is a scripted backend, so the demo is fully offline and
//! deterministic in structure; point `LLM_DEFAULT_*` at a real endpoint
//! to watch a model drive the same loop.
//!
//! The environment here is deliberately tiny -- a real substrate engine
//! supplies observations and consumes steps over the same contract.

use tracing::info;
use tracing_subscriber::EnvFilter;

use commons_memory::{HashingEmbedder, LongTermMemory, ShortTermMemory};
use commons_runner::{
    BackendType, CognitiveAgent, CognitiveAgentParams, HarvestExtractor, LlmBackend,
    PromptEngine, Reasoner, RunnerConfig, ScriptedBackend, create_backend,
};
use commons_types::{
    Orientation, Position, PrimitiveStep, SceneUpdate, Symbol, TickInput,
};
use commons_world::{
    Grid, SpatialConfig, SpatialMemory, local_to_global, scenario,
};

/// Half-width of the demo's square observation window.
const VIEW_RADIUS: i32 = 2;

/// How many ticks the demo runs.
const DEMO_TICKS: u64 = 20;

/// A minimal in-process stand-in for the substrate engine.
///
/// Tracks one agent's true pose on the map, builds egocentric
/// observation windows, and applies primitive steps.
struct DemoEnvironment {
    map: Grid<Symbol>,
    position: Position,
    orientation: Orientation,
}

impl DemoEnvironment {
    /// Window position of the observer (center of the square window).
    const LOCAL_SELF: Position = Position::new(VIEW_RADIUS, VIEW_RADIUS);

    fn new(map: Grid<Symbol>, position: Position) -> Self {
        Self {
            map,
            position,
            orientation: Orientation::South,
        }
    }

    /// Build this tick's payload for the agent.
    fn observe(&self) -> TickInput {
        let side = VIEW_RADIUS.saturating_mul(2).saturating_add(1);
        let mut rows = Vec::new();
        let mut observations = Vec::new();

        for local_row in 0..side {
            let mut row = String::new();
            for local_col in 0..side {
                let global = local_to_global(
                    Position::new(local_row, local_col),
                    Self::LOCAL_SELF,
                    self.position,
                    self.orientation,
                );
                let symbol = self
                    .map
                    .get(global)
                    .copied()
                    .unwrap_or(Symbol::OUT_OF_BOUNDS);
                row.push(symbol.as_char());

                if symbol == Symbol::APPLE {
                    observations
                        .push(format!("Observed an apple at position {global}"));
                } else if symbol == Symbol::GRASS {
                    observations.push(format!(
                        "Observed grass to grow apples at position {global}"
                    ));
                }
            }
            rows.push(row);
        }

        TickInput {
            observations,
            changes: Vec::new(),
            scene: SceneUpdate {
                global_position: self.position,
                orientation: self.orientation,
                observation_text: rows.join("\n"),
            },
            reward: 0.0,
            is_agent_out: false,
        }
    }

    /// Apply one primitive step to the true pose.
    fn apply(&mut self, step: PrimitiveStep) {
        let relative = match step {
            PrimitiveStep::MoveUp => Some(0),
            PrimitiveStep::MoveRight => Some(1),
            PrimitiveStep::MoveDown => Some(2),
            PrimitiveStep::MoveLeft => Some(3),
            PrimitiveStep::TurnLeft => {
                self.orientation = self.orientation.rotated_left();
                None
            }
            PrimitiveStep::TurnRight => {
                self.orientation = self.orientation.rotated_right();
                None
            }
            PrimitiveStep::Attack | PrimitiveStep::Clean | PrimitiveStep::StayPut => {
                None
            }
        };

        if let Some(relative) = relative {
            let direction = Orientation::from_index(
                self.orientation.index().wrapping_add(relative),
            );
            let (dr, dc) = direction.delta();
            if let Some(next) = self.position.offset(dr, dc)
                && self.map.get(next).is_some_and(|&s| s != Symbol::WALL)
            {
                self.position = next;
            }
        }
    }
}

/// A scripted backend whose single default response satisfies every
/// phase's expected fields.
fn demo_scripted_backend() -> LlmBackend {
    let backend = ScriptedBackend::with_default(
        "<react>no</react>\
         <reason>the orchard is calm</reason>\
         <plan>wander the orchard and harvest lightly</plan>\
         <goals>keep the orchard alive\nstay fed</goals>\
         <context>a walled orchard with shared apple patches</context>\
         <questions>what regrows after harvesting?</questions>\
         <insight>patches left with apples regrow; bare patches die</insight>\
         <action>explore</action>",
    );
    LlmBackend::Scripted(backend)
}

/// Game time string for a demo tick (one minute per tick).
fn demo_game_time(tick: u64) -> String {
    let offset = i64::try_from(tick).unwrap_or(0).saturating_mul(60);
    let delta = chrono::TimeDelta::try_seconds(offset)
        .unwrap_or_else(chrono::TimeDelta::zero);
    chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .map(|start| (start + delta).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| String::from("2024-06-01 08:00:00"))
}

/// Application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("commons-runner starting");

    let config = RunnerConfig::from_env()?;
    info!(
        backend = ?config.primary_backend.backend_type,
        model = config.primary_backend.model,
        "configuration loaded"
    );

    let prompts = match &config.templates_dir {
        Some(dir) => PromptEngine::from_dir(dir)?,
        None => PromptEngine::builtin()?,
    };

    let primary = match config.primary_backend.backend_type {
        BackendType::Scripted => demo_scripted_backend(),
        _ => create_backend(&config.primary_backend),
    };
    let fallback = config.fallback_backend.as_ref().map(create_backend);
    let reasoner = Reasoner::new(primary, fallback, prompts, config.retry.clone());

    let map = scenario::starting_map()?;
    let spawn = scenario::SPAWN_POINTS
        .first()
        .copied()
        .unwrap_or(Position::new(1, 1));
    let mut environment = DemoEnvironment::new(map.clone(), spawn);

    let spatial = SpatialMemory::new(
        &map,
        spawn,
        environment.orientation,
        SpatialConfig {
            local_self: DemoEnvironment::LOCAL_SELF,
            ..SpatialConfig::default()
        },
    );

    let mut agent = CognitiveAgent::new(CognitiveAgentParams {
        name: String::from("Kora"),
        bio: String::from(
            "Kora is a careful harvester who prefers leaving patches alive.",
        ),
        spatial,
        long_term: LongTermMemory::new(Box::new(HashingEmbedder::default())),
        short_term: ShortTermMemory::new(),
        reasoner,
        extractor: Box::new(HarvestExtractor::new()),
        config: config.cognition.clone(),
    });

    for tick in 0..DEMO_TICKS {
        let input = environment.observe();
        let game_time = demo_game_time(tick);
        let step = agent.tick(&input, &game_time).await;
        match step {
            Some(step) => {
                info!(
                    tick,
                    step = step.as_str(),
                    position = %environment.position,
                    facing = %environment.orientation,
                    "step taken"
                );
                environment.apply(step);
            }
            None => info!(tick, "agent inactive"),
        }
    }

    info!(
        memories = agent.long_term().len(),
        explored = agent.spatial().explored_ratio(),
        "demo finished"
    );

    Ok(())
}
