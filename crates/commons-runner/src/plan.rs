//! The planning and understanding phases.
//!
//! Both fire only when the reactive gate opens. Planning rewrites the
//! agent's plan and goals from the latest observation, recent
//! reflections, and the gate's justification; understanding refreshes
//! the agent's working summary of how the world works. Either phase
//! silently keeps its prior state when the model fails or returns
//! nothing usable -- a bad model answer costs a cycle, never a crash.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use commons_memory::MemoryFilter;
use commons_types::TickInput;

use crate::agent::CognitiveAgent;

/// How many recent reflections are fed into a planning prompt.
const PLAN_REFLECTION_COUNT: usize = 3;

impl CognitiveAgent {
    /// Re-plan: overwrite the current plan and goals from the model.
    ///
    /// A response carrying neither a `plan` nor a `goals` field leaves
    /// the prior plan and goals untouched.
    pub(crate) async fn plan(&mut self) {
        let reflections = self
            .ltm
            .query(
                PLAN_REFLECTION_COUNT,
                Some(&MemoryFilter::eq("type", "reflection")),
                false,
                true,
            )
            .documents
            .join("\n");
        let reaction_reason = self
            .stm
            .reaction()
            .map(|r| r.reason.clone())
            .unwrap_or_default();

        let inputs = vec![
            self.stm.world_context().unwrap_or("unknown world").to_owned(),
            self.stm
                .last_observation()
                .unwrap_or("nothing observed yet")
                .to_owned(),
            self.stm
                .current_plan()
                .unwrap_or("no current plan")
                .to_owned(),
            reflections,
            reaction_reason,
            self.stm.agent_bio().unwrap_or("").to_owned(),
        ];

        match self.reasoner.complete("plan", &inputs).await {
            Ok(fields) => {
                let plan = fields
                    .get("plan")
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty());
                let goals = fields
                    .get("goals")
                    .map(|g| {
                        g.lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty())
                            .map(String::from)
                            .collect::<Vec<String>>()
                    })
                    .filter(|g| !g.is_empty());

                if plan.is_none() && goals.is_none() {
                    warn!(
                        agent = self.name(),
                        "model returned neither plan nor goals, keeping prior plan"
                    );
                    return;
                }
                if let Some(plan) = plan {
                    debug!(agent = self.name(), plan, "plan updated");
                    self.stm.set_current_plan(String::from(plan));
                }
                if let Some(goals) = goals {
                    self.stm.set_current_goals(goals);
                }
            }
            Err(e) => {
                warn!(agent = self.name(), error = %e, "planning failed, keeping prior plan");
            }
        }
    }

    /// Refresh the world-context summary and remember the update.
    pub(crate) async fn update_understanding(
        &mut self,
        input: &TickInput,
        game_time: &str,
    ) {
        let described: Vec<&str> = input
            .changes
            .iter()
            .map(|c| c.description.as_str())
            .collect();
        let inputs = vec![
            self.stm.world_context().unwrap_or("unknown world").to_owned(),
            self.stm
                .last_observation()
                .unwrap_or("nothing observed yet")
                .to_owned(),
            described.join("; "),
        ];

        match self.reasoner.complete("understanding", &inputs).await {
            Ok(fields) => {
                let Some(context) = fields
                    .get("context")
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                else {
                    return;
                };
                self.stm.set_world_context(String::from(context));

                let mut tags = BTreeMap::new();
                tags.insert(String::from("type"), String::from("understanding"));
                let poignancy =
                    i32::try_from(self.config.understanding_poignancy)
                        .unwrap_or(i32::MAX);
                if let Err(e) =
                    self.ltm.add_memory(context, game_time, poignancy, &tags)
                {
                    warn!(agent = self.name(), error = %e, "failed to store understanding");
                }
            }
            Err(e) => {
                warn!(agent = self.name(), error = %e, "understanding update failed");
            }
        }
    }
}
