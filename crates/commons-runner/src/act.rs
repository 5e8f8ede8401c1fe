//! The act phase: choose one high-level action.
//!
//! The model is asked for exactly one natural-language action
//! descriptor. The call is repeated until a response carries a non-empty
//! `action` field -- this phase enforces no retry bound of its own, so
//! liveness rests on the collaborator's bounded retry budget (a dead
//! backend surfaces as an error, which the tick loop turns into
//! exploration). The chosen descriptor is returned as a single-element
//! queue; translation into primitive steps is the spatial subsystem's
//! job.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::agent::CognitiveAgent;
use crate::error::RunnerError;

impl CognitiveAgent {
    /// Request one high-level action descriptor from the model.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error once its own retry budget is
    /// exhausted; parse failures are retried indefinitely here.
    pub(crate) async fn act(&mut self) -> Result<VecDeque<String>, RunnerError> {
        let known_agents: Vec<String> =
            self.stm.known_agents().iter().cloned().collect();
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
            self.stm.current_goals().join("\n"),
            if known_agents.is_empty() {
                String::from("none")
            } else {
                known_agents.join(", ")
            },
        ];

        loop {
            let fields = self.reasoner.complete("act", &inputs).await?;
            let action = fields
                .get("action")
                .map(|a| a.trim())
                .filter(|a| !a.is_empty());
            match action {
                Some(action) => {
                    debug!(agent = self.name(), action, "action chosen");
                    return Ok(VecDeque::from(vec![String::from(action)]));
                }
                None => {
                    warn!(
                        agent = self.name(),
                        "act response carried no action, asking again"
                    );
                }
            }
        }
    }
}
