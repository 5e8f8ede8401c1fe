//! The reflection phase: derived, higher-level memories.
//!
//! Reflection is gated by the poignancy accumulated in short-term memory
//! since the last reflection: only once the configured threshold is
//! crossed does the phase run, and the counter resets to zero whenever
//! it fires.
//!
//! A reflection cycle gathers the perception memories recorded since the
//! last reflection (all of them, if none has fired yet), asks the model
//! for a handful of salient questions about them, retrieves the
//! top-ranked supporting memories per question, and asks for one insight
//! per question. Non-empty insights are appended to long-term memory
//! tagged `reflection`, where future planning picks them up.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use commons_memory::{MemoryFilter, parse_game_time};

use crate::agent::CognitiveAgent;

/// Bound on how many perception memories feed one reflection.
const REFLECTION_MEMORY_LIMIT: usize = 100;

impl CognitiveAgent {
    /// Run a reflection cycle if the poignancy gate has been crossed.
    pub(crate) async fn reflect(&mut self, game_time: &str) {
        if self.stm.accumulated_poignancy() < self.config.reflection_threshold {
            return;
        }
        debug!(
            agent = self.name(),
            accumulated = self.stm.accumulated_poignancy(),
            "reflection gate crossed"
        );

        // Perception memories since the last reflection, chronological.
        let filter = match self.last_reflection_timestamp {
            Some(since) => MemoryFilter::And(vec![
                MemoryFilter::eq("type", "perception"),
                MemoryFilter::gt("timestamp", since),
            ]),
            None => MemoryFilter::eq("type", "perception"),
        };
        let recent =
            self.ltm
                .query(REFLECTION_MEMORY_LIMIT, Some(&filter), false, true);
        if recent.documents.is_empty() {
            self.finish_reflection(game_time);
            return;
        }

        let questions = self.salient_questions(&recent.documents).await;
        for question in questions {
            let supporting = self.ltm.relevant_memories(
                &question,
                self.config.retrieval_depth,
                None,
            );
            self.derive_insight(&question, &supporting, game_time).await;
        }

        self.finish_reflection(game_time);
    }

    /// Ask the model for the most salient questions about recent
    /// experiences.
    async fn salient_questions(&self, documents: &[String]) -> Vec<String> {
        let inputs = vec![
            documents.join("\n"),
            self.config.reflection_question_count.to_string(),
        ];
        match self.reasoner.complete("reflect_questions", &inputs).await {
            Ok(fields) => fields
                .get("questions")
                .map(|block| {
                    block
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from)
                        .take(self.config.reflection_question_count)
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                warn!(agent = self.name(), error = %e, "reflection questions unavailable");
                Vec::new()
            }
        }
    }

    /// Ask for one insight on a question and remember it if non-empty.
    async fn derive_insight(
        &mut self,
        question: &str,
        supporting: &[String],
        game_time: &str,
    ) {
        let inputs = vec![String::from(question), supporting.join("\n")];
        match self.reasoner.complete("reflect_insight", &inputs).await {
            Ok(fields) => {
                let Some(insight) = fields
                    .get("insight")
                    .map(|i| i.trim())
                    .filter(|i| !i.is_empty())
                else {
                    return;
                };
                let mut tags = BTreeMap::new();
                tags.insert(String::from("type"), String::from("reflection"));
                let poignancy = i32::try_from(self.config.reflection_poignancy)
                    .unwrap_or(i32::MAX);
                match self.ltm.add_memory(insight, game_time, poignancy, &tags) {
                    Ok(_) => {
                        debug!(agent = self.name(), insight, "reflection stored");
                    }
                    Err(e) => {
                        warn!(agent = self.name(), error = %e, "failed to store reflection");
                    }
                }
            }
            Err(e) => {
                warn!(agent = self.name(), error = %e, "insight derivation failed");
            }
        }
    }

    /// Close out a reflection cycle: reset the gate and stamp the time.
    fn finish_reflection(&mut self, game_time: &str) {
        self.stm.reset_poignancy();
        self.last_reflection_timestamp = parse_game_time(game_time).ok();
    }
}
