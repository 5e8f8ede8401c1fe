//! Prompt template loading and rendering via `minijinja`.
//!
//! Each cognition phase addresses its template by id (`react`, `plan`,
//! `reflect_questions`, `reflect_insight`, `understanding`, `act`); the
//! shared `system` template establishes the agent's reality. Templates
//! receive one context value: the ordered `inputs` array, addressed as
//! `{{ inputs[0] }}`, `{{ inputs[1] }}`, and so on.
//!
//! A builtin template set ships with the crate so the binary and tests
//! run without external files; operators can override the whole set with
//! a directory of `.j2` files to tune agent behavior without
//! recompiling.

use minijinja::Environment;

use crate::error::RunnerError;

/// Template ids every prompt set must provide.
const TEMPLATE_IDS: [&str; 7] = [
    "system",
    "react",
    "plan",
    "reflect_questions",
    "reflect_insight",
    "understanding",
    "act",
];

/// Builtin template sources, paired with [`TEMPLATE_IDS`].
const BUILTIN_SOURCES: [&str; 7] = [
    include_str!("../templates/system.j2"),
    include_str!("../templates/react.j2"),
    include_str!("../templates/plan.j2"),
    include_str!("../templates/reflect_questions.j2"),
    include_str!("../templates/reflect_insight.j2"),
    include_str!("../templates/understanding.j2"),
    include_str!("../templates/act.j2"),
];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// Which template produced this prompt (used by the scripted backend
    /// and for logging).
    pub template_id: String,
    /// System message establishing the agent's reality.
    pub system: String,
    /// User message carrying the phase-specific inputs.
    pub user: String,
}

impl PromptEngine {
    /// Create an engine from the builtin template set.
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (id, source) in TEMPLATE_IDS.iter().zip(BUILTIN_SOURCES.iter()) {
            env.add_template_owned((*id).to_owned(), (*source).to_owned())
                .map_err(|e| {
                    RunnerError::Template(format!("failed to add {id} template: {e}"))
                })?;
        }
        Ok(Self { env })
    }

    /// Create an engine loading `<id>.j2` files from a directory.
    ///
    /// All of [`TEMPLATE_IDS`] must be present.
    pub fn from_dir(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for id in TEMPLATE_IDS {
            let path = format!("{templates_dir}/{id}.j2");
            let source = std::fs::read_to_string(&path)
                .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))?;
            env.add_template_owned(id.to_owned(), source).map_err(|e| {
                RunnerError::Template(format!("failed to add {id} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the system and user messages for one phase call.
    ///
    /// `inputs` is the ordered argument list the phase supplies; the
    /// template decides how to lay them out.
    pub fn render(
        &self,
        template_id: &str,
        inputs: &[String],
    ) -> Result<RenderedPrompt, RunnerError> {
        let context = serde_json::json!({ "inputs": inputs });

        let system = self
            .env
            .get_template("system")
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(&context)
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template(template_id)
            .map_err(|e| {
                RunnerError::Template(format!("missing {template_id} template: {e}"))
            })?
            .render(&context)
            .map_err(|e| {
                RunnerError::Template(format!("{template_id} render failed: {e}"))
            })?;

        Ok(RenderedPrompt {
            template_id: String::from(template_id),
            system,
            user,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_load_and_render() {
        let engine = PromptEngine::builtin();
        assert!(engine.is_ok());
        let Ok(engine) = engine else {
            return;
        };

        let inputs = vec![
            String::from("the orchard is shared"),
            String::from("an apple at position (2, 3)"),
            String::from("no current plan"),
            String::from("none pending"),
            String::from("no changes"),
        ];
        let prompt = engine.render("react", &inputs);
        assert!(prompt.is_ok());
        if let Ok(prompt) = prompt {
            assert_eq!(prompt.template_id, "react");
            assert!(!prompt.system.is_empty());
            assert!(prompt.user.contains("an apple at position (2, 3)"));
            assert!(prompt.user.contains("<react>"));
        }
    }

    #[test]
    fn every_builtin_template_renders() {
        let Ok(engine) = PromptEngine::builtin() else {
            return;
        };
        let inputs: Vec<String> =
            (0..6).map(|i| format!("input number {i}")).collect();
        for id in TEMPLATE_IDS {
            assert!(engine.render(id, &inputs).is_ok(), "template {id}");
        }
    }

    #[test]
    fn from_dir_loads_custom_templates() {
        let unique = format!(
            "commons_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        for id in TEMPLATE_IDS {
            std::fs::write(
                dir.join(format!("{id}.j2")),
                format!("{id}: {{{{ inputs[0] }}}}"),
            )
            .ok();
        }

        let engine = PromptEngine::from_dir(dir.to_str().unwrap_or(""));
        assert!(engine.is_ok());
        if let Ok(engine) = engine {
            let prompt =
                engine.render("plan", &[String::from("hello")]);
            assert_eq!(
                prompt.ok().map(|p| p.user),
                Some(String::from("plan: hello"))
            );
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_template_is_an_error() {
        let unique = format!(
            "commons_templates_missing_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        // Only one template present.
        std::fs::write(dir.join("system.j2"), "hi").ok();

        assert!(PromptEngine::from_dir(dir.to_str().unwrap_or("")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_template_id_is_an_error() {
        let Ok(engine) = PromptEngine::builtin() else {
            return;
        };
        assert!(engine.render("daydream", &[]).is_err());
    }
}
