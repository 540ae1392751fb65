//! Prompt assembly for the generation backend.
//!
//! User messages are minijinja templates compiled in at build time; the
//! matching system instructions are fixed text shipped the same way.

use minijinja::{Environment, context};

use crate::core::expand::SubstepCount;

const EXPAND_SYSTEM: &str = include_str!("prompts/expand_system.md");
const EXPAND_USER: &str = include_str!("prompts/expand_user.md");
const HALLUCINATE_SYSTEM: &str = include_str!("prompts/hallucinate_system.md");
const HALLUCINATE_USER: &str = include_str!("prompts/hallucinate_user.md");
const METADATA_SYSTEM: &str = include_str!("prompts/metadata_system.md");
const METADATA_USER: &str = include_str!("prompts/metadata_user.md");
const TIMELINE_SYSTEM: &str = include_str!("prompts/timeline_system.md");
const TIMELINE_USER: &str = include_str!("prompts/timeline_user.md");
const CHALLENGES_SYSTEM: &str = include_str!("prompts/challenges_system.md");
const CHALLENGES_USER: &str = include_str!("prompts/challenges_user.md");

/// A system/user message pair ready for [`TextGenerator::generate`].
///
/// [`TextGenerator::generate`]: crate::agents::TextGenerator::generate
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for (name, template) in [
            ("expand", EXPAND_USER),
            ("hallucinate", HALLUCINATE_USER),
            ("metadata", METADATA_USER),
            ("timeline", TIMELINE_USER),
            ("challenges", CHALLENGES_USER),
        ] {
            env.add_template(name, template)
                .expect("prompt template should be valid");
        }
        Self { env }
    }

    pub fn expand(&self, task: &str, count: &SubstepCount) -> RenderedPrompt {
        RenderedPrompt {
            system: EXPAND_SYSTEM.trim().to_string(),
            user: self.render("expand", task, count),
        }
    }

    pub fn hallucinate(&self, task: &str, count: &SubstepCount) -> RenderedPrompt {
        RenderedPrompt {
            system: HALLUCINATE_SYSTEM.trim().to_string(),
            user: self.render("hallucinate", task, count),
        }
    }

    pub fn page_metadata(&self, topic: &str) -> RenderedPrompt {
        RenderedPrompt {
            system: METADATA_SYSTEM.trim().to_string(),
            user: self.render_topic("metadata", topic),
        }
    }

    pub fn timeline(&self, topic: &str) -> RenderedPrompt {
        RenderedPrompt {
            system: TIMELINE_SYSTEM.trim().to_string(),
            user: self.render_topic("timeline", topic),
        }
    }

    pub fn challenges(&self, topic: &str) -> RenderedPrompt {
        RenderedPrompt {
            system: CHALLENGES_SYSTEM.trim().to_string(),
            user: self.render_topic("challenges", topic),
        }
    }

    fn render(&self, name: &str, task: &str, count: &SubstepCount) -> String {
        let template = self
            .env
            .get_template(name)
            .expect("prompt template should be registered");
        template
            .render(context! {
                task => task,
                count => count.to_string(),
            })
            .expect("prompt rendering should not fail")
            .trim()
            .to_string()
    }

    fn render_topic(&self, name: &str, topic: &str) -> String {
        let template = self
            .env
            .get_template(name)
            .expect("prompt template should be registered");
        template
            .render(context! { topic => topic })
            .expect("prompt rendering should not fail")
            .trim()
            .to_string()
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_prompt_carries_task_and_count() {
        let engine = PromptEngine::new();
        let prompt = engine.expand("Bake bread", &SubstepCount::default());
        assert!(prompt.user.contains("Task: Bake bread"));
        assert!(prompt.user.contains("3-7 detailed substeps"));
        assert!(prompt.system.contains("JSON array of step objects"));
    }

    #[test]
    fn topic_prompts_interpolate_the_topic() {
        let engine = PromptEngine::new();
        for prompt in [
            engine.page_metadata("Bread Making"),
            engine.timeline("Bread Making"),
            engine.challenges("Bread Making"),
        ] {
            assert!(prompt.user.contains("Bread Making"), "{}", prompt.user);
            assert!(!prompt.system.is_empty());
        }
    }
}
