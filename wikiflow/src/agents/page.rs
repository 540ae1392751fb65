//! Wiki page sections generated per topic: metadata, timeline, challenges.

use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::core::normalize::salvage_json;
use crate::io::prompt::{PromptEngine, RenderedPrompt};

use super::{ModelParams, TextGenerator};

/// The page sections the pipeline knows how to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Metadata,
    Timeline,
    Challenges,
}

impl PageKind {
    /// Task label recorded in the output envelope.
    pub fn task_name(self) -> &'static str {
        match self {
            PageKind::Metadata => "Page Metadata Generation",
            PageKind::Timeline => "Automation Timeline Generation",
            PageKind::Challenges => "Automation Challenges Generation",
        }
    }

    /// Key the section lives under in the output document.
    pub fn section_key(self) -> &'static str {
        match self {
            PageKind::Metadata => "page_metadata",
            PageKind::Timeline => "timeline",
            PageKind::Challenges => "challenges",
        }
    }

    /// Default output subdirectory.
    pub fn category(self) -> &'static str {
        match self {
            PageKind::Metadata => "metadata",
            PageKind::Timeline => "automation-timeline",
            PageKind::Challenges => "automation-challenges",
        }
    }

    fn prompt(self, engine: &PromptEngine, topic: &str) -> RenderedPrompt {
        match self {
            PageKind::Metadata => engine.page_metadata(topic),
            PageKind::Timeline => engine.timeline(topic),
            PageKind::Challenges => engine.challenges(topic),
        }
    }
}

/// Generate one page section for a topic.
///
/// A precomputed section short-circuits generation entirely. Unlike the tree
/// path, an unsalvageable reply here is an error: there is no useful
/// placeholder for a whole page section.
pub fn generate_section<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    kind: PageKind,
    topic: &str,
    precomputed: Option<Value>,
    params: &ModelParams,
) -> Result<Value> {
    if let Some(section) = precomputed {
        debug!(kind = ?kind, "using precomputed section");
        return Ok(section);
    }

    let prompt = kind.prompt(engine, topic);
    let raw = generator.generate(&prompt.system, &prompt.user, params)?;
    salvage_json(&raw).ok_or_else(|| {
        anyhow!(
            "model reply for {} was not valid JSON: {}",
            kind.section_key(),
            raw.trim()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;

    fn params() -> ModelParams {
        ModelParams::new("test-model", serde_json::Map::new())
    }

    #[test]
    fn precomputed_section_skips_generation() {
        let generator = ScriptedGenerator::new(Vec::<String>::new());
        let engine = PromptEngine::new();
        let section = generate_section(
            &generator,
            &engine,
            PageKind::Metadata,
            "Bread",
            Some(serde_json::json!({"title": "Bread"})),
            &params(),
        )
        .expect("section");
        assert_eq!(section["title"], "Bread");
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn fenced_reply_is_salvaged() {
        let generator =
            ScriptedGenerator::new(["```json\n{\"historical\": {\"1920s\": \"x\"}}\n```"]);
        let engine = PromptEngine::new();
        let section = generate_section(
            &generator,
            &engine,
            PageKind::Timeline,
            "Bread",
            None,
            &params(),
        )
        .expect("section");
        assert_eq!(section["historical"]["1920s"], "x");
        assert!(generator.calls()[0].user.contains("Bread"));
    }

    #[test]
    fn prose_reply_is_an_error() {
        let generator = ScriptedGenerator::new(["I cannot produce JSON today."]);
        let engine = PromptEngine::new();
        let err = generate_section(
            &generator,
            &engine,
            PageKind::Challenges,
            "Bread",
            None,
            &params(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("was not valid JSON"));
    }
}
