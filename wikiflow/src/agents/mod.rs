//! Model-backed agents for tree generation and page sections.
//!
//! The [`TextGenerator`] trait decouples the operations from the actual chat
//! backend (currently Ollama). Tests use scripted generators that return
//! predetermined replies without any network traffic.

use anyhow::Result;
use serde_json::{Map, Value};

pub mod expander;
pub mod hallucinator;
pub mod ollama;
pub mod page;

/// Model selection plus the open options map forwarded to the backend.
#[derive(Debug, Clone, Default)]
pub struct ModelParams {
    pub model: String,
    /// Backend options (temperature, seed, ...), passed through untouched.
    pub options: Map<String, Value>,
}

impl ModelParams {
    pub fn new(model: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            model: model.into(),
            options,
        }
    }
}

/// Abstraction over blocking text-generation backends.
///
/// Implementations receive two free-text blocks and an open options map and
/// return one opaque text blob; no schema is enforced here. Making sense of
/// the reply is entirely the caller's job (see [`crate::core::normalize`]).
pub trait TextGenerator {
    fn generate(&self, system: &str, user: &str, params: &ModelParams) -> Result<String>;
}
