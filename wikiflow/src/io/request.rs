//! Input documents accepted by the generation commands.
//!
//! Requests are plain JSON files; everything except the primary subject is
//! optional and defaulted, matching the loose documents the pipeline has
//! always consumed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::expand::SubstepCount;
use crate::tree::StepNode;

/// Load any JSON input file into a typed request.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read input {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse input {}", path.display()))
}

fn default_true() -> bool {
    true
}

fn default_depth() -> u32 {
    2
}

/// Input for the `expand` command (one node of an existing tree).
#[derive(Debug, Clone, Deserialize)]
pub struct ExpandRequest {
    pub tree: StepNode,
    /// Index path to the target node; empty means "fall back to `node_step`,
    /// then to the root".
    #[serde(default)]
    pub node_path: Vec<usize>,
    /// Exact label of the target node, used when `node_path` is empty.
    #[serde(default)]
    pub node_step: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "default_true")]
    pub replace_existing: bool,
    #[serde(default)]
    pub num_substeps: Option<SubstepCount>,
}

/// Input for the `hallucinate` command (a fresh tree from one task line).
#[derive(Debug, Clone, Deserialize)]
pub struct HallucinateRequest {
    pub task: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Input for the page-section commands (`metadata`, `timeline`, `challenges`).
#[derive(Debug, Clone, Deserialize)]
pub struct TopicRequest {
    pub topic: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Precomputed sections short-circuit generation when present.
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub timeline: Option<Value>,
    #[serde(default)]
    pub challenges: Option<Value>,
}

/// Input for the `flow` command (the full pipeline).
#[derive(Debug, Clone, Deserialize)]
pub struct FlowRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Number of alternative trees to generate with varied parameters.
    #[serde(default)]
    pub alternatives: u32,
}

impl FlowRequest {
    /// Topic for the page sections, falling back to the task line.
    pub fn subject(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .or(self.task.as_deref())
            .filter(|subject| !subject.trim().is_empty())
    }
}
