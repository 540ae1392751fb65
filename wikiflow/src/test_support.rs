//! Test-only helpers: deterministic step nodes, scripted generators and
//! temporary workspaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Result, anyhow};

use crate::agents::{ModelParams, TextGenerator};
use crate::tree::StepNode;

/// Temporary working directory for filesystem tests.
pub struct TestDir {
    root: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

/// Create a node with a deterministic id derived from its label.
pub fn node(step: &str) -> StepNode {
    StepNode {
        step: step.to_string(),
        id: format!("id-{step}"),
        title: None,
        children: None,
    }
}

/// Create a node with children and a deterministic id.
pub fn node_with_children(step: &str, children: Vec<StepNode>) -> StepNode {
    StepNode {
        children: Some(children),
        ..node(step)
    }
}

/// One recorded generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCall {
    pub system: String,
    pub user: String,
    pub model: String,
}

/// Generator that replays queued replies in order and records every call.
///
/// Errors once the queue is exhausted, which doubles as a test for the
/// recoverable-failure path.
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<String>>,
    calls: RefCell<Vec<GeneratorCall>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.borrow().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, system: &str, user: &str, params: &ModelParams) -> Result<String> {
        self.calls.borrow_mut().push(GeneratorCall {
            system: system.to_string(),
            user: user.to_string(),
            model: params.model.clone(),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted generator ran out of replies"))
    }
}

/// Generator that always fails.
pub struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _system: &str, _user: &str, _params: &ModelParams) -> Result<String> {
        Err(anyhow!("backend unavailable"))
    }
}
