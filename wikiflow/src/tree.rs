//! Step tree data model.
//!
//! A tree of [`StepNode`]s is a strict rooted forest: every node is owned by
//! its parent and edits flow through copy-on-write substitution at a known
//! path ([`crate::core::path::replace_at`]), never through shared references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of a task breakdown.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepNode {
    /// Step description. May be empty after an embedded-JSON label was
    /// lifted into `children`.
    pub step: String,
    /// Assigned once at creation and never regenerated. Expansion keeps the
    /// expanded node's id; only freshly generated children get new ones.
    #[serde(default = "fresh_id")]
    pub id: String,
    /// Original label text, kept aside when embedded JSON is lifted out of
    /// `step` in [`EmbeddedLabelMode::PreserveTitle`] mode.
    ///
    /// [`EmbeddedLabelMode::PreserveTitle`]: crate::core::normalize::EmbeddedLabelMode::PreserveTitle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `None` means the node was never expanded; `Some` with an empty vec
    /// means it was expanded and produced no substeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<StepNode>>,
}

/// Generate a new node identifier.
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

impl StepNode {
    /// Unexpanded node from a label.
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            id: fresh_id(),
            title: None,
            children: None,
        }
    }

    /// Node expanded with the given substeps (possibly none).
    pub fn with_children(step: impl Into<String>, children: Vec<StepNode>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(step)
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(StepNode::node_count)
            .sum::<usize>()
    }
}
