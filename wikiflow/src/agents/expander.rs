//! Node expansion: generate substeps for one node and substitute the result
//! back into its tree.

use tracing::{info, warn};

use crate::core::expand::{SubstepCount, merge_children};
use crate::core::normalize::{FallbackShape, normalize_steps};
use crate::core::path::{locate, locate_by_step, replace_at};
use crate::io::prompt::PromptEngine;
use crate::tree::StepNode;

use super::{ModelParams, TextGenerator};

/// How the target of an expansion is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTarget {
    /// Zero-based child indices from the root.
    Path(Vec<usize>),
    /// Exact label of the node, resolved pre-order-first.
    Step(String),
    /// The tree root itself.
    Root,
}

impl NodeTarget {
    /// Addressing rule for request documents: an index path wins, then a
    /// label, then the root.
    pub fn from_request(node_path: &[usize], node_step: Option<&str>) -> Self {
        if !node_path.is_empty() {
            return NodeTarget::Path(node_path.to_vec());
        }
        match node_step {
            Some(step) if !step.trim().is_empty() => NodeTarget::Step(step.to_string()),
            _ => NodeTarget::Root,
        }
    }
}

/// Result of expanding a node inside a tree.
#[derive(Debug, Clone)]
pub struct ExpandOutcome {
    /// The updated tree; the input tree is left untouched.
    pub tree: StepNode,
    /// Realized path of the expanded node.
    pub node_path: Vec<usize>,
    /// Label of the expanded node at the time of expansion.
    pub node_step: String,
}

/// Expand one node into substeps.
///
/// Generator failures are recoverable here: they degrade through tolerant
/// normalization to the placeholder record, so the returned node always has
/// well-typed children. The node's own label and id are unchanged.
pub fn expand_node<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    node: &StepNode,
    count: &SubstepCount,
    replace_existing: bool,
    params: &ModelParams,
) -> StepNode {
    let prompt = engine.expand(&node.step, count);
    let raw = match generator.generate(&prompt.system, &prompt.user, params) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %format!("{err:#}"), step = %node.step, "generation failed");
            String::new()
        }
    };
    let substeps = normalize_steps(&raw, FallbackShape::Hierarchical);
    info!(step = %node.step, substeps = substeps.len(), "expanded node");
    merge_children(node, substeps, replace_existing)
}

/// Expand the addressed node and substitute the result at its realized path.
///
/// Returns `None` when the target cannot be located; the caller decides how
/// to report that.
pub fn expand_in_tree<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    tree: &StepNode,
    target: &NodeTarget,
    count: &SubstepCount,
    replace_existing: bool,
    params: &ModelParams,
) -> Option<ExpandOutcome> {
    let (node, node_path) = match target {
        NodeTarget::Path(path) => (locate(tree, path)?, path.clone()),
        NodeTarget::Step(step) => {
            let (node, path) = locate_by_step(tree, step)?;
            (node, path)
        }
        NodeTarget::Root => (tree, Vec::new()),
    };
    let node_step = node.step.clone();
    let expanded = expand_node(generator, engine, node, count, replace_existing, params);
    Some(ExpandOutcome {
        tree: replace_at(tree, &node_path, expanded),
        node_path,
        node_step,
    })
}
