//! Recursive tree generation from a single task description.
//!
//! One blocking generation call per node, strictly sequential: expand a
//! level, wait, then recurse into the substeps that came back without their
//! own children. Children order is the order the model produced.

use tracing::{info, warn};

use crate::core::expand::SubstepCount;
use crate::core::normalize::{
    EmbeddedLabelMode, FallbackShape, lift_embedded_json, normalize_steps,
};
use crate::io::prompt::PromptEngine;
use crate::tree::StepNode;

use super::{ModelParams, TextGenerator};

/// Build a task tree of the given depth.
///
/// Never fails: backend errors and malformed replies degrade through
/// tolerant normalization, so the result is always a well-formed tree rooted
/// at `task`. A final pass lifts embedded JSON out of labels in the
/// requested mode.
pub fn hallucinate_tree<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    task: &str,
    depth: u32,
    params: &ModelParams,
    mode: EmbeddedLabelMode,
) -> StepNode {
    let tree = expand_level(generator, engine, task, 0, depth, params);
    let tree = lift_embedded_json(tree, mode);
    info!(task = %task, nodes = tree.node_count(), "hallucinated tree");
    tree
}

fn expand_level<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    step: &str,
    current: u32,
    depth: u32,
    params: &ModelParams,
) -> StepNode {
    if current >= depth {
        return StepNode::with_children(step, Vec::new());
    }

    let prompt = engine.hallucinate(step, &SubstepCount::default());
    let raw = match generator.generate(&prompt.system, &prompt.user, params) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %format!("{err:#}"), step = %step, "generation failed");
            String::new()
        }
    };
    let substeps = normalize_steps(&raw, FallbackShape::Hierarchical);

    let children = substeps
        .into_iter()
        .map(|sub| {
            // Only substeps the model left unexpanded get their own call.
            if sub.children.is_none() && current + 1 < depth {
                let expanded = expand_level(generator, engine, &sub.step, current + 1, depth, params);
                StepNode {
                    children: expanded.children,
                    ..sub
                }
            } else {
                sub
            }
        })
        .collect();

    StepNode::with_children(step, children)
}
