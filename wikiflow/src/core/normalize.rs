//! Tolerant conversion of model replies into step records.
//!
//! Replies are supposed to be JSON arrays of step objects but routinely come
//! back wrapped in code fences, prefixed with commentary, or malformed. The
//! pipeline is two-stage: a strict parse attempt, then a declared fallback
//! that splits the text into lines. It never errors and never returns an
//! empty sequence, so callers can always proceed with a well-typed result.

use serde_json::Value;

use crate::tree::StepNode;

/// Label used when nothing could be salvaged from a reply.
pub const PLACEHOLDER_STEP: &str = "No valid substeps could be generated";

/// Shape of records produced by the line-splitting fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackShape {
    /// Leaf records carry no `children` collection.
    Flat,
    /// Leaf records carry an explicit empty `children` collection.
    Hierarchical,
}

/// What to do with a label once its embedded JSON was lifted into children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedLabelMode {
    /// Empty the label.
    Clear,
    /// Move the raw label text into `title`, then empty the label.
    PreserveTitle,
}

impl std::str::FromStr for EmbeddedLabelMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "clear" => Ok(EmbeddedLabelMode::Clear),
            "title" => Ok(EmbeddedLabelMode::PreserveTitle),
            other => Err(anyhow::anyhow!(
                "unknown embedded-label mode '{other}' (expected 'clear' or 'title')"
            )),
        }
    }
}

/// Remove markdown code-fence markers from a reply.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Best-effort conversion of a reply into a non-empty list of step records.
pub fn normalize_steps(raw: &str, shape: FallbackShape) -> Vec<StepNode> {
    let cleaned = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        let steps = match value {
            Value::Array(items) => items.iter().map(|item| value_to_step(item, shape)).collect(),
            // A lone step object is accepted as a one-element list.
            Value::Object(ref map) if map.contains_key("step") => {
                vec![value_to_step(&value, shape)]
            }
            _ => Vec::new(),
        };
        if !steps.is_empty() {
            return steps;
        }
        return vec![placeholder(shape)];
    }

    let lines: Vec<StepNode> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| leaf(line, shape))
        .collect();
    if lines.is_empty() {
        vec![placeholder(shape)]
    } else {
        lines
    }
}

/// Convert one parsed JSON value into a step record.
///
/// Objects keep their own `children` presence (absent stays absent, so later
/// passes can tell unexpanded nodes apart); scalars become leaves in the
/// requested shape.
pub fn value_to_step(value: &Value, shape: FallbackShape) -> StepNode {
    match value {
        Value::Object(map) => {
            let step = match map.get("step") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let title = match map.get("title") {
                Some(Value::String(text)) => Some(text.clone()),
                _ => None,
            };
            let children = match map.get("children") {
                Some(Value::Array(items)) => {
                    Some(items.iter().map(|item| value_to_step(item, shape)).collect())
                }
                _ => None,
            };
            let mut node = StepNode::new(step);
            node.title = title;
            node.children = children;
            node
        }
        Value::String(text) => leaf(text, shape),
        other => leaf(&other.to_string(), shape),
    }
}

fn leaf(step: &str, shape: FallbackShape) -> StepNode {
    match shape {
        FallbackShape::Flat => StepNode::new(step),
        FallbackShape::Hierarchical => StepNode::with_children(step, Vec::new()),
    }
}

fn placeholder(shape: FallbackShape) -> StepNode {
    leaf(PLACEHOLDER_STEP, shape)
}

/// Recover a JSON object (or array) from free text.
///
/// Tried in order: strict parse of the fence-stripped text, the body of a
/// ```` ```json ```` block, and the slice between the first `{` and the last
/// `}`. Returns `None` when every strategy fails.
pub fn salvage_json(raw: &str) -> Option<Value> {
    let cleaned = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    if let Some(fenced) = raw.split("```json").nth(1) {
        let body = fenced.split("```").next().unwrap_or(fenced).trim();
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if value.is_object() || value.is_array() {
                return Some(value);
            }
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Recursively lift embedded JSON out of labels.
///
/// A label that itself parses as a JSON list becomes the node's children; a
/// JSON object becomes a single child. The label is then emptied, or kept
/// under `title`, per `mode`. Labels that merely look like JSON but fail to
/// parse are left alone. Newly lifted children are processed too.
pub fn lift_embedded_json(mut node: StepNode, mode: EmbeddedLabelMode) -> StepNode {
    let trimmed = node.step.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            let lifted = match value {
                Value::Array(ref items) => Some(
                    items
                        .iter()
                        .map(|item| value_to_step(item, FallbackShape::Hierarchical))
                        .collect::<Vec<_>>(),
                ),
                Value::Object(_) => Some(vec![value_to_step(&value, FallbackShape::Hierarchical)]),
                _ => None,
            };
            if let Some(children) = lifted {
                node.children = Some(children);
                let label = std::mem::take(&mut node.step);
                if mode == EmbeddedLabelMode::PreserveTitle && node.title.is_none() {
                    node.title = Some(label);
                }
            }
        }
    }

    if let Some(children) = node.children.take() {
        node.children = Some(
            children
                .into_iter()
                .map(|child| lift_embedded_json(child, mode))
                .collect(),
        );
    }
    node
}
