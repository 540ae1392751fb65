//! Substep count directives and the children merge policy for expansion.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tree::StepNode;

/// How many substeps an expansion should ask the model for.
///
/// Request documents may carry this as a bare integer or as a `"min-max"`
/// string; both render back into the prompt text verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstepCount {
    Exact(u32),
    Range { min: u32, max: u32 },
}

impl Default for SubstepCount {
    fn default() -> Self {
        SubstepCount::Range { min: 3, max: 7 }
    }
}

impl fmt::Display for SubstepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstepCount::Exact(count) => write!(f, "{count}"),
            SubstepCount::Range { min, max } => write!(f, "{min}-{max}"),
        }
    }
}

impl FromStr for SubstepCount {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parsed = match trimmed.split_once('-') {
            Some((min, max)) => SubstepCount::Range {
                min: parse_bound(min)?,
                max: parse_bound(max)?,
            },
            None => SubstepCount::Exact(parse_bound(trimmed)?),
        };
        parsed.validate()?;
        Ok(parsed)
    }
}

fn parse_bound(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("invalid substep count '{raw}'"))
}

impl SubstepCount {
    fn validate(self) -> Result<()> {
        match self {
            SubstepCount::Exact(0) => Err(anyhow!("substep count must be > 0")),
            SubstepCount::Range { min: 0, .. } => Err(anyhow!("substep range must start > 0")),
            SubstepCount::Range { min, max } if min > max => {
                Err(anyhow!("substep range {min}-{max} is inverted"))
            }
            _ => Ok(()),
        }
    }
}

impl Serialize for SubstepCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubstepCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(count) => {
                let parsed = SubstepCount::Exact(count);
                parsed.validate().map_err(D::Error::custom)?;
                Ok(parsed)
            }
            Raw::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

/// Merge freshly generated `substeps` into `node` without mutating it.
///
/// The substeps become the entire `children` when `replace_existing` is set,
/// or when the node has no children collection, or an empty one. Otherwise
/// they are appended after the existing children, order preserved and with no
/// de-duplication. The node's `step` and `id` carry over unchanged.
pub fn merge_children(node: &StepNode, substeps: Vec<StepNode>, replace_existing: bool) -> StepNode {
    let mut merged = node.clone();
    match merged.children.take() {
        Some(mut existing) if !replace_existing && !existing.is_empty() => {
            existing.extend(substeps);
            merged.children = Some(existing);
        }
        _ => merged.children = Some(substeps),
    }
    merged
}
