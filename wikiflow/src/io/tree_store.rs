//! Tree persistence: single JSON document and directory-per-node layout.
//!
//! The document form is validated against an embedded JSON Schema plus
//! semantic invariants on load. The directory form gives every node its own
//! directory holding a small `node.json` and one subdirectory per child;
//! child directories carry a zero-padded index prefix so lexicographic
//! traversal reproduces children order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::invariants::validate_invariants;
use crate::tree::{StepNode, fresh_id};

const STEP_TREE_SCHEMA: &str = include_str!("../../schemas/step_tree/v1.schema.json");

/// Longest sanitized label segment used in a directory name.
const MAX_SEGMENT_CHARS: usize = 40;
/// Identifier prefix length appended to directory names.
const ID_PREFIX_CHARS: usize = 8;

/// Load and validate a tree document (schema + invariants).
///
/// Accepts either a bare tree or an envelope document carrying the tree under
/// a top-level `tree` field, as written by the generation commands.
pub fn load_tree(path: &Path) -> Result<StepNode> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read tree {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse tree {}", path.display()))?;
    let tree_value = match value.get("tree") {
        Some(inner) => inner.clone(),
        None => value,
    };
    validate_schema(&tree_value).with_context(|| format!("validate tree {}", path.display()))?;
    let tree: StepNode = serde_json::from_value(tree_value)
        .with_context(|| format!("deserialize tree {}", path.display()))?;
    let errors = validate_invariants(&tree);
    if !errors.is_empty() {
        bail!("tree invariants failed: {}", errors.join("; "));
    }
    Ok(tree)
}

/// Write a tree document with pretty formatting and a trailing newline.
pub fn write_tree(path: &Path, tree: &StepNode) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(tree)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write tree {}", path.display()))
}

fn validate_schema(tree: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(STEP_TREE_SCHEMA).context("parse embedded step tree schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(tree) {
        let messages = compiled
            .iter_errors(tree)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "tree schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

/// Per-node metadata stored as `node.json` inside the node's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeMeta {
    step: String,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    /// Set only when the node was expanded but has no substeps, so the
    /// distinction survives a round trip despite the absence of subdirectories.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    expanded: bool,
}

/// Export a tree as a directory hierarchy rooted at `dir`.
///
/// `dir` becomes the root node's directory; it is created if missing and must
/// not already contain a `node.json`.
pub fn export_tree_dirs(dir: &Path, tree: &StepNode) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create tree dir {}", dir.display()))?;
    if dir.join("node.json").exists() {
        bail!("refusing to export into {}: node.json already exists", dir.display());
    }
    write_node_dir(dir, tree)
}

fn write_node_dir(dir: &Path, node: &StepNode) -> Result<()> {
    let meta = NodeMeta {
        step: node.step.clone(),
        id: node.id.clone(),
        title: node.title.clone(),
        expanded: node.children.as_ref().is_some_and(Vec::is_empty),
    };
    let mut buf = serde_json::to_string_pretty(&meta)?;
    buf.push('\n');
    let meta_path = dir.join("node.json");
    fs::write(&meta_path, buf).with_context(|| format!("write {}", meta_path.display()))?;

    for (index, child) in node.children.iter().flatten().enumerate() {
        let child_dir = dir.join(child_dir_name(dir, index, child));
        fs::create_dir(&child_dir)
            .with_context(|| format!("create node dir {}", child_dir.display()))?;
        write_node_dir(&child_dir, child)?;
    }
    Ok(())
}

/// Reconstruct a tree from a directory hierarchy written by
/// [`export_tree_dirs`].
///
/// A directory without a `node.json` is structural corruption and fails the
/// whole import, naming the offending path; nodes are never fabricated.
pub fn import_tree_dirs(dir: &Path) -> Result<StepNode> {
    let meta_path = dir.join("node.json");
    if !meta_path.exists() {
        bail!("invalid tree directory {}: missing node.json", dir.display());
    }
    let contents = fs::read_to_string(&meta_path)
        .with_context(|| format!("read {}", meta_path.display()))?;
    let meta: NodeMeta = serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", meta_path.display()))?;

    let mut child_dirs: Vec<PathBuf> = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("read tree directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read tree directory {}", dir.display()))?;
        if entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?
            .is_dir()
        {
            child_dirs.push(entry.path());
        }
    }
    child_dirs.sort();

    let children = if child_dirs.is_empty() {
        if meta.expanded { Some(Vec::new()) } else { None }
    } else {
        let mut children = Vec::with_capacity(child_dirs.len());
        for child_dir in &child_dirs {
            children.push(import_tree_dirs(child_dir)?);
        }
        Some(children)
    };

    Ok(StepNode {
        step: meta.step,
        id: if meta.id.is_empty() { fresh_id() } else { meta.id },
        title: meta.title,
        children,
    })
}

/// Derive a filesystem-safe directory name for a child node.
///
/// `{index:03}_{sanitized}_{id prefix}`; when that name is already taken at
/// this level the full identifier replaces the prefix.
fn child_dir_name(parent: &Path, index: usize, node: &StepNode) -> String {
    let segment = sanitize_segment(&node.step);
    let short: String = node.id.chars().take(ID_PREFIX_CHARS).collect();
    let name = format!("{index:03}_{segment}_{short}");
    if parent.join(&name).exists() {
        return format!("{index:03}_{segment}_{}", node.id);
    }
    name
}

/// Reduce a label to a bounded, filesystem-safe segment.
pub fn sanitize_segment(label: &str) -> String {
    static NON_WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("non-word pattern should be valid"));
    static SEPARATORS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\s_-]+").expect("separator pattern should be valid"));

    let lowered = label.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let collapsed = SEPARATORS.replace_all(stripped.trim(), "_");
    let bounded: String = collapsed.chars().take(MAX_SEGMENT_CHARS).collect();
    let trimmed = bounded.trim_matches('_');
    if trimmed.is_empty() {
        "node".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{node, node_with_children};

    #[test]
    fn document_round_trip_with_validation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree_path = temp.path().join("tree.json");
        let tree = node_with_children("root", vec![node("a"), node("b")]);

        write_tree(&tree_path, &tree).expect("write");
        let loaded = load_tree(&tree_path).expect("load");
        assert_eq!(loaded, tree);
    }

    #[test]
    fn load_accepts_envelope_documents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("output.json");
        let tree = node_with_children("root", vec![node("a")]);
        let envelope = serde_json::json!({
            "uuid": "whatever",
            "task": "Hallucinate Tree",
            "tree": tree,
        });
        fs::write(&path, serde_json::to_string_pretty(&envelope).expect("json"))
            .expect("write");

        let loaded = load_tree(&path).expect("load");
        assert_eq!(loaded, tree);
    }

    #[test]
    fn load_rejects_schema_violations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tree.json");
        fs::write(&path, r#"{"step": 42, "id": "x"}"#).expect("write");
        let err = load_tree(&path).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tree.json");
        fs::write(
            &path,
            r#"{"step": "r", "id": "dup", "children": [{"step": "c", "id": "dup"}]}"#,
        )
        .expect("write");
        let err = load_tree(&path).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate id"));
    }

    #[test]
    fn directory_round_trip_preserves_structure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tree");
        // depth 3, duplicate labels, one empty label, one expanded-empty node
        let tree = node_with_children(
            "root",
            vec![
                node_with_children(
                    "Mix & Knead Dough!!",
                    vec![node(""), node_with_children("rest", Vec::new())],
                ),
                node("Mix & Knead Dough!!"),
                node("zz"),
            ],
        );

        export_tree_dirs(&root, &tree).expect("export");
        let loaded = import_tree_dirs(&root).expect("import");
        assert_eq!(loaded, tree);
    }

    #[test]
    fn directory_names_are_ordered_and_sanitized() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tree");
        let tree = node_with_children(
            "root",
            vec![node("Mix & Knead Dough!!"), node("Second step")],
        );

        export_tree_dirs(&root, &tree).expect("export");
        let mut names: Vec<String> = fs::read_dir(&root)
            .expect("read dir")
            .filter_map(|entry| {
                let entry = entry.expect("entry");
                entry
                    .file_type()
                    .expect("file type")
                    .is_dir()
                    .then(|| entry.file_name().to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        assert!(names[0].starts_with("000_mix_knead_dough_"), "got {names:?}");
        assert!(names[1].starts_with("001_second_step_"), "got {names:?}");
    }

    #[test]
    fn import_fails_on_missing_metadata() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tree");
        let tree = node_with_children("root", vec![node("a")]);
        export_tree_dirs(&root, &tree).expect("export");

        let child = fs::read_dir(&root)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .expect("child dir");
        fs::remove_file(child.path().join("node.json")).expect("remove");

        let err = import_tree_dirs(&root).unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("missing node.json"), "got {rendered}");
        assert!(rendered.contains(&child.path().display().to_string()));
    }

    #[test]
    fn sanitize_bounds_and_defaults() {
        assert_eq!(sanitize_segment("Mix & Knead Dough!!"), "mix_knead_dough");
        assert_eq!(sanitize_segment("  --  "), "node");
        assert_eq!(sanitize_segment(""), "node");
        let long = sanitize_segment(&"very long label ".repeat(10));
        assert!(long.chars().count() <= MAX_SEGMENT_CHARS);
    }
}
