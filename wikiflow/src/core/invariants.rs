//! Semantic invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::tree::StepNode;

/// Check that every id in the tree is unique.
///
/// Returns stable error messages naming the offending node by its id path
/// from the root.
pub fn validate_invariants(root: &StepNode) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    validate_node(root, &mut seen, &mut errors, root.id.as_str());
    errors
}

fn validate_node(
    node: &StepNode,
    seen: &mut HashSet<String>,
    errors: &mut Vec<String>,
    path: &str,
) {
    if !seen.insert(node.id.clone()) {
        errors.push(format!("duplicate id '{}' at {}", node.id, path));
    }

    for child in node.children.iter().flatten() {
        let child_path = format!("{}/{}", path, child.id);
        validate_node(child, seen, errors, &child_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{node, node_with_children};

    #[test]
    fn unique_ids_pass() {
        let tree = node_with_children("root", vec![node("a"), node("b")]);
        assert!(validate_invariants(&tree).is_empty());
    }

    #[test]
    fn duplicate_ids_are_reported_with_path() {
        let mut tree = node_with_children("root", vec![node("a"), node("b")]);
        if let Some(children) = tree.children.as_mut() {
            children[1].id = children[0].id.clone();
        }

        let errors = validate_invariants(&tree);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate id"));
    }
}
