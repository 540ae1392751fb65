//! Node addressing by child-index paths and by exact label match.
//!
//! A path is a sequence of zero-based child indices; the empty path denotes
//! the root. Navigation misses are reported as `None` so callers can decide
//! their own fallback (usually the root).

use crate::tree::StepNode;

/// Walk `path` index by index from `root`.
///
/// Returns `None` if any step lands on a node without children or an index
/// out of bounds; a partial descent is never reported as a match.
pub fn locate<'a>(root: &'a StepNode, path: &[usize]) -> Option<&'a StepNode> {
    let mut current = root;
    for &index in path {
        current = current.children.as_ref()?.get(index)?;
    }
    Some(current)
}

/// Pre-order search for the first node whose `step` equals `step` exactly.
///
/// Parent is visited before children, children left to right, so ties on
/// duplicate labels resolve deterministically to the first visit.
pub fn locate_by_step<'a>(root: &'a StepNode, step: &str) -> Option<(&'a StepNode, Vec<usize>)> {
    let mut path = Vec::new();
    locate_by_step_inner(root, step, &mut path).map(|node| (node, path))
}

fn locate_by_step_inner<'a>(
    node: &'a StepNode,
    step: &str,
    path: &mut Vec<usize>,
) -> Option<&'a StepNode> {
    if node.step == step {
        return Some(node);
    }
    for (index, child) in node.children.iter().flatten().enumerate() {
        path.push(index);
        if let Some(found) = locate_by_step_inner(child, step, path) {
            return Some(found);
        }
        path.pop();
    }
    None
}

/// Return a new tree with the node at `path` replaced by `new_node`.
///
/// The input tree is never mutated; callers holding the pre-replacement tree
/// keep a consistent view. An empty path substitutes the root. An invalid
/// path is a silent no-op returning a copy of the original; check `locate`
/// first when the distinction matters.
pub fn replace_at(root: &StepNode, path: &[usize], new_node: StepNode) -> StepNode {
    let mut updated = root.clone();
    if replace_in_place(&mut updated, path, new_node) {
        updated
    } else {
        root.clone()
    }
}

fn replace_in_place(node: &mut StepNode, path: &[usize], new_node: StepNode) -> bool {
    match path.split_first() {
        None => {
            *node = new_node;
            true
        }
        Some((&index, rest)) => match node.children.as_mut().and_then(|c| c.get_mut(index)) {
            Some(child) => replace_in_place(child, rest, new_node),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{node, node_with_children};

    fn sample_tree() -> StepNode {
        node_with_children(
            "root",
            vec![
                node_with_children("a", vec![node("a0"), node("a1")]),
                node("b"),
            ],
        )
    }

    #[test]
    fn locate_empty_path_is_root() {
        let tree = sample_tree();
        assert_eq!(locate(&tree, &[]).expect("root").step, "root");
    }

    #[test]
    fn locate_descends_by_index() {
        let tree = sample_tree();
        assert_eq!(locate(&tree, &[0, 1]).expect("a1").step, "a1");
    }

    #[test]
    fn locate_rejects_out_of_bounds_and_leaves() {
        let tree = sample_tree();
        assert!(locate(&tree, &[2]).is_none());
        // "b" has no children collection at all
        assert!(locate(&tree, &[1, 0]).is_none());
    }

    #[test]
    fn locate_by_step_returns_preorder_first_match() {
        let tree = node_with_children(
            "root",
            vec![
                node_with_children("outer", vec![node("dup")]),
                node("dup"),
            ],
        );

        for _ in 0..3 {
            let (found, path) = locate_by_step(&tree, "dup").expect("match");
            assert_eq!(found.step, "dup");
            assert_eq!(path, vec![0, 0]);
        }
    }

    #[test]
    fn locate_by_step_is_case_sensitive() {
        let tree = sample_tree();
        assert!(locate_by_step(&tree, "Root").is_none());
    }

    #[test]
    fn replace_at_is_observable_at_the_same_path() {
        let tree = sample_tree();
        let replacement = node("fixed");
        let updated = replace_at(&tree, &[0, 1], replacement.clone());
        assert_eq!(locate(&updated, &[0, 1]), Some(&replacement));
    }

    #[test]
    fn replace_at_root_is_total_substitution() {
        let tree = sample_tree();
        let replacement = node("other");
        assert_eq!(replace_at(&tree, &[], replacement.clone()), replacement);
    }

    #[test]
    fn replace_at_invalid_path_returns_original() {
        let tree = sample_tree();
        assert_eq!(replace_at(&tree, &[5, 0], node("x")), tree);
    }

    #[test]
    fn replace_at_leaves_input_tree_untouched() {
        let tree = sample_tree();
        let before = tree.clone();
        let _updated = replace_at(&tree, &[0], node("swapped"));
        assert_eq!(tree, before);
    }
}
