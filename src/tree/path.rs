//! Node path resolution helpers
//!
//! Node paths are opaque provider strings. The only structure assumed is that
//! a child's path is longer than, and prefixed by, its parent's path.

use crate::tree::node::TreeNode;

/// True when `candidate` is a non-empty prefix of `target`
pub fn is_path_prefix(candidate: &str, target: &str) -> bool {
    !candidate.is_empty() && target.starts_with(candidate)
}

/// Pick the child to descend into when looking for `target`.
///
/// Among children whose path is a prefix of `target` and longer than
/// `parent_path`, the longest path wins; the first one seen wins a tie.
pub fn select_next_child<'a, I>(children: I, parent_path: &str, target: &str) -> Option<&'a TreeNode>
where
    I: IntoIterator<Item = &'a TreeNode>,
{
    children
        .into_iter()
        .filter(|child| child.node_path.len() > parent_path.len())
        .filter(|child| is_path_prefix(&child.node_path, target))
        .fold(None, |best: Option<&TreeNode>, candidate| match best {
            Some(current) if current.node_path.len() >= candidate.node_path.len() => Some(current),
            _ => Some(candidate),
        })
}
