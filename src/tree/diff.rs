//! One-directional tree diff.
//!
//! `diff(base, comparison)` names every entry of `base` that `comparison` lacks
//! or holds with different content. Entries that exist only in `comparison` are
//! never reported, so an applied diff can add and overwrite but never delete.

use crate::tree::node::{Children, DiffTree, HashNode, Manifest};

/// Compare two manifests from `base`'s perspective.
pub fn diff(base: &Manifest, comparison: &Manifest) -> DiffTree {
    DiffTree::new(diff_children(base.entries(), comparison.entries()))
}

/// Compare two nodes at the same position.
///
/// Returns the entry that must be fetched, or `None` when `comparison` already
/// matches. A change of kind yields the whole `base` node.
pub fn diff_nodes(base: &HashNode, comparison: &HashNode) -> Option<HashNode> {
    match (base, comparison) {
        (HashNode::File(expected), HashNode::File(actual)) => {
            (expected != actual).then(|| base.clone())
        }
        (HashNode::Directory(base_children), HashNode::Directory(comp_children)) => {
            let sub = diff_children(base_children, comp_children);
            (!sub.is_empty()).then(|| HashNode::Directory(sub))
        }
        _ => Some(base.clone()),
    }
}

/// Diff two directories' children, visiting only `base`'s keys.
pub fn diff_children(base: &Children, comparison: &Children) -> Children {
    base.iter()
        .filter_map(|(name, base_node)| {
            let needed = match comparison.get(name) {
                None => Some(base_node.clone()),
                Some(comp_node) => diff_nodes(base_node, comp_node),
            };
            needed.map(|node| (name.clone(), node))
        })
        .collect()
}
