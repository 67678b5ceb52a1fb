//! Property-based tests for one-directional diff guarantees

use proptest::prelude::*;
use updraft::tree::node::file_node;
use updraft::tree::{diff, Children, HashNode, Manifest};

/// Small trees over a narrow name alphabet so generated trees overlap often.
fn arb_node() -> impl Strategy<Value = HashNode> {
    let leaf = (0u8..4).prop_map(|b| file_node([b; 32]));
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-f]", inner, 0..4).prop_map(HashNode::Directory)
    })
}

fn arb_manifest() -> impl Strategy<Value = Manifest> {
    prop::collection::btree_map("[a-f]", arb_node(), 0..5).prop_map(Manifest::new)
}

/// Every node of `sub` is present in `tree` at the same position.
fn is_contained(sub: &Children, tree: &Children) -> bool {
    sub.iter().all(|(name, node)| match (node, tree.get(name)) {
        (HashNode::File(a), Some(HashNode::File(b))) => a == b,
        (HashNode::Directory(a), Some(HashNode::Directory(b))) => is_contained(a, b),
        _ => false,
    })
}

/// True when no directory in the diff is empty unless it is empty in the base too.
fn has_no_spurious_empty_dirs(sub: &Children, base: &Children) -> bool {
    sub.iter().all(|(name, node)| match (node, base.get(name)) {
        (HashNode::Directory(a), Some(HashNode::Directory(b))) => {
            (!a.is_empty() || b.is_empty()) && has_no_spurious_empty_dirs(a, b)
        }
        _ => true,
    })
}

proptest! {
    #[test]
    fn test_diff_with_itself_is_empty(tree in arb_manifest()) {
        prop_assert!(diff(&tree, &tree).is_empty());
    }

    #[test]
    fn test_diff_against_empty_is_the_base(tree in arb_manifest()) {
        let result = diff(&tree, &Manifest::default());
        prop_assert_eq!(result.entries(), tree.entries());
    }

    #[test]
    fn test_diff_only_draws_from_base(base in arb_manifest(), comparison in arb_manifest()) {
        let result = diff(&base, &comparison);
        prop_assert!(is_contained(result.entries(), base.entries()));
        prop_assert!(has_no_spurious_empty_dirs(result.entries(), base.entries()));
    }

    #[test]
    fn test_comparison_only_entries_never_appear(base in arb_manifest(), comparison in arb_manifest()) {
        let result = diff(&base, &comparison);
        for path in result.file_paths() {
            prop_assert!(base.get(&path).is_some());
        }
    }

    #[test]
    fn test_every_differing_base_file_is_reported(base in arb_manifest(), comparison in arb_manifest()) {
        let result = diff(&base, &comparison);
        let reported = result.file_paths();
        for path in base_file_paths(&base) {
            let differs = base.get(&path) != comparison.get(&path);
            prop_assert_eq!(differs, reported.contains(&path), "path {}", path);
        }
    }
}

proptest! {
    #[test]
    fn test_kind_mismatch_reports_whole_base_entry(
        base_node in arb_node(),
        comparison_node in arb_node(),
        rest in arb_manifest(),
    ) {
        prop_assume!(base_node.is_file() != comparison_node.is_file());
        let mut base = rest.entries().clone();
        let mut comparison = rest.entries().clone();
        base.insert("k".to_string(), base_node.clone());
        comparison.insert("k".to_string(), comparison_node);

        let result = diff(&Manifest::new(base), &Manifest::new(comparison));
        prop_assert_eq!(result.get("k"), Some(&base_node));
        prop_assert_eq!(result.entries().len(), 1);
    }
}

fn base_file_paths(manifest: &Manifest) -> Vec<String> {
    updraft::tree::DiffTree::new(manifest.entries().clone()).file_paths()
}
