use mxqueue_core::model::task::{TaskGroup, TaskKind};
use mxqueue_core::{TaskNodeId, TaskTree, TreeError};
use std::collections::HashMap;

fn group(tree: &mut TaskTree, name: &str) -> TaskNodeId {
    tree.insert_detached(TaskKind::Group(TaskGroup), name)
}

/// Every node except the root is listed by exactly one parent, and that
/// parent is the one it points back to.
fn assert_single_parent(tree: &TaskTree) {
    let mut listed: HashMap<TaskNodeId, usize> = HashMap::new();
    for id in tree.subtree(tree.root_id()) {
        for child in tree.get_children(id) {
            *listed.entry(*child).or_default() += 1;
            assert_eq!(tree.get_parent(*child), Some(id));
        }
    }
    for id in tree.subtree(tree.root_id()) {
        let expected = usize::from(id != tree.root_id());
        assert_eq!(listed.get(&id).copied().unwrap_or(0), expected, "node {id}");
    }
}

#[test]
fn node_is_listed_by_one_parent_after_mixed_operations() {
    let mut tree = TaskTree::new();
    let root = tree.root_id();
    let a = group(&mut tree, "a");
    let b = group(&mut tree, "b");
    let c = group(&mut tree, "c");
    let d = group(&mut tree, "d");

    tree.add_child(root, a).unwrap();
    tree.add_child(root, b).unwrap();
    tree.add_child(a, c).unwrap();
    tree.add_child(c, d).unwrap();
    assert_single_parent(&tree);

    tree.set_parent(c, b).unwrap();
    assert_single_parent(&tree);
    assert_eq!(tree.get_children(b), &[c]);
    assert!(tree.get_children(a).is_empty());

    tree.add_child(b, c).unwrap();
    assert_single_parent(&tree);
    assert_eq!(tree.get_children(b), &[c]);

    tree.del_child(b, c, |_| {}).unwrap();
    assert_single_parent(&tree);
    assert!(!tree.contains(c));
    assert!(!tree.contains(d));
}

#[test]
fn del_child_runs_hook_on_children_then_node() {
    let mut tree = TaskTree::new();
    let root = tree.root_id();
    let parent = group(&mut tree, "parent");
    let first = group(&mut tree, "first");
    let second = group(&mut tree, "second");
    let deep = group(&mut tree, "deep");
    tree.add_child(root, parent).unwrap();
    tree.add_child(parent, first).unwrap();
    tree.add_child(parent, second).unwrap();
    tree.add_child(first, deep).unwrap();

    let mut visited = Vec::new();
    let removed = tree
        .del_child(root, parent, |node| visited.push(node.name.clone()))
        .unwrap();

    assert_eq!(visited, vec!["first", "second", "parent"]);
    let removed_names: Vec<&str> = removed.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(removed_names, vec!["parent", "first", "deep", "second"]);
    assert!(tree.get_children(root).is_empty());
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn get_root_walks_to_top_and_detached_nodes_are_their_own_root() {
    let mut tree = TaskTree::new();
    let root = tree.root_id();
    let a = group(&mut tree, "a");
    let b = group(&mut tree, "b");
    let loose = group(&mut tree, "loose");
    tree.add_child(root, a).unwrap();
    tree.add_child(a, b).unwrap();

    assert_eq!(tree.get_root(b).unwrap(), root);
    assert_eq!(tree.get_root(loose).unwrap(), loose);
}

#[test]
fn unknown_and_root_ids_are_contract_violations() {
    let mut tree = TaskTree::new();
    let root = tree.root_id();
    let a = group(&mut tree, "a");
    let missing = uuid::Uuid::new_v4();

    assert_eq!(tree.add_child(missing, a).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.add_child(a, missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.add_child(a, root).unwrap_err(), TreeError::RootImmovable(root));
    assert!(tree.get_root(missing).is_err());
}

#[test]
fn children_keep_insertion_order() {
    let mut tree = TaskTree::new();
    let root = tree.root_id();
    let ids: Vec<TaskNodeId> = ["x", "y", "z"]
        .into_iter()
        .map(|name| {
            let id = group(&mut tree, name);
            tree.add_child(root, id).unwrap();
            id
        })
        .collect();
    assert_eq!(tree.get_children(root), ids.as_slice());
    assert_eq!(tree.subtree(root)[1..], ids[..]);
}
