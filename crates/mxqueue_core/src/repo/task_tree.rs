//! Queue task tree arena.
//!
//! # Responsibility
//! - Own every queue node and keep parent/child links consistent.
//! - Provide attach, detach, reparent and subtree removal primitives.
//!
//! # Invariants
//! - Children are owned top-down through the parent's child sequence; the
//!   parent link is a back-reference id only.
//! - A node is listed in at most one parent's child sequence.
//! - The tree is acyclic; attaching a node under its own descendant fails.
//! - Child order is insertion order.

use crate::model::task::{TaskKind, TaskNodeId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by task tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Contract violations reported by the task tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Id does not name a node of this tree.
    NodeNotFound(TaskNodeId),
    /// Attach would make a node its own ancestor.
    CycleDetected {
        node_id: TaskNodeId,
        parent_id: TaskNodeId,
    },
    /// The root node cannot be attached or removed.
    RootImmovable(TaskNodeId),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "task node not found: {id}"),
            Self::CycleDetected { node_id, parent_id } => write!(
                f,
                "attach would create cycle: node {node_id} under parent {parent_id}"
            ),
            Self::RootImmovable(id) => write!(f, "root task node cannot be moved or removed: {id}"),
        }
    }
}

impl Error for TreeError {}

/// One node of the queue tree.
#[derive(Debug)]
pub struct TaskNode {
    id: TaskNodeId,
    parent: Option<TaskNodeId>,
    children: Vec<TaskNodeId>,
    /// User-facing label.
    pub name: String,
    /// Set once the execution service has run the task.
    pub executed: bool,
    pub kind: TaskKind,
}

impl TaskNode {
    fn new(id: TaskNodeId, kind: TaskKind, name: String) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            name,
            executed: false,
            kind,
        }
    }

    pub fn id(&self) -> TaskNodeId {
        self.id
    }

    pub fn parent(&self) -> Option<TaskNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskNodeId] {
        &self.children
    }

    /// Alias of `executed` used for data collections.
    pub fn is_collected(&self) -> bool {
        self.executed
    }

    pub fn set_collected(&mut self, collected: bool) {
        self.executed = collected;
    }
}

/// Arena holding every node of one queue.
#[derive(Debug)]
pub struct TaskTree {
    nodes: HashMap<TaskNodeId, TaskNode>,
    root: TaskNodeId,
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTree {
    /// Creates a tree holding only the root node.
    pub fn new() -> Self {
        let root = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(root, TaskNode::new(root, TaskKind::Root, String::new()));
        Self { nodes, root }
    }

    pub fn root_id(&self) -> TaskNodeId {
        self.root
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: TaskNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: TaskNodeId) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskNodeId) -> Option<&mut TaskNode> {
        self.nodes.get_mut(&id)
    }

    /// Allocates a node without a parent.
    pub fn insert_detached(&mut self, kind: TaskKind, name: impl Into<String>) -> TaskNodeId {
        let id = Uuid::new_v4();
        self.nodes.insert(id, TaskNode::new(id, kind, name.into()));
        id
    }

    /// Drops a node that was never attached. Attached nodes and the root stay.
    pub fn remove_detached(&mut self, id: TaskNodeId) -> Option<TaskNode> {
        let node = self.nodes.get(&id)?;
        if id == self.root || node.parent.is_some() || !node.children.is_empty() {
            return None;
        }
        self.nodes.remove(&id)
    }

    pub fn get_parent(&self, id: TaskNodeId) -> Option<TaskNodeId> {
        self.nodes.get(&id).and_then(TaskNode::parent)
    }

    /// Children of `id` in insertion order; empty for unknown ids.
    pub fn get_children(&self, id: TaskNodeId) -> &[TaskNodeId] {
        self.nodes
            .get(&id)
            .map(TaskNode::children)
            .unwrap_or_default()
    }

    /// Appends `child` under `parent`, moving it out of its previous parent.
    ///
    /// # Errors
    /// - `NodeNotFound` when either id is not part of this tree.
    /// - `RootImmovable` when `child` is the root.
    /// - `CycleDetected` when `parent` is `child` or one of its descendants.
    pub fn add_child(&mut self, parent: TaskNodeId, child: TaskNodeId) -> TreeResult<()> {
        self.ensure_exists(parent)?;
        self.ensure_exists(child)?;
        if child == self.root {
            return Err(TreeError::RootImmovable(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::CycleDetected {
                node_id: child,
                parent_id: parent,
            });
        }

        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Removes `child` and its subtree from `parent`.
    ///
    /// `on_remove` runs on each direct child of `child`, then on `child`,
    /// before anything is unlinked. Returns the removed nodes in pre-order,
    /// or an empty list when `child` is not a direct child of `parent`.
    pub fn del_child(
        &mut self,
        parent: TaskNodeId,
        child: TaskNodeId,
        mut on_remove: impl FnMut(&TaskNode),
    ) -> TreeResult<Vec<TaskNode>> {
        self.ensure_exists(parent)?;
        if !self.get_children(parent).contains(&child) {
            return Ok(Vec::new());
        }

        for grand_child in self.get_children(child) {
            if let Some(node) = self.nodes.get(grand_child) {
                on_remove(node);
            }
        }
        if let Some(node) = self.nodes.get(&child) {
            on_remove(node);
        }

        let subtree = self.subtree(child);
        self.detach(child);
        Ok(subtree
            .into_iter()
            .filter_map(|id| self.nodes.remove(&id))
            .collect())
    }

    /// Moves `node` under `new_parent`, detaching it from its current parent first.
    pub fn set_parent(&mut self, node: TaskNodeId, new_parent: TaskNodeId) -> TreeResult<()> {
        self.add_child(new_parent, node)
    }

    /// Walks parent links to the top-most ancestor of `id`.
    pub fn get_root(&self, id: TaskNodeId) -> TreeResult<TaskNodeId> {
        self.ensure_exists(id)?;
        let mut current = id;
        while let Some(parent) = self.get_parent(current) {
            current = parent;
        }
        Ok(current)
    }

    /// Ids of `id` and all its descendants in pre-order.
    pub fn subtree(&self, id: TaskNodeId) -> Vec<TaskNodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            result.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        result
    }

    /// Closest ancestor of `id` (itself excluded) matching `predicate`.
    pub fn find_ancestor(
        &self,
        id: TaskNodeId,
        predicate: impl Fn(&TaskNode) -> bool,
    ) -> Option<&TaskNode> {
        let mut cursor = self.get_parent(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(&current)?;
            if predicate(node) {
                return Some(node);
            }
            cursor = node.parent;
        }
        None
    }

    /// Tab-indented dump of the subtree rooted at `id`.
    pub fn pretty_print(&self, id: TaskNodeId) -> String {
        let mut out = String::new();
        self.pretty_print_into(id, 0, &mut out);
        out
    }

    fn pretty_print_into(&self, id: TaskNodeId, indent: usize, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push_str(&"\t".repeat(indent));
        out.push_str(&format!("<{} {}> {}\n", node.kind.kind_name(), node.id, node.name));
        for child in &node.children {
            self.pretty_print_into(*child, indent + 1, out);
        }
    }

    fn ensure_exists(&self, id: TaskNodeId) -> TreeResult<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(TreeError::NodeNotFound(id))
        }
    }

    fn is_ancestor_or_self(&self, candidate: TaskNodeId, id: TaskNodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.get_parent(current);
        }
        false
    }

    /// Unlinks `id` from its parent's child sequence; the node stays in the arena.
    fn detach(&mut self, id: TaskNodeId) {
        let Some(parent) = self.get_parent(id) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }
}
