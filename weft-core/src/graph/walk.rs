//! Graph Traversal
//!
//! Visited-set traversals over an object graph. Nodes are shared, so a graph
//! may contain cycles; every walk here keys its bookkeeping on [`NodeId`]
//! and terminates on any input.

use std::collections::{HashSet, VecDeque};

use tracing::warn;

use super::node::{NodeId, NodeRef, Value};
use crate::error::{ReactiveError, Result};

/// Find a node that lies on a cycle reachable from `root`.
///
/// Depth-first, iterative. Returns the first node found to be revisited
/// while still on the current path.
pub fn find_cycle(root: &Value) -> Option<NodeId> {
    let root = root.as_node()?;

    let mut on_path: HashSet<NodeId> = HashSet::new();
    let mut finished: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<(NodeRef, std::vec::IntoIter<NodeRef>)> = Vec::new();

    on_path.insert(root.id());
    stack.push((root.clone(), root.children().into_iter()));

    loop {
        let next = match stack.last_mut() {
            Some((_, children)) => children.next(),
            None => return None,
        };

        match next {
            Some(child) => {
                let id = child.id();
                if on_path.contains(&id) {
                    return Some(id);
                }
                if finished.contains(&id) {
                    continue;
                }
                on_path.insert(id);
                let grandchildren = child.children().into_iter();
                stack.push((child, grandchildren));
            }
            None => {
                if let Some((node, _)) = stack.pop() {
                    on_path.remove(&node.id());
                    finished.insert(node.id());
                }
            }
        }
    }
}

/// Fail with [`ReactiveError::CyclicGraph`] if `root` reaches a cycle.
pub fn ensure_acyclic(root: &Value) -> Result<()> {
    match find_cycle(root) {
        Some(node) => {
            warn!(node = node.raw(), "cyclic object graph rejected");
            Err(ReactiveError::CyclicGraph { node: node.raw() })
        }
        None => Ok(()),
    }
}

/// Whether `target` is reachable from `from` (including `from` itself).
pub fn reaches(from: &Value, target: NodeId) -> bool {
    let Some(start) = from.as_node() else {
        return false;
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(node) = queue.pop_front() {
        if node.id() == target {
            return true;
        }
        if visited.insert(node.id()) {
            queue.extend(node.children());
        }
    }

    false
}

/// Number of distinct nodes reachable from `root`.
pub fn node_count(root: &Value) -> usize {
    let Some(start) = root.as_node() else {
        return 0;
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![start.clone()];

    while let Some(node) = stack.pop() {
        if visited.insert(node.id()) {
            stack.extend(node.children());
        }
    }

    visited.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Key;
    use serde_json::json;

    fn diamond() -> (NodeRef, NodeRef) {
        let shared = NodeRef::object_from([("x", Value::from(1))]);
        let root = NodeRef::object_from([
            ("left", Value::Node(shared.clone())),
            ("right", Value::Node(shared.clone())),
        ]);
        (root, shared)
    }

    #[test]
    fn tree_has_no_cycle() {
        let root = Value::from_json(json!({ "a": { "b": [1, { "c": 2 }] } }));
        assert_eq!(find_cycle(&root), None);
        assert!(ensure_acyclic(&root).is_ok());
        assert_eq!(node_count(&root), 4);
    }

    #[test]
    fn shared_subtree_is_not_a_cycle() {
        let (root, _) = diamond();
        let root = Value::Node(root);
        assert!(ensure_acyclic(&root).is_ok());
        assert_eq!(node_count(&root), 2);
    }

    #[test]
    fn self_reference_is_detected() {
        let node = NodeRef::object();
        node.set(Key::from("me"), Value::Node(node.clone())).unwrap();

        let err = ensure_acyclic(&Value::Node(node.clone())).unwrap_err();
        assert_eq!(err, ReactiveError::CyclicGraph { node: node.id().raw() });
    }

    #[test]
    fn indirect_cycle_is_detected() {
        let a = NodeRef::object();
        let b = NodeRef::array();
        a.set(Key::from("b"), Value::Node(b.clone())).unwrap();
        b.set(Key::Index(0), Value::Node(a.clone())).unwrap();

        let root = Value::Node(NodeRef::object_from([("a", Value::Node(a.clone()))]));
        assert_eq!(find_cycle(&root), Some(a.id()));
        assert_eq!(node_count(&root), 3);
    }

    #[test]
    fn reachability() {
        let (root, shared) = diamond();
        let root = Value::Node(root);

        assert!(reaches(&root, shared.id()));
        assert!(!reaches(&Value::Node(shared), NodeId::new()));
        assert!(!reaches(&Value::from(1), NodeId::new()));
    }

    #[test]
    fn primitives_have_no_graph() {
        assert_eq!(find_cycle(&Value::Null), None);
        assert_eq!(node_count(&Value::from("s")), 0);
    }
}
