//! In-order traversal: successor/predecessor steps, a restartable cursor and
//! an `Iterator` adapter.

use super::{subtree_max, subtree_min, NodeId, TreeStorage};

/// In-order successor of `node`, or `None` past the last node.
pub fn successor<S: TreeStorage + ?Sized>(s: &S, node: NodeId) -> Option<NodeId> {
    if let Some(r) = s.tree_node(node).right {
        return Some(subtree_min(s, r));
    }
    let mut child = node;
    let mut parent = s.tree_node(node).parent;
    while let Some(p) = parent {
        if s.tree_node(p).left == Some(child) {
            return Some(p);
        }
        child = p;
        parent = s.tree_node(p).parent;
    }
    None
}

/// In-order predecessor of `node`, or `None` before the first node.
pub fn predecessor<S: TreeStorage + ?Sized>(s: &S, node: NodeId) -> Option<NodeId> {
    if let Some(l) = s.tree_node(node).left {
        return Some(subtree_max(s, l));
    }
    let mut child = node;
    let mut parent = s.tree_node(node).parent;
    while let Some(p) = parent {
        if s.tree_node(p).right == Some(child) {
            return Some(p);
        }
        child = p;
        parent = s.tree_node(p).parent;
    }
    None
}

/// Position within a tree.
///
/// Holds no borrow, so the tree may be read between steps. It must not be
/// stepped after the node it points at has been extracted; re-seek with
/// [`KeyedTree::goto_min`](super::KeyedTree::goto_min) instead. Once a step
/// runs off either end the cursor stays at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeCursor {
    position: Option<NodeId>,
}

impl TreeCursor {
    pub(crate) fn at(position: Option<NodeId>) -> Self {
        Self { position }
    }

    #[inline]
    pub fn get(&self) -> Option<NodeId> {
        self.position
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.position.is_none()
    }

    /// Steps to the successor and returns the new position.
    pub fn move_next<S: TreeStorage + ?Sized>(&mut self, s: &S) -> Option<NodeId> {
        self.position = self.position.and_then(|n| successor(s, n));
        self.position
    }

    /// Steps to the predecessor and returns the new position.
    pub fn move_prev<S: TreeStorage + ?Sized>(&mut self, s: &S) -> Option<NodeId> {
        self.position = self.position.and_then(|n| predecessor(s, n));
        self.position
    }
}

/// Ordered walk yielding node ids, ascending or descending.
pub struct Iter<'a, S: TreeStorage + ?Sized> {
    storage: &'a S,
    next: Option<NodeId>,
    ascending: bool,
}

impl<'a, S: TreeStorage + ?Sized> Iter<'a, S> {
    pub(crate) fn forward(storage: &'a S, start: Option<NodeId>) -> Self {
        Self {
            storage,
            next: start,
            ascending: true,
        }
    }

    pub(crate) fn backward(storage: &'a S, start: Option<NodeId>) -> Self {
        Self {
            storage,
            next: start,
            ascending: false,
        }
    }
}

impl<S: TreeStorage + ?Sized> Iterator for Iter<'_, S> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = if self.ascending {
            successor(self.storage, current)
        } else {
            predecessor(self.storage, current)
        };
        Some(current)
    }
}
