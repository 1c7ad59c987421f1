//! ## dtnpool-core::tree
//! **Intrusive red-black tree over externally stored nodes**
//!
//! The tree only keeps a root id, the black height and an element count. The
//! parent/child links and the packed key+color word live in [`TreeNode`]
//! records owned by whoever implements [`TreeStorage`]: a plain
//! `Vec<TreeNode>`, or the block pool, where every slot carries one node so
//! allocated blocks can be indexed by custody id, expiry time and the like.
//!
//! ```
//! use dtnpool_core::tree::{KeyedTree, NodeId, TreeNode};
//!
//! let mut nodes = vec![TreeNode::default(); 4];
//! let mut tree = KeyedTree::new();
//! for (i, key) in [10, 20, 5, 15].into_iter().enumerate() {
//!     tree.insert(&mut nodes, key, NodeId::new(i as u32)).unwrap();
//! }
//! let keys: Vec<u64> = tree.iter(&nodes).map(|id| nodes[id.index()].key()).collect();
//! assert_eq!(keys, vec![5, 10, 15, 20]);
//! ```
//!
//! Precondition violations (double insert, extracting a non-member) come back
//! as [`TreeError`] values; the tree backs live protocol state and never
//! aborts on them.

mod iter;
mod node;

use std::cmp::Ordering;

pub use iter::{predecessor, successor, Iter, TreeCursor};
pub use node::{Color, KeyWord, NodeId, TreeNode, TreeStorage, MAX_KEY};

pub use crate::error::TreeError;

#[inline]
fn color_of<S: TreeStorage + ?Sized>(s: &S, id: Option<NodeId>) -> Color {
    id.map_or(Color::Black, |n| s.tree_node(n).color())
}

#[inline]
fn is_red<S: TreeStorage + ?Sized>(s: &S, id: Option<NodeId>) -> bool {
    color_of(s, id) == Color::Red
}

#[inline]
fn paint<S: TreeStorage + ?Sized>(s: &mut S, id: NodeId, color: Color) {
    s.tree_node_mut(id).word.set_color(color);
}

#[inline]
fn parent_of<S: TreeStorage + ?Sized>(s: &S, id: NodeId) -> Option<NodeId> {
    s.tree_node(id).parent
}

#[inline]
fn left_of<S: TreeStorage + ?Sized>(s: &S, id: NodeId) -> Option<NodeId> {
    s.tree_node(id).left
}

#[inline]
fn right_of<S: TreeStorage + ?Sized>(s: &S, id: NodeId) -> Option<NodeId> {
    s.tree_node(id).right
}

pub(crate) fn subtree_min<S: TreeStorage + ?Sized>(s: &S, mut id: NodeId) -> NodeId {
    while let Some(l) = left_of(s, id) {
        id = l;
    }
    id
}

pub(crate) fn subtree_max<S: TreeStorage + ?Sized>(s: &S, mut id: NodeId) -> NodeId {
    while let Some(r) = right_of(s, id) {
        id = r;
    }
    id
}

/// Root of one intrusive red-black tree.
#[derive(Debug, Default)]
pub struct KeyedTree {
    root: Option<NodeId>,
    black_height: u32,
    len: usize,
}

impl KeyedTree {
    pub const fn new() -> Self {
        Self {
            root: None,
            black_height: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of black nodes on every root-to-leaf path; 0 for an empty tree.
    #[inline]
    pub fn black_height(&self) -> u32 {
        self.black_height
    }

    /// Returns `true` if `node` is currently linked into this tree.
    ///
    /// Walks to the top of the node's tree, so a node linked into a different
    /// tree sharing the same storage is reported as absent.
    pub fn contains<S: TreeStorage + ?Sized>(&self, s: &S, node: NodeId) -> bool {
        if !s.get_tree_node(node).is_some_and(|n| n.linked) {
            return false;
        }
        let mut top = node;
        while let Some(p) = parent_of(s, top) {
            top = p;
        }
        self.root == Some(top)
    }

    pub fn search<S: TreeStorage + ?Sized>(&self, s: &S, key: u64) -> Option<NodeId> {
        self.search_by(s, key, |_, _| Ordering::Equal)
    }

    /// Looks up `key`, breaking ties among equal keys with `cmp`.
    ///
    /// `cmp(storage, existing)` orders the sought item relative to the
    /// existing node; `Equal` is a match.
    pub fn search_by<S, F>(&self, s: &S, key: u64, mut cmp: F) -> Option<NodeId>
    where
        S: TreeStorage + ?Sized,
        F: FnMut(&S, NodeId) -> Ordering,
    {
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = s.tree_node(id);
            let ord = match key.cmp(&node.key()) {
                Ordering::Equal => cmp(s, id),
                ord => ord,
            };
            cur = match ord {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    pub fn insert<S: TreeStorage + ?Sized>(
        &mut self,
        s: &mut S,
        key: u64,
        node: NodeId,
    ) -> Result<(), TreeError> {
        self.insert_by(s, key, node, |_, _| Ordering::Equal)
    }

    /// Links `node` under `key`.
    ///
    /// Equal keys are placed by `cmp` (see [`KeyedTree::search_by`]); an
    /// `Equal` result reports [`TreeError::Duplicate`] and leaves the tree
    /// untouched.
    pub fn insert_by<S, F>(
        &mut self,
        s: &mut S,
        key: u64,
        node: NodeId,
        mut cmp: F,
    ) -> Result<(), TreeError>
    where
        S: TreeStorage + ?Sized,
        F: FnMut(&S, NodeId) -> Ordering,
    {
        if key > MAX_KEY {
            return Err(TreeError::KeyOutOfRange(key));
        }
        match s.get_tree_node(node) {
            None => return Err(TreeError::NodeOutOfRange(node)),
            Some(n) if n.linked => return Err(TreeError::AlreadyLinked(node)),
            Some(_) => {}
        }

        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        while let Some(id) = cur {
            let existing = s.tree_node(id);
            let ord = match key.cmp(&existing.key()) {
                Ordering::Equal => cmp(&*s, id),
                ord => ord,
            };
            parent = Some(id);
            cur = match ord {
                Ordering::Less => {
                    go_left = true;
                    existing.left
                }
                Ordering::Greater => {
                    go_left = false;
                    existing.right
                }
                Ordering::Equal => return Err(TreeError::Duplicate(key)),
            };
        }

        *s.tree_node_mut(node) = TreeNode {
            word: KeyWord::new(key, Color::Red),
            parent,
            left: None,
            right: None,
            linked: true,
        };
        match parent {
            None => self.root = Some(node),
            Some(p) if go_left => s.tree_node_mut(p).left = Some(node),
            Some(p) => s.tree_node_mut(p).right = Some(node),
        }
        self.len += 1;
        self.insert_fixup(s, node);
        Ok(())
    }

    /// Unlinks `node` and zeroes its record.
    pub fn extract<S: TreeStorage + ?Sized>(
        &mut self,
        s: &mut S,
        node: NodeId,
    ) -> Result<(), TreeError> {
        if !self.contains(s, node) {
            return Err(TreeError::NotMember(node));
        }

        if let (Some(_), Some(r)) = (left_of(s, node), right_of(s, node)) {
            let succ = subtree_min(s, r);
            self.swap_with_successor(s, node, succ);
        }

        let n = *s.tree_node(node);
        match n.left.or(n.right) {
            Some(child) => {
                // A single child is always red under a black node.
                s.tree_node_mut(child).parent = n.parent;
                self.replace_child(s, n.parent, node, Some(child));
                paint(s, child, Color::Black);
            }
            None if n.parent.is_none() => {
                self.root = None;
                self.black_height = 0;
            }
            None => {
                if n.color() == Color::Black {
                    self.extract_fixup(s, node);
                }
                // Rotations during the fixup may have moved the leaf.
                let parent = parent_of(s, node);
                self.replace_child(s, parent, node, None);
            }
        }

        *s.tree_node_mut(node) = TreeNode::default();
        self.len -= 1;
        Ok(())
    }

    pub fn first<S: TreeStorage + ?Sized>(&self, s: &S) -> Option<NodeId> {
        self.root.map(|r| subtree_min(s, r))
    }

    pub fn last<S: TreeStorage + ?Sized>(&self, s: &S) -> Option<NodeId> {
        self.root.map(|r| subtree_max(s, r))
    }

    /// Cursor at the first node whose key is `>= min_key`.
    ///
    /// Descent continues left through ties so the leftmost of several equal
    /// keys is found.
    pub fn goto_min<S: TreeStorage + ?Sized>(&self, s: &S, min_key: u64) -> TreeCursor {
        let mut found = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            if s.tree_node(id).key() >= min_key {
                found = Some(id);
                cur = left_of(s, id);
            } else {
                cur = right_of(s, id);
            }
        }
        TreeCursor::at(found)
    }

    /// Cursor at the last node whose key is `<= max_key`.
    pub fn goto_max<S: TreeStorage + ?Sized>(&self, s: &S, max_key: u64) -> TreeCursor {
        let mut found = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            if s.tree_node(id).key() <= max_key {
                found = Some(id);
                cur = right_of(s, id);
            } else {
                cur = left_of(s, id);
            }
        }
        TreeCursor::at(found)
    }

    /// In-order iterator over every node.
    pub fn iter<'a, S: TreeStorage + ?Sized>(&self, s: &'a S) -> Iter<'a, S> {
        Iter::forward(s, self.first(s))
    }

    /// Ascending iterator starting at the first key `>= min_key`.
    pub fn range_from<'a, S: TreeStorage + ?Sized>(&self, s: &'a S, min_key: u64) -> Iter<'a, S> {
        Iter::forward(s, self.goto_min(s, min_key).get())
    }

    /// Descending iterator starting at the last key `<= max_key`.
    pub fn range_to_rev<'a, S: TreeStorage + ?Sized>(
        &self,
        s: &'a S,
        max_key: u64,
    ) -> Iter<'a, S> {
        Iter::backward(s, self.goto_max(s, max_key).get())
    }

    /// Checks every structural invariant.
    ///
    /// Verifies BST order, parent back-links, the red rule, equal black
    /// counts on all paths and that the recorded black height and length
    /// match.
    pub fn validate<S: TreeStorage + ?Sized>(&self, s: &S) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            if self.black_height != 0 || self.len != 0 {
                return Err(TreeError::Inconsistent(format!(
                    "empty tree records black height {} and length {}",
                    self.black_height, self.len
                )));
            }
            return Ok(());
        };
        if parent_of(s, root).is_some() {
            return Err(TreeError::Inconsistent(format!("root {root} has a parent")));
        }
        if is_red(s, Some(root)) {
            return Err(TreeError::Inconsistent(format!("root {root} is red")));
        }
        let (count, height) = check_subtree(s, root, None, None)?;
        if height != self.black_height {
            return Err(TreeError::Inconsistent(format!(
                "black height is {height}, root records {}",
                self.black_height
            )));
        }
        if count != self.len {
            return Err(TreeError::Inconsistent(format!(
                "{count} reachable nodes, root records {}",
                self.len
            )));
        }
        Ok(())
    }

    fn insert_fixup<S: TreeStorage + ?Sized>(&mut self, s: &mut S, mut z: NodeId) {
        loop {
            let Some(p) = parent_of(s, z) else {
                // At root: painting it black adds one black to every path.
                if is_red(s, Some(z)) {
                    paint(s, z, Color::Black);
                    self.black_height += 1;
                }
                return;
            };
            if !is_red(s, Some(p)) {
                return;
            }
            let Some(g) = parent_of(s, p) else {
                paint(s, p, Color::Black);
                self.black_height += 1;
                return;
            };

            let parent_is_left = left_of(s, g) == Some(p);
            let uncle = if parent_is_left {
                right_of(s, g)
            } else {
                left_of(s, g)
            };

            if let Some(u) = uncle.filter(|&u| is_red(s, Some(u))) {
                // Red uncle: push the red up and retry at the grandparent.
                paint(s, p, Color::Black);
                paint(s, u, Color::Black);
                paint(s, g, Color::Red);
                z = g;
                continue;
            }

            let mut p = p;
            if parent_is_left && right_of(s, p) == Some(z) {
                // Inner grandchild: rotate into the outer position first.
                self.rotate_left(s, p);
                std::mem::swap(&mut z, &mut p);
            } else if !parent_is_left && left_of(s, p) == Some(z) {
                self.rotate_right(s, p);
                std::mem::swap(&mut z, &mut p);
            }

            // Outer grandchild.
            paint(s, p, Color::Black);
            paint(s, g, Color::Red);
            if parent_is_left {
                self.rotate_right(s, g);
            } else {
                self.rotate_left(s, g);
            }
            return;
        }
    }

    /// Restores black counts before the black leaf `x` is cut off.
    fn extract_fixup<S: TreeStorage + ?Sized>(&mut self, s: &mut S, mut x: NodeId) {
        loop {
            let Some(p) = parent_of(s, x) else {
                // The deficit reached the root: every path lost one black.
                self.black_height -= 1;
                return;
            };
            if is_red(s, Some(x)) {
                paint(s, x, Color::Black);
                return;
            }

            let x_is_left = left_of(s, p) == Some(x);
            let sibling_of = |s: &S| {
                if x_is_left {
                    right_of(s, p)
                } else {
                    left_of(s, p)
                }
            };
            let mut sib = sibling_of(&*s).expect("black non-root node without a sibling");

            if is_red(s, Some(sib)) {
                // Red sibling: rotate it above the parent so x gets a black one.
                paint(s, sib, Color::Black);
                paint(s, p, Color::Red);
                if x_is_left {
                    self.rotate_left(s, p);
                } else {
                    self.rotate_right(s, p);
                }
                sib = sibling_of(&*s).expect("black non-root node without a sibling");
            }

            let (near, mut far) = if x_is_left {
                (left_of(s, sib), right_of(s, sib))
            } else {
                (right_of(s, sib), left_of(s, sib))
            };

            if !is_red(s, near) && !is_red(s, far) {
                paint(s, sib, Color::Red);
                if is_red(s, Some(p)) {
                    // Red parent absorbs the missing black.
                    paint(s, p, Color::Black);
                    return;
                }
                // All relatives black: the parent's subtree is now short.
                x = p;
                continue;
            }

            if !is_red(s, far) {
                // Red near nephew: turn it into the far one.
                let n = near.expect("red near nephew is present");
                paint(s, n, Color::Black);
                paint(s, sib, Color::Red);
                if x_is_left {
                    self.rotate_right(s, sib);
                } else {
                    self.rotate_left(s, sib);
                }
                far = Some(sib);
                sib = n;
            }

            // Red far nephew.
            let parent_color = color_of(s, Some(p));
            paint(s, sib, parent_color);
            paint(s, p, Color::Black);
            if let Some(f) = far {
                paint(s, f, Color::Black);
            }
            if x_is_left {
                self.rotate_left(s, p);
            } else {
                self.rotate_right(s, p);
            }
            return;
        }
    }

    /// Exchanges the tree positions of `a` and its in-order successor `b`.
    ///
    /// Colors stay with the positions, so every invariant still holds
    /// afterwards except the key order between the two swapped nodes, which
    /// no longer matters once `a` is removed.
    fn swap_with_successor<S: TreeStorage + ?Sized>(&mut self, s: &mut S, a: NodeId, b: NodeId) {
        let an = *s.tree_node(a);
        let bn = *s.tree_node(b);
        debug_assert!(bn.left.is_none());

        self.replace_child(s, an.parent, a, Some(b));
        if let Some(l) = an.left {
            s.tree_node_mut(l).parent = Some(b);
        }

        if bn.parent == Some(a) {
            let bm = s.tree_node_mut(b);
            bm.parent = an.parent;
            bm.left = an.left;
            bm.right = Some(a);
            let am = s.tree_node_mut(a);
            am.parent = Some(b);
            am.left = None;
            am.right = bn.right;
        } else {
            if let Some(bp) = bn.parent {
                s.tree_node_mut(bp).left = Some(a);
            }
            if let Some(r) = an.right {
                s.tree_node_mut(r).parent = Some(b);
            }
            let bm = s.tree_node_mut(b);
            bm.parent = an.parent;
            bm.left = an.left;
            bm.right = an.right;
            let am = s.tree_node_mut(a);
            am.parent = bn.parent;
            am.left = None;
            am.right = bn.right;
        }
        if let Some(r) = bn.right {
            s.tree_node_mut(r).parent = Some(a);
        }

        paint(s, a, bn.color());
        paint(s, b, an.color());
    }

    fn replace_child<S: TreeStorage + ?Sized>(
        &mut self,
        s: &mut S,
        parent: Option<NodeId>,
        old: NodeId,
        new: Option<NodeId>,
    ) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let pn = s.tree_node_mut(p);
                if pn.left == Some(old) {
                    pn.left = new;
                } else {
                    pn.right = new;
                }
            }
        }
    }

    fn rotate_left<S: TreeStorage + ?Sized>(&mut self, s: &mut S, x: NodeId) {
        let y = right_of(s, x).expect("rotate_left without a right child");
        let inner = left_of(s, y);
        s.tree_node_mut(x).right = inner;
        if let Some(b) = inner {
            s.tree_node_mut(b).parent = Some(x);
        }
        let xp = parent_of(s, x);
        s.tree_node_mut(y).parent = xp;
        self.replace_child(s, xp, x, Some(y));
        s.tree_node_mut(y).left = Some(x);
        s.tree_node_mut(x).parent = Some(y);
    }

    fn rotate_right<S: TreeStorage + ?Sized>(&mut self, s: &mut S, x: NodeId) {
        let y = left_of(s, x).expect("rotate_right without a left child");
        let inner = right_of(s, y);
        s.tree_node_mut(x).left = inner;
        if let Some(b) = inner {
            s.tree_node_mut(b).parent = Some(x);
        }
        let xp = parent_of(s, x);
        s.tree_node_mut(y).parent = xp;
        self.replace_child(s, xp, x, Some(y));
        s.tree_node_mut(y).right = Some(x);
        s.tree_node_mut(x).parent = Some(y);
    }
}

/// Returns `(node count, black height)` of the subtree at `id`.
fn check_subtree<S: TreeStorage + ?Sized>(
    s: &S,
    id: NodeId,
    lo: Option<u64>,
    hi: Option<u64>,
) -> Result<(usize, u32), TreeError> {
    let node = s.tree_node(id);
    if !node.linked {
        return Err(TreeError::Inconsistent(format!("{id} reachable but unlinked")));
    }
    let key = node.key();
    if lo.is_some_and(|lo| key < lo) || hi.is_some_and(|hi| key > hi) {
        return Err(TreeError::Inconsistent(format!("{id} key {key} out of order")));
    }

    let mut sides = [(0usize, 0u32); 2];
    for (side, child) in [node.left, node.right].into_iter().enumerate() {
        let Some(c) = child else { continue };
        if parent_of(s, c) != Some(id) {
            return Err(TreeError::Inconsistent(format!(
                "{c} does not point back to parent {id}"
            )));
        }
        if node.color() == Color::Red && is_red(s, Some(c)) {
            return Err(TreeError::Inconsistent(format!("red {id} has red child {c}")));
        }
        sides[side] = if side == 0 {
            check_subtree(s, c, lo, Some(key))?
        } else {
            check_subtree(s, c, Some(key), hi)?
        };
    }

    let [(lc, lh), (rc, rh)] = sides;
    if lh != rh {
        return Err(TreeError::Inconsistent(format!(
            "{id} has black heights {lh} and {rh} below it"
        )));
    }
    let own = u32::from(node.color() == Color::Black);
    Ok((lc + rc + 1, lh + own))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(n: usize) -> Vec<TreeNode> {
        vec![TreeNode::default(); n]
    }

    fn keys(tree: &KeyedTree, nodes: &[TreeNode]) -> Vec<u64> {
        tree.iter(nodes).map(|id| nodes[id.index()].key()).collect()
    }

    fn id(i: usize) -> NodeId {
        NodeId::new(i as u32)
    }

    #[test]
    fn empty_tree_validates() {
        let nodes = arena(1);
        let tree = KeyedTree::new();
        tree.validate(&nodes[..]).unwrap();
        assert_eq!(tree.black_height(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.first(&nodes[..]), None);
    }

    #[test]
    fn extracting_root_keeps_black_height() {
        let mut nodes = arena(4);
        let mut tree = KeyedTree::new();
        for (i, key) in [10, 20, 5, 15].into_iter().enumerate() {
            tree.insert(&mut nodes, key, id(i)).unwrap();
            tree.validate(&nodes).unwrap();
        }
        assert_eq!(tree.root(), Some(id(0)));
        let height = tree.black_height();

        tree.extract(&mut nodes, id(0)).unwrap();
        tree.validate(&nodes).unwrap();

        assert_eq!(tree.black_height(), height);
        assert_eq!(keys(&tree, &nodes), vec![5, 15, 20]);
        assert_eq!(nodes[0], TreeNode::default());
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut nodes = arena(1024);
        let mut tree = KeyedTree::new();
        for i in 0..1024 {
            tree.insert(&mut nodes, i as u64, id(i)).unwrap();
        }
        tree.validate(&nodes).unwrap();
        // 2 * log2(n + 1) bounds the height; black height is at most half of it.
        assert!(tree.black_height() <= 11);
        assert_eq!(tree.len(), 1024);
    }

    #[test]
    fn insert_then_extract_all_empties_tree() {
        let mut nodes = arena(64);
        let mut tree = KeyedTree::new();
        for i in 0..64 {
            tree.insert(&mut nodes, (i * 37 % 64) as u64, id(i)).unwrap();
        }
        for i in (1..64).step_by(2).chain((0..64).step_by(2)) {
            tree.extract(&mut nodes, id(i)).unwrap();
            tree.validate(&nodes).unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.black_height(), 0);
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn duplicate_key_is_reported() {
        let mut nodes = arena(2);
        let mut tree = KeyedTree::new();
        tree.insert(&mut nodes, 7, id(0)).unwrap();
        assert!(matches!(
            tree.insert(&mut nodes, 7, id(1)),
            Err(TreeError::Duplicate(7))
        ));
        assert!(!nodes[1].is_linked());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn double_insert_and_foreign_extract_are_reported() {
        let mut nodes = arena(3);
        let mut a = KeyedTree::new();
        let mut b = KeyedTree::new();
        a.insert(&mut nodes, 1, id(0)).unwrap();
        b.insert(&mut nodes, 2, id(1)).unwrap();

        assert!(matches!(
            a.insert(&mut nodes, 3, id(0)),
            Err(TreeError::AlreadyLinked(_))
        ));
        assert!(matches!(
            b.insert(&mut nodes, 3, id(0)),
            Err(TreeError::AlreadyLinked(_))
        ));
        assert!(matches!(
            a.extract(&mut nodes, id(1)),
            Err(TreeError::NotMember(_))
        ));
        assert!(matches!(
            a.extract(&mut nodes, id(2)),
            Err(TreeError::NotMember(_))
        ));
        assert!(a.contains(&nodes, id(0)));
        assert!(!a.contains(&nodes, id(1)));
    }

    #[test]
    fn ids_outside_storage_are_reported() {
        let mut nodes = arena(4);
        let mut tree = KeyedTree::new();
        tree.insert(&mut nodes, 1, id(0)).unwrap();

        assert_eq!(
            tree.insert(&mut nodes, 2, id(99)),
            Err(TreeError::NodeOutOfRange(id(99)))
        );
        assert_eq!(tree.extract(&mut nodes, id(99)), Err(TreeError::NotMember(id(99))));
        assert!(!tree.contains(&nodes, id(99)));

        let mut pool = crate::alloc::BlockPool::<()>::with_capacity(4);
        let mut by_id = KeyedTree::new();
        assert_eq!(
            by_id.extract(&mut pool, id(99)),
            Err(TreeError::NotMember(id(99)))
        );
        tree.validate(&nodes).unwrap();
    }

    #[test]
    fn oversized_key_is_rejected() {
        let mut nodes = arena(1);
        let mut tree = KeyedTree::new();
        assert!(matches!(
            tree.insert(&mut nodes, MAX_KEY + 1, id(0)),
            Err(TreeError::KeyOutOfRange(_))
        ));
        tree.insert(&mut nodes, MAX_KEY, id(0)).unwrap();
        assert_eq!(tree.search(&nodes, MAX_KEY), Some(id(0)));
    }

    #[test]
    fn comparator_orders_equal_keys() {
        // Node index doubles as the tie-breaker.
        let mut nodes = arena(6);
        let mut tree = KeyedTree::new();
        for i in 0..6 {
            tree.insert_by(&mut nodes, 42, id(i), |_, other| i.cmp(&other.index()))
                .unwrap();
        }
        tree.validate(&nodes).unwrap();

        let order: Vec<usize> = tree.iter(&nodes).map(NodeId::index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);

        let found = tree.search_by(&nodes, 42, |_, other| 4usize.cmp(&other.index()));
        assert_eq!(found, Some(id(4)));
        assert!(matches!(
            tree.insert_by(&mut nodes, 42, id(5), |_, other| 3usize.cmp(&other.index())),
            Err(TreeError::AlreadyLinked(_))
        ));
    }

    #[test]
    fn goto_min_and_max_find_boundaries() {
        let mut nodes = arena(5);
        let mut tree = KeyedTree::new();
        for (i, key) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            tree.insert(&mut nodes, key, id(i)).unwrap();
        }

        let from_25: Vec<u64> = tree
            .range_from(&nodes, 25)
            .map(|n| nodes[n.index()].key())
            .collect();
        assert_eq!(from_25, vec![30, 40, 50]);

        let down_from_35: Vec<u64> = tree
            .range_to_rev(&nodes, 35)
            .map(|n| nodes[n.index()].key())
            .collect();
        assert_eq!(down_from_35, vec![30, 20, 10]);

        assert_eq!(tree.goto_min(&nodes, 51).get(), None);
        assert_eq!(tree.goto_max(&nodes, 9).get(), None);
        assert_eq!(tree.goto_min(&nodes, 50).get(), Some(id(4)));
        assert_eq!(tree.goto_max(&nodes, 10).get(), Some(id(0)));
    }

    #[test]
    fn goto_min_lands_on_leftmost_duplicate() {
        let mut nodes = arena(8);
        let mut tree = KeyedTree::new();
        for i in 0..8 {
            let key = if i < 2 { 1 } else { 5 };
            tree.insert_by(&mut nodes, key, id(i), |_, other| i.cmp(&other.index()))
                .unwrap();
        }
        let cursor = tree.goto_min(&nodes, 2);
        assert_eq!(cursor.get(), Some(id(2)));

        let cursor = tree.goto_max(&nodes, 4);
        assert_eq!(cursor.get(), Some(id(1)));
    }
}
