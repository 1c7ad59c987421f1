//! Tree node layout and the storage seam the tree operates through.

use std::fmt;

/// Largest key a [`KeyWord`] can carry; bit 0 holds the node color.
pub const MAX_KEY: u64 = u64::MAX >> 1;

const COLOR_BIT: u64 = 1;

/// Stable index of a tree node inside its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
}

/// A 63-bit key with the node color packed into bit 0.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyWord(u64);

impl KeyWord {
    #[inline]
    pub fn new(key: u64, color: Color) -> Self {
        debug_assert!(key <= MAX_KEY);
        let bit = match color {
            Color::Red => COLOR_BIT,
            Color::Black => 0,
        };
        Self((key << 1) | bit)
    }

    #[inline]
    pub fn key(self) -> u64 {
        self.0 >> 1
    }

    #[inline]
    pub fn color(self) -> Color {
        if self.0 & COLOR_BIT != 0 {
            Color::Red
        } else {
            Color::Black
        }
    }

    #[inline]
    pub fn set_color(&mut self, color: Color) {
        *self = Self::new(self.key(), color);
    }
}

impl fmt::Debug for KeyWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyWord")
            .field("key", &self.key())
            .field("color", &self.color())
            .finish()
    }
}

/// Intrusive link record for one tree membership.
///
/// Zeroed while unlinked. The `linked` flag separates a lone root from a node
/// that belongs to no tree at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeNode {
    pub(crate) word: KeyWord,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) linked: bool,
}

impl TreeNode {
    #[inline]
    pub fn key(&self) -> u64 {
        self.word.key()
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.word.color()
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }
}

/// Maps node ids to their link records.
///
/// The tree never allocates; whoever owns the nodes implements this and
/// passes itself into every tree operation. The same storage must be used for
/// the whole life of a tree.
pub trait TreeStorage {
    /// Checked lookup; `None` for an id outside the storage.
    fn get_tree_node(&self, id: NodeId) -> Option<&TreeNode>;
    fn tree_node(&self, id: NodeId) -> &TreeNode;
    fn tree_node_mut(&mut self, id: NodeId) -> &mut TreeNode;
}

impl TreeStorage for [TreeNode] {
    #[inline]
    fn get_tree_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.get(id.index())
    }

    #[inline]
    fn tree_node(&self, id: NodeId) -> &TreeNode {
        &self[id.index()]
    }

    #[inline]
    fn tree_node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self[id.index()]
    }
}

impl TreeStorage for Vec<TreeNode> {
    #[inline]
    fn get_tree_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.get(id.index())
    }

    #[inline]
    fn tree_node(&self, id: NodeId) -> &TreeNode {
        &self[id.index()]
    }

    #[inline]
    fn tree_node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self[id.index()]
    }
}
