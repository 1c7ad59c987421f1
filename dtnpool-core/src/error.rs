use std::fmt;

use thiserror::Error;

use crate::alloc::BlockType;
use crate::tree::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("key {0} already present")]
    Duplicate(u64),

    #[error("node {0} is already linked into a tree")]
    AlreadyLinked(NodeId),

    #[error("node {0} is not a member of this tree")]
    NotMember(NodeId),

    #[error("node {0} lies outside the tree storage")]
    NodeOutOfRange(NodeId),

    #[error("key {0:#x} does not fit in 63 bits")]
    KeyOutOfRange(u64),

    #[error("tree invariant broken: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("handle to block {index} is stale or belongs to another pool")]
    StaleHandle { index: u32 },

    #[error("block {index} holds {found:?}, expected {expected:?}")]
    WrongType {
        index: u32,
        expected: BlockType,
        found: BlockType,
    },

    #[error("subqueue reached its depth limit of {limit}")]
    QueueFull { limit: usize },

    #[error("block {index} is still linked into a tree")]
    StillIndexed { index: u32 },
}

/// A refused operation that hands the owned value back to the caller.
///
/// Pushing or recycling consumes the block handle; on failure the handle
/// returns here so the block is never leaked.
pub struct Rejected<T> {
    pub error: PoolError,
    pub block: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(error: PoolError, block: T) -> Self {
        Self { error, block }
    }

    pub fn into_inner(self) -> T {
        self.block
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<T> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
