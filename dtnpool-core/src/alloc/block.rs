//! Block content variants and the handles that reference pool slots.
//!
//! Data blocks (bundle primary blocks, canonical blocks) are lent out as an
//! owned [`Block<K>`]: it is neither `Clone` nor `Copy`, so a block can only be
//! held by one party, be queued, or be recycled, and never two of those at
//! once. Flow and job blocks are shared by many parties and are referenced
//! through copyable ids whose generation is checked on every use.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::Serialize;

use crate::flow::Flow;
use crate::jobs::Job;
use crate::tree::NodeId;

/// Type tag of a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Free,
    Primary,
    Canonical,
    Flow,
    Job,
}

/// Primary block of a bundle; the only block type a subqueue accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub bundle_id: u64,
    pub payload: Bytes,
}

/// Extension or payload block attached to a bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalBlock {
    pub block_type: u8,
    pub payload: Bytes,
}

/// Content of one pool slot.
pub enum BlockContent<A> {
    Free,
    Primary(PrimaryBlock),
    Canonical(CanonicalBlock),
    Flow(Flow<A>),
    Job(Job<A>),
}

impl<A> BlockContent<A> {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Free => BlockType::Free,
            BlockContent::Primary(_) => BlockType::Primary,
            BlockContent::Canonical(_) => BlockType::Canonical,
            BlockContent::Flow(_) => BlockType::Flow,
            BlockContent::Job(_) => BlockType::Job,
        }
    }

    /// The job embedded in this block, if the block type carries one.
    pub fn job(&self) -> Option<&Job<A>> {
        match self {
            BlockContent::Flow(flow) => Some(flow.job()),
            BlockContent::Job(job) => Some(job),
            _ => None,
        }
    }

    pub fn job_mut(&mut self) -> Option<&mut Job<A>> {
        match self {
            BlockContent::Flow(flow) => Some(flow.job_mut()),
            BlockContent::Job(job) => Some(job),
            _ => None,
        }
    }
}

impl<A> fmt::Debug for BlockContent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockContent::Primary(p) => f.debug_tuple("Primary").field(p).finish(),
            BlockContent::Canonical(c) => f.debug_tuple("Canonical").field(c).finish(),
            other => write!(f, "{:?}", other.block_type()),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for the kinds of block that can be lent as an owned [`Block`].
pub trait BlockKind: sealed::Sealed {
    type Content;
    const TYPE: BlockType;

    fn cast<A>(content: &BlockContent<A>) -> Option<&Self::Content>;
    fn cast_mut<A>(content: &mut BlockContent<A>) -> Option<&mut Self::Content>;
    fn wrap<A>(content: Self::Content) -> BlockContent<A>;
}

pub mod kind {
    use super::*;

    #[derive(Debug)]
    pub enum Primary {}

    #[derive(Debug)]
    pub enum Canonical {}

    impl sealed::Sealed for Primary {}
    impl sealed::Sealed for Canonical {}

    impl BlockKind for Primary {
        type Content = PrimaryBlock;
        const TYPE: BlockType = BlockType::Primary;

        fn cast<A>(content: &BlockContent<A>) -> Option<&PrimaryBlock> {
            match content {
                BlockContent::Primary(p) => Some(p),
                _ => None,
            }
        }

        fn cast_mut<A>(content: &mut BlockContent<A>) -> Option<&mut PrimaryBlock> {
            match content {
                BlockContent::Primary(p) => Some(p),
                _ => None,
            }
        }

        fn wrap<A>(content: PrimaryBlock) -> BlockContent<A> {
            BlockContent::Primary(content)
        }
    }

    impl BlockKind for Canonical {
        type Content = CanonicalBlock;
        const TYPE: BlockType = BlockType::Canonical;

        fn cast<A>(content: &BlockContent<A>) -> Option<&CanonicalBlock> {
            match content {
                BlockContent::Canonical(c) => Some(c),
                _ => None,
            }
        }

        fn cast_mut<A>(content: &mut BlockContent<A>) -> Option<&mut CanonicalBlock> {
            match content {
                BlockContent::Canonical(c) => Some(c),
                _ => None,
            }
        }

        fn wrap<A>(content: CanonicalBlock) -> BlockContent<A> {
            BlockContent::Canonical(content)
        }
    }
}

/// Owned handle to a lent data block.
#[must_use = "a lent block must be queued or recycled, dropping it leaks the slot"]
pub struct Block<K: BlockKind> {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    _kind: PhantomData<fn() -> K>,
}

/// A lent bundle primary block.
pub type BundleBlock = Block<kind::Primary>;

impl<K: BlockKind> Block<K> {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Tree node embedded in this block's slot.
    #[inline]
    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.index)
    }
}

impl<K: BlockKind> fmt::Debug for Block<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block<{:?}>#{}", K::TYPE, self.index)
    }
}

/// Shared reference to a flow block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl FlowId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// The job embedded in this flow's block.
    #[inline]
    pub fn job(self) -> JobId {
        JobId {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow#{}.{}", self.index, self.generation)
    }
}

/// Shared reference to a block carrying a job (job blocks and flow blocks).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl JobId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}.{}", self.index, self.generation)
    }
}
