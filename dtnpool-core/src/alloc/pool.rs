//! ## dtnpool-core::alloc::pool
//! **Fixed-capacity block arena**
//!
//! Every slot is sized once at construction: content, one queue link, one job
//! link and one tree node. Nothing grows afterwards, so allocation on the hot
//! path is a free-list pop.
//!
//! Recycling is deferred: a recycled block is appended to the recycle list in
//! O(1) with its content intact, and [`BlockPool::collect`] later drops the
//! content and returns the slot to the free list. This is what lets
//! `drop_all` discard a whole subqueue by splicing one list.

use std::sync::Arc;

use bytes::Bytes;
use dtnpool_config::PoolConfig;
use tracing::{debug, error};

use super::block::{kind, Block, BlockContent, BlockKind, BlockType, CanonicalBlock, PrimaryBlock};
use super::links::{Link, LinkList, NIL};
use super::stats::PoolStats;
use crate::error::{PoolError, Rejected};
use crate::tree::{NodeId, TreeNode, TreeStorage};

const DEFAULT_COLLECT_BATCH: usize = 64;

pub(crate) struct Slot<A> {
    pub(crate) generation: u32,
    pub(crate) content: BlockContent<A>,
}

/// The unlocked arena.
///
/// Every mutating operation takes `&mut self`, so the borrow checker enforces
/// a single writer. Threads share it through [`Pool`](crate::shared::Pool),
/// which adds the admin lock and the worker wake-up.
pub struct BlockPool<A = ()> {
    pub(crate) slots: Vec<Slot<A>>,
    /// Free list, recycle list, subqueues and the active flow list.
    pub(crate) queue_links: Vec<Link>,
    /// Active job list.
    pub(crate) job_links: Vec<Link>,
    pub(crate) tree_nodes: Vec<TreeNode>,
    pub(crate) free: LinkList,
    pub(crate) recycled: LinkList,
    pub(crate) active_jobs: LinkList,
    pub(crate) active_flows: LinkList,
    /// Recycled blocks found still tree-linked, re-checked by `maintain`.
    quarantined: LinkList,
    pub(crate) default_depth_limit: usize,
    collect_batch: usize,
    pub(crate) stats: Arc<PoolStats>,
}

impl<A> BlockPool<A> {
    /// Creates a pool of `capacity` slots.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero or does not fit the 32-bit slot index.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(capacity, DEFAULT_COLLECT_BATCH, 0)
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::build(
            config.block_count,
            config.collect_batch,
            config.default_depth_limit,
        )
    }

    fn build(capacity: usize, collect_batch: usize, default_depth_limit: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity < NIL as usize,
            "Capacity {capacity} exceeds the slot index range"
        );

        let mut queue_links = vec![Link::UNLINKED; capacity];
        let mut free = LinkList::new();
        for index in 0..capacity as u32 {
            free.push_back(&mut queue_links, index);
        }

        debug!(capacity, collect_batch, "block pool created");
        Self {
            slots: (0..capacity)
                .map(|_| Slot {
                    generation: 0,
                    content: BlockContent::Free,
                })
                .collect(),
            queue_links,
            job_links: vec![Link::UNLINKED; capacity],
            tree_nodes: vec![TreeNode::default(); capacity],
            free,
            recycled: LinkList::new(),
            active_jobs: LinkList::new(),
            active_flows: LinkList::new(),
            default_depth_limit,
            quarantined: LinkList::new(),
            collect_batch: collect_batch.max(1),
            stats: Arc::new(PoolStats::new()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Pool-owned blocks: free slots plus recycled blocks awaiting collection.
    #[inline]
    pub fn free_block_count(&self) -> usize {
        self.free.len() + self.recycled.len()
    }

    #[inline]
    pub fn recycled_count(&self) -> usize {
        self.recycled.len()
    }

    /// Blocks currently lent out, queued or holding flow/job state.
    #[inline]
    pub fn in_use_count(&self) -> usize {
        self.capacity() - self.free_block_count() - self.quarantined.len()
    }

    /// Recycled blocks held back because they are still linked into a tree.
    #[inline]
    pub fn quarantined_count(&self) -> usize {
        self.quarantined.len()
    }

    pub fn stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }

    /// Type tag of the slot at `index`.
    pub fn block_type(&self, index: u32) -> Option<BlockType> {
        self.slots
            .get(index as usize)
            .map(|slot| slot.content.block_type())
    }

    pub(crate) fn alloc_slot(&mut self, content: BlockContent<A>) -> Option<u32> {
        if self.free.is_empty() {
            self.collect(self.collect_batch);
        }
        let Some(index) = self.free.pop_front(&mut self.queue_links) else {
            self.stats.record_alloc_failure();
            debug!(capacity = self.capacity(), "block pool exhausted");
            return None;
        };
        self.slots[index as usize].content = content;
        self.stats.record_allocation(self.in_use_count());
        Some(index)
    }

    /// Allocates a data block; `None` means the pool is exhausted.
    pub fn alloc<K: BlockKind>(&mut self, content: K::Content) -> Option<Block<K>> {
        let index = self.alloc_slot(K::wrap(content))?;
        Some(Block::new(index, self.slots[index as usize].generation))
    }

    pub fn alloc_primary(&mut self, bundle_id: u64, payload: Bytes) -> Option<Block<kind::Primary>> {
        self.alloc::<kind::Primary>(PrimaryBlock { bundle_id, payload })
    }

    pub fn alloc_canonical(
        &mut self,
        block_type: u8,
        payload: Bytes,
    ) -> Option<Block<kind::Canonical>> {
        self.alloc::<kind::Canonical>(CanonicalBlock {
            block_type,
            payload,
        })
    }

    pub fn get<K: BlockKind>(&self, block: &Block<K>) -> Option<&K::Content> {
        self.checked_slot(block.index, block.generation)
            .and_then(|slot| K::cast(&slot.content))
    }

    pub fn get_mut<K: BlockKind>(&mut self, block: &Block<K>) -> Option<&mut K::Content> {
        let slot = self.slots.get_mut(block.index as usize)?;
        if slot.generation != block.generation {
            return None;
        }
        K::cast_mut(&mut slot.content)
    }

    /// Resolves a tree search result back to its bundle.
    pub fn primary_at(&self, node: NodeId) -> Option<&PrimaryBlock> {
        self.slots
            .get(node.index())
            .and_then(|slot| kind::Primary::cast(&slot.content))
    }

    /// Hands a lent block back to the pool.
    ///
    /// Refused while the block is still linked into a tree; extract it first.
    pub fn recycle<K: BlockKind>(&mut self, block: Block<K>) -> Result<(), Rejected<Block<K>>> {
        if let Err(error) = self.check_block(&block) {
            return Err(Rejected::new(error, block));
        }
        if self.tree_nodes[block.index as usize].is_linked() {
            let index = block.index;
            return Err(Rejected::new(PoolError::StillIndexed { index }, block));
        }
        self.recycle_index(block.index);
        Ok(())
    }

    /// Appends a slot to the recycle list and invalidates outstanding ids.
    pub(crate) fn recycle_index(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.recycled.push_back(&mut self.queue_links, index);
        self.stats.record_recycles(1);
    }

    /// Returns up to `limit` recycled blocks to the free list.
    ///
    /// Content is dropped here, not at recycle time. A block that is still
    /// linked into a tree is quarantined instead of reused, since handing it
    /// out again would corrupt that tree. [`BlockPool::maintain`] releases it
    /// once it has been extracted.
    pub fn collect(&mut self, limit: usize) -> usize {
        let mut collected = 0;
        for _ in 0..limit {
            let Some(index) = self.recycled.pop_front(&mut self.queue_links) else {
                break;
            };
            if self.tree_nodes[index as usize].is_linked() {
                error!(index, "recycled block still linked into a tree, quarantined");
                self.quarantined.push_back(&mut self.queue_links, index);
                self.stats.record_quarantine();
                continue;
            }
            let slot = &mut self.slots[index as usize];
            slot.content = BlockContent::Free;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push_back(&mut self.queue_links, index);
            collected += 1;
        }
        if collected > 0 {
            self.stats.record_collected(collected);
        }
        collected
    }

    /// One background bookkeeping pass: releases quarantined blocks that
    /// left their tree, then collects a batch.
    pub fn maintain(&mut self) -> usize {
        self.release_quarantined();
        self.collect(self.collect_batch)
    }

    /// Moves quarantined blocks that are no longer tree-linked back onto the
    /// recycle list.
    fn release_quarantined(&mut self) -> usize {
        let mut released = 0;
        for _ in 0..self.quarantined.len() {
            let Some(index) = self.quarantined.pop_front(&mut self.queue_links) else {
                break;
            };
            if self.tree_nodes[index as usize].is_linked() {
                self.quarantined.push_back(&mut self.queue_links, index);
            } else {
                self.recycled.push_back(&mut self.queue_links, index);
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, "quarantined blocks released");
        }
        released
    }

    pub(crate) fn checked_slot(&self, index: u32, generation: u32) -> Option<&Slot<A>> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
    }

    pub(crate) fn check_block<K: BlockKind>(&self, block: &Block<K>) -> Result<(), PoolError> {
        let slot = self
            .checked_slot(block.index, block.generation)
            .ok_or(PoolError::StaleHandle { index: block.index })?;
        let found = slot.content.block_type();
        if found != K::TYPE {
            return Err(PoolError::WrongType {
                index: block.index,
                expected: K::TYPE,
                found,
            });
        }
        Ok(())
    }
}

impl<A> TreeStorage for BlockPool<A> {
    #[inline]
    fn get_tree_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.tree_nodes.get(id.index())
    }

    #[inline]
    fn tree_node(&self, id: NodeId) -> &TreeNode {
        &self.tree_nodes[id.index()]
    }

    #[inline]
    fn tree_node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.tree_nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::KeyedTree;
    use tracing_test::traced_test;

    fn pool(capacity: usize) -> BlockPool {
        BlockPool::with_capacity(capacity)
    }

    #[test]
    fn allocate_until_exhausted() {
        let mut pool = pool(4);
        let blocks: Vec<_> = (0..4)
            .map(|i| pool.alloc_primary(i, Bytes::new()).unwrap())
            .collect();
        assert_eq!(pool.in_use_count(), 4);
        assert!(pool.alloc_primary(99, Bytes::new()).is_none());
        assert_eq!(pool.stats().alloc_failures(), 1);

        for block in blocks {
            pool.recycle(block).unwrap();
        }
        assert_eq!(pool.free_block_count(), 4);
        assert_eq!(pool.in_use_count(), 0);
    }

    #[test]
    fn recycled_blocks_are_collected_on_demand() {
        let mut pool = pool(1);
        let block = pool.alloc_primary(1, Bytes::from_static(b"one")).unwrap();
        pool.recycle(block).unwrap();
        assert_eq!(pool.recycled_count(), 1);

        // Free list is empty, so allocation collects inline.
        let block = pool.alloc_primary(2, Bytes::from_static(b"two")).unwrap();
        assert_eq!(pool.recycled_count(), 0);
        assert_eq!(pool.get(&block).unwrap().bundle_id, 2);
        assert_eq!(pool.stats().collected(), 1);
        pool.recycle(block).unwrap();
    }

    #[test]
    fn maintain_drops_content_and_advances_generation() {
        let mut pool = pool(2);
        let block = pool.alloc_canonical(7, Bytes::from_static(b"ext")).unwrap();
        let index = block.index();
        pool.recycle(block).unwrap();
        assert_eq!(pool.block_type(index), Some(BlockType::Canonical));

        assert_eq!(pool.maintain(), 1);
        assert_eq!(pool.block_type(index), Some(BlockType::Free));
        assert_eq!(pool.recycled_count(), 0);
        assert_eq!(pool.free_block_count(), 2);
    }

    #[test]
    fn get_mut_edits_content() {
        let mut pool = pool(1);
        let block = pool.alloc_primary(1, Bytes::new()).unwrap();
        pool.get_mut(&block).unwrap().payload = Bytes::from_static(b"edited");
        assert_eq!(pool.get(&block).unwrap().payload, Bytes::from_static(b"edited"));
        pool.recycle(block).unwrap();
    }

    #[test]
    fn indexed_block_cannot_be_recycled() {
        let mut pool = pool(2);
        let mut by_id = KeyedTree::new();
        let block = pool.alloc_primary(42, Bytes::new()).unwrap();
        by_id.insert(&mut pool, 42, block.node_id()).unwrap();

        let rejected = pool.recycle(block).unwrap_err();
        assert!(matches!(rejected.error, PoolError::StillIndexed { .. }));

        let block = rejected.into_inner();
        let found = by_id.search(&pool, 42).unwrap();
        assert_eq!(pool.primary_at(found).unwrap().bundle_id, 42);

        by_id.extract(&mut pool, block.node_id()).unwrap();
        pool.recycle(block).unwrap();
    }

    #[traced_test]
    #[test]
    fn block_linked_after_recycle_is_quarantined() {
        let mut pool = pool(2);
        let mut tree = KeyedTree::new();
        let block = pool.alloc_primary(5, Bytes::new()).unwrap();
        let node = block.node_id();
        pool.recycle(block).unwrap();
        tree.insert(&mut pool, 5, node).unwrap();

        assert_eq!(pool.maintain(), 0);
        assert_eq!(pool.stats().quarantined(), 1);
        assert_eq!(pool.quarantined_count(), 1);
        assert_eq!(pool.free_block_count(), 1);
        assert_eq!(pool.in_use_count(), 0);
        assert!(logs_contain("quarantined"));
        assert_eq!(tree.validate(&pool), Ok(()));

        // Still linked: the next pass keeps it back.
        assert_eq!(pool.maintain(), 0);
        assert_eq!(pool.quarantined_count(), 1);

        tree.extract(&mut pool, node).unwrap();
        assert_eq!(pool.maintain(), 1);
        assert_eq!(pool.quarantined_count(), 0);
        assert_eq!(pool.free_block_count(), 2);
        let a = pool.alloc_primary(1, Bytes::new()).unwrap();
        let b = pool.alloc_primary(2, Bytes::new()).unwrap();
        pool.recycle(a).unwrap();
        pool.recycle(b).unwrap();
    }

    #[traced_test]
    #[test]
    fn exhaustion_is_logged() {
        let mut pool = pool(1);
        let block = pool.alloc_primary(1, Bytes::new()).unwrap();
        assert!(pool.alloc_primary(2, Bytes::new()).is_none());
        assert!(logs_contain("block pool exhausted"));
        pool.recycle(block).unwrap();
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        BlockPool::<()>::with_capacity(0);
    }
}
