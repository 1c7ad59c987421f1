//! ## dtnpool-core::flow
//! **Per-interface bundle queues**
//!
//! A flow is one pool block holding an ingress and an egress [`Subqueue`] plus
//! the [`Job`] that processes them. Queued bundles are linked through the
//! pool's queue link array, so push, pull, splicing a whole subqueue onto
//! another and discarding a whole subqueue are all O(1).
//!
//! Pushing consumes the owned [`BundleBlock`] and pulling hands one back, so a
//! bundle is either lent to exactly one holder or queued, never both.

mod subqueue;

use tracing::{debug, warn};

pub use subqueue::{Direction, Subqueue};

use crate::alloc::{BlockContent, BlockPool, BlockType, BundleBlock, FlowId, Slot};
use crate::error::{PoolError, Rejected};
use crate::jobs::Job;

/// Flow block content.
pub struct Flow<A> {
    ingress: Subqueue,
    egress: Subqueue,
    job: Job<A>,
}

impl<A> Flow<A> {
    pub(crate) fn new(depth_limit: usize) -> Self {
        Self {
            ingress: Subqueue::with_limit(depth_limit),
            egress: Subqueue::with_limit(depth_limit),
            job: Job::new(None),
        }
    }

    pub fn subqueue(&self, direction: Direction) -> &Subqueue {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }

    pub(crate) fn subqueue_mut(&mut self, direction: Direction) -> &mut Subqueue {
        match direction {
            Direction::Ingress => &mut self.ingress,
            Direction::Egress => &mut self.egress,
        }
    }

    pub fn job(&self) -> &Job<A> {
        &self.job
    }

    pub(crate) fn job_mut(&mut self) -> &mut Job<A> {
        &mut self.job
    }
}

fn flow_in<A>(slots: &mut [Slot<A>], id: FlowId) -> Result<&mut Flow<A>, PoolError> {
    let slot = slots
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .ok_or(PoolError::StaleHandle { index: id.index })?;
    match &mut slot.content {
        BlockContent::Flow(flow) => Ok(flow),
        other => Err(PoolError::WrongType {
            index: id.index,
            expected: BlockType::Flow,
            found: other.block_type(),
        }),
    }
}

impl<A> BlockPool<A> {
    /// Allocates a flow whose subqueues use the pool's default depth limit.
    pub fn create_flow(&mut self) -> Option<FlowId> {
        self.create_flow_with_limit(self.default_depth_limit)
    }

    pub fn create_flow_with_limit(&mut self, depth_limit: usize) -> Option<FlowId> {
        let index = self.alloc_slot(BlockContent::Flow(Flow::new(depth_limit)))?;
        let id = FlowId {
            index,
            generation: self.slots[index as usize].generation,
        };
        debug!(flow = %id, depth_limit, "flow created");
        Some(id)
    }

    pub fn flow(&self, id: FlowId) -> Result<&Flow<A>, PoolError> {
        let slot = self
            .checked_slot(id.index, id.generation)
            .ok_or(PoolError::StaleHandle { index: id.index })?;
        match &slot.content {
            BlockContent::Flow(flow) => Ok(flow),
            other => Err(PoolError::WrongType {
                index: id.index,
                expected: BlockType::Flow,
                found: other.block_type(),
            }),
        }
    }

    /// Counters of one subqueue.
    pub fn subqueue(&self, id: FlowId, direction: Direction) -> Result<Subqueue, PoolError> {
        Ok(*self.flow(id)?.subqueue(direction))
    }

    pub fn depth(&self, id: FlowId, direction: Direction) -> Result<usize, PoolError> {
        Ok(self.flow(id)?.subqueue(direction).depth())
    }

    /// Sets the maximum depth of one subqueue, 0 for unlimited.
    ///
    /// Bundles already queued beyond a lowered limit stay; only new pushes are
    /// refused.
    pub fn set_depth_limit(
        &mut self,
        id: FlowId,
        direction: Direction,
        limit: usize,
    ) -> Result<(), PoolError> {
        flow_in(&mut self.slots, id)?
            .subqueue_mut(direction)
            .set_depth_limit(limit);
        Ok(())
    }

    /// Appends a bundle to a subqueue.
    ///
    /// On failure the bundle comes back inside the [`Rejected`].
    pub fn push(
        &mut self,
        id: FlowId,
        direction: Direction,
        block: BundleBlock,
    ) -> Result<(), Rejected<BundleBlock>> {
        if let Err(error) = self.check_block(&block) {
            return Err(Rejected::new(error, block));
        }
        let queued = flow_in(&mut self.slots, id)
            .and_then(|flow| flow.subqueue_mut(direction).push(&mut self.queue_links, block.index));
        match queued {
            Ok(()) => Ok(()),
            Err(error) => Err(Rejected::new(error, block)),
        }
    }

    /// Removes the oldest bundle of a subqueue.
    pub fn pull(
        &mut self,
        id: FlowId,
        direction: Direction,
    ) -> Result<Option<BundleBlock>, PoolError> {
        let index = flow_in(&mut self.slots, id)?
            .subqueue_mut(direction)
            .pull(&mut self.queue_links);
        Ok(index.map(|index| BundleBlock::new(index, self.slots[index as usize].generation)))
    }

    /// Splices every bundle of `src` onto the back of `dst`.
    ///
    /// Returns the number moved. Moving a subqueue onto itself moves nothing.
    /// If the batch would exceed the destination's depth limit nothing moves
    /// and `QueueFull` is returned.
    pub fn move_all(
        &mut self,
        dst: (FlowId, Direction),
        src: (FlowId, Direction),
    ) -> Result<usize, PoolError> {
        let mut to = *self.flow(dst.0)?.subqueue(dst.1);
        let mut from = *self.flow(src.0)?.subqueue(src.1);
        if dst == src {
            return Ok(0);
        }

        let moved = to.move_from(&mut self.queue_links, &mut from)?;
        *flow_in(&mut self.slots, src.0)?.subqueue_mut(src.1) = from;
        *flow_in(&mut self.slots, dst.0)?.subqueue_mut(dst.1) = to;
        Ok(moved)
    }

    /// Discards every bundle of a subqueue, handing them back to the pool.
    ///
    /// The whole list is spliced onto the recycle list; content is released
    /// by the next collection pass.
    pub fn drop_all(&mut self, id: FlowId, direction: Direction) -> Result<usize, PoolError> {
        let dropped = flow_in(&mut self.slots, id)?
            .subqueue_mut(direction)
            .drain_into(&mut self.queue_links, &mut self.recycled);
        if dropped > 0 {
            self.stats.record_recycles(dropped);
            debug!(flow = %id, ?direction, dropped, "subqueue discarded");
        }
        Ok(dropped)
    }

    /// Tears a flow down: discards both subqueues, withdraws the flow from the
    /// active lists and recycles the flow block.
    ///
    /// Returns the number of bundles discarded.
    pub fn destroy_flow(&mut self, id: FlowId) -> Result<usize, PoolError> {
        self.flow(id)?;
        let dropped =
            self.drop_all(id, Direction::Ingress)? + self.drop_all(id, Direction::Egress)?;
        self.active_jobs.unlink(&mut self.job_links, id.index);
        self.active_flows.unlink(&mut self.queue_links, id.index);
        self.recycle_index(id.index);
        if dropped > 0 {
            warn!(flow = %id, dropped, "flow destroyed with queued bundles");
        } else {
            debug!(flow = %id, "flow destroyed");
        }
        Ok(dropped)
    }

    /// Links a flow at the tail of the active flow list, moving it there if
    /// it was already listed.
    pub fn mark_flow_active(&mut self, id: FlowId) -> Result<(), PoolError> {
        self.flow(id)?;
        self.active_flows.unlink(&mut self.queue_links, id.index);
        self.active_flows.push_back(&mut self.queue_links, id.index);
        Ok(())
    }

    /// Pops the head of the active flow list.
    pub fn next_active_flow(&mut self) -> Option<FlowId> {
        while let Some(index) = self.active_flows.pop_front(&mut self.queue_links) {
            let slot = &self.slots[index as usize];
            if let BlockContent::Flow(_) = slot.content {
                return Some(FlowId {
                    index,
                    generation: slot.generation,
                });
            }
            warn!(index, "non-flow block on the active flow list, skipped");
        }
        None
    }

    pub fn is_flow_active(&self, id: FlowId) -> Result<bool, PoolError> {
        self.flow(id)?;
        Ok(self.active_flows.contains(&self.queue_links, id.index))
    }
}
