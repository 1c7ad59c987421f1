//! ## dtnpool-core::jobs
//! **Schedulable work items**
//!
//! A job is embedded in a pool block: either a standalone job block or the
//! job of a flow. Being active means being linked into the pool-wide active
//! job list; the list holds membership only and never owns the block.
//!
//! Job states are Idle and Active. Marking a job active re-splices it to the
//! tail, so marking twice yields one entry. Dequeuing returns it to Idle
//! before its handler runs, which makes re-activation from inside the handler
//! safe.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::alloc::{BlockContent, BlockPool, BlockType, JobId, Slot};
use crate::error::PoolError;
use crate::shared::Pool;

/// Work routine invoked by a worker with the shared pool, the worker's
/// argument and the job that fired.
pub type JobHandler<A> = Arc<dyn Fn(&Pool<A>, &A, JobId) + Send + Sync>;

/// Wraps a closure as a [`JobHandler`].
pub fn job_handler<A, F>(f: F) -> JobHandler<A>
where
    F: Fn(&Pool<A>, &A, JobId) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct Job<A> {
    handler: Option<JobHandler<A>>,
}

impl<A> Job<A> {
    pub(crate) fn new(handler: Option<JobHandler<A>>) -> Self {
        Self { handler }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn handler(&self) -> Option<&JobHandler<A>> {
        self.handler.as_ref()
    }
}

impl<A> fmt::Debug for Job<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

fn job_in<A>(slots: &mut [Slot<A>], id: JobId) -> Result<&mut Job<A>, PoolError> {
    let slot = slots
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .ok_or(PoolError::StaleHandle { index: id.index })?;
    let found = slot.content.block_type();
    slot.content.job_mut().ok_or(PoolError::WrongType {
        index: id.index,
        expected: BlockType::Job,
        found,
    })
}

impl<A> BlockPool<A> {
    /// Allocates a standalone job block.
    pub fn alloc_job(&mut self, handler: Option<JobHandler<A>>) -> Option<JobId> {
        let index = self.alloc_slot(BlockContent::Job(Job::new(handler)))?;
        Some(JobId {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Cancels and recycles a standalone job block. Flow jobs go away with
    /// [`BlockPool::destroy_flow`].
    pub fn recycle_job(&mut self, id: JobId) -> Result<(), PoolError> {
        job_in(&mut self.slots, id)?;
        let found = self.slots[id.index as usize].content.block_type();
        if found != BlockType::Job {
            return Err(PoolError::WrongType {
                index: id.index,
                expected: BlockType::Job,
                found,
            });
        }
        self.active_jobs.unlink(&mut self.job_links, id.index);
        self.recycle_index(id.index);
        Ok(())
    }

    /// Replaces the handler. Clearing it also cancels the job.
    pub fn set_handler(
        &mut self,
        id: JobId,
        handler: Option<JobHandler<A>>,
    ) -> Result<(), PoolError> {
        let clearing = handler.is_none();
        job_in(&mut self.slots, id)?.handler = handler;
        if clearing {
            self.active_jobs.unlink(&mut self.job_links, id.index);
        }
        Ok(())
    }

    /// Links a job at the tail of the active list.
    ///
    /// Returns `false` for a job without a handler, which is never listed.
    pub fn mark_active(&mut self, id: JobId) -> Result<bool, PoolError> {
        let runnable = job_in(&mut self.slots, id)?.has_handler();
        self.active_jobs.unlink(&mut self.job_links, id.index);
        if !runnable {
            debug!(job = %id, "job without handler not activated");
            return Ok(false);
        }
        self.active_jobs.push_back(&mut self.job_links, id.index);
        self.stats.record_activation();
        Ok(true)
    }

    /// Removes a job from the active list; returns whether it was listed.
    pub fn cancel(&mut self, id: JobId) -> Result<bool, PoolError> {
        job_in(&mut self.slots, id)?;
        Ok(self.active_jobs.unlink(&mut self.job_links, id.index))
    }

    pub fn is_active(&self, id: JobId) -> Result<bool, PoolError> {
        let slot = self
            .checked_slot(id.index, id.generation)
            .ok_or(PoolError::StaleHandle { index: id.index })?;
        if slot.content.job().is_none() {
            return Err(PoolError::WrongType {
                index: id.index,
                expected: BlockType::Job,
                found: slot.content.block_type(),
            });
        }
        Ok(self.active_jobs.contains(&self.job_links, id.index))
    }

    pub fn active_job_count(&self) -> usize {
        self.active_jobs.len()
    }

    /// Pops the head of the active list.
    ///
    /// List membership and slot content are tracked apart, so an entry whose
    /// slot no longer carries a job is dropped and the next one tried.
    pub fn get_next_active(&mut self) -> Option<JobId> {
        self.take_next_active().map(|(id, _)| id)
    }

    /// Pops the head of the active list together with its handler.
    pub(crate) fn take_next_active(&mut self) -> Option<(JobId, JobHandler<A>)> {
        while let Some(index) = self.active_jobs.pop_front(&mut self.job_links) {
            let slot = &self.slots[index as usize];
            match slot.content.job().and_then(Job::handler) {
                Some(handler) => {
                    let id = JobId {
                        index,
                        generation: slot.generation,
                    };
                    return Some((id, Arc::clone(handler)));
                }
                None => warn!(index, "active list entry no longer runnable, skipped"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> JobHandler<()> {
        job_handler(|_, _, _| {})
    }

    #[test]
    fn marking_twice_lists_once() {
        let mut pool = BlockPool::with_capacity(4);
        let job = pool.alloc_job(Some(noop())).unwrap();

        assert_eq!(pool.mark_active(job), Ok(true));
        assert_eq!(pool.mark_active(job), Ok(true));
        assert_eq!(pool.active_job_count(), 1);

        assert_eq!(pool.get_next_active(), Some(job));
        assert_eq!(pool.get_next_active(), None);
        assert_eq!(pool.is_active(job), Ok(false));
    }

    #[test]
    fn activation_order_is_served_in_order() {
        let mut pool = BlockPool::with_capacity(4);
        let jobs: Vec<_> = (0..3)
            .map(|_| pool.alloc_job(Some(noop())).unwrap())
            .collect();
        for &job in jobs.iter().rev() {
            pool.mark_active(job).unwrap();
        }
        // Re-marking moves the job to the tail.
        pool.mark_active(jobs[2]).unwrap();

        let served: Vec<_> = std::iter::from_fn(|| pool.get_next_active()).collect();
        assert_eq!(served, vec![jobs[1], jobs[0], jobs[2]]);
    }

    #[test]
    fn handlerless_job_is_never_listed() {
        let mut pool = BlockPool::with_capacity(2);
        let job = pool.alloc_job(None).unwrap();
        assert_eq!(pool.mark_active(job), Ok(false));
        assert_eq!(pool.active_job_count(), 0);

        pool.set_handler(job, Some(noop())).unwrap();
        assert_eq!(pool.mark_active(job), Ok(true));
        pool.set_handler(job, None).unwrap();
        assert_eq!(pool.is_active(job), Ok(false));
    }

    #[test]
    fn cancel_is_a_noop_for_idle_jobs() {
        let mut pool = BlockPool::with_capacity(2);
        let job = pool.alloc_job(Some(noop())).unwrap();
        assert_eq!(pool.cancel(job), Ok(false));
        pool.mark_active(job).unwrap();
        assert_eq!(pool.cancel(job), Ok(true));
        assert_eq!(pool.get_next_active(), None);
    }

    #[test]
    fn flow_jobs_share_the_active_list() {
        let mut pool = BlockPool::with_capacity(4);
        let flow = pool.create_flow().unwrap();
        let job = pool.alloc_job(Some(noop())).unwrap();

        pool.set_handler(flow.job(), Some(noop())).unwrap();
        pool.mark_active(flow.job()).unwrap();
        pool.mark_active(job).unwrap();
        assert_eq!(
            pool.recycle_job(flow.job()),
            Err(PoolError::WrongType {
                index: flow.index(),
                expected: BlockType::Job,
                found: BlockType::Flow,
            })
        );

        pool.destroy_flow(flow).unwrap();
        assert_eq!(pool.get_next_active(), Some(job));
        assert_eq!(pool.get_next_active(), None);
    }

    #[test]
    fn recycled_job_id_is_stale() {
        let mut pool = BlockPool::with_capacity(2);
        let job = pool.alloc_job(Some(noop())).unwrap();
        pool.mark_active(job).unwrap();
        pool.recycle_job(job).unwrap();

        assert_eq!(pool.active_job_count(), 0);
        assert_eq!(
            pool.mark_active(job),
            Err(PoolError::StaleHandle { index: job.index() })
        );
    }

    #[test]
    fn data_blocks_are_not_jobs() {
        let mut pool = BlockPool::<()>::with_capacity(2);
        let block = pool.alloc_primary(1, bytes::Bytes::new()).unwrap();
        let fake = JobId {
            index: block.index(),
            generation: 0,
        };
        assert!(matches!(
            pool.mark_active(fake),
            Err(PoolError::WrongType {
                found: BlockType::Primary,
                ..
            })
        ));
        pool.recycle(block).unwrap();
    }
}
