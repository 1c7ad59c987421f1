//! ## dtnpool-core::shared
//! **Thread-shared pool and worker loop**
//!
//! [`Pool`] puts a [`BlockPool`] behind one admin lock and adds a broadcast
//! wake for workers waiting on the active job list. Tree and subqueue
//! operations run on the locked [`PoolGuard`]; handlers always run with the
//! lock released, so a handler may lock the pool itself.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dtnpool_config::PoolConfig;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, instrument, trace};

use crate::alloc::{BlockPool, JobId, PoolStats};
use crate::error::PoolError;

pub struct Pool<A = ()> {
    inner: Mutex<BlockPool<A>>,
    work_ready: Condvar,
    stats: Arc<PoolStats>,
}

/// Locked access to the pool's admin state.
pub struct PoolGuard<'a, A> {
    guard: MutexGuard<'a, BlockPool<A>>,
    pool: &'a Pool<A>,
}

impl<A> Deref for PoolGuard<'_, A> {
    type Target = BlockPool<A>;

    fn deref(&self) -> &BlockPool<A> {
        &self.guard
    }
}

impl<A> DerefMut for PoolGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut BlockPool<A> {
        &mut self.guard
    }
}

impl<A> PoolGuard<'_, A> {
    /// Activates a job and wakes every waiting worker.
    pub fn mark_active(&mut self, id: JobId) -> Result<bool, PoolError> {
        let listed = self.guard.mark_active(id)?;
        if listed {
            self.pool.work_ready.notify_all();
        }
        Ok(listed)
    }
}

impl<A> Pool<A> {
    pub fn new(pool: BlockPool<A>) -> Self {
        let stats = Arc::clone(pool.stats());
        Self {
            inner: Mutex::new(pool),
            work_ready: Condvar::new(),
            stats,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(BlockPool::with_capacity(capacity))
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(BlockPool::from_config(config))
    }

    pub fn lock(&self) -> PoolGuard<'_, A> {
        PoolGuard {
            guard: self.inner.lock(),
            pool: self,
        }
    }

    pub fn mark_active(&self, id: JobId) -> Result<bool, PoolError> {
        self.lock().mark_active(id)
    }

    pub fn cancel(&self, id: JobId) -> Result<bool, PoolError> {
        self.inner.lock().cancel(id)
    }

    pub fn get_next_active(&self) -> Option<JobId> {
        self.inner.lock().get_next_active()
    }

    /// Waits up to `timeout` for a job to become active and dequeues it.
    pub fn wait_next_active(&self, timeout: Duration) -> Option<JobId> {
        let deadline = Instant::now() + timeout;
        let mut pool = self.inner.lock();
        loop {
            if let Some(id) = pool.get_next_active() {
                return Some(id);
            }
            if self.work_ready.wait_until(&mut pool, deadline).timed_out() {
                return pool.get_next_active();
            }
        }
    }

    /// Waits up to `timeout` until the active list is non-empty, without
    /// dequeuing. Also returns early on [`Pool::wake_all`].
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut pool = self.inner.lock();
        if pool.active_job_count() > 0 {
            return true;
        }
        self.work_ready.wait_for(&mut pool, timeout);
        pool.active_job_count() > 0
    }

    pub fn wake_all(&self) {
        self.work_ready.notify_all();
    }

    /// Runs active jobs until the list is empty; returns how many ran.
    ///
    /// Every iteration first gives the pool one collection pass.
    pub fn run_all(&self, arg: &A) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut pool = self.inner.lock();
                pool.maintain();
                pool.take_next_active()
            };
            let Some((job, handler)) = next else {
                break;
            };
            self.stats.record_dispatch();
            trace!(%job, "dispatching job");
            handler(self, arg, job);
            ran += 1;
        }
        ran
    }

    /// Worker loop: drains the active list, then sleeps up to `idle` for more
    /// work, until `shutdown` is set.
    #[instrument(skip_all)]
    pub fn work(&self, arg: &A, shutdown: &AtomicBool, idle: Duration) -> usize {
        debug!("worker started");
        let mut ran = 0;
        while !shutdown.load(Ordering::Acquire) {
            ran += self.run_all(arg);
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            self.wait_for_work(idle);
        }
        debug!(ran, "worker stopped");
        ran
    }

    pub fn maintain(&self) -> usize {
        self.inner.lock().maintain()
    }

    pub fn stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job_handler;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn run_all_runs_each_activation_once() {
        let pool = Pool::with_capacity(8);
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let handler = job_handler(move |_: &Pool, _: &(), _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let jobs: Vec<_> = {
            let mut guard = pool.lock();
            (0..3)
                .map(|_| guard.alloc_job(Some(handler.clone())).unwrap())
                .collect()
        };
        for &job in &jobs {
            pool.mark_active(job).unwrap();
        }
        pool.mark_active(jobs[0]).unwrap();

        assert_eq!(pool.run_all(&()), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(pool.stats().jobs_dispatched(), 3);
        assert_eq!(pool.run_all(&()), 0);
    }

    #[test]
    fn handler_may_reactivate_itself() {
        let pool = Pool::with_capacity(2);
        let handler = job_handler(|pool: &Pool<usize>, limit: &usize, job| {
            if pool.stats().jobs_dispatched() < *limit {
                pool.mark_active(job).unwrap();
            }
        });
        let job = pool.lock().alloc_job(Some(handler)).unwrap();
        pool.mark_active(job).unwrap();

        assert_eq!(pool.run_all(&4), 4);
        assert_eq!(pool.lock().is_active(job), Ok(false));
    }

    #[test]
    fn cancelled_job_does_not_run() {
        let pool = Pool::with_capacity(2);
        let job = pool
            .lock()
            .alloc_job(Some(job_handler(|_: &Pool, _: &(), _| {
                panic!("cancelled job ran")
            })))
            .unwrap();
        pool.mark_active(job).unwrap();
        assert_eq!(pool.cancel(job), Ok(true));
        assert_eq!(pool.run_all(&()), 0);
    }

    #[test]
    fn wait_times_out_when_idle() {
        let pool: Pool = Pool::with_capacity(1);
        assert_eq!(pool.wait_next_active(Duration::from_millis(10)), None);
        assert!(!pool.wait_for_work(Duration::from_millis(10)));
    }

    #[test]
    fn waiting_worker_is_woken_by_activation() {
        let pool = Arc::new(Pool::with_capacity(2));
        let job = pool
            .lock()
            .alloc_job(Some(job_handler(|_: &Pool, _: &(), _| {})))
            .unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.wait_next_active(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        pool.mark_active(job).unwrap();

        assert_eq!(waiter.join().unwrap(), Some(job));
    }

    #[test]
    fn work_stops_on_shutdown() {
        let pool: Arc<Pool> = Arc::new(Pool::with_capacity(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = {
            let pool = Arc::clone(&pool);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || pool.work(&(), &shutdown, Duration::from_millis(5)))
        };
        thread::sleep(Duration::from_millis(20));
        shutdown.store(true, Ordering::Release);
        pool.wake_all();
        assert_eq!(worker.join().unwrap(), 0);
    }
}
