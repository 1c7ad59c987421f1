use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dtnpool_core::prelude::*;

const JOBS: usize = 200;
const WORKERS: usize = 4;

fn spawn_workers<A: Send + Sync + Default + 'static>(
    pool: &Arc<Pool<A>>,
    shutdown: &Arc<AtomicBool>,
) -> Vec<thread::JoinHandle<usize>> {
    (0..WORKERS)
        .map(|_| {
            let pool = Arc::clone(pool);
            let shutdown = Arc::clone(shutdown);
            thread::spawn(move || pool.work(&A::default(), &shutdown, Duration::from_millis(5)))
        })
        .collect()
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() {
        assert!(start.elapsed() < deadline, "timed out waiting for workers");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn every_activation_runs_exactly_once_across_workers() {
    let pool: Arc<Pool> = Arc::new(Pool::with_capacity(JOBS));
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..JOBS).map(|_| AtomicUsize::new(0)).collect());

    let jobs: Vec<JobId> = {
        let mut guard = pool.lock();
        (0..JOBS)
            .map(|_| {
                let runs = Arc::clone(&runs);
                let handler = job_handler(move |_: &Pool, _: &(), job: JobId| {
                    runs[job.index() as usize].fetch_add(1, Ordering::SeqCst);
                });
                guard.alloc_job(Some(handler)).expect("pool sized for every job")
            })
            .collect()
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let workers = spawn_workers(&pool, &shutdown);
    for &job in &jobs {
        assert_eq!(pool.mark_active(job), Ok(true));
    }

    wait_until(Duration::from_secs(10), || {
        pool.stats().jobs_dispatched() == JOBS
    });
    shutdown.store(true, Ordering::Release);
    pool.wake_all();

    let ran: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(ran, JOBS);
    assert!(runs.iter().all(|r| r.load(Ordering::SeqCst) == 1));
}

#[test]
fn flow_handlers_drain_ingress_to_egress() {
    const BUNDLES: u64 = 64;

    let pool: Arc<Pool> = Arc::new(Pool::with_capacity(BUNDLES as usize + 8));
    let flow = pool.lock().create_flow().unwrap();
    let forwarded = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&forwarded);
    let handler = job_handler(move |pool: &Pool, _: &(), _job| {
        let mut guard = pool.lock();
        let moved = guard
            .move_all((flow, Direction::Egress), (flow, Direction::Ingress))
            .unwrap();
        while let Some(bundle) = guard.pull(flow, Direction::Egress).unwrap() {
            guard.recycle(bundle).unwrap();
        }
        counter.fetch_add(moved, Ordering::SeqCst);
    });
    pool.lock().set_handler(flow.job(), Some(handler)).unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let workers = spawn_workers(&pool, &shutdown);

    for id in 0..BUNDLES {
        let mut guard = pool.lock();
        let bundle = guard.alloc_primary(id, Bytes::new()).unwrap();
        guard.push(flow, Direction::Ingress, bundle).unwrap();
        guard.mark_active(flow.job()).unwrap();
    }

    wait_until(Duration::from_secs(10), || {
        forwarded.load(Ordering::SeqCst) == BUNDLES as usize
    });
    shutdown.store(true, Ordering::Release);
    pool.wake_all();
    for worker in workers {
        worker.join().unwrap();
    }

    let guard = pool.lock();
    let ingress = guard.subqueue(flow, Direction::Ingress).unwrap();
    let egress = guard.subqueue(flow, Direction::Egress).unwrap();
    assert_eq!(ingress.push_count(), BUNDLES);
    assert_eq!(egress.pull_count(), BUNDLES);
    assert_eq!(guard.in_use_count(), 1);
}
