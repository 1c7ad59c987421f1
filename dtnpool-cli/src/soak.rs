//! Soak workload: one producer spreads bundles over flows, every flow's job
//! forwards ingress to egress and drains egress, and worker threads run the
//! jobs until every bundle was delivered or refused.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use bytes::Bytes;
use dtnpool_config::DtnPoolConfig;
use dtnpool_core::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands::SoakArgs;

const BACKOFF: Duration = Duration::from_micros(200);

#[derive(Debug, Serialize)]
pub struct SoakReport {
    pub bundles: u64,
    pub delivered: u64,
    pub refused: u64,
    /// Bundles the pool refused to take back; their blocks stay allocated.
    pub held: u64,
    pub payload_bytes: u64,
    pub workers: usize,
    pub elapsed_ms: u64,
    pub stats: StatsSnapshot,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    refused: AtomicU64,
    payload_bytes: AtomicU64,
    held: Mutex<Vec<BundleBlock>>,
}

impl Counters {
    fn settled(&self) -> u64 {
        self.delivered.load(Ordering::Acquire) + self.refused.load(Ordering::Acquire)
    }

    /// Counts a bundle the pool would not recycle as refused and keeps its block.
    fn hold(&self, rejected: Rejected<BundleBlock>) {
        warn!(error = %rejected.error, "bundle not recyclable, holding its block");
        self.held.lock().push(rejected.into_inner());
        self.refused.fetch_add(1, Ordering::AcqRel);
    }
}

/// Recycles a delivered bundle and counts it.
fn deliver(pool: &mut BlockPool, bundle: BundleBlock, counters: &Counters) {
    let size = pool.get(&bundle).map_or(0, |b| b.payload.len() as u64);
    match pool.recycle(bundle) {
        Ok(()) => {
            counters.payload_bytes.fetch_add(size, Ordering::Relaxed);
            counters.delivered.fetch_add(1, Ordering::AcqRel);
        }
        Err(rejected) => counters.hold(rejected),
    }
}

fn forward_handler(flow: FlowId, counters: Arc<Counters>) -> JobHandler<()> {
    job_handler(move |pool: &Pool, _: &(), _job| {
        let mut guard = pool.lock();
        if let Err(err) = guard.move_all((flow, Direction::Egress), (flow, Direction::Ingress)) {
            warn!(%flow, %err, "egress full, ingress left in place");
        }
        while let Ok(Some(bundle)) = guard.pull(flow, Direction::Egress) {
            deliver(&mut guard, bundle, &counters);
        }
    })
}

fn produce(pool: &Pool, flows: &[FlowId], args: &SoakArgs, counters: &Counters) {
    let mut rng = StdRng::seed_from_u64(args.seed);
    for bundle_id in 0..args.bundles {
        let flow = flows[rng.random_range(0..flows.len())];
        let size = rng.random_range(0..=args.max_payload);
        let payload = Bytes::from(vec![(bundle_id & 0xff) as u8; size]);

        loop {
            let mut guard = pool.lock();
            let Some(bundle) = guard.alloc_primary(bundle_id, payload.clone()) else {
                drop(guard);
                std::thread::sleep(BACKOFF);
                continue;
            };
            if let Err(rejected) = guard.push(flow, Direction::Ingress, bundle) {
                debug!(%flow, error = %rejected.error, "bundle refused");
                match guard.recycle(rejected.into_inner()) {
                    Ok(()) => {
                        counters.refused.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(rejected) => counters.hold(rejected),
                }
            }
            if let Err(err) = guard.mark_active(flow.job()) {
                warn!(%flow, %err, "flow job not activated");
            }
            break;
        }
    }
}

fn spawn_workers(
    pool: &Arc<Pool>,
    shutdown: &Arc<AtomicBool>,
    threads: usize,
    idle: Duration,
) -> anyhow::Result<Vec<JoinHandle<usize>>> {
    (0..threads)
        .map(|n| {
            let pool = Arc::clone(pool);
            let shutdown = Arc::clone(shutdown);
            thread::Builder::new()
                .name(format!("dtnpool-worker-{n}"))
                .spawn(move || pool.work(&(), &shutdown, idle))
                .with_context(|| format!("spawning worker {n}"))
        })
        .collect()
}

pub async fn run(config: &DtnPoolConfig, args: &SoakArgs) -> anyhow::Result<SoakReport> {
    if args.flows == 0 {
        bail!("soak needs at least one flow");
    }
    if args.flows >= config.pool.block_count {
        bail!(
            "{} flows leave no room for bundles in a pool of {} blocks",
            args.flows,
            config.pool.block_count
        );
    }

    let pool: Arc<Pool> = Arc::new(Pool::from_config(&config.pool));
    let counters = Arc::new(Counters::default());
    let flows = {
        let mut guard = pool.lock();
        let mut flows = Vec::with_capacity(args.flows);
        for _ in 0..args.flows {
            let flow = guard.create_flow().context("pool exhausted creating flows")?;
            guard.set_handler(flow.job(), Some(forward_handler(flow, Arc::clone(&counters))))?;
            flows.push(flow);
        }
        flows
    };

    let threads = config.workers.threads;
    let idle = Duration::from_millis(config.workers.idle_timeout_ms);
    info!(threads, flows = flows.len(), bundles = args.bundles, "soak started");
    let started = Instant::now();

    // Workers block until shutdown, so they get their own threads rather
    // than the runtime's bounded blocking pool.
    let shutdown = Arc::new(AtomicBool::new(false));
    let workers = match spawn_workers(&pool, &shutdown, threads, idle) {
        Ok(workers) => workers,
        Err(err) => {
            shutdown.store(true, Ordering::Release);
            pool.wake_all();
            return Err(err);
        }
    };

    let producer = {
        let pool = Arc::clone(&pool);
        let flows = flows.clone();
        let args = args.clone();
        let counters = Arc::clone(&counters);
        tokio::task::spawn_blocking(move || produce(&pool, &flows, &args, &counters))
    };
    producer.await.context("producer panicked")?;

    while counters.settled() < args.bundles {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    shutdown.store(true, Ordering::Release);
    pool.wake_all();
    tokio::task::spawn_blocking(move || {
        workers
            .into_iter()
            .try_for_each(|worker| worker.join().map(drop))
    })
    .await?
    .map_err(|_| anyhow::anyhow!("worker panicked"))?;

    {
        let mut guard = pool.lock();
        for &flow in &flows {
            guard.destroy_flow(flow)?;
        }
        while guard.maintain() > 0 {}
    }

    let elapsed = started.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "soak finished");
    let report = SoakReport {
        bundles: args.bundles,
        delivered: counters.delivered.load(Ordering::Acquire),
        refused: counters.refused.load(Ordering::Acquire),
        held: counters.held.lock().len() as u64,
        payload_bytes: counters.payload_bytes.load(Ordering::Relaxed),
        workers: threads,
        elapsed_ms: elapsed.as_millis() as u64,
        stats: pool.stats().snapshot(),
    };
    Ok(report)
}
