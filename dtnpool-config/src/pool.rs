//! Block pool and worker configuration.
//!
//! Governs the fixed arena every protocol object comes from:
//! - Slot count and recycling batch size
//! - Default subqueue depth limit for new flows
//! - Worker thread count and idle wait

use serde::{Deserialize, Deserializer, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Arena sizing and recycling behavior.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of uniform block slots, fixed at startup.
    #[validate(range(min = 1, max = 16777216))]
    #[serde(default = "default_block_count", deserialize_with = "deserialize_count")]
    pub block_count: usize,

    /// Recycled blocks returned to the free list per maintenance pass.
    #[validate(range(min = 1, max = 65536))]
    #[serde(default = "default_collect_batch")]
    pub collect_batch: usize,

    /// Depth limit applied to subqueues of newly created flows (0 = unlimited).
    #[validate(range(max = 16777216))]
    #[serde(default, deserialize_with = "deserialize_count")]
    pub default_depth_limit: usize,
}

fn default_block_count() -> usize {
    16384
}

fn default_collect_batch() -> usize {
    64
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_count: default_block_count(),
            collect_batch: default_collect_batch(),
            default_depth_limit: 0,
        }
    }
}

/// Worker threads draining the active job list.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    #[validate(range(min = 1, max = 1024))]
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// How long an idle worker sleeps before re-checking for shutdown.
    #[validate(range(min = 1, max = 60000))]
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,
}

fn default_threads() -> usize {
    num_cpus::get()
}

fn default_idle_timeout() -> u64 {
    50
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            idle_timeout_ms: default_idle_timeout(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Num(usize),
    Str(String),
}

/// Accepts plain numbers or counts with a `k`/`m` suffix (e.g. "64k").
fn deserialize_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match CountValue::deserialize(deserializer)? {
        CountValue::Num(n) => Ok(n),
        CountValue::Str(s) => validation::parse_count(&s).map_err(serde::de::Error::custom),
    }
}
