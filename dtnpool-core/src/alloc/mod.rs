//! ## dtnpool-core::alloc
//! **Fixed-capacity block pool**
//!
//! ### Key Submodules:
//! - `block`: block content variants, owned data block handles, flow/job ids
//! - `pool`: the arena itself, with deferred recycling
//! - `stats`: usage counters and serializable snapshots
//! - `links`: index-linked lists shared by the pool, subqueues and job lists

mod block;
pub(crate) mod links;
mod pool;
mod stats;

pub use block::{
    kind, Block, BlockContent, BlockKind, BlockType, BundleBlock, CanonicalBlock, FlowId, JobId,
    PrimaryBlock,
};
pub use pool::BlockPool;
pub(crate) use pool::Slot;
pub use stats::{PoolStats, StatsSnapshot};
