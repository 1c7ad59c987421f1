//! # dtnpool-core
//!
//! Block memory pool and intrusive indexing/scheduling layer underneath a DTN
//! Bundle Protocol stack. Every transient protocol object (bundle blocks,
//! per-interface flow state, schedulable jobs) lives in one fixed-capacity
//! pool and is recycled without touching the general-purpose allocator on the
//! hot path.
//!
//! ### Key Submodules:
//! - `tree`: intrusive red-black tree keyed on 63-bit integers
//! - `alloc`: the type-tagged block pool and its handles
//! - `flow`: ingress/egress subqueues with O(1) splice and discard
//! - `jobs`: active job list served to workers in activation order
//! - `shared`: the locked, thread-shared [`Pool`] and the worker loop
//!
//! ```
//! use bytes::Bytes;
//! use dtnpool_core::prelude::*;
//!
//! let mut pool: BlockPool = BlockPool::with_capacity(16);
//! let flow = pool.create_flow().unwrap();
//! let bundle = pool.alloc_primary(7, Bytes::from_static(b"hello")).unwrap();
//! pool.push(flow, Direction::Egress, bundle).unwrap();
//!
//! let bundle = pool.pull(flow, Direction::Egress).unwrap().unwrap();
//! assert_eq!(pool.get(&bundle).unwrap().bundle_id, 7);
//! pool.recycle(bundle).unwrap();
//! ```

pub mod alloc;
pub mod error;
pub mod flow;
pub mod jobs;
pub mod shared;
pub mod tree;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::error::*;
    pub use crate::flow::*;
    pub use crate::jobs::*;
    pub use crate::shared::*;
    pub use crate::tree::*;
}

pub use error::{PoolError, Rejected, TreeError};
pub use shared::{Pool, PoolGuard};
