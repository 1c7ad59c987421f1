use serde::Serialize;

use crate::alloc::links::{Link, LinkList};
use crate::error::PoolError;

/// Which side of a flow a subqueue serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Bundles received on the flow, waiting for processing.
    Ingress,
    /// Bundles waiting for the duct to pull them for transmission.
    Egress,
}

/// FIFO of primary bundle blocks with lifetime counters.
///
/// The entries live in the pool's queue link array; this value only holds the
/// list ends and the counters, so it is cheap to copy out and write back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Subqueue {
    pub(crate) list: LinkList,
    push_count: u64,
    pull_count: u64,
    depth_limit: usize,
}

impl Subqueue {
    pub(crate) fn with_limit(depth_limit: usize) -> Self {
        Self {
            depth_limit,
            ..Self::default()
        }
    }

    /// Bundles currently queued.
    #[inline]
    pub fn depth(&self) -> usize {
        self.push_count.wrapping_sub(self.pull_count) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn push_count(&self) -> u64 {
        self.push_count
    }

    pub fn pull_count(&self) -> u64 {
        self.pull_count
    }

    /// Maximum depth, 0 for unlimited.
    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    pub(crate) fn set_depth_limit(&mut self, limit: usize) {
        self.depth_limit = limit;
    }

    /// Whether `extra` more bundles fit under the depth limit.
    #[inline]
    pub fn has_room(&self, extra: usize) -> bool {
        self.depth_limit == 0 || self.depth().saturating_add(extra) <= self.depth_limit
    }

    pub(crate) fn push(&mut self, links: &mut [Link], index: u32) -> Result<(), PoolError> {
        if !self.has_room(1) {
            return Err(PoolError::QueueFull {
                limit: self.depth_limit,
            });
        }
        self.list.push_back(links, index);
        self.push_count = self.push_count.wrapping_add(1);
        Ok(())
    }

    pub(crate) fn pull(&mut self, links: &mut [Link]) -> Option<u32> {
        let index = self.list.pop_front(links)?;
        self.pull_count = self.pull_count.wrapping_add(1);
        Some(index)
    }

    /// Splices all of `src` onto the back of `self`.
    ///
    /// All or nothing: if the whole batch does not fit under the depth limit
    /// nothing moves.
    pub(crate) fn move_from(
        &mut self,
        links: &mut [Link],
        src: &mut Subqueue,
    ) -> Result<usize, PoolError> {
        if !self.has_room(src.depth()) {
            return Err(PoolError::QueueFull {
                limit: self.depth_limit,
            });
        }
        let moved = self.list.append(links, &mut src.list);
        self.push_count = self.push_count.wrapping_add(moved as u64);
        src.pull_count = src.pull_count.wrapping_add(moved as u64);
        Ok(moved)
    }

    /// Splices every entry onto `dst`, counting them as pulled.
    pub(crate) fn drain_into(&mut self, links: &mut [Link], dst: &mut LinkList) -> usize {
        let moved = dst.append(links, &mut self.list);
        self.pull_count = self.pull_count.wrapping_add(moved as u64);
        moved
    }
}
