//! Article id allocation.
//!
//! The coordinator owns the only allocator in the cluster; peers that need
//! an id (read-your-writes writes on a non-coordinator) request one over
//! the wire. Ids start at 1 and are never reused; an id whose write later
//! fails stays a permanent gap in the sequence.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next id. Strictly increasing across all callers.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new()
    }
}
