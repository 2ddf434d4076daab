//! Tracked allocator implementation
//!
//! Provides an allocator that tracks memory usage statistics by wrapping
//! another allocator implementation.
//!
//! # Safety
//!
//! - All unsafe operations are forwarded to the inner allocator with the
//!   same contracts
//! - Statistics live behind an `Rc`, so every clone of a tracker reports
//!   into the same counters; this is what lets a test observe the
//!   allocations a container makes through its own clone
//!
//! ## Invariants
//!
//! - Every successful allocation is counted
//! - Every deallocation adjusts the counters to match
//! - Failed allocations only bump the failure count

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;
use std::rc::Rc;

use super::{AllocResult, Allocator, Propagation};

/// Snapshot of a [`TrackedAllocator`]'s counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Bytes currently allocated
    pub allocated_bytes: usize,
    /// Highest value `allocated_bytes` has reached
    pub peak_allocated_bytes: usize,
    /// Successful allocations
    pub allocation_count: usize,
    /// Deallocations
    pub deallocation_count: usize,
    /// Failed allocation attempts
    pub failed_allocations: usize,
}

#[derive(Debug, Default)]
struct Counters {
    allocated_bytes: Cell<usize>,
    peak_allocated_bytes: Cell<usize>,
    allocation_count: Cell<usize>,
    deallocation_count: Cell<usize>,
    failed_allocations: Cell<usize>,
}

impl Counters {
    fn record_allocation(&self, size: usize) {
        let current = self.allocated_bytes.get() + size;
        self.allocated_bytes.set(current);
        if current > self.peak_allocated_bytes.get() {
            self.peak_allocated_bytes.set(current);
        }
        self.allocation_count.set(self.allocation_count.get() + 1);
    }

    fn record_deallocation(&self, size: usize) {
        self.allocated_bytes
            .set(self.allocated_bytes.get().saturating_sub(size));
        self.deallocation_count
            .set(self.deallocation_count.get() + 1);
    }

    fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes.get(),
            peak_allocated_bytes: self.peak_allocated_bytes.get(),
            allocation_count: self.allocation_count.get(),
            deallocation_count: self.deallocation_count.get(),
            failed_allocations: self.failed_allocations.get(),
        }
    }
}

/// A wrapper allocator that tracks memory usage statistics
///
/// Acts as a transparent wrapper around any other allocator. Clones share
/// the counters and inherit the inner allocator's propagation policy.
///
/// # Thread Safety
/// Single-threaded by construction (`Rc` + `Cell`), like the containers it
/// instruments.
#[derive(Debug)]
pub struct TrackedAllocator<A> {
    inner: A,
    stats: Rc<Counters>,
}

impl<A> TrackedAllocator<A> {
    /// Creates a new TrackedAllocator wrapping the provided allocator
    pub fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            stats: Rc::new(Counters::default()),
        }
    }

    /// Gets a reference to the underlying allocator
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Returns the total bytes currently allocated
    pub fn allocated_bytes(&self) -> usize {
        self.stats.allocated_bytes.get()
    }

    /// Returns the total number of allocations performed
    pub fn allocation_count(&self) -> usize {
        self.stats.allocation_count.get()
    }

    /// Returns the total number of deallocations performed
    pub fn deallocation_count(&self) -> usize {
        self.stats.deallocation_count.get()
    }

    /// Allocations not yet returned
    pub fn outstanding(&self) -> usize {
        self.allocation_count()
            .saturating_sub(self.deallocation_count())
    }

    /// Check if there are any memory leaks (allocations > deallocations)
    pub fn has_leaks(&self) -> bool {
        self.outstanding() > 0
    }

    /// Get detailed statistics snapshot
    pub fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    /// Whether two trackers report into the same counters
    pub fn shares_stats_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.stats, &other.stats)
    }
}

impl<A: Clone> Clone for TrackedAllocator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stats: Rc::clone(&self.stats),
        }
    }
}

impl<A: Default> Default for TrackedAllocator<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

// SAFETY: TrackedAllocator forwards every call to the inner allocator.
// - Layout and pointer requirements are preserved unchanged
// - Counter updates have no memory-safety impact
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    const PROPAGATION: Propagation = A::PROPAGATION;

    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarding the caller's contract to the inner allocator.
        match unsafe { self.inner.allocate(layout) } {
            Ok(ptr) => {
                self.stats.record_allocation(layout.size());
                Ok(ptr)
            }
            Err(error) => {
                self.stats
                    .failed_allocations
                    .set(self.stats.failed_allocations.get() + 1);
                Err(error)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarding the caller's contract to the inner allocator.
        unsafe { self.inner.deallocate(ptr, layout) };
        self.stats.record_deallocation(layout.size());
    }

    fn detached(&self) -> Self {
        Self::new(self.inner.detached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SystemAllocator;

    #[test]
    fn clones_share_counters() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let clone = tracked.clone();
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let ptr = clone.allocate(layout).unwrap();
            assert_eq!(tracked.allocation_count(), 1);
            assert_eq!(tracked.allocated_bytes(), 64);
            assert!(tracked.has_leaks());

            tracked.deallocate(ptr.cast(), layout);
        }

        assert_eq!(clone.deallocation_count(), 1);
        assert_eq!(clone.outstanding(), 0);
        assert_eq!(clone.stats().peak_allocated_bytes, 64);
        assert!(tracked.shares_stats_with(&clone));
    }

    #[test]
    fn detached_gets_fresh_counters() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let detached = tracked.detached();
        assert!(!tracked.shares_stats_with(&detached));
    }
}
