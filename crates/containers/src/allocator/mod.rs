//! Pluggable allocation for the containers in this crate
//!
//! Every container takes an allocator by value at construction and routes
//! all of its node, block and control-block memory through it.

use core::alloc::Layout;
use core::ptr::NonNull;

mod stack;
mod system;
mod tracked;
mod traits;

pub use crate::error::{AllocError, AllocResult};
pub use stack::{StackAllocator, StackStorage};
pub use system::SystemAllocator;
pub use tracked::{AllocatorStats, TrackedAllocator};
pub use traits::{Allocator, Propagation, TypedAllocator};

/// Aligned dangling pointer for zero-sized requests
#[inline]
pub(crate) fn dangling(layout: Layout) -> NonNull<[u8]> {
    let ptr = NonNull::new(core::ptr::without_provenance_mut::<u8>(layout.align()))
        .unwrap_or(NonNull::dangling());
    NonNull::slice_from_raw_parts(ptr, 0)
}
