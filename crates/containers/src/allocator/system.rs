//! System allocator implementation
//!
//! Provides an allocator that wraps the system's default memory allocator.
//! It is the default allocator parameter of every container in this crate.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

use super::{AllocError, AllocResult, Allocator, dangling};

/// Wrapper for the system's default allocator
///
/// Stateless: every instance can free memory obtained by any other, so the
/// default [`Propagation::SHARED`](super::Propagation::SHARED) policy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

// SAFETY: SystemAllocator forwards to `std::alloc::System`.
// - System returns aligned, exclusive memory or null
// - Null is reported as an error, never handed out
// - Zero-sized requests get an aligned dangling pointer and are never freed
unsafe impl Allocator for SystemAllocator {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }

        // SAFETY: layout has non-zero size (checked above).
        let ptr = unsafe { System.alloc(layout) };

        match NonNull::new(ptr) {
            Some(non_null) => Ok(NonNull::slice_from_raw_parts(non_null, layout.size())),
            None => Err(AllocError::allocation_failed_with_layout(layout)),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY: ptr came from System.alloc with this layout (caller contract).
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }
}
