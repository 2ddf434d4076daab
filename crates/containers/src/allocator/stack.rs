//! Fixed-capacity arena over a caller-owned buffer
//!
//! # Safety
//!
//! - The buffer lives inside `StackStorage` behind an `UnsafeCell`
//! - A `Cell` cursor hands out disjoint ranges; it never moves backwards
//! - `StackAllocator<'a, N>` borrows the storage, so nothing allocated from
//!   it can outlive the buffer
//!
//! ## Invariants
//!
//! - All returned pointers lie within `[base, base + N)`
//! - Returned addresses are aligned to the requested alignment
//! - `deallocate` never reclaims anything; memory is released when the
//!   storage itself goes away
//!
//! ## Thread Safety
//!
//! None. The cursor is a plain `Cell`, so neither type is `Sync`.

use core::alloc::Layout;
use core::cell::{Cell, UnsafeCell};
use core::fmt;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use super::{AllocError, AllocResult, Allocator, dangling};
use crate::config::StackConfig;

/// Fixed `N`-byte arena buffer with a bump cursor
///
/// The buffer is aligned like `max_align_t` (16 bytes), so requests up to
/// that alignment never waste padding at the start.
///
/// # Memory Layout
/// ```text
/// [base]----[alloc1]--[pad]--[alloc2]----[cursor]---------[base + N]
///           <-------- handed out -------->  <-- available -->
/// ```
#[repr(C, align(16))]
pub struct StackStorage<const N: usize> {
    buffer: UnsafeCell<[MaybeUninit<u8>; N]>,
    cursor: Cell<usize>,
    config: StackConfig,
    allocation_count: Cell<usize>,
    peak_usage: Cell<usize>,
}

impl<const N: usize> StackStorage<N> {
    /// Creates storage with the default configuration
    ///
    /// The value lives wherever it is placed; for multi-megabyte arenas use
    /// [`boxed`](Self::boxed) so the buffer never touches the call stack.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StackConfig::default())
    }

    /// Creates storage with a custom configuration
    #[must_use]
    pub fn with_config(config: StackConfig) -> Self {
        Self {
            buffer: UnsafeCell::new([MaybeUninit::uninit(); N]),
            cursor: Cell::new(0),
            config,
            allocation_count: Cell::new(0),
            peak_usage: Cell::new(0),
        }
    }

    /// Creates heap-placed storage with the default configuration
    #[must_use]
    pub fn boxed() -> Box<Self> {
        Self::boxed_with_config(StackConfig::default())
    }

    /// Creates heap-placed storage without building the buffer on the stack
    #[must_use]
    pub fn boxed_with_config(config: StackConfig) -> Box<Self> {
        let mut storage = Box::<Self>::new_uninit();
        let raw = storage.as_mut_ptr();

        // SAFETY: Initializing every field except the buffer in place.
        // - raw points to a live, properly aligned allocation for Self
        // - the buffer is MaybeUninit<u8> and needs no initialization
        // - every other field is written exactly once before assume_init
        unsafe {
            ptr::addr_of_mut!((*raw).cursor).write(Cell::new(0));
            ptr::addr_of_mut!((*raw).config).write(config);
            ptr::addr_of_mut!((*raw).allocation_count).write(Cell::new(0));
            ptr::addr_of_mut!((*raw).peak_usage).write(Cell::new(0));
            storage.assume_init()
        }
    }

    /// Total capacity in bytes
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes consumed so far, including alignment padding
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes still available for allocation
    #[inline]
    pub fn available(&self) -> usize {
        N - self.cursor.get()
    }

    /// Number of allocations served (0 unless `track_stats` is set)
    pub fn allocation_count(&self) -> usize {
        self.allocation_count.get()
    }

    /// Highest cursor position observed (0 unless `track_stats` is set)
    pub fn peak_usage(&self) -> usize {
        self.peak_usage.get()
    }

    /// Configuration this storage was built with
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Whether `ptr` points into this storage's buffer
    pub fn contains(&self, ptr: *const u8) -> bool {
        let base = self.base() as usize;
        let addr = ptr as usize;
        addr >= base && addr < base + N
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        self.buffer.get().cast::<u8>()
    }

    /// Bumps the cursor past padding and `size` bytes
    ///
    /// Padding is computed on the absolute address, so the result is aligned
    /// for any power-of-two `align` regardless of the buffer's own alignment.
    ///
    /// # Errors
    /// - `InvalidLayout` if `align` is not a power of two
    /// - `ArenaExhausted` if the request does not fit; the cursor is left
    ///   untouched
    pub fn allocate(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        if !align.is_power_of_two() {
            return Err(AllocError::invalid_layout("alignment must be a power of two"));
        }

        let base = self.base();
        let cursor = self.cursor.get();
        let current = base as usize + cursor;
        let padding = current.wrapping_neg() & (align - 1);

        let offset = cursor
            .checked_add(padding)
            .filter(|offset| *offset <= N)
            .ok_or_else(|| AllocError::arena_exhausted(size, self.available(), N))?;
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= N)
            .ok_or_else(|| AllocError::arena_exhausted(size, self.available(), N))?;

        // SAFETY: offset <= N, so the result stays within (or one past) the buffer.
        let ptr = unsafe { base.add(offset) };

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: [offset, end) is inside the buffer and was never handed out.
            unsafe { ptr::write_bytes(ptr, pattern, size) };
        }

        self.cursor.set(end);
        if self.config.track_stats {
            self.allocation_count.set(self.allocation_count.get() + 1);
            self.peak_usage.set(self.peak_usage.get().max(end));
        }

        NonNull::new(ptr).ok_or_else(|| AllocError::allocation_failed(size, align))
    }

    /// Individual allocations are never reclaimed
    #[inline]
    pub fn deallocate(&self, _ptr: NonNull<u8>, _size: usize) {}
}

impl<const N: usize> Default for StackStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for StackStorage<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackStorage")
            .field("capacity", &N)
            .field("used", &self.used())
            .field("config", &self.config)
            .finish()
    }
}

/// Allocator handle bound to a [`StackStorage`]
///
/// Cheap to copy; every copy (and every [`rebind`](Self::rebind)) draws
/// from the same buffer.
pub struct StackAllocator<'a, const N: usize> {
    storage: &'a StackStorage<N>,
}

impl<'a, const N: usize> StackAllocator<'a, N> {
    /// Binds an allocator to `storage`
    pub const fn new(storage: &'a StackStorage<N>) -> Self {
        Self { storage }
    }

    /// The storage this allocator draws from
    pub fn storage(&self) -> &'a StackStorage<N> {
        self.storage
    }

    /// Allocator for another value type over the same buffer
    ///
    /// The interface is byte-level, so the handle itself is unchanged;
    /// this exists so that code converting between element types says so.
    #[must_use]
    pub fn rebind(&self) -> Self {
        *self
    }
}

impl<const N: usize> Clone for StackAllocator<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const N: usize> Copy for StackAllocator<'_, N> {}

impl<const N: usize> PartialEq for StackAllocator<'_, N> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.storage, other.storage)
    }
}

impl<const N: usize> Eq for StackAllocator<'_, N> {}

impl<const N: usize> fmt::Debug for StackAllocator<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackAllocator")
            .field("storage", &ptr::from_ref(self.storage))
            .field("used", &self.storage.used())
            .field("capacity", &N)
            .finish()
    }
}

impl<'a, const N: usize> From<&'a StackStorage<N>> for StackAllocator<'a, N> {
    fn from(storage: &'a StackStorage<N>) -> Self {
        Self::new(storage)
    }
}

// SAFETY: StackAllocator forwards to StackStorage::allocate.
// - Ranges come from a monotonic cursor and never overlap
// - Pointers are aligned to layout.align() (absolute-address padding)
// - The 'a borrow keeps the buffer alive for every pointer handed out
// - deallocate is a no-op, so freeing through any copy is sound
unsafe impl<const N: usize> Allocator for StackAllocator<'_, N> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }

        let ptr = self.storage.allocate(layout.size(), layout.align())?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.storage.deallocate(ptr, layout.size());
    }
}
