//! Allocator traits used by every container in this crate
//!
//! The system is built around two traits:
//! - `Allocator`: byte-level allocation/deallocation plus the propagation
//!   policy containers consult when they are copied
//! - `TypedAllocator`: typed helpers layered on top of any `Allocator`
//!
//! # Safety
//!
//! ## Trait Safety Contracts
//!
//! - **Allocator**: Returned pointers must be valid, aligned, and must not
//!   overlap any other live allocation from the same allocator (or any of
//!   its clones)
//! - **TypedAllocator**: Safe trait, unsafe methods; callers uphold the
//!   initialization and matching-deallocation rules
//!
//! ## Clones share state
//!
//! Containers keep one allocator value and hand clones of it to the code
//! that allocates on their behalf (nodes, control blocks). A clone must be able
//! to deallocate memory obtained through any other clone of the same value.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Validation of layout parameters
#[inline]
fn validate_layout(layout: Layout) -> AllocResult<()> {
    if !layout.align().is_power_of_two() {
        return Err(AllocError::invalid_layout("alignment must be a power of two"));
    }

    if layout.size() > isize::MAX as usize - (layout.align() - 1) {
        return Err(AllocError::size_overflow("layout padding"));
    }

    Ok(())
}

/// How an allocator travels with the container that owns it when the
/// container is copied.
///
/// This is an explicit per-type flag pair rather than something inferred:
/// each [`Allocator`] implementation states it in
/// [`Allocator::PROPAGATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Propagation {
    /// A copy-constructed container (`Clone::clone`) takes a clone of the
    /// source container's allocator. When `false` it starts from
    /// [`Allocator::detached`] instead.
    pub on_copy_construction: bool,

    /// A copy-assigned container (`Clone::clone_from`) adopts the source
    /// container's allocator before copying elements. When `false` it keeps
    /// its own.
    pub on_copy_assignment: bool,
}

impl Propagation {
    /// Copies share the allocator, assignment keeps the destination's.
    ///
    /// This is the default and matches allocators that are handles onto
    /// shared state (arena references, the global heap).
    pub const SHARED: Self = Self {
        on_copy_construction: true,
        on_copy_assignment: false,
    };

    /// The allocator follows its container everywhere
    pub const ALWAYS: Self = Self {
        on_copy_construction: true,
        on_copy_assignment: true,
    };

    /// Every container keeps a private allocator
    pub const NEVER: Self = Self {
        on_copy_construction: false,
        on_copy_assignment: false,
    };
}

impl Default for Propagation {
    fn default() -> Self {
        Self::SHARED
    }
}

/// Byte-level allocator interface
///
/// Containers never call the global allocator directly: every node, block,
/// map and control block they own is obtained through this trait.
///
/// # Safety
///
/// Implementors must ensure that:
/// - Returned pointers are valid for reads and writes of `layout.size()`
///   bytes and aligned to `layout.align()`
/// - Live allocations never overlap
/// - Memory from one clone may be deallocated through any other clone
pub unsafe trait Allocator: Clone {
    /// Copy propagation policy for containers using this allocator
    const PROPAGATION: Propagation = Propagation::SHARED;

    /// Allocates memory with the given layout
    ///
    /// # Safety
    /// - Memory content is uninitialized and must be initialized before use
    /// - Zero-sized layouts may return a dangling, well-aligned pointer
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator (or a clone)
    /// - `layout` must match the original allocation layout exactly
    /// - After this call, `ptr` becomes invalid and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// The allocator a copied container starts with when
    /// [`Propagation::on_copy_construction`] is `false`.
    ///
    /// This is the equivalent of a default-constructed allocator. Stateless
    /// allocators can keep the provided clone.
    fn detached(&self) -> Self {
        self.clone()
    }

    /// Allocator for a container copy-constructed from one that uses `self`
    fn select_on_copy_construction(&self) -> Self {
        if Self::PROPAGATION.on_copy_construction {
            self.clone()
        } else {
            self.detached()
        }
    }

    /// Allocator a container using `self` keeps after being copy-assigned
    /// from a container using `source`
    fn select_on_copy_assignment(&self, source: &Self) -> Self {
        if Self::PROPAGATION.on_copy_assignment {
            source.clone()
        } else {
            self.clone()
        }
    }
}

/// Typed allocation helpers available on every [`Allocator`]
///
/// Because the underlying interface is byte-level, "rebinding" an allocator
/// to another value type is simply calling these methods with another `T`:
/// the same allocator value serves list nodes, sentinels, deque blocks and
/// control blocks alike.
pub trait TypedAllocator: Allocator {
    /// Allocates memory for a single instance of type `T`
    ///
    /// # Safety
    /// The caller must initialize the memory before reading from it,
    /// and must deallocate it with `dealloc_typed::<T>()` when done.
    #[inline]
    unsafe fn alloc_typed<T>(&self) -> AllocResult<NonNull<T>> {
        let layout = Layout::new::<T>();
        validate_layout(layout)?;
        // SAFETY: layout derived from T; allocate returns a valid pointer or error.
        let ptr = unsafe { self.allocate(layout)? };
        Ok(ptr.cast::<T>())
    }

    /// Allocates and initializes memory for a single instance of type `T`
    ///
    /// On allocation failure `value` is dropped and the error returned.
    ///
    /// # Safety
    /// The caller must drop the value and deallocate with
    /// `dealloc_typed::<T>()` when done.
    #[inline]
    unsafe fn alloc_init<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        // SAFETY: forwarding the caller's contract.
        let ptr = unsafe { self.alloc_typed::<T>()? };
        // SAFETY: ptr is freshly allocated, aligned and valid for writes of T.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates memory for an array of `count` instances of type `T`
    ///
    /// # Safety
    /// - Caller must initialize elements before reading them
    /// - Must deallocate with `dealloc_array::<T>()` passing the same count
    #[inline]
    unsafe fn alloc_array<T>(&self, count: usize) -> AllocResult<NonNull<T>> {
        if count == 0 {
            return Ok(NonNull::dangling());
        }

        let layout =
            Layout::array::<T>(count).map_err(|_| AllocError::size_overflow("array layout"))?;
        validate_layout(layout)?;
        // SAFETY: layout is valid and non-empty (count > 0).
        let ptr = unsafe { self.allocate(layout)? };
        Ok(ptr.cast::<T>())
    }

    /// Deallocates memory for a single instance of type `T`
    ///
    /// # Safety
    /// - `ptr` must have been allocated by `alloc_typed::<T>()` or `alloc_init::<T>()`
    /// - If `T` has a destructor, caller must run it before deallocation
    #[inline]
    unsafe fn dealloc_typed<T>(&self, ptr: NonNull<T>) {
        // SAFETY: layout matches the one used by alloc_typed (caller contract).
        unsafe { self.deallocate(ptr.cast(), Layout::new::<T>()) }
    }

    /// Deallocates memory for an array of type `T`
    ///
    /// # Safety
    /// - `ptr` must have been allocated by `alloc_array::<T>()` with same `count`
    /// - Element destructors must already have run
    #[inline]
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, count: usize) {
        if count == 0 {
            return;
        }
        // alloc_array succeeded with this count, so the layout is valid.
        if let Ok(layout) = Layout::array::<T>(count) {
            // SAFETY: ptr/count match the original allocation (caller contract).
            unsafe { self.deallocate(ptr.cast(), layout) }
        }
    }
}

impl<A: Allocator> TypedAllocator for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SystemAllocator;

    #[test]
    fn typed_round_trip() {
        let alloc = SystemAllocator::new();
        unsafe {
            let ptr = alloc.alloc_init(String::from("node")).unwrap();
            assert_eq!(ptr.as_ref(), "node");
            core::ptr::drop_in_place(ptr.as_ptr());
            alloc.dealloc_typed(ptr);
        }
    }

    #[test]
    fn array_of_zero_is_dangling() {
        let alloc = SystemAllocator::new();
        unsafe {
            let ptr = alloc.alloc_array::<u64>(0).unwrap();
            assert_eq!(ptr, NonNull::dangling());
            alloc.dealloc_array(ptr, 0);
        }
    }

    #[test]
    fn oversized_array_is_rejected() {
        let alloc = SystemAllocator::new();
        let err = unsafe { alloc.alloc_array::<u64>(usize::MAX) }.unwrap_err();
        assert_eq!(err.code(), "CONTAINER:ALLOC:OVERFLOW");
    }

    #[test]
    fn propagation_presets() {
        assert_eq!(Propagation::default(), Propagation::SHARED);
        assert!(Propagation::ALWAYS.on_copy_assignment);
        assert!(!Propagation::NEVER.on_copy_construction);
        assert_eq!(
            <SystemAllocator as Allocator>::PROPAGATION,
            Propagation::SHARED
        );
    }
}
