//! Type-erased control block shared by [`SharedPtr`](super::SharedPtr) and
//! [`WeakPtr`](super::WeakPtr)
//!
//! # Safety
//!
//! Every block starts with a `#[repr(C)]` [`Header`], so a pointer to any
//! concrete block can be cast to `NonNull<Header>` and back. The header
//! carries two monomorphized entry points that remember the concrete block
//! type (value type, deleter, allocator) after the handles have erased it.
//!
//! ## Invariants
//!
//! - The value is destroyed exactly once, when `shared` goes 1 → 0
//! - The block is released exactly once, when both counts are 0
//! - While the value is being destroyed an implicit weak reference is held,
//!   so handles dropped from inside the value's destructor never release
//!   the block early

use core::cell::Cell;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::trace;

use crate::allocator::{Allocator, TypedAllocator};
use crate::error::ContainerResult;

/// Where the managed value lives relative to its control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Storage {
    /// The block wraps an external pointer, a deleter and an allocator
    Separate,
    /// The value sits inline in the same allocation as the block
    CoLocated,
}

#[repr(C)]
pub(crate) struct Header {
    shared: Cell<usize>,
    weak: Cell<usize>,
    storage: Storage,
    drop_value: unsafe fn(NonNull<Header>),
    release: unsafe fn(NonNull<Header>),
}

impl Header {
    fn new(
        storage: Storage,
        drop_value: unsafe fn(NonNull<Header>),
        release: unsafe fn(NonNull<Header>),
    ) -> Self {
        Self {
            shared: Cell::new(1),
            weak: Cell::new(0),
            storage,
            drop_value,
            release,
        }
    }
}

/// Something that can dispose of the value behind a separate block
pub(crate) trait Deleter<T: ?Sized> {
    /// # Safety
    /// Called once, with the pointer the block was created with.
    unsafe fn delete(self, ptr: NonNull<T>);
}

/// Caller-supplied deleter closure
pub(crate) struct FnDeleter<F>(pub(crate) F);

impl<T: ?Sized, F: FnOnce(NonNull<T>)> Deleter<T> for FnDeleter<F> {
    unsafe fn delete(self, ptr: NonNull<T>) {
        (self.0)(ptr);
    }
}

/// Deleter for values adopted from a `Box`
pub(crate) struct BoxDeleter;

impl<T: ?Sized> Deleter<T> for BoxDeleter {
    unsafe fn delete(self, ptr: NonNull<T>) {
        // SAFETY: ptr came from Box::into_raw (from_box contract).
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// Block holding the value inline
#[repr(C)]
struct InlineBlock<T, A> {
    header: Header,
    alloc: A,
    value: ManuallyDrop<T>,
}

/// Block wrapping an externally allocated value
#[repr(C)]
struct SeparateBlock<T: ?Sized, D, A> {
    header: Header,
    ptr: NonNull<T>,
    deleter: ManuallyDrop<D>,
    alloc: A,
}

/// Allocates a block with `value` inline
///
/// Returns the header and a pointer to the value. On failure `value` and
/// `alloc` are dropped.
pub(crate) fn new_inline<T, A: Allocator>(
    value: T,
    alloc: A,
) -> ContainerResult<(NonNull<Header>, NonNull<T>)> {
    // SAFETY: released by release_inline::<T, A> with the same layout.
    let block = unsafe { alloc.alloc_typed::<InlineBlock<T, A>>()? };

    // SAFETY: block is freshly allocated for InlineBlock<T, A>.
    unsafe {
        block.as_ptr().write(InlineBlock {
            header: Header::new(Storage::CoLocated, drop_inline::<T, A>, release_inline::<T, A>),
            alloc,
            value: ManuallyDrop::new(value),
        });
        let value = NonNull::new_unchecked(&raw mut (*block.as_ptr()).value).cast::<T>();
        Ok((block.cast(), value))
    }
}

/// Allocates a block that adopts `ptr`
///
/// On failure the deleter is run on `ptr` before the error is returned, so
/// the value never leaks.
///
/// # Safety
/// `deleter` must be sound to call once with `ptr`, and `ptr` must stay
/// valid for reads until then.
pub(crate) unsafe fn new_separate<T: ?Sized, D: Deleter<T>, A: Allocator>(
    ptr: NonNull<T>,
    deleter: D,
    alloc: A,
) -> ContainerResult<NonNull<Header>> {
    // SAFETY: released by release_separate::<T, D, A> with the same layout.
    let block = match unsafe { alloc.alloc_typed::<SeparateBlock<T, D, A>>() } {
        Ok(block) => block,
        Err(error) => {
            // SAFETY: caller contract; the pointer is handed over exactly once.
            unsafe { deleter.delete(ptr) };
            return Err(error);
        }
    };

    // SAFETY: block is freshly allocated for SeparateBlock<T, D, A>.
    unsafe {
        block.as_ptr().write(SeparateBlock {
            header: Header::new(
                Storage::Separate,
                drop_separate::<T, D, A>,
                release_separate::<T, D, A>,
            ),
            ptr,
            deleter: ManuallyDrop::new(deleter),
            alloc,
        });
    }
    Ok(block.cast())
}

unsafe fn drop_inline<T, A>(header: NonNull<Header>) {
    let block = header.cast::<InlineBlock<T, A>>();
    // SAFETY: shared just reached 0, so nothing else can reach the value.
    unsafe { ManuallyDrop::drop(&mut (*block.as_ptr()).value) };
}

unsafe fn release_inline<T, A: Allocator>(header: NonNull<Header>) {
    let block = header.cast::<InlineBlock<T, A>>();
    // SAFETY: both counts are 0; the allocator is moved out before the
    // memory holding it is returned.
    unsafe {
        let alloc = ptr::read(&raw const (*block.as_ptr()).alloc);
        alloc.dealloc_typed(block);
    }
}

unsafe fn drop_separate<T: ?Sized, D: Deleter<T>, A>(header: NonNull<Header>) {
    let block = header.cast::<SeparateBlock<T, D, A>>();
    // SAFETY: shared just reached 0; the deleter is taken exactly once.
    unsafe {
        let deleter = ManuallyDrop::take(&mut (*block.as_ptr()).deleter);
        deleter.delete((*block.as_ptr()).ptr);
    }
}

unsafe fn release_separate<T: ?Sized, D, A: Allocator>(header: NonNull<Header>) {
    let block = header.cast::<SeparateBlock<T, D, A>>();
    // SAFETY: both counts are 0; the allocator is moved out before the
    // memory holding it is returned.
    unsafe {
        let alloc = ptr::read(&raw const (*block.as_ptr()).alloc);
        alloc.dealloc_typed(block);
    }
}

// ============================================================================
// Count manipulation
// ============================================================================

/// # Safety (all functions below)
/// `block` must point at a live header.
#[inline]
pub(crate) unsafe fn shared_count(block: NonNull<Header>) -> usize {
    // SAFETY: caller contract.
    unsafe { block.as_ref().shared.get() }
}

#[inline]
pub(crate) unsafe fn weak_count(block: NonNull<Header>) -> usize {
    // SAFETY: caller contract.
    unsafe { block.as_ref().weak.get() }
}

#[inline]
pub(crate) unsafe fn storage(block: NonNull<Header>) -> Storage {
    // SAFETY: caller contract.
    unsafe { block.as_ref().storage }
}

#[inline]
pub(crate) unsafe fn acquire_shared(block: NonNull<Header>) {
    // SAFETY: caller contract.
    let header = unsafe { block.as_ref() };
    header.shared.set(header.shared.get() + 1);
}

/// Takes a new owning reference if the value is still alive
#[inline]
pub(crate) unsafe fn try_acquire_shared(block: NonNull<Header>) -> bool {
    // SAFETY: caller contract.
    let header = unsafe { block.as_ref() };
    let shared = header.shared.get();
    if shared == 0 {
        return false;
    }
    header.shared.set(shared + 1);
    true
}

#[inline]
pub(crate) unsafe fn acquire_weak(block: NonNull<Header>) {
    // SAFETY: caller contract.
    let header = unsafe { block.as_ref() };
    header.weak.set(header.weak.get() + 1);
}

/// Drops one owning reference, destroying the value on the last one
pub(crate) unsafe fn release_shared(block: NonNull<Header>) {
    // SAFETY: caller contract.
    let header = unsafe { block.as_ref() };
    let shared = header.shared.get() - 1;
    header.shared.set(shared);
    if shared > 0 {
        return;
    }

    // implicit weak reference for the duration of the value's destructor
    header.weak.set(header.weak.get() + 1);
    let drop_value = header.drop_value;

    #[cfg(feature = "logging")]
    trace!(storage = ?header.storage, "shared count reached zero, destroying value");

    // SAFETY: shared went 1 -> 0 just now, so this is the only destruction.
    unsafe { drop_value(block) };
    // SAFETY: the implicit weak reference kept the block alive.
    unsafe { release_weak(block) };
}

/// Drops one weak reference, releasing the block when nothing refers to it
pub(crate) unsafe fn release_weak(block: NonNull<Header>) {
    // SAFETY: caller contract.
    let header = unsafe { block.as_ref() };
    let weak = header.weak.get() - 1;
    header.weak.set(weak);
    if weak > 0 || header.shared.get() > 0 {
        return;
    }

    let release = header.release;

    #[cfg(feature = "logging")]
    trace!(storage = ?header.storage, "releasing control block");

    // SAFETY: both counts are 0; nothing can reach the block any more.
    unsafe { release(block) };
}
