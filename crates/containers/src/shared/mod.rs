//! Reference-counted owning and observing pointers
//!
//! [`SharedPtr`] owns a value jointly with its clones; [`WeakPtr`] observes
//! it without keeping it alive. Both point at a type-erased control block
//! that comes in two storage flavours:
//!
//! - **co-located**: [`SharedPtr::new`] / [`SharedPtr::new_in`] place the
//!   value inside the control block, one allocation in total
//! - **separate**: [`SharedPtr::from_box`] / [`SharedPtr::from_raw_in`]
//!   adopt an existing pointer together with a deleter, and only the
//!   control block is allocated
//!
//! The handles are single-threaded (`!Send`, `!Sync`); counts are plain
//! `Cell`s.
//!
//! # Examples
//!
//! ```
//! use nebula_containers::shared::SharedPtr;
//!
//! let owner = SharedPtr::new(String::from("payload"));
//! let observer = SharedPtr::downgrade(&owner);
//! assert_eq!(owner.use_count(), 1);
//!
//! let second = observer.lock();
//! assert_eq!(*second, "payload");
//! assert_eq!(owner.use_count(), 2);
//!
//! drop(owner);
//! drop(second);
//! assert!(observer.expired());
//! assert!(observer.lock().is_empty());
//! ```

mod block;
mod weak;

use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::allocator::{Allocator, SystemAllocator};
use crate::error::{ContainerResult, alloc_failure};

use self::block::{BoxDeleter, FnDeleter, Header, Storage};

pub use self::weak::WeakPtr;

/// Control block plus the pointer handed out by `Deref`
///
/// `value` may point anywhere inside (or outside) the block's value after
/// [`SharedPtr::map`]; it is only dereferenced while `shared > 0`.
struct Inner<T: ?Sized> {
    block: NonNull<Header>,
    value: NonNull<T>,
}

impl<T: ?Sized> Clone for Inner<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Inner<T> {}

/// Owning reference-counted pointer
///
/// An empty `SharedPtr` owns nothing and has no control block.
pub struct SharedPtr<T: ?Sized> {
    inner: Option<Inner<T>>,
    _marker: PhantomData<T>,
}

impl<T> SharedPtr<T> {
    /// Co-allocates `value` and its control block on the global allocator
    ///
    /// # Panics
    /// If the allocation fails.
    pub fn new(value: T) -> Self {
        Self::new_in(value, SystemAllocator)
    }

    /// Co-allocates `value` and its control block through `alloc`
    ///
    /// The allocator is stored in the block and used again to release it.
    ///
    /// # Panics
    /// If the allocation fails.
    pub fn new_in<A: Allocator + 'static>(value: T, alloc: A) -> Self {
        Self::try_new_in(value, alloc).unwrap_or_else(|error| alloc_failure(error))
    }

    /// Fallible form of [`new_in`](Self::new_in)
    ///
    /// On failure `value` is dropped and the error returned.
    pub fn try_new_in<A: Allocator + 'static>(value: T, alloc: A) -> ContainerResult<Self> {
        let (block, value) = block::new_inline(value, alloc)?;
        Ok(Self::from_inner(Inner { block, value }))
    }

    /// Replaces the managed value with a freshly co-allocated `value`
    pub fn reset_with(&mut self, value: T) {
        *self = Self::new(value);
    }
}

impl<T: ?Sized> SharedPtr<T> {
    /// Creates an empty handle
    pub const fn empty() -> Self {
        Self {
            inner: None,
            _marker: PhantomData,
        }
    }

    fn from_inner(inner: Inner<T>) -> Self {
        Self {
            inner: Some(inner),
            _marker: PhantomData,
        }
    }

    /// Adopts a boxed value; only the control block is allocated
    ///
    /// Works for unsized values, e.g. `Box<dyn Trait>`.
    ///
    /// # Panics
    /// If the control block cannot be allocated. The box is dropped first.
    pub fn from_box(value: Box<T>) -> Self {
        // SAFETY: the pointer came from Box::into_raw, which BoxDeleter undoes.
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        // SAFETY: as above; BoxDeleter runs exactly once, on success or failure.
        match unsafe { block::new_separate(ptr, BoxDeleter, SystemAllocator) } {
            Ok(block) => Self::from_inner(Inner { block, value: ptr }),
            Err(error) => alloc_failure(error),
        }
    }

    /// Adopts `ptr` with a custom deleter; the control block is allocated
    /// through `alloc`
    ///
    /// If the block cannot be allocated, `deleter` is run on `ptr` before
    /// the error is returned, so the pointee never leaks.
    ///
    /// # Safety
    ///
    /// - `ptr` must be valid for reads for as long as any owning handle
    ///   exists
    /// - calling `deleter(ptr)` exactly once must be sound
    pub unsafe fn from_raw_in<D, A>(ptr: NonNull<T>, deleter: D, alloc: A) -> ContainerResult<Self>
    where
        D: FnOnce(NonNull<T>) + 'static,
        A: Allocator + 'static,
    {
        // SAFETY: forwarded caller contract.
        let block = unsafe { block::new_separate(ptr, FnDeleter(deleter), alloc)? };
        Ok(Self::from_inner(Inner { block, value: ptr }))
    }

    /// Whether this handle owns nothing
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// The managed value, or `None` for an empty handle
    pub fn get(&self) -> Option<&T> {
        // SAFETY: this handle keeps shared > 0, so the value is alive.
        self.inner.map(|inner| unsafe { &*inner.value.as_ptr() })
    }

    /// Number of owning handles sharing the value, 0 when empty
    pub fn use_count(&self) -> usize {
        // SAFETY: this handle keeps the block alive.
        self.inner
            .map_or(0, |inner| unsafe { block::shared_count(inner.block) })
    }

    /// Number of weak handles observing the value, 0 when empty
    pub fn weak_count(&self) -> usize {
        // SAFETY: this handle keeps the block alive.
        self.inner
            .map_or(0, |inner| unsafe { block::weak_count(inner.block) })
    }

    /// Whether the value lives inside its control block
    pub fn is_co_allocated(&self) -> bool {
        // SAFETY: this handle keeps the block alive.
        self.inner.is_some_and(|inner| unsafe {
            block::storage(inner.block) == Storage::CoLocated
        })
    }

    /// Creates a weak handle observing the same value
    pub fn downgrade(this: &Self) -> WeakPtr<T> {
        match this.inner {
            Some(inner) => {
                // SAFETY: this handle keeps the block alive.
                unsafe { block::acquire_weak(inner.block) };
                WeakPtr::from_parts(inner.block, inner.value)
            }
            None => WeakPtr::new(),
        }
    }

    /// Moves ownership out, leaving `self` empty
    #[must_use]
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }

    /// Gives up ownership, leaving `self` empty
    pub fn reset(&mut self) {
        drop(self.take());
    }

    /// Exchanges the managed values of two handles
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Whether both handles point at the same value
    ///
    /// Two empty handles compare equal.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (this.inner, other.inner) {
            (Some(a), Some(b)) => a.value.cast::<u8>() == b.value.cast::<u8>(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Aliasing conversion that keeps sharing this control block
    ///
    /// Used to view the value as a field of it or as a trait object:
    ///
    /// ```
    /// use core::fmt::Display;
    /// use nebula_containers::shared::SharedPtr;
    ///
    /// let number = SharedPtr::new(42_u32);
    /// let shown: SharedPtr<dyn Display> = SharedPtr::map(number.clone(), |n| n as &dyn Display);
    /// assert_eq!(shown.to_string(), "42");
    /// assert_eq!(number.use_count(), 2);
    /// ```
    ///
    /// The result no longer names `T`, yet the block still drops a `T`, so
    /// `T` may not borrow anything:
    ///
    /// ```compile_fail
    /// use nebula_containers::shared::SharedPtr;
    ///
    /// struct Holder<'a> {
    ///     borrowed: &'a String,
    ///     x: u8,
    /// }
    ///
    /// let escaped = {
    ///     let owner = String::from("scoped");
    ///     let holder = SharedPtr::new(Holder { borrowed: &owner, x: 7 });
    ///     SharedPtr::map(holder, |h| &h.x)
    /// };
    /// assert_eq!(*escaped, 7);
    /// ```
    ///
    /// If `f` panics, `this` is dropped normally.
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> SharedPtr<U>
    where
        T: 'static,
    {
        let Some(inner) = this.inner else {
            return SharedPtr::empty();
        };
        // SAFETY: `this` holds a shared count for the whole call.
        let value = NonNull::from(f(unsafe { &*inner.value.as_ptr() }));
        // the shared count moves into the result
        let _this = core::mem::ManuallyDrop::new(this);
        SharedPtr::from_inner(Inner {
            block: inner.block,
            value,
        })
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner {
            // SAFETY: this handle keeps the block alive.
            unsafe { block::acquire_shared(inner.block) };
        }
        Self {
            inner: self.inner,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            // SAFETY: this handle owned one shared reference.
            unsafe { block::release_shared(inner.block) };
        }
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    /// # Panics
    /// If the handle is empty.
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty SharedPtr"),
        }
    }
}

impl<T: ?Sized> From<Box<T>> for SharedPtr<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f
                .debug_struct("SharedPtr")
                .field("value", &value)
                .field("use_count", &self.use_count())
                .field("weak_count", &self.weak_count())
                .finish(),
            None => f.write_str("SharedPtr(empty)"),
        }
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
