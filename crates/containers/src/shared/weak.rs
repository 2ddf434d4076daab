use core::fmt;
use core::ptr::NonNull;

use super::block::{self, Header};
use super::{Inner, SharedPtr};

/// Non-owning observer of a [`SharedPtr`]'s value
///
/// Keeps the control block alive but not the value. Use
/// [`lock`](Self::lock) or [`upgrade`](Self::upgrade) to get an owning
/// handle back while the value still exists.
///
/// A weak view of a part of the value, or of the value as a trait object,
/// goes through [`SharedPtr::map`] and then [`SharedPtr::downgrade`]:
///
/// ```
/// use nebula_containers::shared::{SharedPtr, WeakPtr};
///
/// let pair = SharedPtr::new((7_u32, String::from("label")));
/// let label: WeakPtr<String> = SharedPtr::downgrade(&SharedPtr::map(pair.clone(), |p| &p.1));
/// assert_eq!(*label.lock(), "label");
///
/// drop(pair);
/// assert!(label.expired());
/// ```
pub struct WeakPtr<T: ?Sized> {
    inner: Option<Inner<T>>,
}

impl<T: ?Sized> WeakPtr<T> {
    /// Creates an empty weak handle that never locks
    pub const fn new() -> Self {
        Self { inner: None }
    }

    /// Takes ownership of an already counted weak reference
    pub(super) fn from_parts(block: NonNull<Header>, value: NonNull<T>) -> Self {
        Self {
            inner: Some(Inner { block, value }),
        }
    }

    /// Number of owning handles, 0 when empty or expired
    pub fn use_count(&self) -> usize {
        // SAFETY: a weak handle keeps the block alive.
        self.inner
            .map_or(0, |inner| unsafe { block::shared_count(inner.block) })
    }

    /// Number of weak handles on this block, 0 when empty
    pub fn weak_count(&self) -> usize {
        // SAFETY: a weak handle keeps the block alive.
        self.inner
            .map_or(0, |inner| unsafe { block::weak_count(inner.block) })
    }

    /// Whether the value is gone (or was never there)
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Owning handle to the value, or `None` if it has been destroyed
    pub fn upgrade(&self) -> Option<SharedPtr<T>> {
        let inner = self.inner?;
        // SAFETY: a weak handle keeps the block alive.
        if unsafe { block::try_acquire_shared(inner.block) } {
            Some(SharedPtr::from_inner(inner))
        } else {
            None
        }
    }

    /// Owning handle to the value, empty if it has been destroyed
    pub fn lock(&self) -> SharedPtr<T> {
        self.upgrade().unwrap_or_default()
    }

    /// Stops observing, leaving `self` empty
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Exchanges the observed values of two handles
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Whether both handles observe the same value
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (this.inner, other.inner) {
            (Some(a), Some(b)) => a.value.cast::<u8>() == b.value.cast::<u8>(),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for WeakPtr<T> {
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner {
            // SAFETY: this handle keeps the block alive.
            unsafe { block::acquire_weak(inner.block) };
        }
        Self { inner: self.inner }
    }
}

impl<T: ?Sized> Drop for WeakPtr<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            // SAFETY: this handle owned one weak reference.
            unsafe { block::release_weak(inner.block) };
        }
    }
}

impl<T: ?Sized> Default for WeakPtr<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPtr")
            .field("use_count", &self.use_count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}
