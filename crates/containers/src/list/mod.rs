//! Allocator-aware doubly-linked list
//!
//! # Safety
//!
//! The list is a circular ring of raw links anchored at a sentinel:
//! - The sentinel is a bare [`Link`] allocated through the list's allocator
//! - Every other link is the first field of a `#[repr(C)]` [`Node<T>`], so a
//!   `NonNull<Link>` that is not the sentinel may be cast to `NonNull<Node<T>>`
//! - Node and sentinel memory only ever comes from, and returns to, `alloc`
//!
//! ## Invariants
//!
//! - `head.next == head && head.prev == head` iff `len == 0`
//! - Walking `next` from the sentinel visits exactly `len` nodes before
//!   returning to it, and `prev` visits them in reverse
//! - References handed out point at `Node::value`, never at a `Link`, so
//!   relinking through raw pointers never aliases a live `&mut T`

mod cursor;
mod iter;

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::trace;

use crate::allocator::{Allocator, SystemAllocator, TypedAllocator};
use crate::error::{ContainerError, ContainerResult, alloc_failure};

pub use cursor::{Cursor, CursorMut};
pub use iter::{IntoIter, Iter, IterMut};

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct Link {
    next: NonNull<Link>,
    prev: NonNull<Link>,
}

#[repr(C)]
struct Node<T> {
    link: Link,
    value: T,
}

/// Doubly-linked list whose nodes are obtained from a pluggable allocator
///
/// Positional insert and erase go through [`CursorMut`]. Copies honour the
/// allocator's [`Propagation`](crate::allocator::Propagation) policy.
///
/// # Examples
///
/// ```
/// use nebula_containers::list::List;
///
/// let mut list = List::new();
/// list.push_back(2);
/// list.push_front(1);
/// list.push_back(3);
///
/// let mut cursor = list.cursor_mut_at(2);
/// cursor.insert(9);
///
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [1, 2, 9, 3]);
/// ```
pub struct List<T, A: Allocator = SystemAllocator> {
    head: NonNull<Link>,
    len: usize,
    alloc: A,
    _marker: PhantomData<Box<Node<T>>>,
}

// SAFETY: List owns its nodes exclusively, like Box<Node<T>>.
// - No shared mutable state outlives a &mut List
// - The allocator travels with the list, so it must be Send as well
unsafe impl<T: Send, A: Allocator + Send> Send for List<T, A> {}

// SAFETY: &List only exposes &T and &A.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for List<T, A> {}

impl<T> List<T> {
    /// Creates an empty list on the system allocator
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(SystemAllocator::new())
    }
}

impl<T, A: Allocator> List<T, A> {
    /// Creates an empty list whose nodes come from `alloc`
    ///
    /// # Panics
    /// If the sentinel cannot be allocated.
    pub fn new_in(alloc: A) -> Self {
        match Self::try_new_in(alloc) {
            Ok(list) => list,
            Err(error) => alloc_failure(error),
        }
    }

    /// Creates an empty list, reporting sentinel allocation failure
    pub fn try_new_in(alloc: A) -> ContainerResult<Self> {
        let dangling = Link {
            next: NonNull::dangling(),
            prev: NonNull::dangling(),
        };
        // SAFETY: the sentinel is released in Drop with dealloc_typed::<Link>.
        let head = unsafe { alloc.alloc_init(dangling)? };
        // SAFETY: head is freshly allocated and initialized.
        unsafe {
            (*head.as_ptr()).next = head;
            (*head.as_ptr()).prev = head;
        }

        Ok(Self {
            head,
            len: 0,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates a list of `count` elements produced by `f(index)`
    ///
    /// If `f` fails (or node allocation fails) the elements built so far are
    /// dropped and every node and the sentinel go back to the allocator
    /// before the error is returned. A panic in `f` unwinds the same way.
    pub fn try_from_fn_in<E, F>(count: usize, alloc: A, mut f: F) -> Result<Self, E>
    where
        E: From<ContainerError>,
        F: FnMut(usize) -> Result<T, E>,
    {
        let mut list = Self::try_new_in(alloc)?;
        for index in 0..count {
            let value = f(index)?;
            list.try_push_back(value)?;
        }
        Ok(list)
    }

    /// Creates a list of `count` default values
    pub fn with_len_in(count: usize, alloc: A) -> Self
    where
        T: Default,
    {
        match Self::try_from_fn_in::<ContainerError, _>(count, alloc, |_| Ok(T::default())) {
            Ok(list) => list,
            Err(error) => alloc_failure(error),
        }
    }

    /// Creates a list of `count` clones of `value`
    pub fn from_elem_in(count: usize, value: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        match Self::try_from_fn_in::<ContainerError, _>(count, alloc, |_| Ok(value.clone())) {
            Ok(list) => list,
            Err(error) => alloc_failure(error),
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The allocator the list draws its nodes from
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn front(&self) -> Option<&T> {
        // SAFETY: head.next is a valued node when len > 0.
        (!self.is_empty()).then(|| unsafe { Self::value_ref(self.first()) })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as in front; &mut self guarantees exclusivity.
        (!self.is_empty()).then(|| unsafe { Self::value_mut(self.first()) })
    }

    pub fn back(&self) -> Option<&T> {
        // SAFETY: head.prev is a valued node when len > 0.
        (!self.is_empty()).then(|| unsafe { Self::value_ref(self.last()) })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as in back; &mut self guarantees exclusivity.
        (!self.is_empty()).then(|| unsafe { Self::value_mut(self.last()) })
    }

    /// Appends an element
    ///
    /// # Panics
    /// If the allocator cannot provide a node.
    pub fn push_back(&mut self, value: T) {
        if let Err(error) = self.try_push_back(value) {
            alloc_failure(error);
        }
    }

    /// Prepends an element
    ///
    /// # Panics
    /// If the allocator cannot provide a node.
    pub fn push_front(&mut self, value: T) {
        if let Err(error) = self.try_push_front(value) {
            alloc_failure(error);
        }
    }

    /// Appends an element; on failure the value is dropped
    pub fn try_push_back(&mut self, value: T) -> ContainerResult<()> {
        self.link_before(self.head, value).map(|_| ())
    }

    /// Prepends an element; on failure the value is dropped
    pub fn try_push_front(&mut self, value: T) -> ContainerResult<()> {
        self.link_before(self.first(), value).map(|_| ())
    }

    pub fn pop_back(&mut self) -> Option<T> {
        // SAFETY: head.prev is a node of this list when non-empty.
        (!self.is_empty()).then(|| unsafe { self.unlink(self.last()) })
    }

    pub fn pop_front(&mut self) -> Option<T> {
        // SAFETY: head.next is a node of this list when non-empty.
        (!self.is_empty()).then(|| unsafe { self.unlink(self.first()) })
    }

    /// Drops every element and returns the nodes to the allocator
    ///
    /// The sentinel is kept, so the list stays usable.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == value)
    }

    /// Reverses the order of the elements in place by relinking
    pub fn reverse(&mut self) {
        let mut link = self.head;
        loop {
            // SAFETY: every link reachable from head is live; each is visited once.
            unsafe {
                let current = &mut *link.as_ptr();
                core::mem::swap(&mut current.next, &mut current.prev);
                link = current.prev;
            }
            if link == self.head {
                break;
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.first(), self.last(), self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.first(), self.last(), self.len)
    }

    /// Read-only cursor on the first element (the end position if empty)
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.first(), 0)
    }

    /// Read-only cursor on the last element (the end position if empty)
    pub fn cursor_back(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.last(), self.len.saturating_sub(1))
    }

    /// Read-only cursor at `index`; `index == len` is the end position
    ///
    /// # Panics
    /// If `index > len`.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, A> {
        let link = self.link_at(index);
        Cursor::new(self, link, index)
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, A> {
        let first = self.first();
        CursorMut::new(self, first, 0)
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, A> {
        let last = self.last();
        let index = self.len.saturating_sub(1);
        CursorMut::new(self, last, index)
    }

    /// Mutable cursor on the end position, where `insert` appends
    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, A> {
        let (head, len) = (self.head, self.len);
        CursorMut::new(self, head, len)
    }

    /// Mutable cursor at `index`; `index == len` is the end position
    ///
    /// # Panics
    /// If `index > len`.
    pub fn cursor_mut_at(&mut self, index: usize) -> CursorMut<'_, T, A> {
        let link = self.link_at(index);
        CursorMut::new(self, link, index)
    }

    /// Clones the list through a fallible element copier
    ///
    /// The allocator is chosen as by [`Clone::clone`]. On failure the copy
    /// built so far is released and the error returned.
    pub fn try_clone_with<E, F>(&self, mut f: F) -> Result<Self, E>
    where
        E: From<ContainerError>,
        F: FnMut(&T) -> Result<T, E>,
    {
        let mut copy = Self::try_new_in(self.copy_construction_allocator())?;
        for value in self {
            copy.try_push_back(f(value)?)?;
        }
        Ok(copy)
    }

    /// Replaces the contents with copies of `source`
    ///
    /// The allocator is chosen as by [`Clone::clone_from`]. The new ring is
    /// built completely before the old one is released, so on failure `self`
    /// is left untouched.
    pub fn try_assign_from<E, F>(&mut self, source: &Self, mut f: F) -> Result<(), E>
    where
        E: From<ContainerError>,
        F: FnMut(&T) -> Result<T, E>,
    {
        let mut fresh = Self::try_new_in(self.copy_assignment_allocator(source))?;
        for value in source {
            fresh.try_push_back(f(value)?)?;
        }
        *self = fresh;
        Ok(())
    }

    fn copy_construction_allocator(&self) -> A {
        #[cfg(feature = "logging")]
        trace!(
            propagate = A::PROPAGATION.on_copy_construction,
            "list copy: selecting allocator"
        );

        self.alloc.select_on_copy_construction()
    }

    fn copy_assignment_allocator(&self, source: &Self) -> A {
        #[cfg(feature = "logging")]
        trace!(
            propagate = A::PROPAGATION.on_copy_assignment,
            "list assignment: selecting allocator"
        );

        self.alloc.select_on_copy_assignment(&source.alloc)
    }

    #[inline]
    fn first(&self) -> NonNull<Link> {
        // SAFETY: head is live for the whole lifetime of the list.
        unsafe { (*self.head.as_ptr()).next }
    }

    #[inline]
    fn last(&self) -> NonNull<Link> {
        // SAFETY: head is live for the whole lifetime of the list.
        unsafe { (*self.head.as_ptr()).prev }
    }

    fn link_at(&self, index: usize) -> NonNull<Link> {
        assert!(
            index <= self.len,
            "cursor index {index} out of bounds for list of length {}",
            self.len
        );

        // SAFETY: walking at most len links from head stays on the ring.
        unsafe {
            if index <= self.len / 2 {
                let mut link = self.first();
                for _ in 0..index {
                    link = (*link.as_ptr()).next;
                }
                link
            } else {
                let mut link = self.head;
                for _ in index..self.len {
                    link = (*link.as_ptr()).prev;
                }
                link
            }
        }
    }

    /// Allocates a node holding `value` and links it in front of `next`
    fn link_before(&mut self, next: NonNull<Link>, value: T) -> ContainerResult<NonNull<Link>> {
        // SAFETY: next is the sentinel or a node of this list, so next.prev
        // is live too. The node is freed in unlink via dealloc_typed::<Node<T>>.
        unsafe {
            let prev = (*next.as_ptr()).prev;
            let node = self.alloc.alloc_init(Node {
                link: Link { next, prev },
                value,
            })?;
            let link = node.cast::<Link>();
            (*prev.as_ptr()).next = link;
            (*next.as_ptr()).prev = link;
            self.len += 1;
            Ok(link)
        }
    }

    /// Unlinks a node, moves its value out and frees the node
    ///
    /// # Safety
    /// `link` must be a valued node of this list (never the sentinel).
    unsafe fn unlink(&mut self, link: NonNull<Link>) -> T {
        // SAFETY: link is a live Node<T> of this list (caller contract).
        unsafe {
            let Link { next, prev } = *link.as_ptr();
            (*prev.as_ptr()).next = next;
            (*next.as_ptr()).prev = prev;
            self.len -= 1;

            let node = link.cast::<Node<T>>();
            let value = ptr::read(&raw const (*node.as_ptr()).value);
            self.alloc.dealloc_typed(node);
            value
        }
    }

    /// # Safety
    /// `link` must be a valued node that outlives `'a`.
    #[inline]
    unsafe fn value_ref<'a>(link: NonNull<Link>) -> &'a T {
        // SAFETY: caller contract.
        unsafe { &(*link.cast::<Node<T>>().as_ptr()).value }
    }

    /// # Safety
    /// `link` must be a valued node that outlives `'a`, with no other live
    /// reference to its value.
    #[inline]
    unsafe fn value_mut<'a>(link: NonNull<Link>) -> &'a mut T {
        // SAFETY: caller contract.
        unsafe { &mut (*link.cast::<Node<T>>().as_ptr()).value }
    }
}

impl<T, A: Allocator> Drop for List<T, A> {
    fn drop(&mut self) {
        // Finishes the teardown if an element destructor panics.
        struct DropGuard<'a, T, A: Allocator>(&'a mut List<T, A>);

        impl<T, A: Allocator> Drop for DropGuard<'_, T, A> {
            fn drop(&mut self) {
                self.0.clear();
                // SAFETY: the sentinel came from alloc_init::<Link> in try_new_in.
                unsafe { self.0.alloc.dealloc_typed(self.0.head) };
            }
        }

        let guard = DropGuard(self);
        while let Some(value) = guard.0.pop_front() {
            drop(value);
        }
    }
}

impl<T: Clone, A: Allocator> Clone for List<T, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::new_in(self.copy_construction_allocator());
        copy.extend(self.iter().cloned());
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        let mut fresh = Self::new_in(self.copy_assignment_allocator(source));
        fresh.extend(source.iter().cloned());
        *self = fresh;
    }
}

impl<T, A: Allocator + Default> Default for List<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<List<T, B>> for List<T, A> {
    fn eq(&self, other: &List<T, B>) -> bool {
        self.len == other.len && self.iter().eq(other)
    }
}

impl<T: Eq, A: Allocator> Eq for List<T, A> {}

impl<T: Hash, A: Allocator> Hash for List<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for value in self {
            value.hash(state);
        }
    }
}

impl<T, A: Allocator> Extend<T> for List<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for List<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, A: Allocator + Default> FromIterator<T> for List<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::default();
        list.extend(iter);
        list
    }
}

impl<T, A: Allocator> IntoIterator for List<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut List<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
