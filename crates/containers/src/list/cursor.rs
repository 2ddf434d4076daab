//! Positions inside a [`List`]
//!
//! A cursor sits on an element or on the end position (the sentinel),
//! which is where the ring wraps. Moving past either end lands on the end
//! position; moving again wraps to the other end.

use core::fmt;
use core::ptr::NonNull;

use super::{Link, List};
use crate::allocator::Allocator;
use crate::error::{ContainerResult, alloc_failure};

/// Read-only position in a [`List`]
///
/// Holds a relation to a node, never ownership of it. Cheap to copy.
pub struct Cursor<'a, T, A: Allocator> {
    list: &'a List<T, A>,
    current: NonNull<Link>,
    index: usize,
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    pub(super) fn new(list: &'a List<T, A>, current: NonNull<Link>, index: usize) -> Self {
        Self {
            list,
            current,
            index,
        }
    }

    /// Index of the current element, `None` at the end position
    pub fn index(&self) -> Option<usize> {
        (!self.is_end()).then_some(self.index)
    }

    /// Whether the cursor sits on the end position
    pub fn is_end(&self) -> bool {
        self.current == self.list.head
    }

    /// The element under the cursor
    pub fn current(&self) -> Option<&'a T> {
        // SAFETY: not the sentinel, so a valued node borrowed for 'a.
        (!self.is_end()).then(|| unsafe { List::<T, A>::value_ref(self.current) })
    }

    pub fn move_next(&mut self) {
        // SAFETY: current is a live link of the borrowed list.
        self.current = unsafe { (*self.current.as_ptr()).next };
        self.index = if self.current == self.list.head {
            self.list.len
        } else if self.index == self.list.len {
            0
        } else {
            self.index + 1
        };
    }

    pub fn move_prev(&mut self) {
        // SAFETY: current is a live link of the borrowed list.
        self.current = unsafe { (*self.current.as_ptr()).prev };
        self.index = if self.current == self.list.head {
            self.list.len
        } else if self.index == 0 {
            self.list.len - 1
        } else {
            self.index - 1
        };
    }

    /// The element after the current one
    pub fn peek_next(&self) -> Option<&'a T> {
        let mut next = *self;
        next.move_next();
        next.current()
    }

    /// The element before the current one
    pub fn peek_prev(&self) -> Option<&'a T> {
        let mut prev = *self;
        prev.move_prev();
        prev.current()
    }

    /// The list this cursor walks
    pub fn list(&self) -> &'a List<T, A> {
        self.list
    }
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialEq for Cursor<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl<T, A: Allocator> Eq for Cursor<'_, T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor")
            .field(&self.index())
            .field(&self.current())
            .finish()
    }
}

/// Mutable position in a [`List`]
///
/// Inserting and erasing through the cursor is O(1). Erasing invalidates
/// only the erased position: the cursor moves on to the successor.
pub struct CursorMut<'a, T, A: Allocator> {
    list: &'a mut List<T, A>,
    current: NonNull<Link>,
    index: usize,
}

impl<'a, T, A: Allocator> CursorMut<'a, T, A> {
    pub(super) fn new(list: &'a mut List<T, A>, current: NonNull<Link>, index: usize) -> Self {
        Self {
            list,
            current,
            index,
        }
    }

    pub fn index(&self) -> Option<usize> {
        (!self.is_end()).then_some(self.index)
    }

    pub fn is_end(&self) -> bool {
        self.current == self.list.head
    }

    pub fn current(&mut self) -> Option<&mut T> {
        // SAFETY: not the sentinel; the &mut self borrow keeps it unique.
        (!self.is_end()).then(|| unsafe { List::<T, A>::value_mut(self.current) })
    }

    pub fn move_next(&mut self) {
        let mut cursor = self.as_cursor();
        cursor.move_next();
        (self.current, self.index) = (cursor.current, cursor.index);
    }

    pub fn move_prev(&mut self) {
        let mut cursor = self.as_cursor();
        cursor.move_prev();
        (self.current, self.index) = (cursor.current, cursor.index);
    }

    pub fn peek_next(&mut self) -> Option<&mut T> {
        // SAFETY: current is a live link of the borrowed list.
        let next = unsafe { (*self.current.as_ptr()).next };
        // SAFETY: not the sentinel; the &mut self borrow keeps it unique.
        (next != self.list.head).then(|| unsafe { List::<T, A>::value_mut(next) })
    }

    pub fn peek_prev(&mut self) -> Option<&mut T> {
        // SAFETY: current is a live link of the borrowed list.
        let prev = unsafe { (*self.current.as_ptr()).prev };
        // SAFETY: not the sentinel; the &mut self borrow keeps it unique.
        (prev != self.list.head).then(|| unsafe { List::<T, A>::value_mut(prev) })
    }

    /// Inserts `value` before the current position
    ///
    /// The cursor stays on the same element. At the end position this
    /// appends.
    ///
    /// # Panics
    /// If the allocator cannot provide a node.
    pub fn insert(&mut self, value: T) {
        if let Err(error) = self.try_insert(value) {
            alloc_failure(error);
        }
    }

    /// Inserts `value` before the current position, reporting allocation
    /// failure; on failure the value is dropped and the list is unchanged
    pub fn try_insert(&mut self, value: T) -> ContainerResult<()> {
        self.list.link_before(self.current, value)?;
        self.index += 1;
        Ok(())
    }

    /// Removes the current element and moves to its successor
    ///
    /// Returns `None` at the end position.
    pub fn erase(&mut self) -> Option<T> {
        if self.is_end() {
            return None;
        }

        let erased = self.current;
        // SAFETY: erased is a valued node of this list; its next is read
        // before the node is released.
        unsafe {
            self.current = (*erased.as_ptr()).next;
            Some(self.list.unlink(erased))
        }
    }

    /// Read-only view of the same position
    pub fn as_cursor(&self) -> Cursor<'_, T, A> {
        Cursor::new(&*self.list, self.current, self.index)
    }

    /// Converts into a read-only cursor for the rest of the borrow
    pub fn into_cursor(self) -> Cursor<'a, T, A> {
        Cursor::new(self.list, self.current, self.index)
    }

    pub fn list(&self) -> &List<T, A> {
        &*self.list
    }
}

impl<'a, T, A: Allocator> From<CursorMut<'a, T, A>> for Cursor<'a, T, A> {
    fn from(cursor: CursorMut<'a, T, A>) -> Self {
        cursor.into_cursor()
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for CursorMut<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut")
            .field(&self.as_cursor().index())
            .field(&self.as_cursor().current())
            .finish()
    }
}
