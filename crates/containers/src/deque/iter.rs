use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use super::{Block, Deque, slot_ptr};
use crate::allocator::Allocator;

/// Borrowing iterator over a [`Deque`]
///
/// Walks the absolute slot range `[front, back)`; `nth` and `nth_back`
/// jump directly instead of stepping.
pub struct Iter<'a, T> {
    map: NonNull<Block<T>>,
    front: usize,
    back: usize,
    _marker: PhantomData<&'a T>,
}

impl<T> Iter<'_, T> {
    pub(super) fn new(map: NonNull<Block<T>>, front: usize, back: usize) -> Self {
        Self {
            map,
            front,
            back,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }
        let slot = self.front;
        self.front += 1;
        // SAFETY: slot is in the live range of the borrowed deque.
        Some(unsafe { &*slot_ptr(self.map, slot) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<&'a T> {
        self.front += n.min(self.back - self.front);
        self.next()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        // SAFETY: back is in the live range of the borrowed deque.
        Some(unsafe { &*slot_ptr(self.map, self.back) })
    }

    fn nth_back(&mut self, n: usize) -> Option<&'a T> {
        self.back -= n.min(self.back - self.front);
        self.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self::new(self.map, self.front, self.back)
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Mutably borrowing iterator over a [`Deque`]
pub struct IterMut<'a, T> {
    map: NonNull<Block<T>>,
    front: usize,
    back: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<T> IterMut<'_, T> {
    pub(super) fn new(map: NonNull<Block<T>>, front: usize, back: usize) -> Self {
        Self {
            map,
            front,
            back,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.front == self.back {
            return None;
        }
        let slot = self.front;
        self.front += 1;
        // SAFETY: each live slot is yielded once, so the &mut never aliases.
        Some(unsafe { &mut *slot_ptr(self.map, slot) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<&'a mut T> {
        self.front += n.min(self.back - self.front);
        self.next()
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        // SAFETY: each live slot is yielded once, so the &mut never aliases.
        Some(unsafe { &mut *slot_ptr(self.map, self.back) })
    }

    fn nth_back(&mut self, n: usize) -> Option<&'a mut T> {
        self.back -= n.min(self.back - self.front);
        self.next_back()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

impl<T> fmt::Debug for IterMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut")
            .field("remaining", &(self.back - self.front))
            .finish()
    }
}

/// Owning iterator over a [`Deque`]
pub struct IntoIter<T, A: Allocator> {
    deque: Deque<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    pub(super) fn new(deque: Deque<T, A>) -> Self {
        Self { deque }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.deque.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.deque.len(), Some(self.deque.len()))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        self.deque.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.deque).finish()
    }
}
