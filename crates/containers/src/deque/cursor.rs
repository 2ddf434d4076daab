//! Random-access positions inside a [`Deque`]

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

use super::{BLOCK_SIZE, Deque};
use crate::allocator::Allocator;

/// Random-access position in a [`Deque`]
///
/// A plain `Copy` value: arithmetic never touches the deque, and a cursor
/// may point anywhere (before the front, at the end, beyond it). Only
/// [`get`](Self::get) requires the position to hold an element.
///
/// Positions are split into a block and a slot of the deque's map, so
/// moving across block boundaries and measuring distances both go through
/// `index / BLOCK_SIZE` and `index % BLOCK_SIZE`.
pub struct Cursor<'a, T, A: Allocator> {
    deque: &'a Deque<T, A>,
    index: isize,
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    pub(super) fn new(deque: &'a Deque<T, A>, index: isize) -> Self {
        Self { deque, index }
    }

    /// Logical index relative to the front
    pub fn index(&self) -> isize {
        self.index
    }

    /// Absolute position in the map, `block * BLOCK_SIZE + slot`
    fn absolute(&self) -> isize {
        self.deque.first as isize + self.index
    }

    /// Block of the map this position falls in
    pub fn block(&self) -> isize {
        self.absolute().div_euclid(BLOCK_SIZE as isize)
    }

    /// Slot within [`block`](Self::block)
    pub fn slot(&self) -> usize {
        self.absolute().rem_euclid(BLOCK_SIZE as isize) as usize
    }

    /// The element at this position, if there is one
    pub fn get(&self) -> Option<&'a T> {
        usize::try_from(self.index)
            .ok()
            .and_then(|index| self.deque.get(index))
    }

    /// Whether this is the one-past-the-end position
    pub fn is_end(&self) -> bool {
        self.index == self.deque.len() as isize
    }

    /// Moves by `offset` positions in either direction
    #[must_use]
    pub fn offset(self, offset: isize) -> Self {
        Self::new(self.deque, self.index + offset)
    }

    /// Signed distance `self - other`, computed from block and slot deltas
    ///
    /// # Panics
    /// If the cursors belong to different deques.
    pub fn distance(&self, other: &Self) -> isize {
        assert!(
            core::ptr::eq(self.deque, other.deque),
            "cursors belong to different deques"
        );
        (self.block() - other.block()) * BLOCK_SIZE as isize + self.slot() as isize
            - other.slot() as isize
    }
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<T, A: Allocator> Add<usize> for Cursor<'_, T, A> {
    type Output = Self;

    fn add(self, n: usize) -> Self {
        self.offset(n as isize)
    }
}

impl<T, A: Allocator> Sub<usize> for Cursor<'_, T, A> {
    type Output = Self;

    fn sub(self, n: usize) -> Self {
        self.offset(-(n as isize))
    }
}

impl<T, A: Allocator> AddAssign<usize> for Cursor<'_, T, A> {
    fn add_assign(&mut self, n: usize) {
        *self = *self + n;
    }
}

impl<T, A: Allocator> SubAssign<usize> for Cursor<'_, T, A> {
    fn sub_assign(&mut self, n: usize) {
        *self = *self - n;
    }
}

impl<'a, T, A: Allocator> Sub for Cursor<'a, T, A> {
    type Output = isize;

    fn sub(self, other: Self) -> isize {
        self.distance(&other)
    }
}

impl<T, A: Allocator> PartialEq for Cursor<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.deque, other.deque) && self.index == other.index
    }
}

impl<T, A: Allocator> Eq for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialOrd for Cursor<'_, T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, A: Allocator> Ord for Cursor<'_, T, A> {
    /// Orders by position; cursors of different deques order by address
    fn cmp(&self, other: &Self) -> Ordering {
        let this: *const Deque<T, A> = self.deque;
        let that: *const Deque<T, A> = other.deque;
        this.cmp(&that).then(self.index.cmp(&other.index))
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("block", &self.block())
            .field("slot", &self.slot())
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::deque::{BLOCK_SIZE, Deque};

    #[test]
    fn arithmetic_crosses_blocks() {
        let deque: Deque<usize> = (0..BLOCK_SIZE * 3).collect();
        let begin = deque.begin();
        let end = deque.end();
        assert_eq!(end - begin, (BLOCK_SIZE * 3) as isize);
        assert_eq!(begin - end, -((BLOCK_SIZE * 3) as isize));

        let mut cursor = begin + (BLOCK_SIZE + 5);
        assert_eq!(cursor.get(), Some(&(BLOCK_SIZE + 5)));
        assert_eq!(cursor.block() - begin.block(), 1);

        cursor -= BLOCK_SIZE;
        assert_eq!(cursor.get(), Some(&5));
        cursor += 2 * BLOCK_SIZE - 5;
        assert_eq!(cursor.get(), Some(&(2 * BLOCK_SIZE)));
        assert_eq!(cursor.slot(), (begin.slot() + 2 * BLOCK_SIZE) % BLOCK_SIZE);
    }

    #[test]
    fn ordering_follows_position() {
        let deque: Deque<i32> = (0..10).collect();
        let a = deque.cursor(3);
        let b = deque.cursor(7);
        assert!(a < b);
        assert!(b > a);
        assert_eq!(a + 4, b);
        assert_eq!(b - 4usize, a);
        assert!(deque.end().is_end());
        assert_eq!(deque.end().get(), None);
        assert_eq!((deque.begin() - 1usize).get(), None);
    }
}
