//! Double-ended queue built from fixed-size blocks
//!
//! # Safety
//!
//! Storage is a map (an array of optional block pointers) and the blocks it
//! points at, all obtained from the deque's allocator:
//! - Live elements occupy the absolute slot range `[first, last)`, where
//!   slot `s` lives in block `s / BLOCK_SIZE` at offset `s % BLOCK_SIZE`
//! - Every block that covers a slot in `[first, last)` is allocated
//! - Blocks outside that range may be allocated (kept for reuse) or `None`
//!
//! ## Invariants
//!
//! - `len == (last_block - first_block) * BLOCK_SIZE - first_offset + last_offset`,
//!   which holds by construction since `len == last - first`
//! - Slots are initialized exactly within `[first, last)`
//! - Growing only reallocates the map; block pointers are copied across, so
//!   elements never move and references stay valid until the element is
//!   popped or the deque is mutated through `insert`/`erase`

mod cursor;
mod iter;

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::allocator::{Allocator, SystemAllocator, TypedAllocator};
use crate::config::DequeConfig;
use crate::error::{ContainerError, ContainerResult, alloc_failure};

pub use cursor::Cursor;
pub use iter::{IntoIter, Iter, IterMut};

/// Number of element slots in each block
pub const BLOCK_SIZE: usize = 32;

type Block<T> = Option<NonNull<T>>;

/// Double-ended queue with O(1) amortized push and pop at both ends
///
/// Elements live in blocks of [`BLOCK_SIZE`] slots that never move once
/// allocated. When a push runs off either end of the block map, the map is
/// reallocated to three times the span of blocks in use and the existing
/// blocks are placed in its middle third, leaving headroom on both sides.
///
/// `insert` and `erase` at arbitrary positions are O(n): they shift
/// elements one slot at a time toward the nearer end.
///
/// # Examples
///
/// ```
/// use nebula_containers::deque::Deque;
///
/// let mut deque = Deque::new();
/// deque.push_back(2);
/// deque.push_front(1);
/// deque.insert(2, 3);
///
/// assert_eq!(deque[0], 1);
/// assert!(deque.at(3).is_err());
/// assert_eq!(deque.cursor(2) - deque.cursor(0), 2);
/// ```
pub struct Deque<T, A: Allocator = SystemAllocator> {
    map: NonNull<Block<T>>,
    map_len: usize,
    first: usize,
    last: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// SAFETY: Deque owns its elements and storage exclusively.
unsafe impl<T: Send, A: Allocator + Send> Send for Deque<T, A> {}

// SAFETY: &Deque only exposes &T and &A.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Deque<T, A> {}

impl<T> Deque<T> {
    /// Creates an empty deque on the system allocator
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(SystemAllocator::new())
    }
}

impl<T, A: Allocator> Deque<T, A> {
    /// Creates an empty deque with the default map size
    ///
    /// # Panics
    /// If the map cannot be allocated.
    pub fn new_in(alloc: A) -> Self {
        match Self::with_config_in(DequeConfig::default(), alloc) {
            Ok(deque) => deque,
            Err(error) => alloc_failure(error),
        }
    }

    /// Creates an empty deque with a custom initial map size
    pub fn with_config_in(config: DequeConfig, alloc: A) -> ContainerResult<Self> {
        config.validate()?;

        let map_len = config.initial_blocks;
        // SAFETY: the map is released in Drop/grow with dealloc_array(map_len).
        let map = unsafe { alloc.alloc_array::<Block<T>>(map_len)? };
        for index in 0..map_len {
            // SAFETY: index < map_len, inside the fresh allocation.
            unsafe { map.as_ptr().add(index).write(None) };
        }

        let center = map_len / 2 * BLOCK_SIZE;
        Ok(Self {
            map,
            map_len,
            first: center,
            last: center,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates a deque of `count` elements produced by `f(index)`
    ///
    /// On failure the constructed prefix is dropped and all blocks and the
    /// map go back to the allocator before the error is returned.
    pub fn try_from_fn_in<E, F>(count: usize, alloc: A, mut f: F) -> Result<Self, E>
    where
        E: From<ContainerError>,
        F: FnMut(usize) -> Result<T, E>,
    {
        let mut deque = Self::with_config_in(DequeConfig::for_len(count, BLOCK_SIZE), alloc)?;
        for index in 0..count {
            let value = f(index)?;
            deque.try_push_back(value)?;
        }
        Ok(deque)
    }

    /// Creates a deque of `count` default values
    pub fn with_len_in(count: usize, alloc: A) -> Self
    where
        T: Default,
    {
        match Self::try_from_fn_in::<ContainerError, _>(count, alloc, |_| Ok(T::default())) {
            Ok(deque) => deque,
            Err(error) => alloc_failure(error),
        }
    }

    /// Creates a deque of `count` clones of `value`
    pub fn from_elem_in(count: usize, value: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        match Self::try_from_fn_in::<ContainerError, _>(count, alloc, |_| Ok(value.clone())) {
            Ok(deque) => deque,
            Err(error) => alloc_failure(error),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Number of block slots in the current map
    #[inline]
    pub fn map_len(&self) -> usize {
        self.map_len
    }

    pub fn push_back(&mut self, value: T) {
        if let Err(error) = self.try_push_back(value) {
            alloc_failure(error);
        }
    }

    pub fn push_front(&mut self, value: T) {
        if let Err(error) = self.try_push_front(value) {
            alloc_failure(error);
        }
    }

    /// Appends an element; on failure the value is dropped and the deque is
    /// unchanged
    pub fn try_push_back(&mut self, value: T) -> ContainerResult<()> {
        if self.last == self.map_len * BLOCK_SIZE {
            self.grow()?;
        }

        let block = self.block_for(self.last / BLOCK_SIZE)?;
        // SAFETY: the slot is inside an allocated block and past the live range.
        unsafe { block.as_ptr().add(self.last % BLOCK_SIZE).write(value) };
        self.last += 1;
        Ok(())
    }

    /// Prepends an element; on failure the value is dropped and the deque is
    /// unchanged
    pub fn try_push_front(&mut self, value: T) -> ContainerResult<()> {
        if self.first == 0 {
            self.grow()?;
        }

        let slot = self.first - 1;
        let block = self.block_for(slot / BLOCK_SIZE)?;
        // SAFETY: the slot is inside an allocated block and before the live range.
        unsafe { block.as_ptr().add(slot % BLOCK_SIZE).write(value) };
        self.first = slot;
        Ok(())
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.last -= 1;
        // SAFETY: the slot was the last live element and is now outside the range.
        Some(unsafe { self.slot(self.last).read() })
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let slot = self.first;
        self.first += 1;
        // SAFETY: the slot was the first live element and is now outside the range.
        Some(unsafe { self.slot(slot).read() })
    }

    /// Inserts `value` so that it ends up at `index`
    ///
    /// O(n): the value is pushed at the nearer end and swapped into place.
    ///
    /// # Panics
    /// If `index > len`, or if the allocator cannot provide a block.
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );

        if index < len / 2 {
            self.push_front(value);
            for position in 0..index {
                self.swap(position, position + 1);
            }
        } else {
            self.push_back(value);
            for position in (index..len).rev() {
                self.swap(position, position + 1);
            }
        }
    }

    /// Removes and returns the element at `index`
    ///
    /// O(n): the element is swapped to the nearer end and popped.
    ///
    /// # Panics
    /// If `index >= len`.
    pub fn erase(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );

        let value = if index < len / 2 {
            for position in (0..index).rev() {
                self.swap(position, position + 1);
            }
            self.pop_front()
        } else {
            for position in index..len - 1 {
                self.swap(position, position + 1);
            }
            self.pop_back()
        };

        match value {
            Some(value) => value,
            None => unreachable!("non-empty deque popped nothing"),
        }
    }

    /// Swaps two elements
    ///
    /// # Panics
    /// If either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) {
        let len = self.len();
        assert!(a < len && b < len, "swap indices {a}, {b} out of range for length {len}");
        // SAFETY: both slots are live; ptr::swap tolerates a == b.
        unsafe { ptr::swap(self.slot(self.first + a), self.slot(self.first + b)) };
    }

    /// Drops every element; allocated blocks are kept for reuse
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
        let center = self.map_len / 2 * BLOCK_SIZE;
        self.first = center;
        self.last = center;
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len().checked_sub(1).and_then(|index| self.get_mut(index))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        // SAFETY: index < len.
        (index < self.len()).then(|| unsafe { self.get_unchecked(index) })
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            // SAFETY: index < len.
            Some(unsafe { self.get_unchecked_mut(index) })
        } else {
            None
        }
    }

    /// Bounds-checked access
    pub fn at(&self, index: usize) -> ContainerResult<&T> {
        let len = self.len();
        self.get(index)
            .ok_or_else(|| ContainerError::out_of_range(index, len))
    }

    /// Bounds-checked mutable access
    pub fn at_mut(&mut self, index: usize) -> ContainerResult<&mut T> {
        let len = self.len();
        self.get_mut(index)
            .ok_or_else(|| ContainerError::out_of_range(index, len))
    }

    /// Access without a bounds check
    ///
    /// # Safety
    /// `index` must be less than `len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        // SAFETY: index < len (caller contract), so the slot is live.
        unsafe { &*self.slot(self.first + index) }
    }

    /// Mutable access without a bounds check
    ///
    /// # Safety
    /// `index` must be less than `len()`.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: index < len (caller contract), so the slot is live.
        unsafe { &mut *self.slot(self.first + index) }
    }

    /// Random-access position at `index`; `index == len` is the end
    pub fn cursor(&self, index: usize) -> Cursor<'_, T, A> {
        Cursor::new(self, index as isize)
    }

    pub fn begin(&self) -> Cursor<'_, T, A> {
        self.cursor(0)
    }

    pub fn end(&self) -> Cursor<'_, T, A> {
        self.cursor(self.len())
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.map, self.first, self.last)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.map, self.first, self.last)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == value)
    }

    /// Pointer to absolute slot `slot`
    ///
    /// # Safety
    /// The block covering `slot` must be allocated.
    #[inline]
    unsafe fn slot(&self, slot: usize) -> *mut T {
        // SAFETY: caller contract; the map entry is in bounds and Some.
        unsafe { slot_ptr(self.map, slot) }
    }

    /// The block at `index`, allocating it if needed
    fn block_for(&mut self, index: usize) -> ContainerResult<NonNull<T>> {
        debug_assert!(index < self.map_len);
        // SAFETY: index < map_len.
        let entry = unsafe { &mut *self.map.as_ptr().add(index) };
        if let Some(block) = *entry {
            return Ok(block);
        }
        // SAFETY: released with dealloc_array(BLOCK_SIZE) in grow or Drop.
        let block = unsafe { self.alloc.alloc_array::<T>(BLOCK_SIZE)? };
        *entry = Some(block);
        Ok(block)
    }

    /// Reallocates the map to three times the block span in use and moves
    /// the live blocks into its middle third
    ///
    /// On failure nothing has changed.
    fn grow(&mut self) -> ContainerResult<()> {
        let first_block = self.first / BLOCK_SIZE;
        let end_block = self.last.div_ceil(BLOCK_SIZE).max(first_block + 1);
        let span = end_block - first_block;
        let new_len = span
            .checked_mul(3)
            .ok_or_else(|| ContainerError::size_overflow("deque block map"))?;

        // SAFETY: the new map is released in Drop or the next grow.
        let new_map = unsafe { self.alloc.alloc_array::<Block<T>>(new_len)? };

        // SAFETY: every index is within its map; each live block pointer is
        // copied exactly once and every other block is released exactly once.
        unsafe {
            for index in 0..new_len {
                new_map.as_ptr().add(index).write(None);
            }
            for index in 0..self.map_len {
                let block = *self.map.as_ptr().add(index);
                if (first_block..end_block).contains(&index) {
                    new_map.as_ptr().add(span + index - first_block).write(block);
                } else if let Some(block) = block {
                    self.alloc.dealloc_array(block, BLOCK_SIZE);
                }
            }
            self.alloc.dealloc_array(self.map, self.map_len);
        }

        #[cfg(feature = "logging")]
        debug!(
            old_blocks = self.map_len,
            new_blocks = new_len,
            len = self.len(),
            "deque block map grown"
        );

        let len = self.len();
        self.first = span * BLOCK_SIZE + self.first % BLOCK_SIZE;
        self.last = self.first + len;
        self.map = new_map;
        self.map_len = new_len;
        Ok(())
    }
}

/// Pointer to absolute slot `slot` of `map`
///
/// # Safety
/// `slot / BLOCK_SIZE` must index an allocated block of `map`.
#[inline]
unsafe fn slot_ptr<T>(map: NonNull<Block<T>>, slot: usize) -> *mut T {
    // SAFETY: caller contract.
    unsafe {
        match *map.as_ptr().add(slot / BLOCK_SIZE) {
            Some(block) => block.as_ptr().add(slot % BLOCK_SIZE),
            None => unreachable!("live slot {slot} in an unallocated block"),
        }
    }
}

impl<T, A: Allocator> Drop for Deque<T, A> {
    fn drop(&mut self) {
        while self.pop_back().is_some() {}
        // SAFETY: each block and the map are released exactly once, with the
        // counts they were allocated with.
        unsafe {
            for index in 0..self.map_len {
                if let Some(block) = *self.map.as_ptr().add(index) {
                    self.alloc.dealloc_array(block, BLOCK_SIZE);
                }
            }
            self.alloc.dealloc_array(self.map, self.map_len);
        }
    }
}

impl<T: Clone, A: Allocator> Clone for Deque<T, A> {
    fn clone(&self) -> Self {
        let alloc = self.alloc.select_on_copy_construction();
        match Self::try_from_fn_in::<ContainerError, _>(self.len(), alloc, |index| {
            // SAFETY: index < self.len().
            Ok(unsafe { self.get_unchecked(index) }.clone())
        }) {
            Ok(deque) => deque,
            Err(error) => alloc_failure(error),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        let alloc = self.alloc.select_on_copy_assignment(&source.alloc);
        let mut fresh = Self::new_in(alloc);
        fresh.extend(source.iter().cloned());
        *self = fresh;
    }
}

impl<T, A: Allocator + Default> Default for Deque<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A: Allocator> Index<usize> for Deque<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("{}", ContainerError::out_of_range(index, self.len())),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for Deque<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("{}", ContainerError::out_of_range(index, len)),
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Deque<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Deque<T, B>> for Deque<T, A> {
    fn eq(&self, other: &Deque<T, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other)
    }
}

impl<T: Eq, A: Allocator> Eq for Deque<T, A> {}

impl<T: Hash, A: Allocator> Hash for Deque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T, A: Allocator> Extend<T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, A: Allocator + Default> FromIterator<T> for Deque<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::default();
        deque.extend(iter);
        deque
    }
}

impl<T, A: Allocator> IntoIterator for Deque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Deque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Deque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TrackedAllocator;
    use pretty_assertions::assert_eq;

    fn contents<A: Allocator>(deque: &Deque<i32, A>) -> Vec<i32> {
        deque.iter().copied().collect()
    }

    #[test]
    fn pushes_cross_block_boundaries() {
        let mut deque = Deque::new();
        for i in 0..100 {
            deque.push_back(i);
            deque.push_front(-i - 1);
        }
        assert_eq!(deque.len(), 200);
        assert_eq!(deque[0], -100);
        assert_eq!(deque[199], 99);
        for (index, value) in deque.iter().enumerate() {
            assert_eq!(*value, index as i32 - 100);
        }
    }

    #[test]
    fn growth_keeps_headroom_on_both_sides() {
        let mut deque = Deque::with_config_in(DequeConfig::small(), SystemAllocator).unwrap();
        assert_eq!(deque.map_len(), 2);

        // the last push runs off the map and forces a third growth
        for i in 0..=BLOCK_SIZE * 4 {
            deque.push_back(i);
        }
        assert_eq!(deque.map_len(), 12);
        let first_block = deque.first / BLOCK_SIZE;
        let end_block = deque.last.div_ceil(BLOCK_SIZE);
        assert!(first_block > 0);
        assert!(end_block < deque.map_len());
        assert_eq!(deque.len(), deque.last - deque.first);
    }

    #[test]
    fn insert_and_erase_shift_toward_nearer_end() {
        let mut deque: Deque<i32> = (0..10).collect();
        deque.insert(2, 100);
        deque.insert(9, 200);
        assert_eq!(contents(&deque), [0, 1, 100, 2, 3, 4, 5, 6, 7, 200, 8, 9]);

        assert_eq!(deque.erase(2), 100);
        assert_eq!(deque.erase(8), 200);
        assert_eq!(contents(&deque), (0..10).collect::<Vec<_>>());

        deque.insert(10, 10);
        deque.insert(0, -1);
        assert_eq!(deque.front(), Some(&-1));
        assert_eq!(deque.back(), Some(&10));
    }

    #[test]
    fn at_reports_out_of_range() {
        let deque: Deque<i32> = (0..5).collect();
        assert_eq!(deque.at(4), Ok(&4));
        let err = deque.at(5).unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(err, ContainerError::out_of_range(5, 5));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_panics_out_of_range() {
        let deque: Deque<i32> = (0..3).collect();
        let _ = deque[3];
    }

    #[test]
    fn storage_is_released() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        {
            let mut deque = Deque::new_in(tracked.clone());
            for i in 0..1_000 {
                if i % 3 == 0 {
                    deque.push_front(i.to_string());
                } else {
                    deque.push_back(i.to_string());
                }
            }
            while deque.len() > 10 {
                deque.pop_front();
            }
            deque.clear();
            deque.push_back(String::from("again"));
        }
        assert!(!tracked.has_leaks());
    }

    #[test]
    fn failed_construction_releases_storage() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let result = Deque::try_from_fn_in(100, tracked.clone(), |i| {
            if i == 70 {
                Err(ContainerError::invalid_config("element seventy"))
            } else {
                Ok(vec![i; 2])
            }
        });
        assert!(result.is_err());
        assert!(!tracked.has_leaks());
    }

    #[test]
    fn clone_is_deep() {
        let original: Deque<String> = ["a", "b", "c"].into_iter().map(String::from).collect();
        let mut copy = original.clone();
        copy[1].push('!');
        assert_eq!(original[1], "b");
        assert_eq!(copy[1], "b!");

        copy.clone_from(&original);
        assert_eq!(copy, original);
    }

    #[test]
    fn zero_sized_elements() {
        let mut deque = Deque::new();
        for _ in 0..(BLOCK_SIZE * 10) {
            deque.push_front(());
        }
        assert_eq!(deque.len(), BLOCK_SIZE * 10);
        assert_eq!(deque.iter().count(), BLOCK_SIZE * 10);
    }
}
