//! Growable byte string with a trailing NUL
//!
//! [`ByteString`] stores raw bytes (not necessarily UTF-8) in a buffer
//! obtained from its allocator. The buffer always holds `capacity + 1`
//! bytes and the byte right after the contents is kept at zero, so
//! [`as_bytes_with_nul`](ByteString::as_bytes_with_nul) can hand the buffer
//! to C-style consumers without copying.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::{Add, AddAssign, Deref, DerefMut, Index, IndexMut};
use core::ptr::{self, NonNull};
use core::slice::{self, SliceIndex};

use crate::allocator::{Allocator, SystemAllocator, TypedAllocator};
use crate::error::{ContainerError, ContainerResult, alloc_failure};

/// Byte string parameterized over its allocator
///
/// # Examples
///
/// ```
/// use nebula_containers::string::ByteString;
///
/// let mut greeting = ByteString::from("hello");
/// greeting += b' ';
/// greeting += &ByteString::from("world");
///
/// assert_eq!(greeting.find("o"), Some(4));
/// assert_eq!(greeting.rfind("o"), Some(7));
/// assert_eq!(greeting.substr(6, 5).unwrap(), "world");
/// assert_eq!(greeting.as_bytes_with_nul().last(), Some(&0));
/// ```
pub struct ByteString<A: Allocator = SystemAllocator> {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    alloc: A,
}

// SAFETY: ByteString owns its buffer exclusively.
unsafe impl<A: Allocator + Send> Send for ByteString<A> {}
// SAFETY: shared access only reads the buffer.
unsafe impl<A: Allocator + Sync> Sync for ByteString<A> {}

impl ByteString {
    /// Creates an empty string on the global allocator
    pub fn new() -> Self {
        Self::new_in(SystemAllocator)
    }

    /// Copies `bytes` into a new string on the global allocator
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_bytes_in(bytes, SystemAllocator)
    }

    /// `count` copies of `byte`
    pub fn repeat(count: usize, byte: u8) -> Self {
        Self::repeat_in(count, byte, SystemAllocator)
    }
}

impl<A: Allocator> ByteString<A> {
    /// Creates an empty string
    ///
    /// # Panics
    /// If the one-byte terminator cannot be allocated.
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// Creates an empty string with room for `capacity` bytes
    ///
    /// # Panics
    /// If the buffer cannot be allocated.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|error| alloc_failure(error))
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in)
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> ContainerResult<Self> {
        let ptr = Self::allocate_buffer(&alloc, capacity)?;
        // SAFETY: the buffer holds capacity + 1 bytes.
        unsafe { ptr.as_ptr().write(0) };
        Ok(Self {
            ptr,
            len: 0,
            capacity,
            alloc,
        })
    }

    /// Copies `bytes` into a new string
    ///
    /// # Panics
    /// If the buffer cannot be allocated.
    pub fn from_bytes_in(bytes: &[u8], alloc: A) -> Self {
        Self::try_from_bytes_in(bytes, alloc).unwrap_or_else(|error| alloc_failure(error))
    }

    /// Fallible form of [`from_bytes_in`](Self::from_bytes_in)
    pub fn try_from_bytes_in(bytes: &[u8], alloc: A) -> ContainerResult<Self> {
        let mut string = Self::try_with_capacity_in(bytes.len(), alloc)?;
        // SAFETY: capacity covers bytes.len(), and the regions are distinct.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), string.ptr.as_ptr(), bytes.len());
            string.set_len(bytes.len());
        }
        Ok(string)
    }

    /// `count` copies of `byte`
    ///
    /// # Panics
    /// If the buffer cannot be allocated.
    pub fn repeat_in(count: usize, byte: u8, alloc: A) -> Self {
        let mut string = Self::with_capacity_in(count, alloc);
        // SAFETY: capacity covers count bytes.
        unsafe {
            ptr::write_bytes(string.ptr.as_ptr(), byte, count);
            string.set_len(count);
        }
        string
    }

    fn allocate_buffer(alloc: &A, capacity: usize) -> ContainerResult<NonNull<u8>> {
        let bytes = capacity
            .checked_add(1)
            .ok_or_else(|| ContainerError::size_overflow("string capacity"))?;
        // SAFETY: released in replace_buffer or Drop with the same count.
        unsafe { alloc.alloc_array::<u8>(bytes) }
    }

    /// Sets the length and rewrites the terminator
    ///
    /// # Safety
    /// `len <= capacity` and the first `len` bytes are initialized.
    unsafe fn set_len(&mut self, len: usize) {
        self.len = len;
        // SAFETY: len <= capacity, and the buffer holds capacity + 1 bytes.
        unsafe { self.ptr.as_ptr().add(len).write(0) };
    }

    /// Moves the contents into a fresh buffer of exactly `capacity` bytes
    fn replace_buffer(&mut self, capacity: usize) -> ContainerResult<()> {
        debug_assert!(capacity >= self.len);
        let fresh = Self::allocate_buffer(&self.alloc, capacity)?;
        // SAFETY: both buffers hold at least len + 1 bytes; the old one is
        // released with the count it was allocated with.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), fresh.as_ptr(), self.len + 1);
            self.alloc.dealloc_array(self.ptr, self.capacity + 1);
        }
        self.ptr = fresh;
        self.capacity = capacity;
        Ok(())
    }

    /// Number of bytes, not counting the terminator
    pub fn len(&self) -> usize {
        self.len
    }

    /// Bytes that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the string has no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The allocator backing this string
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The contents, without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the first len bytes are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The contents, mutably
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: the first len bytes are initialized and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// The contents followed by the NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        // SAFETY: len + 1 bytes are always initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len + 1) }
    }

    /// First byte
    pub fn front(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }

    /// Last byte
    pub fn back(&self) -> Option<u8> {
        self.as_bytes().last().copied()
    }

    /// Ensures room for at least `capacity` bytes; never shrinks
    ///
    /// # Panics
    /// If the buffer cannot be reallocated.
    pub fn reserve(&mut self, capacity: usize) {
        if let Err(error) = self.try_reserve(capacity) {
            alloc_failure(error);
        }
    }

    /// Fallible form of [`reserve`](Self::reserve)
    pub fn try_reserve(&mut self, capacity: usize) -> ContainerResult<()> {
        if capacity <= self.capacity {
            return Ok(());
        }
        self.replace_buffer(capacity)
    }

    /// Drops spare capacity
    pub fn shrink_to_fit(&mut self) {
        if self.capacity != self.len {
            // shrinking never asks for more than is held now
            if let Err(error) = self.replace_buffer(self.len) {
                alloc_failure(error);
            }
        }
    }

    /// Appends one byte, growing to `2 * len + 1` when full
    ///
    /// # Panics
    /// If the buffer cannot be grown.
    pub fn push(&mut self, byte: u8) {
        if let Err(error) = self.try_push(byte) {
            alloc_failure(error);
        }
    }

    /// Fallible form of [`push`](Self::push)
    pub fn try_push(&mut self, byte: u8) -> ContainerResult<()> {
        if self.len == self.capacity {
            let grown = self
                .len
                .checked_mul(2)
                .and_then(|doubled| doubled.checked_add(1))
                .ok_or_else(|| ContainerError::size_overflow("string growth"))?;
            self.replace_buffer(grown)?;
        }
        // SAFETY: len < capacity after growing.
        unsafe {
            self.ptr.as_ptr().add(self.len).write(byte);
            self.set_len(self.len + 1);
        }
        Ok(())
    }

    /// Removes and returns the last byte
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.back()?;
        // SAFETY: shrinking keeps every remaining byte initialized.
        unsafe { self.set_len(self.len - 1) };
        Some(byte)
    }

    /// Appends `bytes`, growing to twice the combined length when needed
    ///
    /// # Panics
    /// If the buffer cannot be grown.
    pub fn append(&mut self, bytes: &[u8]) {
        if let Err(error) = self.try_append(bytes) {
            alloc_failure(error);
        }
    }

    /// Fallible form of [`append`](Self::append)
    pub fn try_append(&mut self, bytes: &[u8]) -> ContainerResult<()> {
        let total = self
            .len
            .checked_add(bytes.len())
            .ok_or_else(|| ContainerError::size_overflow("string append"))?;
        if total > self.capacity {
            let grown = total
                .checked_mul(2)
                .ok_or_else(|| ContainerError::size_overflow("string growth"))?;
            self.replace_buffer(grown)?;
        }
        // SAFETY: capacity covers total; `bytes` cannot alias our buffer
        // because appending borrows self mutably.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.as_ptr().add(self.len), bytes.len());
            self.set_len(total);
        }
        Ok(())
    }

    /// Drops the contents but keeps the buffer
    pub fn clear(&mut self) {
        // SAFETY: zero bytes are trivially initialized.
        unsafe { self.set_len(0) };
    }

    /// Position of the first occurrence of `needle`
    ///
    /// An empty needle matches at 0.
    pub fn find(&self, needle: impl AsRef<[u8]>) -> Option<usize> {
        let needle = needle.as_ref();
        if needle.is_empty() {
            return Some(0);
        }
        self.as_bytes()
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Position of the last occurrence of `needle`
    ///
    /// An empty needle matches at `len()`.
    pub fn rfind(&self, needle: impl AsRef<[u8]>) -> Option<usize> {
        let needle = needle.as_ref();
        if needle.is_empty() {
            return Some(self.len);
        }
        self.as_bytes()
            .windows(needle.len())
            .rposition(|window| window == needle)
    }

    /// Copies up to `count` bytes starting at `start`
    ///
    /// `count` is clamped to the bytes available. The copy uses the
    /// allocator a copy-constructed string would.
    ///
    /// # Errors
    /// [`ContainerError::OutOfRange`] if `start > len()`.
    pub fn substr(&self, start: usize, count: usize) -> ContainerResult<Self> {
        if start > self.len {
            return Err(ContainerError::out_of_range(start, self.len));
        }
        let end = start + count.min(self.len - start);
        Self::try_from_bytes_in(&self.as_bytes()[start..end], self.alloc.select_on_copy_construction())
    }
}

impl<A: Allocator> Drop for ByteString<A> {
    fn drop(&mut self) {
        // SAFETY: the buffer was allocated with capacity + 1 bytes.
        unsafe { self.alloc.dealloc_array(self.ptr, self.capacity + 1) };
    }
}

impl<A: Allocator> Clone for ByteString<A> {
    fn clone(&self) -> Self {
        Self::from_bytes_in(self.as_bytes(), self.alloc.select_on_copy_construction())
    }

    fn clone_from(&mut self, source: &Self) {
        let alloc = self.alloc.select_on_copy_assignment(&source.alloc);
        *self = Self::from_bytes_in(source.as_bytes(), alloc);
    }
}

impl<A: Allocator + Default> Default for ByteString<A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<A: Allocator> Deref for ByteString<A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: Allocator> DerefMut for ByteString<A> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl<A: Allocator> AsRef<[u8]> for ByteString<A> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: Allocator, I: SliceIndex<[u8]>> Index<I> for ByteString<A> {
    type Output = I::Output;

    fn index(&self, index: I) -> &I::Output {
        &self.as_bytes()[index]
    }
}

impl<A: Allocator, I: SliceIndex<[u8]>> IndexMut<I> for ByteString<A> {
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut self.as_bytes_mut()[index]
    }
}

impl<A: Allocator, B: Allocator> AddAssign<&ByteString<B>> for ByteString<A> {
    fn add_assign(&mut self, other: &ByteString<B>) {
        self.append(other.as_bytes());
    }
}

impl<A: Allocator> AddAssign<&[u8]> for ByteString<A> {
    fn add_assign(&mut self, other: &[u8]) {
        self.append(other);
    }
}

impl<A: Allocator> AddAssign<&str> for ByteString<A> {
    fn add_assign(&mut self, other: &str) {
        self.append(other.as_bytes());
    }
}

impl<A: Allocator> AddAssign<u8> for ByteString<A> {
    fn add_assign(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl<A: Allocator, B: Allocator> Add<&ByteString<B>> for ByteString<A> {
    type Output = Self;

    fn add(mut self, other: &ByteString<B>) -> Self {
        self += other;
        self
    }
}

impl<A: Allocator> Add<u8> for ByteString<A> {
    type Output = Self;

    fn add(mut self, byte: u8) -> Self {
        self.push(byte);
        self
    }
}

impl<A: Allocator> Extend<u8> for ByteString<A> {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        for byte in iter {
            self.push(byte);
        }
    }
}

impl<'a, A: Allocator> Extend<&'a u8> for ByteString<A> {
    fn extend<I: IntoIterator<Item = &'a u8>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl FromIterator<u8> for ByteString {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut string = Self::new();
        string.extend(iter);
        string
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&str> for ByteString {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl<A: Allocator, B: Allocator> PartialEq<ByteString<B>> for ByteString<A> {
    fn eq(&self, other: &ByteString<B>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> Eq for ByteString<A> {}

impl<A: Allocator> PartialEq<[u8]> for ByteString<A> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl<A: Allocator> PartialEq<str> for ByteString<A> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> PartialEq<&str> for ByteString<A> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> PartialOrd for ByteString<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Allocator> Ord for ByteString<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl<A: Allocator> Hash for ByteString<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl<A: Allocator> fmt::Display for ByteString<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.as_bytes().utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

impl<A: Allocator> fmt::Debug for ByteString<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.as_bytes().escape_ascii())
    }
}
