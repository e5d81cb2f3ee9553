//! Persistent (immutable) vector based on a 32-way branching trie.
//!
//! This module provides [`PersistentVector`], an immutable dynamic array
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! `PersistentVector` is a 32-way branching trie with a tail buffer, in the
//! style of Clojure's `PersistentVector`. It provides:
//!
//! - O(log32 N) random access (effectively O(1) for practical sizes)
//! - O(1) amortized append through the tail buffer
//! - O(log32 N) update
//! - O(1) len and `is_empty`
//! - chunked traversal over whole leaf arrays
//!
//! All operations return new vectors without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Internal Structure
//!
//! The vector consists of:
//! - A root node (32-way branching trie) holding every index below the
//!   tail offset in full 32-element leaves
//! - A tail buffer (1 to 32 elements once non-empty) holding the most
//!   recently appended elements
//!
//! # Examples
//!
//! ```rust
//! use persistent_trie::persistent::PersistentVector;
//!
//! let vector = PersistentVector::new()
//!     .push_back(1)
//!     .push_back(2)
//!     .push_back(3);
//!
//! assert_eq!(vector.get(0), Some(&1));
//! assert_eq!(vector.get(2), Some(&3));
//!
//! // Structural sharing: the original vector is preserved
//! let extended = vector.push_back(4);
//! assert_eq!(vector.len(), 3);
//! assert_eq!(extended.len(), 4);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, FusedIterator};
use std::ops::{ControlFlow, Index};

use super::ReferenceCounter;
use super::bits::{BITS_PER_LEVEL, BRANCHING_FACTOR, required_shift, slot, tail_offset};
use super::chunked::{ChunkedSeq, Chunks};
use super::node::{TrieNode, build_root};
use super::subvector::SubVector;
use crate::error::{CollectionError, Result};

// =============================================================================
// PersistentVector Definition
// =============================================================================

/// A persistent (immutable) vector based on a 32-way branching trie.
///
/// # Time Complexity
///
/// | Operation    | Complexity                    |
/// |--------------|-------------------------------|
/// | `new`        | O(1)                          |
/// | `get`/`nth`  | O(log32 N)                    |
/// | `push_back`  | O(log32 N) amortized O(1)     |
/// | `assoc_n`    | O(log32 N)                    |
/// | `subvector`  | O(1)                          |
/// | `len`        | O(1)                          |
/// | `iter`       | O(N / 32 * log32 N) descents  |
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(50), Some(&50));
/// ```
pub struct PersistentVector<T> {
    /// Total number of elements
    length: usize,
    /// Shift of the root level: (depth - 1) * `BITS_PER_LEVEL`
    shift: usize,
    /// Root node of the trie
    root: TrieNode<T>,
    /// Tail buffer for efficient append (up to 32 elements)
    tail: ReferenceCounter<[T]>,
}

impl<T> Clone for PersistentVector<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> PersistentVector<T> {
    /// Creates a new empty vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = PersistentVector::new();
    /// assert!(vector.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            shift: BITS_PER_LEVEL,
            root: TrieNode::empty_branch(),
            tail: ReferenceCounter::from(Vec::<T>::new()),
        }
    }

    /// Creates a vector containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::singleton(42);
    /// assert_eq!(vector.len(), 1);
    /// assert_eq!(vector.get(0), Some(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            length: 1,
            shift: BITS_PER_LEVEL,
            root: TrieNode::empty_branch(),
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Returns the number of elements in the vector.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns the number of elements in the vector.
    ///
    /// Same as [`len`](Self::len); this is the name the runtime's
    /// collection protocol uses.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.length
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the starting index of the tail buffer.
    #[inline]
    const fn tail_offset(&self) -> usize {
        tail_offset(self.length)
    }

    /// Returns a reference to the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.get(0), Some(&1));
    /// assert_eq!(vector.get(4), Some(&5));
    /// assert_eq!(vector.get(10), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        Some(&self.leaf_for(index)[slot(index, 0)])
    }

    /// Returns the element at `index`, or fails with
    /// [`CollectionError::IndexOutOfRange`].
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..1000).collect();
    /// assert_eq!(vector.nth(500), Ok(&500));
    /// assert!(vector.nth(1000).is_err());
    /// ```
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or_else(|| CollectionError::index_out_of_range(index, self.length))
    }

    /// Returns the element at `index`, or `default` when out of bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..3).collect();
    /// assert_eq!(vector.get_or(1, &-1), &1);
    /// assert_eq!(vector.get_or(7, &-1), &-1);
    /// ```
    #[must_use]
    pub fn get_or<'a>(&'a self, index: usize, default: &'a T) -> &'a T {
        self.get(index).unwrap_or(default)
    }

    /// Returns a reference to the first element.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a reference to the last element.
    ///
    /// # Complexity
    ///
    /// O(1) - the last element is always in the tail
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tail.last()
    }

    /// Returns the leaf array holding `index`: the tail buffer when
    /// `index >= tail_offset`, otherwise the trie leaf found by descent.
    ///
    /// Callers must pass an index below `len()`.
    pub(crate) fn leaf_for(&self, index: usize) -> &ReferenceCounter<[T]> {
        debug_assert!(index < self.length);
        if index >= self.tail_offset() {
            &self.tail
        } else {
            self.root.leaf_for(self.shift, index)
        }
    }

    /// Returns an iterator over references to the elements.
    ///
    /// The iterator descends the trie once per leaf array rather than once
    /// per element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// let collected: Vec<&i32> = vector.iter().collect();
    /// assert_eq!(collected, vec![&1, &2, &3, &4, &5]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentVectorIterator<'_, T> {
        PersistentVectorIterator::range(self, 0, self.length)
    }

    /// Returns a chunked sequence positioned at the first element, or `None`
    /// if the vector is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..40).collect();
    /// let seq = vector.chunked_seq().unwrap();
    /// assert_eq!(seq.first_chunk().len(), 32);
    /// assert_eq!(seq.next_chunk().unwrap().first_chunk().len(), 8);
    /// ```
    #[must_use]
    pub fn chunked_seq(&self) -> Option<ChunkedSeq<'_, T>> {
        ChunkedSeq::at(self, 0, 0)
    }

    /// Returns an iterator over the vector's leaf arrays as chunks.
    #[must_use]
    pub fn chunks(&self) -> Chunks<'_, T> {
        Chunks::new(self.chunked_seq())
    }

    /// Folds over the elements a leaf array at a time.
    ///
    /// The folding function returns [`ControlFlow::Break`] to stop early;
    /// the carried value is then returned as the result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=100).collect();
    /// let sum = vector.reduce(0, |accumulator, element| {
    ///     ControlFlow::Continue(accumulator + element)
    /// });
    /// assert_eq!(sum, 5050);
    ///
    /// let first_over_40 = vector.reduce(None, |_, element| {
    ///     if *element > 40 {
    ///         ControlFlow::Break(Some(*element))
    ///     } else {
    ///         ControlFlow::Continue(None)
    ///     }
    /// });
    /// assert_eq!(first_over_40, Some(41));
    /// ```
    pub fn reduce<B, F>(&self, init: B, function: F) -> B
    where
        F: FnMut(B, &T) -> ControlFlow<B, B>,
    {
        let Some(seq) = self.chunked_seq() else {
            return init;
        };
        seq.reduce(init, function)
    }

    /// Returns an O(1) window `[start, end)` over this vector.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `end > len()` or `start > end`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let window = vector.subvector(2, 5).unwrap();
    /// assert_eq!(window.len(), 3);
    /// assert_eq!(window.get(0), Some(&2));
    /// assert!(vector.subvector(5, 11).is_err());
    /// ```
    pub fn subvector(&self, start: usize, end: usize) -> Result<SubVector<T>> {
        if end > self.length {
            return Err(CollectionError::index_out_of_range(end, self.length));
        }
        if start > end {
            return Err(CollectionError::index_out_of_range(start, self.length));
        }
        Ok(SubVector::new(self.clone(), start, end))
    }

    /// Returns `true` if both vectors share the leaf array holding `index`.
    ///
    /// Exposed for structural sharing checks.
    #[doc(hidden)]
    #[must_use]
    pub fn shares_leaf_with(&self, other: &Self, index: usize) -> bool {
        index < self.length
            && index < other.length
            && ReferenceCounter::ptr_eq(self.leaf_for(index), other.leaf_for(index))
    }

    /// Asserts the structural invariants of this vector.
    ///
    /// # Panics
    ///
    /// Panics if the tail length does not match the tail offset, the root
    /// shift is not the minimal one for the trie's contents, or the trie
    /// is malformed. Any such panic is a bug in this crate.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        let tail_offset = self.tail_offset();
        assert_eq!(
            self.tail.len(),
            self.length - tail_offset,
            "tail length does not match the tail offset"
        );
        assert!(
            self.length == 0 || !self.tail.is_empty(),
            "non-empty vector with an empty tail"
        );
        if tail_offset > 0 {
            assert_eq!(
                self.shift,
                required_shift(tail_offset - 1),
                "root shift is not minimal"
            );
        } else {
            assert_eq!(self.shift, BITS_PER_LEVEL, "empty trie with a raised root");
        }
        assert_eq!(
            self.root.check_invariants(self.shift),
            tail_offset,
            "trie does not hold exactly the elements below the tail offset"
        );
    }
}

impl<T: Clone> PersistentVector<T> {
    /// Appends an element to the back of the vector.
    ///
    /// Returns a new vector with the element at the end.
    ///
    /// # Complexity
    ///
    /// O(log32 N) amortized O(1) due to tail optimization
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::new()
    ///     .push_back(1)
    ///     .push_back(2)
    ///     .push_back(3);
    ///
    /// assert_eq!(vector.len(), 3);
    /// assert_eq!(vector.get(2), Some(&3));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        if self.tail.len() < BRANCHING_FACTOR {
            let mut new_tail = Vec::with_capacity(self.tail.len() + 1);
            new_tail.extend_from_slice(&self.tail);
            new_tail.push(element);

            Self {
                length: self.length + 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(new_tail),
            }
        } else {
            self.push_tail_to_root(element)
        }
    }

    /// Pushes the full tail into the trie and starts a new tail with `element`.
    fn push_tail_to_root(&self, element: T) -> Self {
        // The full tail becomes a trie leaf as-is; only its count is bumped.
        let tail_leaf = TrieNode::Leaf(self.tail.clone());
        let tail_offset = self.tail_offset();

        let (root, shift) = if required_shift(tail_offset) > self.shift {
            let shift = self.shift + BITS_PER_LEVEL;
            tracing::trace!(
                length = self.length + 1,
                shift,
                "vector trie grew a level"
            );
            (
                TrieNode::grow(self.root.clone(), self.shift, tail_leaf),
                shift,
            )
        } else {
            tracing::trace!(tail_offset, "vector tail pushed into the trie");
            (
                self.root.push_tail(self.shift, tail_offset, tail_leaf),
                self.shift,
            )
        };

        Self {
            length: self.length + 1,
            shift,
            root,
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Returns a new vector with the element at `index` replaced, or
    /// appended when `index == len()`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index > len()`.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// let updated = vector.assoc_n(2, 100).unwrap();
    /// assert_eq!(updated.get(2), Some(&100));
    /// assert_eq!(vector.get(2), Some(&3)); // Original unchanged
    ///
    /// let appended = vector.assoc_n(5, 6).unwrap();
    /// assert_eq!(appended.len(), 6);
    /// assert!(vector.assoc_n(6, 0).is_err());
    /// ```
    pub fn assoc_n(&self, index: usize, element: T) -> Result<Self> {
        match index.cmp(&self.length) {
            std::cmp::Ordering::Less => Ok(self.assoc_within(index, element)),
            std::cmp::Ordering::Equal => Ok(self.push_back(element)),
            std::cmp::Ordering::Greater => {
                Err(CollectionError::index_out_of_range(index, self.length))
            }
        }
    }

    /// Updates the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.update(0, 10).unwrap().get(0), Some(&10));
    /// assert!(vector.update(5, 10).is_none());
    /// ```
    #[must_use]
    pub fn update(&self, index: usize, element: T) -> Option<Self> {
        (index < self.length).then(|| self.assoc_within(index, element))
    }

    /// Replaces the element at an index known to be below `len()`.
    pub(crate) fn assoc_within(&self, index: usize, element: T) -> Self {
        debug_assert!(index < self.length);
        let tail_offset = self.tail_offset();

        if index >= tail_offset {
            let mut new_tail = self.tail.to_vec();
            new_tail[index - tail_offset] = element;

            Self {
                length: self.length,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(new_tail),
            }
        } else {
            Self {
                length: self.length,
                shift: self.shift,
                root: self.root.assoc(self.shift, index, element),
                tail: self.tail.clone(),
            }
        }
    }

    /// Appends every element of `iter`, in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let extended = vector.extend_from(4..=6);
    /// assert_eq!(extended.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    /// assert_eq!(vector.len(), 3);
    /// ```
    #[must_use]
    pub fn extend_from<I>(&self, iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        iter.into_iter()
            .fold(self.clone(), |vector, element| vector.push_back(element))
    }

    /// Creates a `PersistentVector` from a slice.
    #[must_use]
    pub fn from_slice(slice: &[T]) -> Self {
        build_persistent_vector_from_vec(slice.to_vec())
    }

    /// Returns a new vector with `function` applied to every element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let doubled = vector.map(|element| element * 2);
    /// assert_eq!(doubled.to_vec(), vec![2, 4, 6]);
    /// ```
    #[must_use]
    pub fn map<U, F>(&self, function: F) -> PersistentVector<U>
    where
        F: FnMut(&T) -> U,
    {
        build_persistent_vector_from_vec(self.iter().map(function).collect())
    }

    /// Copies the elements into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut elements = Vec::with_capacity(self.length);
        for chunk in self.chunks() {
            elements.extend_from_slice(chunk.as_slice());
        }
        elements
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to elements of a [`PersistentVector`].
///
/// The current leaf array is cached, so the trie is descended once per 32
/// elements.
pub struct PersistentVectorIterator<'a, T> {
    vector: &'a PersistentVector<T>,
    /// Next index to yield
    index: usize,
    /// One past the last index to yield
    end: usize,
    /// Leaf array holding `index`, loaded lazily at leaf boundaries
    leaf: Option<&'a [T]>,
}

impl<'a, T> PersistentVectorIterator<'a, T> {
    /// Creates an iterator over `[start, end)`; both must be within bounds.
    pub(crate) const fn range(vector: &'a PersistentVector<T>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= vector.length);
        Self {
            vector,
            index: start,
            end,
            leaf: None,
        }
    }
}

impl<'a, T> Iterator for PersistentVectorIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }

        let within = slot(self.index, 0);
        let leaf = match self.leaf {
            Some(leaf) if within != 0 => leaf,
            _ => {
                let leaf: &'a [T] = self.vector.leaf_for(self.index);
                self.leaf = Some(leaf);
                leaf
            }
        };

        self.index += 1;
        Some(&leaf[within])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.index;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for PersistentVectorIterator<'_, T> {}

impl<T> FusedIterator for PersistentVectorIterator<'_, T> {}

/// An owning iterator over the elements of a [`PersistentVector`].
///
/// Holds a reference count on the current leaf and clones elements out of it.
pub struct PersistentVectorIntoIterator<T> {
    vector: PersistentVector<T>,
    index: usize,
    leaf: Option<ReferenceCounter<[T]>>,
}

impl<T: Clone> Iterator for PersistentVectorIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.vector.length {
            return None;
        }

        let within = slot(self.index, 0);
        if within == 0 || self.leaf.is_none() {
            self.leaf = Some(self.vector.leaf_for(self.index).clone());
        }

        self.index += 1;
        self.leaf.as_ref().map(|leaf| leaf[within].clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.length - self.index;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for PersistentVectorIntoIterator<T> {}

impl<T: Clone> FusedIterator for PersistentVectorIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentVector<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for PersistentVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        build_persistent_vector_from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone> IntoIterator for PersistentVector<T> {
    type Item = T;
    type IntoIter = PersistentVectorIntoIterator<T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        PersistentVectorIntoIterator {
            vector: self,
            index: 0,
            leaf: None,
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentVector<T> {
    type Item = &'a T;
    type IntoIter = PersistentVectorIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Index<usize> for PersistentVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index).unwrap_or_else(|| {
            panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.length
            )
        })
    }
}

impl<T: PartialEq> PartialEq for PersistentVector<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if self.root.ptr_eq(&other.root) && ReferenceCounter::ptr_eq(&self.tail, &other.tail) {
            return true;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentVector<T> {}

/// Hashes the length, then each element in order, so equal vectors hash
/// equally.
impl<T: Hash> Hash for PersistentVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

/// Builds a vector from a `Vec` in one pass: full leaves go into the trie
/// bottom-up, the remainder (1 to 32 elements) becomes the tail.
fn build_persistent_vector_from_vec<T>(mut elements: Vec<T>) -> PersistentVector<T> {
    let length = elements.len();

    if length <= BRANCHING_FACTOR {
        return PersistentVector {
            length,
            shift: BITS_PER_LEVEL,
            root: TrieNode::empty_branch(),
            tail: ReferenceCounter::from(elements),
        };
    }

    let tail_elements = elements.split_off(tail_offset(length));
    let (root, shift) = build_root(elements);

    PersistentVector {
        length,
        shift,
        root,
        tail: ReferenceCounter::from(tail_elements),
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentVector<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentVectorVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> PersistentVectorVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentVectorVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = PersistentVector<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        let mut elements = Vec::with_capacity(capacity);
        while let Some(element) = seq.next_element()? {
            elements.push(element);
        }
        Ok(build_persistent_vector_from_vec(elements))
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentVector<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentVectorVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn built_by_push(length: usize) -> PersistentVector<usize> {
        (0..length).fold(PersistentVector::new(), |vector, element| {
            vector.push_back(element)
        })
    }

    #[rstest]
    fn test_display() {
        let vector: PersistentVector<i32> = (1..=3).collect();
        assert_eq!(format!("{vector}"), "[1, 2, 3]");
        assert_eq!(format!("{}", PersistentVector::<i32>::new()), "[]");
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(32)]
    #[case(33)]
    #[case(64)]
    #[case(1056)]
    #[case(1057)]
    #[case(32 * 32 * 32 + 33)]
    fn test_push_back_keeps_invariants(#[case] length: usize) {
        let vector = built_by_push(length);
        vector.check_invariants();
        assert_eq!(vector.len(), length);
        assert!(vector.iter().copied().eq(0..length));
    }

    #[rstest]
    #[case(0)]
    #[case(31)]
    #[case(32)]
    #[case(33)]
    #[case(1024)]
    #[case(1056)]
    #[case(1057)]
    #[case(40_000)]
    fn test_bulk_build_matches_push_back(#[case] length: usize) {
        let collected: PersistentVector<usize> = (0..length).collect();
        collected.check_invariants();
        assert_eq!(collected, built_by_push(length));
        assert_eq!(collected.shift, built_by_push(length).shift);
    }

    #[rstest]
    fn test_root_grows_when_rightmost_path_is_full() {
        let full = built_by_push(1056);
        assert_eq!(full.shift, BITS_PER_LEVEL);
        let grown = full.push_back(1056);
        assert_eq!(grown.shift, 2 * BITS_PER_LEVEL);
        grown.check_invariants();
        assert_eq!(grown.get(1023), Some(&1023));
        assert_eq!(grown.get(1056), Some(&1056));
    }

    #[rstest]
    fn test_push_back_shares_trie_leaves() {
        let vector = built_by_push(100);
        let extended = vector.push_back(100);
        assert!(vector.shares_leaf_with(&extended, 0));
        assert!(vector.shares_leaf_with(&extended, 64));
        assert!(!vector.shares_leaf_with(&extended, 96));
    }

    #[rstest]
    fn test_pushed_tail_becomes_leaf_without_copy() {
        let vector = built_by_push(32);
        let extended = vector.push_back(32);
        assert!(ReferenceCounter::ptr_eq(
            &vector.tail,
            extended.leaf_for(0)
        ));
    }

    #[rstest]
    fn test_assoc_within_trie_shares_siblings() {
        let vector = built_by_push(2000);
        let updated = vector.assoc_n(500, 0).unwrap();
        updated.check_invariants();

        assert_eq!(vector.get(500), Some(&500));
        assert_eq!(updated.get(500), Some(&0));
        assert!(!vector.shares_leaf_with(&updated, 500));
        assert!(vector.shares_leaf_with(&updated, 0));
        assert!(vector.shares_leaf_with(&updated, 1500));
        assert!(ReferenceCounter::ptr_eq(&vector.tail, &updated.tail));
    }

    #[rstest]
    fn test_assoc_in_tail_shares_root() {
        let vector = built_by_push(40);
        let updated = vector.assoc_n(35, 0).unwrap();
        assert!(vector.root.ptr_eq(&updated.root));
        assert_eq!(updated.get(35), Some(&0));
        assert_eq!(vector.get(35), Some(&35));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(5, 6)]
    #[case(100, 1000)]
    fn test_assoc_n_out_of_range(#[case] length: usize, #[case] index: usize) {
        let vector = built_by_push(length);
        assert_eq!(
            vector.assoc_n(index + 1, 0).unwrap_err(),
            CollectionError::index_out_of_range(index + 1, length)
        );
    }

    #[rstest]
    fn test_get_or_and_nth() {
        let vector = built_by_push(1000);
        assert_eq!(vector.nth(500), Ok(&500));
        assert_eq!(
            vector.nth(1000),
            Err(CollectionError::index_out_of_range(1000, 1000))
        );
        assert_eq!(vector.get_or(1000, &7), &7);
    }

    #[rstest]
    #[should_panic(expected = "index out of bounds")]
    fn test_index_panics_out_of_bounds() {
        let vector = built_by_push(3);
        let _ = vector[3];
    }

    #[rstest]
    fn test_into_iter_matches_iter() {
        let vector = built_by_push(777);
        let owned: Vec<usize> = vector.clone().into_iter().collect();
        let borrowed: Vec<usize> = vector.iter().copied().collect();
        assert_eq!(owned, borrowed);
        assert_eq!(vector.iter().len(), 777);
    }

    #[rstest]
    fn test_reduce_short_circuits() {
        let vector = built_by_push(500);
        let mut visited = 0;
        let found = vector.reduce(0, |accumulator, element| {
            visited += 1;
            if *element == 40 {
                ControlFlow::Break(accumulator + element)
            } else {
                ControlFlow::Continue(accumulator + element)
            }
        });
        assert_eq!(found, (0..=40).sum::<usize>());
        assert_eq!(visited, 41);
    }

    #[rstest]
    fn test_map_and_to_vec() {
        let vector = built_by_push(70);
        let mapped = vector.map(|element| element + 1);
        mapped.check_invariants();
        assert_eq!(mapped.to_vec(), (1..=70).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_equal_vectors_hash_equally() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |vector: &PersistentVector<usize>| {
            let mut hasher = DefaultHasher::new();
            vector.hash(&mut hasher);
            hasher.finish()
        };
        let pushed = built_by_push(300);
        let collected: PersistentVector<usize> = (0..300).collect();
        assert_eq!(hash(&pushed), hash(&collected));
    }
}

// =============================================================================
// Thread Safety Tests (arc feature only)
// =============================================================================

#[cfg(all(test, feature = "arc"))]
mod multithread_tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[rstest]
    fn test_vector_shared_across_threads() {
        let vector: PersistentVector<i32> = (0..10000).collect();

        let vector1 = vector.clone();
        let vector2 = vector;

        let handle1 = thread::spawn(move || vector1.iter().sum::<i32>());
        let handle2 = thread::spawn(move || vector2.iter().sum::<i32>());

        let sum1 = handle1.join().unwrap();
        let sum2 = handle2.join().unwrap();

        assert_eq!(sum1, sum2);
        assert_eq!(sum1, (0..10000).sum::<i32>());
    }

    #[rstest]
    fn test_versions_diverge_independently_across_threads() {
        let base: PersistentVector<i32> = (0..5000).collect();

        let handles: Vec<_> = (0..4)
            .map(|thread_id| {
                let version = base.clone();
                thread::spawn(move || {
                    let updated = version.assoc_n(thread_id * 1000, -1).unwrap();
                    (updated.get(thread_id * 1000).copied(), updated.len())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), (Some(-1), 5000));
        }
        assert!(base.iter().copied().eq(0..5000));
    }
}
