//! Leaf-at-a-time traversal of a [`PersistentVector`].
//!
//! A [`ChunkedSeq`] walks a vector one trie leaf (or the tail) at a time.
//! Each step exposes the remainder of the current leaf as an
//! [`ArrayChunk`], so bulk consumers touch the trie once per 32 elements.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::ControlFlow;

use super::bits::BRANCHING_FACTOR;
use super::vector::PersistentVector;
use crate::error::{CollectionError, Result};

// =============================================================================
// ArrayChunk
// =============================================================================

/// A read-only window over the unconsumed part of one leaf array.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..10).collect();
/// let chunk = vector.chunked_seq().unwrap().first_chunk();
/// assert_eq!(chunk.len(), 10);
///
/// let rest = chunk.drop_first().unwrap();
/// assert_eq!(rest.nth(0), Ok(&1));
/// assert_eq!(rest.len(), 9);
/// ```
pub struct ArrayChunk<'a, T> {
    elements: &'a [T],
}

impl<T> Clone for ArrayChunk<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayChunk<'_, T> {}

impl<'a, T> ArrayChunk<'a, T> {
    pub(crate) const fn new(elements: &'a [T]) -> Self {
        Self { elements }
    }

    /// Returns the number of elements left in the chunk.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the chunk has no elements left.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at `index`, relative to the chunk's start.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len()`.
    pub fn nth(&self, index: usize) -> Result<&'a T> {
        self.elements
            .get(index)
            .ok_or_else(|| CollectionError::index_out_of_range(index, self.len()))
    }

    /// Returns the element at `index`, or `default` when out of bounds.
    #[must_use]
    pub fn get_or(&self, index: usize, default: &'a T) -> &'a T {
        self.elements.get(index).unwrap_or(default)
    }

    /// Returns the remaining elements as a slice of the underlying leaf.
    #[inline]
    #[must_use]
    pub const fn as_slice(&self) -> &'a [T] {
        self.elements
    }

    /// Returns the chunk without its first element.
    ///
    /// # Errors
    ///
    /// Returns `EmptyChunk` if the chunk has no elements left.
    pub fn drop_first(&self) -> Result<Self> {
        self.elements
            .split_first()
            .map(|(_, rest)| Self::new(rest))
            .ok_or(CollectionError::EmptyChunk)
    }

    /// Folds the chunk's elements in order.
    ///
    /// Returns `Break` with the carried value as soon as `function` does, so
    /// callers folding several chunks know to stop.
    pub fn reduce<B, F>(&self, init: B, mut function: F) -> ControlFlow<B, B>
    where
        F: FnMut(B, &'a T) -> ControlFlow<B, B>,
    {
        let mut accumulator = init;
        for element in self.elements {
            match function(accumulator, element) {
                ControlFlow::Continue(value) => accumulator = value,
                ControlFlow::Break(value) => return ControlFlow::Break(value),
            }
        }
        ControlFlow::Continue(accumulator)
    }
}

impl<T: fmt::Debug> fmt::Debug for ArrayChunk<'_, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.elements).finish()
    }
}

// =============================================================================
// ChunkedSeq
// =============================================================================

/// A position in a vector, remembered as a leaf plus an offset into it.
///
/// Only constructed for a position that holds an element, so
/// [`first`](Self::first) always succeeds.
pub struct ChunkedSeq<'a, T> {
    vector: &'a PersistentVector<T>,
    /// Index of the leaf's first element in the vector
    index: usize,
    /// Position within the leaf
    offset: usize,
    leaf: &'a [T],
}

impl<T> Clone for ChunkedSeq<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChunkedSeq<'_, T> {}

impl<'a, T> ChunkedSeq<'a, T> {
    /// Positions a sequence at `offset` within the leaf starting at `index`.
    ///
    /// Returns `None` once the position is past the end of the vector.
    pub(crate) fn at(vector: &'a PersistentVector<T>, index: usize, offset: usize) -> Option<Self> {
        if index + offset >= vector.len() {
            return None;
        }
        let leaf: &'a [T] = vector.leaf_for(index);
        Some(Self {
            vector,
            index,
            offset,
            leaf,
        })
    }

    /// Returns the element at the current position.
    #[inline]
    #[must_use]
    pub fn first(&self) -> &'a T {
        &self.leaf[self.offset]
    }

    /// Returns the sequence advanced by one element, or `None` at the end.
    ///
    /// Stays within the current leaf until it is exhausted.
    #[must_use]
    pub fn rest(&self) -> Option<Self> {
        if self.offset + 1 < self.leaf.len() {
            Some(Self {
                offset: self.offset + 1,
                ..*self
            })
        } else {
            self.next_chunk()
        }
    }

    /// Returns the remainder of the current leaf as a chunk.
    #[inline]
    #[must_use]
    pub fn first_chunk(&self) -> ArrayChunk<'a, T> {
        ArrayChunk::new(&self.leaf[self.offset..])
    }

    /// Returns the sequence positioned at the start of the next leaf, or
    /// `None` if the current leaf is the last.
    #[must_use]
    pub fn next_chunk(&self) -> Option<Self> {
        Self::at(self.vector, self.index + self.leaf.len(), 0)
    }

    /// Returns the number of elements from the current position to the end.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.vector.len() - (self.index + self.offset)
    }

    /// Folds the remaining elements a chunk at a time, stopping as soon as
    /// `function` returns [`ControlFlow::Break`].
    pub fn reduce<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, &'a T) -> ControlFlow<B, B>,
    {
        let mut accumulator = init;
        let mut current = Some(*self);

        while let Some(seq) = current {
            match seq.first_chunk().reduce(accumulator, &mut function) {
                ControlFlow::Continue(value) => accumulator = value,
                ControlFlow::Break(value) => return value,
            }
            current = seq.next_chunk();
        }

        accumulator
    }
}

impl<T: fmt::Debug> fmt::Debug for ChunkedSeq<'_, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChunkedSeq")
            .field("index", &(self.index + self.offset))
            .field("chunk", &self.first_chunk())
            .finish()
    }
}

// =============================================================================
// Chunks Iterator
// =============================================================================

/// An iterator over the chunks of a vector.
///
/// Created by [`PersistentVector::chunks`].
pub struct Chunks<'a, T> {
    current: Option<ChunkedSeq<'a, T>>,
}

impl<'a, T> Chunks<'a, T> {
    pub(crate) const fn new(current: Option<ChunkedSeq<'a, T>>) -> Self {
        Self { current }
    }
}

impl<'a, T> Iterator for Chunks<'a, T> {
    type Item = ArrayChunk<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.current?;
        self.current = seq.next_chunk();
        Some(seq.first_chunk())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.current.map_or(0, |seq| {
            (seq.vector.len() - seq.index).div_ceil(BRANCHING_FACTOR)
        });
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Chunks<'_, T> {}

impl<T> FusedIterator for Chunks<'_, T> {}
