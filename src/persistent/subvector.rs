//! Index windows over a [`PersistentVector`].
//!
//! A [`SubVector`] is a `[start, end)` view that shares the whole trie of
//! its backing vector. Taking a window of a window re-anchors onto the
//! backing vector, so windows never nest.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{ControlFlow, Index};

use super::vector::{PersistentVector, PersistentVectorIterator};
use crate::error::{CollectionError, Result};

/// An O(1) window `[start, end)` over a persistent vector.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// let window = vector.subvector(10, 20).unwrap();
/// assert_eq!(window.len(), 10);
/// assert_eq!(window.get(0), Some(&10));
///
/// let inner = window.subvector(2, 4).unwrap();
/// assert_eq!(inner.iter().copied().collect::<Vec<_>>(), vec![12, 13]);
/// ```
pub struct SubVector<T> {
    vector: PersistentVector<T>,
    start: usize,
    end: usize,
}

impl<T> Clone for SubVector<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            vector: self.vector.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

impl<T> SubVector<T> {
    /// Callers guarantee `start <= end <= vector.len()`.
    pub(crate) const fn new(vector: PersistentVector<T>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= vector.len());
        Self { vector, start, end }
    }

    /// Returns the number of elements in the window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the window is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the element at `index`, relative to the window's start.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            self.vector.get(self.start + index)
        } else {
            None
        }
    }

    /// Returns the element at `index`, or fails with `IndexOutOfRange`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len()`.
    pub fn nth(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or_else(|| CollectionError::index_out_of_range(index, self.len()))
    }

    /// Returns the element at `index`, or `default` when out of bounds.
    #[must_use]
    pub fn get_or<'a>(&'a self, index: usize, default: &'a T) -> &'a T {
        self.get(index).unwrap_or(default)
    }

    /// Returns the first element of the window.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element of the window.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Returns a narrower window, anchored on the same backing vector.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `end > len()` or `start > end`.
    pub fn subvector(&self, start: usize, end: usize) -> Result<Self> {
        if end > self.len() {
            return Err(CollectionError::index_out_of_range(end, self.len()));
        }
        if start > end {
            return Err(CollectionError::index_out_of_range(start, self.len()));
        }
        Ok(Self::new(
            self.vector.clone(),
            self.start + start,
            self.start + end,
        ))
    }

    /// Returns an iterator over the window's elements.
    #[must_use]
    pub fn iter(&self) -> PersistentVectorIterator<'_, T> {
        PersistentVectorIterator::range(&self.vector, self.start, self.end)
    }

    /// Folds the window's elements in order, stopping as soon as `function`
    /// returns [`ControlFlow::Break`].
    pub fn reduce<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, &T) -> ControlFlow<B, B>,
    {
        match self
            .iter()
            .try_fold(init, |accumulator, element| function(accumulator, element))
        {
            ControlFlow::Continue(value) | ControlFlow::Break(value) => value,
        }
    }
}

impl<T: Clone> SubVector<T> {
    /// Appends an element at the window's end.
    ///
    /// The element is written into the backing vector at position `end`,
    /// replacing whatever the backing vector held there. Elements of the
    /// backing vector outside the window are never observable through it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..5).collect();
    /// let window = vector.subvector(1, 3).unwrap().push_back(99);
    /// assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![1, 2, 99]);
    /// assert_eq!(vector.get(3), Some(&3));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        let vector = if self.end == self.vector.len() {
            self.vector.push_back(element)
        } else {
            self.vector.assoc_within(self.end, element)
        };
        Self::new(vector, self.start, self.end + 1)
    }

    /// Replaces the element at `index`, or appends when `index == len()`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index > len()`.
    pub fn assoc_n(&self, index: usize, element: T) -> Result<Self> {
        match index.cmp(&self.len()) {
            std::cmp::Ordering::Less => Ok(Self::new(
                self.vector.assoc_within(self.start + index, element),
                self.start,
                self.end,
            )),
            std::cmp::Ordering::Equal => Ok(self.push_back(element)),
            std::cmp::Ordering::Greater => {
                Err(CollectionError::index_out_of_range(index, self.len()))
            }
        }
    }

    /// Copies the window into a standalone vector.
    #[must_use]
    pub fn to_vector(&self) -> PersistentVector<T> {
        self.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a SubVector<T> {
    type Item = &'a T;
    type IntoIter = PersistentVectorIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Index<usize> for SubVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index).unwrap_or_else(|| {
            panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.len()
            )
        })
    }
}

impl<T: PartialEq> PartialEq for SubVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for SubVector<T> {}

impl<T: PartialEq> PartialEq<PersistentVector<T>> for SubVector<T> {
    fn eq(&self, other: &PersistentVector<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<SubVector<T>> for PersistentVector<T> {
    fn eq(&self, other: &SubVector<T>) -> bool {
        other == self
    }
}

/// Hashes like a [`PersistentVector`] with the same elements.
impl<T: Hash> Hash for SubVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SubVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for SubVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (position, element) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}
