//! Persistent (immutable) hash set.
//!
//! This module provides [`PersistentHashSet`], an immutable hash set
//! that uses [`PersistentHashMap`] internally.
//!
//! # Overview
//!
//! `PersistentHashSet` is a wrapper around `PersistentHashMap<T, ()>`:
//!
//! - O(log32 N) contains (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! # Examples
//!
//! ```rust
//! use persistent_trie::persistent::PersistentHashSet;
//!
//! let set = PersistentHashSet::new()
//!     .insert(1)
//!     .insert(2)
//!     .insert(3);
//!
//! assert!(set.contains(&1));
//! assert!(!set.contains(&4));
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);      // Original unchanged
//! assert_eq!(updated.len(), 4);  // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, FusedIterator};

use super::hashmap::{PersistentHashMap, PersistentHashMapIntoIterator, PersistentHashMapIterator};
use crate::error::{CollectionError, Result};

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on [`PersistentHashMap`].
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::PersistentHashSet;
///
/// let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
/// assert_eq!(set.len(), 3);
/// assert!(set.contains(&2));
/// ```
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> Clone for PersistentHashSet<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PersistentHashSet<T> {
    /// Creates a new empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentHashMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns the number of elements in the set.
    ///
    /// Same as [`len`](Self::len).
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the set contains `element`.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Returns the stored element equal to `element`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::singleton("stored".to_string());
    /// assert_eq!(set.get("stored"), Some(&"stored".to_string()));
    /// assert_eq!(set.get("other"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get_key_value(element).map(|(stored, _)| stored)
    }

    /// Returns the stored element equal to `element`, or fails with
    /// `KeyNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the element is absent.
    pub fn fetch<Q>(&self, element: &Q) -> Result<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(element)
            .ok_or_else(|| CollectionError::key_not_found(element))
    }

    /// Returns an iterator over the elements of the set.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }

    /// Returns `true` if both sets share the same trie.
    #[doc(hidden)]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T: Hash + Eq> PersistentHashSet<T> {
    /// Asserts the structural invariants of the underlying trie.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        self.inner.check_invariants();
    }

    /// Returns `true` if every element of `self` is in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let subset: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let superset: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    ///
    /// assert!(subset.is_subset(&superset));
    /// assert!(!superset.is_subset(&subset));
    /// ```
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(element))
    }
}

impl<T: Clone + Hash + Eq> PersistentHashSet<T> {
    /// Creates a set containing a single element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Inserts an element into the set.
    ///
    /// If the element is already present, the receiver is returned
    /// unchanged, still sharing its trie.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::new().insert(1);
    /// let same = set.insert(1);
    /// assert_eq!(same.len(), 1);
    /// ```
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        if self.contains(&element) {
            return self.clone();
        }
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element from the set.
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of two sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// assert_eq!(set_a.union(&set_b).len(), 3);
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller
            .iter()
            .fold(larger.clone(), |set, element| set.insert(element.clone()))
    }

    /// Returns the elements present in both sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let intersection = set_a.intersection(&set_b);
    /// assert_eq!(intersection.len(), 2);
    /// assert!(intersection.contains(&2));
    /// ```
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller
            .iter()
            .filter(|element| larger.contains(*element))
            .cloned()
            .collect()
    }

    /// Returns the elements of `self` that are not in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let difference = set_a.difference(&set_b);
    /// assert_eq!(difference.len(), 1);
    /// assert!(difference.contains(&1));
    /// ```
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        if self.len() <= other.len() {
            self.iter()
                .filter(|element| !other.contains(*element))
                .cloned()
                .collect()
        } else {
            other
                .iter()
                .fold(self.clone(), |set, element| set.remove(element))
        }
    }

    /// Returns a new set with `function` applied to every element.
    ///
    /// Elements that map to equal values collapse into one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = [1, 2, 3, 4].into_iter().collect();
    /// let parity = set.map(|element| element % 2);
    /// assert_eq!(parity.len(), 2);
    /// ```
    #[must_use]
    pub fn map<U, F>(&self, function: F) -> PersistentHashSet<U>
    where
        U: Clone + Hash + Eq,
        F: FnMut(&T) -> U,
    {
        self.iter().map(function).collect()
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, _)| element)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {}

impl<T> FusedIterator for PersistentHashSetIterator<'_, T> {}

/// An owning iterator over elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T> {
    inner: PersistentHashMapIntoIterator<T, ()>,
}

impl<T> Iterator for PersistentHashSetIntoIterator<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIntoIterator<T> {}

impl<T> FusedIterator for PersistentHashSetIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentHashSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|element| (element, ())).collect(),
        }
    }
}

impl<T: Clone> IntoIterator for PersistentHashSet<T> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Hash + Eq> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Hash + Eq> Eq for PersistentHashSet<T> {}

/// Order-independent, like the map it wraps.
impl<T: Hash> Hash for PersistentHashSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{{")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentHashSet<T> {
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
struct PersistentHashSetVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> PersistentHashSetVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentHashSetVisitor<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    type Value = PersistentHashSet<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut set = PersistentHashSet::new();
        while let Some(element) = seq.next_element()? {
            set = set.insert(element);
        }
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentHashSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentHashSetVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_display_empty_hashset() {
        let set: PersistentHashSet<i32> = PersistentHashSet::new();
        assert_eq!(format!("{set}"), "#{}");
    }

    #[rstest]
    fn test_display_single_element_hashset() {
        let set = PersistentHashSet::singleton(42);
        assert_eq!(format!("{set}"), "#{42}");
    }

    #[rstest]
    fn test_insert_present_returns_receiver() {
        let set: PersistentHashSet<i32> = (0..50).collect();
        let same = set.insert(25);
        assert!(same.ptr_eq(&set));
    }

    #[rstest]
    fn test_remove_is_idempotent() {
        let set: PersistentHashSet<i32> = (0..50).collect();
        let once = set.remove(&10);
        let twice = once.remove(&10);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 49);
        twice.check_invariants();
    }

    #[rstest]
    fn test_get_returns_stored_element() {
        let set = PersistentHashSet::singleton("x".to_string());
        assert_eq!(set.fetch("x").map(String::as_str), Ok("x"));
        assert_eq!(
            set.fetch("y"),
            Err(CollectionError::KeyNotFound {
                key: "\"y\"".to_string()
            })
        );
    }

    #[rstest]
    #[case(&[1, 2, 3], &[2, 3, 4], &[1, 2, 3, 4], &[2, 3], &[1])]
    #[case(&[], &[1], &[1], &[], &[])]
    #[case(&[1, 2], &[], &[1, 2], &[], &[1, 2])]
    fn test_set_algebra(
        #[case] left: &[i32],
        #[case] right: &[i32],
        #[case] union: &[i32],
        #[case] intersection: &[i32],
        #[case] difference: &[i32],
    ) {
        let left: PersistentHashSet<i32> = left.iter().copied().collect();
        let right: PersistentHashSet<i32> = right.iter().copied().collect();
        let expect = |elements: &[i32]| elements.iter().copied().collect::<PersistentHashSet<i32>>();

        assert_eq!(left.union(&right), expect(union));
        assert_eq!(left.intersection(&right), expect(intersection));
        assert_eq!(left.difference(&right), expect(difference));
    }

    #[rstest]
    fn test_map_collapses_equal_images() {
        let set: PersistentHashSet<i32> = (0..10).collect();
        let mapped = set.map(|element| element / 5);
        assert_eq!(mapped.len(), 2);
        assert!(mapped.contains(&0) && mapped.contains(&1));
    }

    #[rstest]
    fn test_owned_iteration_yields_every_element() {
        let set: PersistentHashSet<i32> = (0..100).collect();
        let iter = set.clone().into_iter();
        assert_eq!(iter.len(), 100);
        let mut elements: Vec<i32> = iter.collect();
        elements.sort_unstable();
        assert_eq!(elements, (0..100).collect::<Vec<_>>());
        assert_eq!(set.len(), 100);
    }
}
