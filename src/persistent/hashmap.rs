//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! `PersistentHashMap` is a Hash Array Mapped Trie (HAMT). It provides:
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Examples
//!
//! ```rust
//! use persistent_trie::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), None);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, FusedIterator};
use std::ops::Index;

use super::ReferenceCounter;
use super::bits::hash_of;
use super::hamt::{Iter, Node};
use super::hashset::PersistentHashSet;
use super::vector::PersistentVector;
use crate::error::{CollectionError, Result};

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
pub struct PersistentHashMap<K, V> {
    /// Root node of the trie
    root: ReferenceCounter<Node<K, V>>,
    /// Number of entries
    length: usize,
}

impl<K, V> Clone for PersistentHashMap<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty()),
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns the number of entries in the map.
    ///
    /// Same as [`len`](Self::len).
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("key".to_string(), 42);
    /// assert_eq!(map.get("key"), Some(&42));
    /// assert_eq!(map.get("other"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and its value for `key`.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.get(0, hash_of(key), key)
    }

    /// Returns the value for `key`, or `default` when absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("a", 1);
    /// assert_eq!(map.get_or("a", &0), &1);
    /// assert_eq!(map.get_or("b", &0), &0);
    /// ```
    #[must_use]
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns the value for `key`, or fails with `KeyNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` carrying the `Debug` rendering of `key` if it
    /// is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::CollectionError;
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("a", 1);
    /// assert_eq!(map.fetch("a"), Ok(&1));
    /// assert_eq!(
    ///     map.fetch("b"),
    ///     Err(CollectionError::KeyNotFound { key: "\"b\"".to_string() })
    /// );
    /// ```
    pub fn fetch<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(key)
            .ok_or_else(|| CollectionError::key_not_found(key))
    }

    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Returns an iterator over key-value pairs.
    ///
    /// Iteration order is determined by key hashes and is stable for a
    /// given map value.
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            inner: Iter::new(&self.root, self.length),
        }
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Returns `true` if both maps share the same root node.
    #[doc(hidden)]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.root, &other.root)
    }
}

impl<K: Hash + Eq, V> PersistentHashMap<K, V> {
    /// Asserts the structural invariants of the trie.
    ///
    /// # Panics
    ///
    /// Panics if an entry is stored off its hash path, a cached hash is
    /// stale, a lone entry is left below the root, or the entry count is
    /// wrong. Any such panic is a bug in this crate.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        assert_eq!(
            self.root.check_invariants(0, 0, &hash_of::<K>),
            self.length,
            "entry count does not match the trie contents"
        );
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentHashMap<K, V> {
    /// Creates a map containing a single entry.
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Creates a map from key-value pairs; later pairs win on duplicate keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::from_pairs([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get("a"), Some(&3));
    /// ```
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |map, (key, value)| map.insert(key, value))
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_of(&key);
        let (root, added) = self.root.insert(0, hash, key, value);
        Self {
            root: ReferenceCounter::new(root),
            length: if added { self.length + 1 } else { self.length },
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key is absent, the result
    /// shares the receiver's root.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root
            .remove(0, hash_of(key), key)
            .map_or_else(
                || self.clone(),
                |root| Self {
                    root: ReferenceCounter::new(root),
                    length: self.length - 1,
                },
            )
    }

    /// Updates the entry for `key` with `updater`.
    ///
    /// The updater receives the current value, if any. Returning `Some`
    /// stores the new value, returning `None` removes the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("count", 10);
    ///
    /// let updated = map.update_with("count", |value| value.map(|value| value + 1));
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<F>(&self, key: K, updater: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let current = self.get(&key);
        let present = current.is_some();
        match (present, updater(current)) {
            (_, Some(value)) => self.insert(key, value),
            (true, None) => self.remove(&key),
            (false, None) => self.clone(),
        }
    }

    /// Merges two maps, with values from `other` taking precedence on key
    /// conflicts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let left = PersistentHashMap::from_pairs([("a", 1), ("b", 2)]);
    /// let right = PersistentHashMap::from_pairs([("b", 20), ("c", 3)]);
    /// let merged = left.merge(&right);
    ///
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20));
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        other.iter().fold(self.clone(), |map, (key, value)| {
            map.insert(key.clone(), value.clone())
        })
    }

    /// Returns the keys as a set.
    #[must_use]
    pub fn key_set(&self) -> PersistentHashSet<K> {
        self.keys().cloned().collect()
    }

    /// Returns the entries as a vector of pairs, in iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_trie::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::from_pairs([("a", 1), ("b", 2)]);
    /// let mut entries = map.entries().to_vec();
    /// entries.sort_unstable();
    /// assert_eq!(entries, vec![("a", 1), ("b", 2)]);
    /// ```
    #[must_use]
    pub fn entries(&self) -> PersistentVector<(K, V)> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {}

impl<K, V> FusedIterator for PersistentHashMapIterator<'_, K, V> {}

/// An owning iterator over entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {}

impl<K, V> FusedIterator for PersistentHashMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentHashMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, Q, V> Index<&Q> for PersistentHashMap<K, V>
where
    K: Borrow<Q>,
    Q: Hash + Eq + fmt::Debug + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &Self::Output {
        self.get(key)
            .unwrap_or_else(|| panic!("key not found: {key:?}"))
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if self.ptr_eq(other) {
            return true;
        }
        self.iter()
            .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Hash + Eq, V: Eq> Eq for PersistentHashMap<K, V> {}

/// Order-independent: entry hashes are combined with a commutative sum, so
/// equal maps hash equally whatever their insertion history.
impl<K: Hash, V: Hash> Hash for PersistentHashMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self.iter().fold(0_u32, |combined, entry| {
            combined.wrapping_add(hash_of(&entry))
        });
        self.length.hash(state);
        combined.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentHashMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<K, V> PersistentHashMapVisitor<K, V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentHashMap::new();
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================
