//! A closed sum over the persistent collections.
//!
//! A dynamically typed runtime holds its collection values as one type.
//! [`Collection`] is that type for a host value `T`: a vector of values, a
//! map from values to values, or a set of values. Operations dispatch on
//! the variant.
//!
//! # Examples
//!
//! ```rust
//! use persistent_trie::collection::{Collection, CollectionKind, MapEntry};
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! enum Value {
//!     Int(i64),
//!     Pair(Box<Value>, Box<Value>),
//! }
//!
//! impl MapEntry for Value {
//!     fn into_entry(self) -> Result<(Self, Self), Self> {
//!         match self {
//!             Value::Pair(key, value) => Ok((*key, *value)),
//!             other => Err(other),
//!         }
//!     }
//!
//!     fn from_entry(key: Self, value: Self) -> Self {
//!         Value::Pair(Box::new(key), Box::new(value))
//!     }
//! }
//!
//! let map = Collection::empty_of(CollectionKind::Map)
//!     .conj(Value::from_entry(Value::Int(1), Value::Int(2)))
//!     .unwrap();
//! assert_eq!(map.count(), 1);
//! assert!(map.conj(Value::Int(3)).is_err());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

use crate::error::{CollectionError, Result};
use crate::persistent::{
    PersistentHashMap, PersistentHashMapIterator, PersistentHashSet, PersistentHashSetIterator,
    PersistentVector, PersistentVectorIterator,
};

/// Conversion between a host value and a map entry.
///
/// A map conjoins only values that decompose into a key and a value, and
/// yields its entries back as host values when iterated.
pub trait MapEntry: Sized {
    /// Splits an entry-shaped value into its key and value, or returns the
    /// value unchanged when it is not entry-shaped.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if the value is not a key/value pair.
    fn into_entry(self) -> std::result::Result<(Self, Self), Self>;

    /// Builds the host value representing one map entry.
    fn from_entry(key: Self, value: Self) -> Self;
}

/// The variant of a [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// An indexed sequence.
    Vector,
    /// A key-to-value map.
    Map,
    /// An unordered set.
    Set,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vector => "vector",
            Self::Map => "map",
            Self::Set => "set",
        };
        formatter.write_str(name)
    }
}

/// A persistent collection of host values.
pub enum Collection<T> {
    /// A [`PersistentVector`] of values.
    Vector(PersistentVector<T>),
    /// A [`PersistentHashMap`] from values to values.
    Map(PersistentHashMap<T, T>),
    /// A [`PersistentHashSet`] of values.
    Set(PersistentHashSet<T>),
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Vector(vector) => Self::Vector(vector.clone()),
            Self::Map(map) => Self::Map(map.clone()),
            Self::Set(set) => Self::Set(set.clone()),
        }
    }
}

impl<T> Collection<T> {
    /// Creates an empty collection of the given kind.
    #[must_use]
    pub fn empty_of(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Vector => Self::Vector(PersistentVector::new()),
            CollectionKind::Map => Self::Map(PersistentHashMap::new()),
            CollectionKind::Set => Self::Set(PersistentHashSet::new()),
        }
    }

    /// Returns an empty collection of the same kind.
    #[must_use]
    pub fn empty(&self) -> Self {
        Self::empty_of(self.kind())
    }

    /// Returns which collection this is.
    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        match self {
            Self::Vector(_) => CollectionKind::Vector,
            Self::Map(_) => CollectionKind::Map,
            Self::Set(_) => CollectionKind::Set,
        }
    }

    /// Returns the number of elements (entries for a map).
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Vector(vector) => vector.len(),
            Self::Map(map) => map.len(),
            Self::Set(set) => set.len(),
        }
    }

    /// Returns `true` if the collection has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl<T: Clone + MapEntry> Collection<T> {
    /// Returns an iterator over the elements.
    ///
    /// Map entries are yielded as host values built by
    /// [`MapEntry::from_entry`].
    #[must_use]
    pub fn iter(&self) -> CollectionIter<'_, T> {
        match self {
            Self::Vector(vector) => CollectionIter::Vector(vector.iter()),
            Self::Map(map) => CollectionIter::Map(map.iter()),
            Self::Set(set) => CollectionIter::Set(set.iter()),
        }
    }
}

impl<T: Clone + Hash + Eq + MapEntry> Collection<T> {
    /// Adds `item` the way the collection naturally grows: appended to a
    /// vector, inserted as an entry into a map, added to a set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` when conjoining onto a map an item that is not
    /// a key/value pair.
    pub fn conj(&self, item: T) -> Result<Self> {
        match self {
            Self::Vector(vector) => Ok(Self::Vector(vector.push_back(item))),
            Self::Map(map) => item
                .into_entry()
                .map(|(key, value)| Self::Map(map.insert(key, value)))
                .map_err(|_| CollectionError::InvalidEntry),
            Self::Set(set) => Ok(Self::Set(set.insert(item))),
        }
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// An iterator over the elements of a [`Collection`], yielding owned values.
pub enum CollectionIter<'a, T> {
    /// Walks a vector in index order.
    Vector(PersistentVectorIterator<'a, T>),
    /// Walks map entries.
    Map(PersistentHashMapIterator<'a, T, T>),
    /// Walks set elements.
    Set(PersistentHashSetIterator<'a, T>),
}

impl<T: Clone + MapEntry> Iterator for CollectionIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Vector(iter) => iter.next().cloned(),
            Self::Map(iter) => iter
                .next()
                .map(|(key, value)| T::from_entry(key.clone(), value.clone())),
            Self::Set(iter) => iter.next().cloned(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Vector(iter) => iter.size_hint(),
            Self::Map(iter) => iter.size_hint(),
            Self::Set(iter) => iter.size_hint(),
        }
    }
}

impl<T: Clone + MapEntry> ExactSizeIterator for CollectionIter<'_, T> {}

impl<T: Clone + MapEntry> FusedIterator for CollectionIter<'_, T> {}

impl<'a, T: Clone + MapEntry> IntoIterator for &'a Collection<T> {
    type Item = T;
    type IntoIter = CollectionIter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> From<PersistentVector<T>> for Collection<T> {
    fn from(vector: PersistentVector<T>) -> Self {
        Self::Vector(vector)
    }
}

impl<T> From<PersistentHashMap<T, T>> for Collection<T> {
    fn from(map: PersistentHashMap<T, T>) -> Self {
        Self::Map(map)
    }
}

impl<T> From<PersistentHashSet<T>> for Collection<T> {
    fn from(set: PersistentHashSet<T>) -> Self {
        Self::Set(set)
    }
}

/// Collections of different kinds are never equal, even when empty.
impl<T: Hash + Eq> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Vector(left), Self::Vector(right)) => left == right,
            (Self::Map(left), Self::Map(right)) => left == right,
            (Self::Set(left), Self::Set(right)) => left == right,
            _ => false,
        }
    }
}

impl<T: Hash + Eq> Eq for Collection<T> {}

impl<T: Hash> Hash for Collection<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Vector(vector) => vector.hash(state),
            Self::Map(map) => map.hash(state),
            Self::Set(set) => set.hash(state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(vector) => formatter.debug_tuple("Vector").field(vector).finish(),
            Self::Map(map) => formatter.debug_tuple("Map").field(map).finish(),
            Self::Set(set) => formatter.debug_tuple("Set").field(set).finish(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Collection<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(vector) => fmt::Display::fmt(vector, formatter),
            Self::Map(map) => fmt::Display::fmt(map, formatter),
            Self::Set(set) => fmt::Display::fmt(set, formatter),
        }
    }
}
