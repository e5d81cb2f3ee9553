//! Persistent (immutable) data structures.
//!
//! This module provides the trie-based collections the runtime is built on:
//!
//! - [`PersistentVector`]: 32-way vector trie with a tail buffer
//! - [`SubVector`]: an index window over a vector, sharing its trie
//! - [`PersistentHashMap`]: hash array mapped trie (HAMT)
//! - [`PersistentHashSet`]: a HAMT map with unit values
//! - [`ChunkedSeq`] / [`ArrayChunk`]: leaf-at-a-time traversal of a vector
//!
//! # Structural Sharing
//!
//! Every write allocates new nodes only along the path from the root to the
//! changed slot; all sibling subtrees are shared by reference with the
//! previous version, which stays valid and unchanged.
//!
//! # Examples
//!
//! ## `PersistentVector`
//!
//! ```rust
//! use persistent_trie::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..100).collect();
//! let updated = vector.assoc_n(50, 999).unwrap();
//! assert_eq!(vector.get(50), Some(&50));     // Original unchanged
//! assert_eq!(updated.get(50), Some(&999));   // New version
//! ```
//!
//! ## `PersistentHashMap`
//!
//! ```rust
//! use persistent_trie::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(updated.get("one"), Some(&100));
//! ```
//!
//! ## `ChunkedSeq`
//!
//! ```rust
//! use persistent_trie::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..70).collect();
//! let sizes: Vec<usize> = vector.chunks().map(|chunk| chunk.len()).collect();
//! assert_eq!(sizes, vec![32, 32, 6]);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

pub mod bits;
mod chunked;
mod hamt;
mod hashmap;
mod hashset;
mod node;
mod subvector;
mod vector;

pub use chunked::ArrayChunk;
pub use chunked::ChunkedSeq;
pub use chunked::Chunks;
pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use subvector::SubVector;
pub use vector::PersistentVector;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;

#[cfg(feature = "arc")]
mod thread_safety {
    use super::{PersistentHashMap, PersistentHashSet, PersistentVector, SubVector};
    use static_assertions::assert_impl_all;

    assert_impl_all!(PersistentVector<i32>: Send, Sync);
    assert_impl_all!(SubVector<i32>: Send, Sync);
    assert_impl_all!(PersistentHashMap<String, i32>: Send, Sync);
    assert_impl_all!(PersistentHashSet<String>: Send, Sync);
}

// =============================================================================
// Tests
// =============================================================================
