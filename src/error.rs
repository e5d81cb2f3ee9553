//! Error types for collection operations.
//!
//! Only conditions a caller can provoke are represented here. Broken
//! structural invariants are implementation bugs and fail through
//! assertions instead of being returned.

use thiserror::Error;

/// Errors reported by the fetch-or-fail operations of the collections.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::CollectionError;
/// use persistent_trie::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..3).collect();
/// assert_eq!(
///     vector.nth(3),
///     Err(CollectionError::IndexOutOfRange { index: 3, length: 3 })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// An index outside the valid range of a vector or subvector.
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the collection at the time of the call.
        length: usize,
    },

    /// A lookup without a default for a key that is absent.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// `Debug` rendering of the missing key.
        key: String,
    },

    /// `drop_first` on a chunk with no remaining elements.
    #[error("drop_first of empty chunk")]
    EmptyChunk,

    /// An element conjoined onto a map that is not a key/value pair.
    #[error("map entries must be key/value pairs")]
    InvalidEntry,
}

impl CollectionError {
    pub(crate) const fn index_out_of_range(index: usize, length: usize) -> Self {
        Self::IndexOutOfRange { index, length }
    }

    pub(crate) fn key_not_found<Q: std::fmt::Debug + ?Sized>(key: &Q) -> Self {
        Self::KeyNotFound {
            key: format!("{key:?}"),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CollectionError>;
