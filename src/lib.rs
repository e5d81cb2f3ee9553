//! # persistent-trie
//!
//! Persistent (immutable, structurally shared) collections for a language
//! runtime: a 32-way vector trie, a hash array mapped trie for maps and
//! sets, and a chunked traversal view over the vector's leaf arrays.
//!
//! ## Overview
//!
//! - **Vector**: [`PersistentVector`](persistent::PersistentVector) with a
//!   tail buffer for O(1) amortized append and O(log32 N) access/update,
//!   plus [`SubVector`](persistent::SubVector) windows.
//! - **Map / Set**: [`PersistentHashMap`](persistent::PersistentHashMap) and
//!   [`PersistentHashSet`](persistent::PersistentHashSet), partitioned on
//!   32-bit key hashes.
//! - **Chunks**: [`ChunkedSeq`](persistent::ChunkedSeq) and
//!   [`ArrayChunk`](persistent::ArrayChunk) walk a vector 32 elements at a
//!   time.
//! - **Collection**: the closed [`Collection`](collection::Collection) sum
//!   type an evaluator dispatches on.
//!
//! Every write returns a new version; all prior versions stay valid.
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes through `Arc` so collections are `Send + Sync`
//! - `serde`: serialization support
//! - `fxhash` / `ahash`: faster key hashers for the HAMT
//!
//! ## Example
//!
//! ```rust
//! use persistent_trie::prelude::*;
//!
//! let vector: PersistentVector<i32> = (0..1000).collect();
//! assert_eq!(vector.nth(500), Ok(&500));
//! assert!(vector.nth(1000).is_err());
//!
//! let map = PersistentHashMap::new().insert("a", 1).insert("b", 2);
//! assert_eq!(map.remove("a").get_or("a", &0), &0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use persistent_trie::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collection::*;
    pub use crate::error::*;
    pub use crate::persistent::*;
}

pub mod collection;
pub mod error;
pub mod persistent;

pub use error::{CollectionError, Result};
