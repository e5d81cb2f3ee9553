//! Bit-partitioning arithmetic shared by the vector trie and the HAMT.
//!
//! Both tries branch 32 ways, so each level consumes 5 bits of either a
//! vector index or a key hash. A `shift` is the bit offset of the slice
//! a level reads: `0` at the vector's leaves, growing by 5 toward the root.
//! The HAMT reads its slices the other way round, starting from shift `0`
//! at its root and ending at [`MAX_HASH_SHIFT`], and takes them from the
//! most-significant end of the hash.
//!
//! Indices are `usize`; a vector of `usize::MAX` elements needs a trie of
//! 13 levels on 64-bit targets (7 on 32-bit), and every computation here
//! stays within range for any `usize` input.

use std::hash::{Hash, Hasher};

/// Branching factor (2^5 = 32)
pub const BRANCHING_FACTOR: usize = 32;

/// Bits per level in the trie
pub const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting the slot within a node
pub const MASK: usize = BRANCHING_FACTOR - 1;

/// Width of a key hash in bits.
pub const HASH_BITS: usize = 32;

/// The deepest shift at which a hash still has bits left to partition on.
///
/// Shifts `0, 5, ..., 30` consume the 32 hash bits; the slice at 30 has
/// only two significant bits. Keys whose hashes are equal beyond this point
/// go into a collision bucket.
pub const MAX_HASH_SHIFT: usize = 30;

/// A key hash as consumed by the HAMT.
pub type HashCode = u32;

/// Returns the slot selected by `value` in a node at `shift`.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::bits::slot;
///
/// assert_eq!(slot(1000, 0), 8);
/// assert_eq!(slot(1000, 5), 31);
/// assert_eq!(slot(1000, 10), 0);
/// ```
#[inline]
#[must_use]
pub const fn slot(value: usize, shift: usize) -> usize {
    (value >> shift) & MASK
}

/// Returns the slot selected by a key hash at `shift`.
///
/// Hash slices are read most-significant first: shift `0` selects bits
/// 27 to 31, and shift [`MAX_HASH_SHIFT`] selects the two lowest bits,
/// padded on the right to a full 5-bit slice.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::bits::hash_slot;
///
/// assert_eq!(hash_slot(0xF800_0000, 0), 31);
/// assert_eq!(hash_slot(0xF800_0000, 5), 0);
/// assert_eq!(hash_slot(0b11, 30), 0b11000);
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn hash_slot(hash: HashCode, shift: usize) -> usize {
    ((padded_hash(hash) >> (MAX_HASH_SHIFT - shift)) as usize) & MASK
}

/// Returns the slices of `hash` above `shift`, i.e. the path prefix that
/// leads to a node at `shift`.
#[inline]
#[must_use]
pub const fn hash_prefix(hash: HashCode, shift: usize) -> u64 {
    padded_hash(hash) >> (MAX_HASH_SHIFT + BITS_PER_LEVEL - shift)
}

/// The hash widened to 35 bits so that all seven slices are 5 bits wide.
#[inline]
const fn padded_hash(hash: HashCode) -> u64 {
    (hash as u64) << (MAX_HASH_SHIFT + BITS_PER_LEVEL - HASH_BITS)
}

/// Returns the index of the first element held in a vector's tail buffer.
///
/// Every index below this value is stored in the trie.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::bits::tail_offset;
///
/// assert_eq!(tail_offset(0), 0);
/// assert_eq!(tail_offset(32), 0);
/// assert_eq!(tail_offset(33), 32);
/// assert_eq!(tail_offset(64), 32);
/// assert_eq!(tail_offset(65), 64);
/// ```
#[inline]
#[must_use]
pub const fn tail_offset(length: usize) -> usize {
    if length < BRANCHING_FACTOR {
        0
    } else {
        ((length - 1) >> BITS_PER_LEVEL) << BITS_PER_LEVEL
    }
}

/// Returns the root shift needed to address `largest_index` through the trie.
///
/// This is the smallest multiple of [`BITS_PER_LEVEL`] for which the root
/// slot of `largest_index` still fits in a node, and never less than one
/// branch level because the vector root always points at leaves.
///
/// # Examples
///
/// ```rust
/// use persistent_trie::persistent::bits::required_shift;
///
/// assert_eq!(required_shift(0), 5);
/// assert_eq!(required_shift(1023), 5);
/// assert_eq!(required_shift(1024), 10);
/// assert_eq!(required_shift(32 * 32 * 32), 15);
/// ```
#[must_use]
pub const fn required_shift(largest_index: usize) -> usize {
    let mut shift = BITS_PER_LEVEL;
    while (largest_index >> shift) > MASK {
        shift += BITS_PER_LEVEL;
    }
    shift
}

/// Computes the 32-bit hash of a key with the configured hasher.
///
/// The hasher is deterministic for a given build: std's `DefaultHasher`
/// by default, `FxHasher` with the `fxhash` feature, `AHasher` with the
/// `ahash` feature. The 64-bit output is folded so both halves contribute.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn hash_of<K: Hash + ?Sized>(key: &K) -> HashCode {
    let mut hasher = new_hasher();
    key.hash(&mut hasher);
    let full = hasher.finish();
    (full ^ (full >> HASH_BITS)) as HashCode
}

#[cfg(feature = "fxhash")]
#[inline]
fn new_hasher() -> impl Hasher {
    rustc_hash::FxHasher::default()
}

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
#[inline]
fn new_hasher() -> impl Hasher {
    ahash::AHasher::default()
}

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
#[inline]
fn new_hasher() -> impl Hasher {
    std::collections::hash_map::DefaultHasher::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(31, 0, 31)]
    #[case(32, 0, 0)]
    #[case(32, 5, 1)]
    #[case(0b11111_00000_00001, 10, 31)]
    #[case(usize::MAX, 5, 31)]
    fn test_slot(#[case] value: usize, #[case] shift: usize, #[case] expected: usize) {
        assert_eq!(slot(value, shift), expected);
    }

    #[rstest]
    fn test_hash_slot_covers_all_bits() {
        let hash: HashCode = u32::MAX;
        let slots: Vec<usize> = (0..=MAX_HASH_SHIFT)
            .step_by(BITS_PER_LEVEL)
            .map(|shift| hash_slot(hash, shift))
            .collect();
        assert_eq!(slots, vec![31, 31, 31, 31, 31, 31, 0b11000]);
    }

    #[rstest]
    #[case(0x8000_0000, 0, 16)]
    #[case(0x0400_0000, 5, 16)]
    #[case(0x0000_0004, 25, 1)]
    #[case(0x0000_0001, 30, 8)]
    fn test_hash_slot_reads_high_bits_first(
        #[case] hash: HashCode,
        #[case] shift: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(hash_slot(hash, shift), expected);
    }

    #[rstest]
    fn test_hash_prefix_concatenates_slots_above() {
        let hash: HashCode = 0xDEAD_BEEF;
        let prefix = (0..MAX_HASH_SHIFT)
            .step_by(BITS_PER_LEVEL)
            .fold(0_u64, |prefix, shift| {
                assert_eq!(hash_prefix(hash, shift), prefix);
                (prefix << BITS_PER_LEVEL) | hash_slot(hash, shift) as u64
            });
        assert_eq!(hash_prefix(hash, MAX_HASH_SHIFT), prefix);
        assert_eq!(hash_prefix(hash, 0), 0);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(31, 0)]
    #[case(32, 0)]
    #[case(33, 32)]
    #[case(1056, 1024)]
    #[case(1057, 1056)]
    fn test_tail_offset(#[case] length: usize, #[case] expected: usize) {
        assert_eq!(tail_offset(length), expected);
    }

    #[rstest]
    #[case(0, 5)]
    #[case(31, 5)]
    #[case(1023, 5)]
    #[case(1024, 10)]
    #[case(32_767, 10)]
    #[case(32_768, 15)]
    fn test_required_shift(#[case] largest_index: usize, #[case] expected: usize) {
        assert_eq!(required_shift(largest_index), expected);
    }

    #[rstest]
    fn test_required_shift_does_not_overflow() {
        let shift = required_shift(usize::MAX);
        assert!(shift < usize::BITS as usize);
        assert!((usize::MAX >> shift) <= MASK);
    }

    #[rstest]
    fn test_hash_of_is_deterministic() {
        assert_eq!(hash_of("key"), hash_of("key"));
        assert_eq!(hash_of(&42_i64), hash_of(&42_i64));
    }
}
