//! Hash array mapped trie (HAMT) nodes shared by the hash map and set.
//!
//! A node is logically 32 slots wide but stores only its occupied slots,
//! in slot order, next to a bitmap of which slots are occupied. Level `n`
//! of the trie is indexed by the `n`th 5-bit slice of the hash, counting
//! from the most-significant end (see [`hash_slot`]). Two keys whose hashes
//! differ are always separated by descending until their slices differ;
//! only keys with identical 32-bit hashes share a [`Bucket`].
//!
//! Below the root, no node consists of a single `Entry` or `Collision`
//! slot: removal lifts such a lone slot into the parent.

use std::borrow::Borrow;
use std::iter::FusedIterator;

use arrayvec::ArrayVec;
use smallvec::{SmallVec, smallvec};

use super::ReferenceCounter;
use super::bits::{BITS_PER_LEVEL, HashCode, MAX_HASH_SHIFT, hash_prefix, hash_slot};

/// Maximum number of nodes on a root-to-leaf path: shifts `0, 5, ..., 30`.
pub(super) const MAX_DEPTH: usize = MAX_HASH_SHIFT / BITS_PER_LEVEL + 1;

// =============================================================================
// Node Definition
// =============================================================================

/// A bitmap-compressed trie node.
pub(super) struct Node<K, V> {
    /// Bit `i` is set when logical slot `i` is occupied
    bitmap: u32,
    /// Occupied slots, ordered by slot index
    slots: Vec<Slot<K, V>>,
}

/// An occupied slot of a node.
pub(super) enum Slot<K, V> {
    /// A single key-value entry with its cached hash
    Entry { hash: HashCode, key: K, value: V },
    /// A sub-node one level deeper
    Branch(ReferenceCounter<Node<K, V>>),
    /// Two or more entries whose hashes are identical
    Collision(ReferenceCounter<Bucket<K, V>>),
}

/// Entries that share a full hash code.
pub(super) struct Bucket<K, V> {
    hash: HashCode,
    entries: SmallVec<[(K, V); 2]>,
}

impl<K: Clone, V: Clone> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        Self {
            bitmap: self.bitmap,
            slots: self.slots.clone(),
        }
    }
}

impl<K: Clone, V: Clone> Clone for Slot<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Entry { hash, key, value } => Self::Entry {
                hash: *hash,
                key: key.clone(),
                value: value.clone(),
            },
            Self::Branch(node) => Self::Branch(node.clone()),
            Self::Collision(bucket) => Self::Collision(bucket.clone()),
        }
    }
}

impl<K: Clone, V: Clone> Clone for Bucket<K, V> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            entries: self.entries.clone(),
        }
    }
}

#[inline]
const fn bit_for(hash: HashCode, shift: usize) -> u32 {
    1 << hash_slot(hash, shift)
}

/// Position of `bit`'s slot in the compressed slot array.
#[inline]
const fn position(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Fails loudly on a broken trie. Reaching this is a bug in this module.
#[cold]
#[inline(never)]
fn invariant_violation(message: &str) -> ! {
    panic!("hash trie invariant violation: {message}")
}

impl<K, V> Node<K, V> {
    /// Creates a node with no occupied slots.
    pub(super) const fn empty() -> Self {
        Self {
            bitmap: 0,
            slots: Vec::new(),
        }
    }

    /// Looks up `key`, descending from this node at `shift`.
    pub(super) fn get<Q>(&self, shift: usize, hash: HashCode, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut node = self;
        let mut shift = shift;

        loop {
            let bit = bit_for(hash, shift);
            if node.bitmap & bit == 0 {
                return None;
            }

            match &node.slots[position(node.bitmap, bit)] {
                Slot::Entry {
                    hash: entry_hash,
                    key: entry_key,
                    value,
                } => {
                    return (*entry_hash == hash && entry_key.borrow() == key)
                        .then_some((entry_key, value));
                }
                Slot::Branch(child) => {
                    node = child;
                    shift += BITS_PER_LEVEL;
                }
                Slot::Collision(bucket) => return bucket.get(hash, key),
            }
        }
    }

    /// Converts a node produced by removal into the slot its parent holds.
    ///
    /// An empty node vanishes; a lone entry or bucket moves up a level.
    fn into_parent_slot(mut self) -> Option<Slot<K, V>> {
        match self.slots.len() {
            0 => None,
            1 if !matches!(self.slots[0], Slot::Branch(_)) => {
                tracing::trace!("hash trie node collapsed into its parent");
                self.slots.pop()
            }
            _ => Some(Slot::Branch(ReferenceCounter::new(self))),
        }
    }
}

impl<K: Eq + Clone, V: Clone> Node<K, V> {
    /// Returns a copy of this node with `key` bound to `value`, and whether
    /// the key was newly added.
    pub(super) fn insert(&self, shift: usize, hash: HashCode, key: K, value: V) -> (Self, bool) {
        let bit = bit_for(hash, shift);
        let index = position(self.bitmap, bit);

        if self.bitmap & bit == 0 {
            let mut slots = Vec::with_capacity(self.slots.len() + 1);
            slots.extend_from_slice(&self.slots[..index]);
            slots.push(Slot::Entry { hash, key, value });
            slots.extend_from_slice(&self.slots[index..]);
            return (
                Self {
                    bitmap: self.bitmap | bit,
                    slots,
                },
                true,
            );
        }

        let (replacement, added) = match &self.slots[index] {
            Slot::Entry {
                hash: entry_hash,
                key: entry_key,
                value: entry_value,
            } => {
                if *entry_hash == hash && *entry_key == key {
                    (Slot::Entry { hash, key, value }, false)
                } else if *entry_hash == hash {
                    tracing::trace!(hash, "hash collision bucket created");
                    let bucket = Bucket {
                        hash,
                        entries: smallvec![(entry_key.clone(), entry_value.clone()), (key, value)],
                    };
                    (Slot::Collision(ReferenceCounter::new(bucket)), true)
                } else {
                    let existing = Slot::Entry {
                        hash: *entry_hash,
                        key: entry_key.clone(),
                        value: entry_value.clone(),
                    };
                    let inserted = Slot::Entry { hash, key, value };
                    (
                        pair(shift + BITS_PER_LEVEL, (*entry_hash, existing), (hash, inserted)),
                        true,
                    )
                }
            }
            Slot::Branch(child) => {
                let (child, added) = child.insert(shift + BITS_PER_LEVEL, hash, key, value);
                (Slot::Branch(ReferenceCounter::new(child)), added)
            }
            Slot::Collision(bucket) => {
                if bucket.hash == hash {
                    let (bucket, added) = bucket.insert(key, value);
                    (Slot::Collision(ReferenceCounter::new(bucket)), added)
                } else {
                    let existing = Slot::Collision(bucket.clone());
                    let inserted = Slot::Entry { hash, key, value };
                    (
                        pair(shift + BITS_PER_LEVEL, (bucket.hash, existing), (hash, inserted)),
                        true,
                    )
                }
            }
        };

        (self.with_slot(index, replacement), added)
    }

    /// Returns a copy of this node without `key`, or `None` if the key is
    /// absent. The returned node may be empty.
    pub(super) fn remove<Q>(&self, shift: usize, hash: HashCode, key: &Q) -> Option<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let bit = bit_for(hash, shift);
        if self.bitmap & bit == 0 {
            return None;
        }
        let index = position(self.bitmap, bit);

        match &self.slots[index] {
            Slot::Entry {
                hash: entry_hash,
                key: entry_key,
                ..
            } => (*entry_hash == hash && entry_key.borrow() == key)
                .then(|| self.without_slot(index, bit)),
            Slot::Branch(child) => {
                let child = child.remove(shift + BITS_PER_LEVEL, hash, key)?;
                Some(child.into_parent_slot().map_or_else(
                    || self.without_slot(index, bit),
                    |slot| self.with_slot(index, slot),
                ))
            }
            Slot::Collision(bucket) => {
                if bucket.hash != hash {
                    return None;
                }
                let bucket = bucket.remove(key)?;
                Some(self.with_slot(index, bucket.into_slot()))
            }
        }
    }

    fn with_slot(&self, index: usize, slot: Slot<K, V>) -> Self {
        let mut slots = self.slots.clone();
        slots[index] = slot;
        Self {
            bitmap: self.bitmap,
            slots,
        }
    }

    fn without_slot(&self, index: usize, bit: u32) -> Self {
        let mut slots = Vec::with_capacity(self.slots.len() - 1);
        slots.extend_from_slice(&self.slots[..index]);
        slots.extend_from_slice(&self.slots[index + 1..]);
        Self {
            bitmap: self.bitmap & !bit,
            slots,
        }
    }
}

/// Builds the slot holding two leaf slots with different hashes, placed in
/// a new node at `shift` (and deeper, while their hash slices agree).
fn pair<K, V>(
    shift: usize,
    first: (HashCode, Slot<K, V>),
    second: (HashCode, Slot<K, V>),
) -> Slot<K, V> {
    let (first_hash, first_slot) = first;
    let (second_hash, second_slot) = second;

    if shift > MAX_HASH_SHIFT {
        invariant_violation("distinct hashes agree on every slice");
    }

    let first_bit = bit_for(first_hash, shift);
    let second_bit = bit_for(second_hash, shift);

    let node = if first_bit == second_bit {
        Node {
            bitmap: first_bit,
            slots: vec![pair(
                shift + BITS_PER_LEVEL,
                (first_hash, first_slot),
                (second_hash, second_slot),
            )],
        }
    } else {
        let slots = if first_bit < second_bit {
            vec![first_slot, second_slot]
        } else {
            vec![second_slot, first_slot]
        };
        Node {
            bitmap: first_bit | second_bit,
            slots,
        }
    };

    Slot::Branch(ReferenceCounter::new(node))
}

// =============================================================================
// Collision Bucket
// =============================================================================

impl<K, V> Bucket<K, V> {
    fn get<Q>(&self, hash: HashCode, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.hash != hash {
            return None;
        }
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key.borrow() == key)
            .map(|(entry_key, value)| (entry_key, value))
    }

    /// Turns a bucket back into a plain entry once it holds a single one.
    fn into_slot(self) -> Slot<K, V> {
        if self.entries.len() == 1 {
            let hash = self.hash;
            if let Some((key, value)) = self.entries.into_iter().next() {
                return Slot::Entry { hash, key, value };
            }
            invariant_violation("bucket lost its last entry");
        }
        Slot::Collision(ReferenceCounter::new(self))
    }
}

impl<K: Eq + Clone, V: Clone> Bucket<K, V> {
    fn insert(&self, key: K, value: V) -> (Self, bool) {
        let mut entries = self.entries.clone();
        let added = match entries.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            Some(entry) => {
                entry.1 = value;
                false
            }
            None => {
                entries.push((key, value));
                true
            }
        };
        (
            Self {
                hash: self.hash,
                entries,
            },
            added,
        )
    }

    fn remove<Q>(&self, key: &Q) -> Option<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let index = self
            .entries
            .iter()
            .position(|(entry_key, _)| entry_key.borrow() == key)?;
        let mut entries = self.entries.clone();
        entries.remove(index);
        Some(Self {
            hash: self.hash,
            entries,
        })
    }
}

// =============================================================================
// Invariant Checks
// =============================================================================

impl<K: Eq, V> Node<K, V> {
    /// Asserts the structural invariants of the subtree at `shift` and
    /// returns the number of entries it holds.
    ///
    /// `prefix` holds the slots selected by the path to this node, first
    /// slot highest; `hash_key` recomputes a key's hash.
    pub(super) fn check_invariants<F>(&self, shift: usize, prefix: u64, hash_key: &F) -> usize
    where
        F: Fn(&K) -> HashCode,
    {
        assert!(shift <= MAX_HASH_SHIFT, "node below the deepest hash slice");
        assert_eq!(
            self.bitmap.count_ones() as usize,
            self.slots.len(),
            "bitmap population does not match the slot count"
        );
        if shift > 0 {
            assert!(!self.slots.is_empty(), "empty node below the root");
            if self.slots.len() == 1 {
                assert!(
                    matches!(self.slots[0], Slot::Branch(_)),
                    "lone entry left below the root"
                );
            }
        }

        let occupied = (0..32_usize).filter(|slot| self.bitmap & (1 << slot) != 0);
        let check_hash = |hash: HashCode, slot: usize| {
            assert_eq!(hash_prefix(hash, shift), prefix, "hash stored off its path");
            assert_eq!(hash_slot(hash, shift), slot, "hash stored in the wrong slot");
        };

        occupied
            .zip(&self.slots)
            .map(|(slot, entry)| match entry {
                Slot::Entry { hash, key, .. } => {
                    check_hash(*hash, slot);
                    assert_eq!(hash_key(key), *hash, "stale cached hash");
                    1
                }
                Slot::Branch(child) => {
                    let child_prefix = (prefix << BITS_PER_LEVEL) | slot as u64;
                    child.check_invariants(shift + BITS_PER_LEVEL, child_prefix, hash_key)
                }
                Slot::Collision(bucket) => {
                    check_hash(bucket.hash, slot);
                    assert!(bucket.entries.len() >= 2, "collision bucket with one entry");
                    for (offset, (key, _)) in bucket.entries.iter().enumerate() {
                        assert_eq!(hash_key(key), bucket.hash, "key in the wrong bucket");
                        assert!(
                            bucket.entries[offset + 1..]
                                .iter()
                                .all(|(other, _)| other != key),
                            "duplicate key in a collision bucket"
                        );
                    }
                    bucket.entries.len()
                }
            })
            .sum()
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// Depth-first iterator over the entries of a trie.
pub(super) struct Iter<'a, K, V> {
    stack: ArrayVec<std::slice::Iter<'a, Slot<K, V>>, MAX_DEPTH>,
    collision: Option<std::slice::Iter<'a, (K, V)>>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            collision: self.collision.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(root: &'a Node<K, V>, length: usize) -> Self {
        let mut stack = ArrayVec::new();
        stack.push(root.slots.iter());
        Self {
            stack,
            collision: None,
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.collision.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some((key, value));
            }
            self.collision = None;

            let next = self.stack.last_mut()?.next();
            match next {
                Some(Slot::Entry { key, value, .. }) => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Some(Slot::Branch(child)) => {
                    if self.stack.try_push(child.slots.iter()).is_err() {
                        invariant_violation("trie deeper than the hash width");
                    }
                }
                Some(Slot::Collision(bucket)) => self.collision = Some(bucket.entries.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Keys are their own hashes, so tests can place them precisely.
    fn identity(key: &u32) -> HashCode {
        *key
    }

    /// Builds a hash whose leading slices are `slots`, remaining bits zero.
    fn placed(slots: &[u32]) -> HashCode {
        slots
            .iter()
            .zip((0..).step_by(BITS_PER_LEVEL))
            .fold(0, |hash, (slot, shift)| hash | (slot << (27 - shift)))
    }

    fn build(keys: &[u32]) -> Node<u32, u32> {
        keys.iter().fold(Node::empty(), |node, key| {
            node.insert(0, *key, *key, key.wrapping_mul(10)).0
        })
    }

    #[rstest]
    fn test_keys_sharing_leading_slices_nest() {
        // Same slot at shifts 0 and 5, different at 10.
        let first = placed(&[7, 3, 1]);
        let second = placed(&[7, 3, 2]);
        let node = build(&[first, second]);

        assert_eq!(node.slots.len(), 1);
        assert_eq!(node.check_invariants(0, 0, &identity), 2);
        assert_eq!(node.get(0, first, &first), Some((&first, &first.wrapping_mul(10))));
        assert_eq!(node.get(0, second, &second), Some((&second, &second.wrapping_mul(10))));
    }

    #[rstest]
    fn test_equal_hashes_share_a_bucket() {
        let node = [(1_u32, "a"), (2, "b"), (3, "c")]
            .into_iter()
            .fold(Node::<u32, &str>::empty(), |node, (key, value)| {
                node.insert(0, 7, key, value).0
            });

        assert_eq!(node.slots.len(), 1);
        assert!(matches!(node.slots[0], Slot::Collision(_)));
        assert_eq!(node.get(0, 7, &2), Some((&2, &"b")));
        assert_eq!(node.get(0, 7, &4), None);
        assert_eq!(node.get(0, 8, &2), None);
    }

    #[rstest]
    fn test_insert_reports_replacement() {
        let node = build(&[1, 2]);
        let (replaced, added) = node.insert(0, 1, 1, 99);
        assert!(!added);
        assert_eq!(replaced.get(0, 1, &1), Some((&1, &99)));
        assert_eq!(node.get(0, 1, &1), Some((&1, &10)));
    }

    #[rstest]
    fn test_remove_collapses_nested_node() {
        let first = placed(&[7, 3, 1]);
        let second = placed(&[7, 3, 2]);
        let node = build(&[first, second, placed(&[4])]);

        let removed = node.remove(0, second, &second).unwrap();
        assert_eq!(removed.check_invariants(0, 0, &identity), 2);
        assert_eq!(removed.get(0, first, &first), Some((&first, &first.wrapping_mul(10))));
        assert_eq!(removed.get(0, second, &second), None);
        assert!(removed
            .slots
            .iter()
            .all(|slot| matches!(slot, Slot::Entry { .. })));
    }

    #[rstest]
    fn test_remove_from_bucket_leaves_plain_entry() {
        let node = Node::<u32, u32>::empty()
            .insert(0, 9, 1, 1)
            .0
            .insert(0, 9, 2, 2)
            .0;
        let removed = node.remove(0, 9, &1).unwrap();
        assert!(matches!(removed.slots[0], Slot::Entry { key: 2, .. }));
        assert!(node.remove(0, 9, &3).is_none());
    }

    #[rstest]
    fn test_remove_absent_is_none() {
        let node = build(&[1, 2, 3]);
        assert!(node.remove(0, 4, &4).is_none());
        assert!(node.remove(0, 33, &33).is_none());
    }

    #[rstest]
    fn test_iterator_visits_every_entry() {
        let keys: Vec<u32> = (0..2000).map(|key| key * 7919).collect();
        let node = build(&keys);
        let mut seen: Vec<u32> = Iter::new(&node, keys.len()).map(|(key, _)| *key).collect();
        seen.sort_unstable();
        let mut expected = keys;
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[rstest]
    fn test_deepest_split() {
        // Hashes differing only in the lowest bit descend to shift 30.
        let first = 0x1000_0000;
        let second = 0x1000_0001;
        let node = build(&[first, second]);
        assert_eq!(node.check_invariants(0, 0, &identity), 2);
        assert_eq!(Iter::new(&node, 2).count(), 2);
    }
}
