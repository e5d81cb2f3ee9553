//! Internal node structure for the vector trie.
//!
//! A branch holds exactly [`BRANCHING_FACTOR`] child slots; a leaf holds up
//! to 32 elements and is shared with the vector's tail buffer when the tail
//! is pushed into the trie. Nodes are never mutated once built: every
//! write goes through one of the path-copy functions below, which allocate
//! the nodes on a single root-to-leaf path and clone only the reference
//! counts of the siblings.

use super::ReferenceCounter;
use super::bits::{BITS_PER_LEVEL, BRANCHING_FACTOR, slot};

/// The children of a branch node.
pub(super) type Children<T> = [Option<TrieNode<T>>; BRANCHING_FACTOR];

/// Internal node structure for the radix balanced tree.
pub(super) enum TrieNode<T> {
    /// Branch node containing child nodes
    Branch(ReferenceCounter<Children<T>>),
    /// Leaf node containing actual elements
    Leaf(ReferenceCounter<[T]>),
}

impl<T> Clone for TrieNode<T> {
    #[inline]
    fn clone(&self) -> Self {
        match self {
            Self::Branch(children) => Self::Branch(children.clone()),
            Self::Leaf(elements) => Self::Leaf(elements.clone()),
        }
    }
}

/// Fails loudly on a broken trie. Reaching this is a bug in this module.
#[cold]
#[inline(never)]
pub(super) fn invariant_violation(message: &str) -> ! {
    panic!("vector trie invariant violation: {message}")
}

impl<T> TrieNode<T> {
    /// Creates an empty branch node.
    pub(super) fn empty_branch() -> Self {
        Self::Branch(ReferenceCounter::new(std::array::from_fn(|_| None)))
    }

    /// Creates a branch whose first child is `child`.
    fn branch_with_first(child: Self) -> Self {
        let mut children: Children<T> = std::array::from_fn(|_| None);
        children[0] = Some(child);
        Self::Branch(ReferenceCounter::new(children))
    }

    /// Wraps `node` in single-child branches until it sits at `level`.
    pub(super) fn new_path(level: usize, node: Self) -> Self {
        if level == 0 {
            node
        } else {
            Self::branch_with_first(Self::new_path(level - BITS_PER_LEVEL, node))
        }
    }

    /// Grows the trie by one level: the old root becomes the first child of a
    /// new root and `tail` is placed on a fresh path in the second slot.
    pub(super) fn grow(root: Self, shift: usize, tail: Self) -> Self {
        let mut children: Children<T> = std::array::from_fn(|_| None);
        children[0] = Some(root);
        children[1] = Some(Self::new_path(shift, tail));
        Self::Branch(ReferenceCounter::new(children))
    }

    /// Returns a copy of this branch with the leaf `tail` inserted at the
    /// position of index `tail_offset`.
    ///
    /// Only the nodes on the rightmost path are copied.
    pub(super) fn push_tail(&self, level: usize, tail_offset: usize, tail: Self) -> Self {
        let Self::Branch(children) = self else {
            invariant_violation("push_tail reached a leaf above the bottom level")
        };

        let subindex = slot(tail_offset, level);
        let mut new_children = children.as_ref().clone();

        new_children[subindex] = Some(if level == BITS_PER_LEVEL {
            tail
        } else {
            match &children[subindex] {
                Some(child) => child.push_tail(level - BITS_PER_LEVEL, tail_offset, tail),
                None => Self::new_path(level - BITS_PER_LEVEL, tail),
            }
        });

        Self::Branch(ReferenceCounter::new(new_children))
    }

    /// Returns the leaf array holding `index`, descending from a root at `shift`.
    pub(super) fn leaf_for(&self, shift: usize, index: usize) -> &ReferenceCounter<[T]> {
        let mut node = self;
        let mut level = shift;

        loop {
            match node {
                Self::Branch(children) => {
                    if level == 0 {
                        invariant_violation("branch found at leaf level");
                    }
                    let Some(child) = &children[slot(index, level)] else {
                        invariant_violation("missing child on a trie path")
                    };
                    node = child;
                    level -= BITS_PER_LEVEL;
                }
                Self::Leaf(elements) => return elements,
            }
        }
    }

    /// Returns `true` if both handles point at the same allocation.
    pub(super) fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Branch(left), Self::Branch(right)) => ReferenceCounter::ptr_eq(left, right),
            (Self::Leaf(left), Self::Leaf(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Asserts the structural invariants of the subtree at `level` and
    /// returns the number of elements it holds.
    ///
    /// Leaves sit exactly at level 0 and are full; a branch's children form a
    /// contiguous prefix of its slots.
    pub(super) fn check_invariants(&self, level: usize) -> usize {
        match self {
            Self::Leaf(elements) => {
                assert_eq!(level, 0, "leaf found above the bottom level");
                assert_eq!(elements.len(), BRANCHING_FACTOR, "trie leaf is not full");
                elements.len()
            }
            Self::Branch(children) => {
                assert!(level > 0, "branch found at leaf level");
                let occupied = children.iter().take_while(|child| child.is_some()).count();
                assert!(
                    children[occupied..].iter().all(Option::is_none),
                    "gap between branch children"
                );
                children[..occupied]
                    .iter()
                    .flatten()
                    .map(|child| child.check_invariants(level - BITS_PER_LEVEL))
                    .sum()
            }
        }
    }
}

impl<T: Clone> TrieNode<T> {
    /// Returns a copy of this subtree with the element at `index` replaced.
    ///
    /// Copies every node on the path to the containing leaf; siblings are
    /// shared.
    pub(super) fn assoc(&self, level: usize, index: usize, element: T) -> Self {
        match self {
            Self::Branch(children) => {
                let subindex = slot(index, level);
                let Some(child) = &children[subindex] else {
                    invariant_violation("missing child on a trie path")
                };
                let mut new_children = children.as_ref().clone();
                new_children[subindex] =
                    Some(child.assoc(level - BITS_PER_LEVEL, index, element));
                Self::Branch(ReferenceCounter::new(new_children))
            }
            Self::Leaf(elements) => {
                let mut new_elements = elements.to_vec();
                new_elements[slot(index, 0)] = element;
                Self::Leaf(ReferenceCounter::from(new_elements))
            }
        }
    }
}

/// Builds a trie bottom-up from full leaves, returning the root and its shift.
///
/// `elements.len()` must be a non-zero multiple of [`BRANCHING_FACTOR`].
pub(super) fn build_root<T>(elements: Vec<T>) -> (TrieNode<T>, usize) {
    debug_assert!(!elements.is_empty() && elements.len().is_multiple_of(BRANCHING_FACTOR));

    let mut current_level: Vec<TrieNode<T>> = Vec::with_capacity(elements.len() / BRANCHING_FACTOR);
    let mut iter = elements.into_iter();

    loop {
        let chunk: Vec<T> = iter.by_ref().take(BRANCHING_FACTOR).collect();
        if chunk.is_empty() {
            break;
        }
        current_level.push(TrieNode::Leaf(ReferenceCounter::from(chunk)));
    }

    let mut shift = BITS_PER_LEVEL;

    while current_level.len() > BRANCHING_FACTOR {
        current_level = group_into_branches(current_level);
        shift += BITS_PER_LEVEL;
    }

    let root = group_into_branches(current_level)
        .pop()
        .unwrap_or_else(TrieNode::empty_branch);
    (root, shift)
}

/// Packs consecutive nodes into branches of up to 32 children.
fn group_into_branches<T>(nodes: Vec<TrieNode<T>>) -> Vec<TrieNode<T>> {
    let mut branches = Vec::with_capacity(nodes.len().div_ceil(BRANCHING_FACTOR));
    let mut nodes = nodes.into_iter().peekable();

    while nodes.peek().is_some() {
        let mut children: Children<T> = std::array::from_fn(|_| None);
        for (child_slot, node) in children.iter_mut().zip(nodes.by_ref()) {
            *child_slot = Some(node);
        }
        branches.push(TrieNode::Branch(ReferenceCounter::new(children)));
    }

    branches
}
