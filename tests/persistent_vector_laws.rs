//! Property-based tests for PersistentVector laws.
//!
//! This module verifies the invariants of PersistentVector and its
//! windows against a plain `Vec` model using proptest.

use std::ops::ControlFlow;

use persistent_trie::persistent::PersistentVector;
use proptest::prelude::*;

/// Vectors large enough to cross the first and second root growth.
fn elements() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(any::<i32>(), 0..2200)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Push Law: pushing every element yields the model vector
    #[test]
    fn prop_push_back_matches_model(elements in elements()) {
        let vector = elements
            .iter()
            .fold(PersistentVector::new(), |vector, element| vector.push_back(*element));
        vector.check_invariants();
        prop_assert_eq!(vector.len(), elements.len());
        prop_assert_eq!(vector.to_vec(), elements);
    }

    /// Bulk construction and repeated push build equal vectors
    #[test]
    fn prop_collect_equals_push_back(elements in elements()) {
        let collected: PersistentVector<i32> = elements.iter().copied().collect();
        let pushed = PersistentVector::new().extend_from(elements.iter().copied());
        collected.check_invariants();
        prop_assert_eq!(collected, pushed);
    }

    /// Get-Assoc Law: assoc_n is visible at its index and nowhere else
    #[test]
    fn prop_assoc_n_is_local(
        elements in prop::collection::vec(any::<i32>(), 1..2200),
        seed in any::<usize>(),
        replacement in any::<i32>(),
    ) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        let index = seed % elements.len();
        let updated = vector.assoc_n(index, replacement).unwrap();
        updated.check_invariants();

        let mut model = elements.clone();
        model[index] = replacement;
        prop_assert_eq!(updated.to_vec(), model);
        prop_assert_eq!(vector.to_vec(), elements);
    }

    /// Out-of-range reads fail, in-range reads succeed
    #[test]
    fn prop_nth_bounds(elements in elements(), index in 0_usize..2500) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        prop_assert_eq!(vector.nth(index).is_ok(), index < elements.len());
        prop_assert_eq!(vector.get(index), elements.get(index));
    }

    /// Windows read the same elements as the model slice
    #[test]
    fn prop_subvector_matches_slice(
        elements in elements(),
        first in any::<usize>(),
        second in any::<usize>(),
    ) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        let bound = elements.len() + 1;
        let (start, end) = {
            let (a, b) = (first % bound, second % bound);
            (a.min(b), a.max(b))
        };
        let window = vector.subvector(start, end).unwrap();
        prop_assert_eq!(window.len(), end - start);
        prop_assert!(window.iter().eq(elements[start..end].iter()));
    }

    /// Chunked reduction without early exit equals a plain fold
    #[test]
    fn prop_reduce_equals_fold(elements in elements()) {
        let vector: PersistentVector<i32> = elements.iter().copied().collect();
        let reduced = vector.reduce(0_i64, |sum, element| {
            ControlFlow::Continue(sum + i64::from(*element))
        });
        let folded: i64 = elements.iter().map(|element| i64::from(*element)).sum();
        prop_assert_eq!(reduced, folded);
    }
}
