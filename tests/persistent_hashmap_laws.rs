//! Property-based tests for PersistentHashMap.
//!
//! This module checks PersistentHashMap against a std `HashMap` model and
//! verifies its structural invariants after arbitrary edit sequences.

use persistent_trie::persistent::PersistentHashMap;
use proptest::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Strategy for generating test data
// =============================================================================

#[derive(Debug, Clone)]
enum Edit {
    Insert(u16, i32),
    Remove(u16),
}

fn arbitrary_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (any::<u16>(), any::<i32>()).prop_map(|(key, value)| Edit::Insert(key, value)),
        1 => any::<u16>().prop_map(Edit::Remove),
    ]
}

fn arbitrary_entries() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(("[a-z]{1,10}", any::<i32>()), 0..200)
}

proptest! {
    /// Model Law: any sequence of inserts and removes agrees with HashMap
    #[test]
    fn prop_edits_match_model(edits in prop::collection::vec(arbitrary_edit(), 0..1500)) {
        let mut model = HashMap::new();
        let mut map = PersistentHashMap::new();

        for edit in edits {
            match edit {
                Edit::Insert(key, value) => {
                    model.insert(key, value);
                    map = map.insert(key, value);
                }
                Edit::Remove(key) => {
                    model.remove(&key);
                    map = map.remove(&key);
                }
            }
        }

        map.check_invariants();
        prop_assert_eq!(map.len(), model.len());
        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    /// Get-Insert Law: map.insert(k, v).get(&k) == Some(&v)
    #[test]
    fn prop_get_insert(entries in arbitrary_entries(), key in "[a-z]{1,10}", value in any::<i32>()) {
        let map: PersistentHashMap<String, i32> = entries.into_iter().collect();
        let inserted = map.insert(key.clone(), value);
        prop_assert_eq!(inserted.get(&key), Some(&value));
    }

    /// Remove Law: removing a key hides it and leaves the others alone
    #[test]
    fn prop_remove_hides_only_its_key(entries in arbitrary_entries(), victim in "[a-z]{1,10}") {
        let map: PersistentHashMap<String, i32> = entries.into_iter().collect();
        let removed = map.remove(&victim);
        removed.check_invariants();

        prop_assert_eq!(removed.get(&victim), None);
        for (key, value) in &map {
            if *key != victim {
                prop_assert_eq!(removed.get(key), Some(value));
            }
        }
    }

    /// Insertion order does not affect equality or hashing
    #[test]
    fn prop_order_independent_equality(entries in arbitrary_entries()) {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let deduplicated: HashMap<String, i32> = entries.into_iter().collect();
        let forward: PersistentHashMap<String, i32> = deduplicated.clone().into_iter().collect();
        let mut reversed_entries: Vec<(String, i32)> = deduplicated.into_iter().collect();
        reversed_entries.reverse();
        let backward: PersistentHashMap<String, i32> = reversed_entries.into_iter().collect();

        let hash = |map: &PersistentHashMap<String, i32>| {
            let mut hasher = DefaultHasher::new();
            map.hash(&mut hasher);
            hasher.finish()
        };
        prop_assert_eq!(hash(&forward), hash(&backward));
        prop_assert_eq!(forward, backward);
    }
}
