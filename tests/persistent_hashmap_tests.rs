//! Scenario tests for PersistentHashMap.
//!
//! Covers the lookup family (`get`, `get_or`, `fetch`), persistence of
//! prior versions, forced hash collisions, and the derived views.

use persistent_trie::CollectionError;
use persistent_trie::persistent::{PersistentHashMap, PersistentHashSet};
use rstest::rstest;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Keyword-like key, as a runtime would intern `:a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Keyword(&'static str);

/// Key whose hash depends only on `group`, so keys in one group collide.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Colliding {
    id: u32,
    group: u8,
}

impl Hash for Colliding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
    }
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Lookup
// =============================================================================

#[rstest]
fn test_keyword_scenario() {
    let map = PersistentHashMap::new()
        .insert(Keyword("a"), 1)
        .insert(Keyword("b"), 2);

    assert_eq!(map.count(), 2);
    assert_eq!(map.get(&Keyword("a")), Some(&1));

    let removed = map.remove(&Keyword("a"));
    assert_eq!(removed.get_or(&Keyword("a"), &0), &0);
    assert_eq!(removed.count(), 1);
    assert_eq!(map.get(&Keyword("a")), Some(&1));
}

#[rstest]
fn test_get_on_empty_map_returns_none() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert_eq!(map.get("key"), None);
    assert!(!map.contains_key("key"));
}

#[rstest]
fn test_fetch_missing_key_error() {
    let map = PersistentHashMap::singleton(Keyword("a"), 1);
    assert_eq!(
        map.fetch(&Keyword("missing")),
        Err(CollectionError::KeyNotFound {
            key: "Keyword(\"missing\")".to_string()
        })
    );
}

#[rstest]
fn test_get_key_value_returns_stored_key() {
    let map = PersistentHashMap::singleton("stored".to_string(), 7);
    let (key, value) = map.get_key_value("stored").unwrap();
    assert_eq!(key, "stored");
    assert_eq!(*value, 7);
}

// =============================================================================
// Persistence
// =============================================================================

#[rstest]
fn test_versions_are_independent() {
    let base: PersistentHashMap<i32, i32> = (0..1000).map(|key| (key, key)).collect();
    let updated = base.insert(500, -1);
    let removed = base.remove(&500);

    assert_eq!(base.get(&500), Some(&500));
    assert_eq!(updated.get(&500), Some(&-1));
    assert_eq!(removed.get(&500), None);
    assert_eq!((base.len(), updated.len(), removed.len()), (1000, 1000, 999));
    for map in [&base, &updated, &removed] {
        map.check_invariants();
    }
}

#[rstest]
#[case(1)]
#[case(33)]
#[case(1000)]
#[case(20_000)]
fn test_insert_then_remove_all(#[case] size: i32) {
    let full: PersistentHashMap<i32, i32> = (0..size).map(|key| (key, key * 2)).collect();
    full.check_invariants();
    assert_eq!(full.len(), size as usize);

    let emptied = (0..size).fold(full, |map, key| map.remove(&key));
    emptied.check_invariants();
    assert!(emptied.is_empty());
    assert_eq!(emptied, PersistentHashMap::new());
}

// =============================================================================
// Collisions
// =============================================================================

#[rstest]
fn test_full_hash_collisions() {
    let keys: Vec<Colliding> = (0..60)
        .map(|id| Colliding {
            id,
            group: (id % 4) as u8,
        })
        .collect();
    let map: PersistentHashMap<Colliding, u32> =
        keys.iter().map(|key| (key.clone(), key.id)).collect();
    map.check_invariants();
    assert_eq!(map.len(), 60);

    for key in &keys {
        assert_eq!(map.get(key), Some(&key.id));
    }

    let halved = keys
        .iter()
        .filter(|key| key.id % 2 == 0)
        .fold(map.clone(), |map, key| map.remove(key));
    halved.check_invariants();
    assert_eq!(halved.len(), 30);
    assert!(keys
        .iter()
        .all(|key| halved.contains_key(key) == (key.id % 2 == 1)));
}

#[rstest]
fn test_collision_replace_keeps_count() {
    let first = Colliding { id: 1, group: 0 };
    let second = Colliding { id: 2, group: 0 };
    let map = PersistentHashMap::new()
        .insert(first.clone(), "a")
        .insert(second.clone(), "b")
        .insert(first.clone(), "c");
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&first), Some(&"c"));
    assert_eq!(map.get(&second), Some(&"b"));
}

// =============================================================================
// Derived views
// =============================================================================

#[rstest]
fn test_merge_is_right_biased() {
    let left = PersistentHashMap::from_pairs([("a", 1), ("b", 2)]);
    let right = PersistentHashMap::from_pairs([("b", 20), ("c", 30)]);
    let merged = left.merge(&right);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get("b"), Some(&20));
    assert_eq!(right.merge(&left).get("b"), Some(&2));
}

#[rstest]
fn test_keys_values_and_key_set() {
    let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key + 1000)).collect();

    let mut keys: Vec<i32> = map.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..100).collect::<Vec<_>>());

    let values_sum: i32 = map.values().sum();
    assert_eq!(values_sum, (1000..1100).sum::<i32>());

    let expected: PersistentHashSet<i32> = (0..100).collect();
    assert_eq!(map.key_set(), expected);
}

#[rstest]
fn test_entries_vector_matches_iteration() {
    let map: PersistentHashMap<i32, i32> = (0..50).map(|key| (key, -key)).collect();
    let entries = map.entries();
    assert_eq!(entries.len(), 50);
    assert!(entries
        .iter()
        .zip(map.iter())
        .all(|((key, value), (map_key, map_value))| key == map_key && value == map_value));
}

#[rstest]
fn test_update_with() {
    let map = PersistentHashMap::singleton("count", 10);
    assert_eq!(
        map.update_with("count", |value| value.map(|value| value + 1))
            .get("count"),
        Some(&11)
    );
    assert!(map.update_with("count", |_| None).is_empty());
}

#[rstest]
fn test_equal_maps_hash_equally() {
    let forward: PersistentHashMap<i32, i32> = (0..300).map(|key| (key, key)).collect();
    let shuffled: PersistentHashMap<i32, i32> = (0..300)
        .map(|key| ((key * 7) % 300, (key * 7) % 300))
        .collect();
    assert_eq!(forward, shuffled);
    assert_eq!(hash_of(&forward), hash_of(&shuffled));
}

#[rstest]
fn test_debug_format() {
    let map = PersistentHashMap::singleton("key", 1);
    assert_eq!(format!("{map:?}"), "{\"key\": 1}");
}
