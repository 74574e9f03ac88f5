//! Property-based testing for the tree-backed containers
//!
//! Random operation sequences are applied to a tessera container and a
//! `std::collections` model in lockstep; afterwards the container must agree
//! with the model and pass its structural validation (red-black invariants,
//! tree/list agreement).

use proptest::prelude::*;
use std::collections::BTreeMap;

use tessera::{TreeMap, TreeMultiSet, TreeSet};

#[derive(Debug, Clone)]
enum MapOp {
    Insert(u8, i32),
    Remove(u8),
    Clear,
}

fn map_ops() -> impl Strategy<Value = Vec<MapOp>> {
    prop::collection::vec(
        prop_oneof![
            6 => (any::<u8>(), any::<i32>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
            3 => any::<u8>().prop_map(MapOp::Remove),
            1 => Just(MapOp::Clear),
        ],
        0..400,
    )
}

proptest! {
    #[test]
    fn prop_tree_map_matches_btree_model(ops in map_ops()) {
        let mut map: TreeMap<u8, i32> = TreeMap::new();
        let mut model: BTreeMap<u8, i32> = BTreeMap::new();

        for op in ops {
            match op {
                MapOp::Insert(k, v) => {
                    let (_, inserted) = map.insert(k, v).unwrap();
                    // The model mirrors first-insert-wins semantics.
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(map.remove(&k), model.remove(&k));
                }
                MapOp::Clear => {
                    map.clear();
                    model.clear();
                }
            }
        }

        map.debug_validate();
        prop_assert_eq!(map.len(), model.len());
        let got: Vec<(u8, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, i32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_tree_set_round_trip_is_sort_unique(values in prop::collection::vec(any::<i16>(), 0..500)) {
        let mut set = TreeSet::new();
        for &v in &values {
            set.insert(v).unwrap();
        }
        set.debug_validate();

        let mut expected = values.clone();
        expected.sort();
        expected.dedup();
        let got: Vec<i16> = set.iter().copied().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_tree_multi_set_round_trip_is_stable_sort(values in prop::collection::vec(0u8..32, 0..400)) {
        let mut bag = TreeMultiSet::new();
        for &v in &values {
            bag.insert(v).unwrap();
        }
        bag.debug_validate();

        let mut expected = values.clone();
        expected.sort();
        let got: Vec<u8> = bag.iter().copied().collect();
        prop_assert_eq!(got, expected);

        for key in 0u8..32 {
            let expected_count = values.iter().filter(|&&v| v == key).count();
            prop_assert_eq!(bag.count(&key), expected_count);
        }
    }

    #[test]
    fn prop_bounds_agree_with_model(
        values in prop::collection::vec(0u8..64, 1..300),
        probe in 0u8..64,
    ) {
        let set: TreeSet<u8> = values.iter().copied().collect();
        let sorted: Vec<u8> = set.iter().copied().collect();

        let lb = set.lower_bound(&probe);
        let expected_lb = sorted.iter().find(|&&v| v >= probe);
        match expected_lb {
            Some(v) => prop_assert_eq!(set.value_at(lb).unwrap(), v),
            None => prop_assert!(lb.is_end()),
        }

        let ub = set.upper_bound(&probe);
        let expected_ub = sorted.iter().find(|&&v| v > probe);
        match expected_ub {
            Some(v) => prop_assert_eq!(set.value_at(ub).unwrap(), v),
            None => prop_assert!(ub.is_end()),
        }
    }

    #[test]
    fn prop_erase_keeps_invariants_step_by_step(
        values in prop::collection::vec(any::<u16>(), 1..120),
        seed in any::<u64>(),
    ) {
        let mut set: TreeSet<u16> = values.iter().copied().collect();
        let mut remaining: Vec<u16> = set.iter().copied().collect();

        // Erase in a seed-driven order, validating after every step.
        let mut state = seed;
        while !remaining.is_empty() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (state as usize) % remaining.len();
            let victim = remaining.remove(pick);
            prop_assert!(set.remove(&victim));
            set.debug_validate();
        }
        prop_assert!(set.is_empty());
    }

    #[test]
    fn prop_hint_insert_of_sorted_stream_always_hits(values in prop::collection::vec(any::<i32>(), 0..300)) {
        let mut sorted = values.clone();
        sorted.sort();
        sorted.dedup();

        let mut set = TreeSet::new();
        for &v in &sorted {
            let end = set.end();
            set.insert_hint(end, v).unwrap();
        }
        prop_assert_eq!(set.hint_hits(), sorted.len() as u64);
        let got: Vec<i32> = set.iter().copied().collect();
        prop_assert_eq!(got, sorted);
        set.debug_validate();
    }

    #[test]
    fn prop_hint_insert_never_corrupts(
        values in prop::collection::vec(0u8..32, 0..200),
        hints in prop::collection::vec(0usize..8, 0..200),
    ) {
        // Feed arbitrary (often wrong) hints; order must still come out right.
        let mut set = TreeSet::new();
        for (i, &v) in values.iter().enumerate() {
            let hint = match hints.get(i) {
                Some(&steps) => {
                    let mut cursor = set.begin();
                    for _ in 0..steps {
                        if cursor.is_end() {
                            break;
                        }
                        cursor = set.next(cursor).unwrap();
                    }
                    cursor
                }
                None => set.end(),
            };
            set.insert_hint(hint, v).unwrap();
        }
        set.debug_validate();

        let mut expected = values.clone();
        expected.sort();
        expected.dedup();
        let got: Vec<u8> = set.iter().copied().collect();
        prop_assert_eq!(got, expected);
    }
}
