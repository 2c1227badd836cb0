//! Shared differential-fuzz driver: replay random operation sequences
//! against a `BTreeMap` twin and compare size and full enumeration after
//! every single step.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arbor::{AvlMap, LlrbTree, RbMap, SortedMap};

/// The façade contract every map variant under test satisfies.
pub trait MapLike {
    fn set(&mut self, k: i32, v: i32);
    fn del(&mut self, k: &i32) -> bool;
    fn get(&self, k: &i32) -> Option<i32>;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn entries(&self) -> Vec<(i32, i32)>;
    /// Structural invariant validation, run after every mutation.
    fn check(&self);
}

impl MapLike for RbMap<i32, i32> {
    fn set(&mut self, k: i32, v: i32) {
        RbMap::set(self, k, v);
    }
    fn del(&mut self, k: &i32) -> bool {
        RbMap::del(self, k)
    }
    fn get(&self, k: &i32) -> Option<i32> {
        RbMap::get(self, k).copied()
    }
    fn len(&self) -> usize {
        RbMap::len(self)
    }
    fn clear(&mut self) {
        RbMap::clear(self);
    }
    fn entries(&self) -> Vec<(i32, i32)> {
        self.iter().map(|(k, v)| (*k, *v)).collect()
    }
    fn check(&self) {
        self.assert_invariants();
    }
}

impl MapLike for AvlMap<i32, i32> {
    fn set(&mut self, k: i32, v: i32) {
        AvlMap::set(self, k, v);
    }
    fn del(&mut self, k: &i32) -> bool {
        AvlMap::del(self, k)
    }
    fn get(&self, k: &i32) -> Option<i32> {
        AvlMap::get(self, k).copied()
    }
    fn len(&self) -> usize {
        AvlMap::len(self)
    }
    fn clear(&mut self) {
        AvlMap::clear(self);
    }
    fn entries(&self) -> Vec<(i32, i32)> {
        self.iter().map(|(k, v)| (*k, *v)).collect()
    }
    fn check(&self) {
        self.assert_invariants();
    }
}

impl MapLike for LlrbTree<i32, i32> {
    fn set(&mut self, k: i32, v: i32) {
        LlrbTree::set(self, k, v);
    }
    fn del(&mut self, k: &i32) -> bool {
        LlrbTree::del(self, k)
    }
    fn get(&self, k: &i32) -> Option<i32> {
        LlrbTree::get(self, k).copied()
    }
    fn len(&self) -> usize {
        LlrbTree::len(self)
    }
    fn clear(&mut self) {
        LlrbTree::clear(self);
    }
    fn entries(&self) -> Vec<(i32, i32)> {
        self.iter().map(|(k, v)| (*k, *v)).collect()
    }
    fn check(&self) {
        self.assert_invariants();
    }
}

impl MapLike for SortedMap<i32, i32> {
    fn set(&mut self, k: i32, v: i32) {
        self.set_element(k, v);
    }
    fn del(&mut self, k: &i32) -> bool {
        self.erase_element_by_key(k)
    }
    fn get(&self, k: &i32) -> Option<i32> {
        self.get_element_by_key(k).copied()
    }
    fn len(&self) -> usize {
        SortedMap::len(self)
    }
    fn clear(&mut self) {
        SortedMap::clear(self);
    }
    fn entries(&self) -> Vec<(i32, i32)> {
        self.iter().map(|(k, v)| (*k, *v)).collect()
    }
    fn check(&self) {
        self.assert_invariants();
    }
}

fn assert_matches_twin<M: MapLike>(map: &M, twin: &BTreeMap<i32, i32>, trace: &[String]) {
    map.check();
    assert_eq!(
        map.len(),
        twin.len(),
        "size diverged from the oracle; trace: {trace:?}"
    );
    let entries = map.entries();
    let expected: Vec<(i32, i32)> = twin.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries, expected, "enumeration diverged; trace: {trace:?}");
}

/// Seeded so failures replay deterministically.
pub fn fuzz_map<M: MapLike>(map: &mut M, seed: u64, rounds: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut twin: BTreeMap<i32, i32> = BTreeMap::new();
    let mut trace: Vec<String> = Vec::new();
    for _ in 0..rounds {
        let insert_count = if rng.gen_bool(0.5) {
            0
        } else {
            rng.gen_range(0..=10)
        };
        let delete_count = if rng.gen_bool(0.5) {
            rng.gen_range(0..=40)
        } else {
            rng.gen_range(0..=10)
        };
        for _ in 0..insert_count {
            let k = rng.gen_range(0..=100);
            let v = rng.gen_range(0..=1000);
            trace.push(format!("set {k}={v}"));
            map.set(k, v);
            twin.insert(k, v);
            assert_matches_twin(map, &twin, &trace);
        }
        for _ in 0..delete_count {
            let k = rng.gen_range(0..=100);
            trace.push(format!("del {k}"));
            let removed = map.del(&k);
            assert_eq!(
                removed,
                twin.remove(&k).is_some(),
                "delete outcome diverged; trace: {trace:?}"
            );
            assert_matches_twin(map, &twin, &trace);
        }
        for _ in 0..5 {
            let k = rng.gen_range(0..=100);
            assert_eq!(map.get(&k), twin.get(&k).copied());
        }
        if rng.gen_bool(0.1) {
            trace.push("clear".to_string());
            map.clear();
            twin.clear();
            assert_matches_twin(map, &twin, &trace);
        }
    }
}
