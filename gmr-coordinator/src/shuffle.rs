//! Grouping of map output by key and assignment of keys to reducers.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use common::ihash;
use common::protocol::KeyValues;

use crate::error::SubmitError;

/// Every value emitted for every key, across all map results of a job.
pub type IntermediateMap = HashMap<String, Vec<Value>>;

/// The keys (with their full value lists) owned by one reducer index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducePartition {
    pub index: usize,
    pub entries: KeyValues,
}

impl ReducePartition {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            entries: KeyValues::new(),
        }
    }

    pub fn reduce_id(&self) -> String {
        format!("reduce_{}", self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append one map result to the intermediate map.
///
/// Appending is per key, so folding results in any order yields the same
/// value multiset for every key.
pub fn fold(intermediate: &mut IntermediateMap, results: KeyValues) {
    for (key, values) in results {
        intermediate.entry(key).or_default().extend(values);
    }
}

/// Reducer index that owns `key`.
pub fn reducer_for(key: &str, num_reducers: usize) -> usize {
    ihash(key.as_bytes()) as usize % num_reducers
}

/// Split the intermediate map into partitions by reducer index.
///
/// Only partitions that own at least one key are built, ordered by index.
/// With more reducers than keys the remaining indices simply own nothing.
pub fn partition(
    intermediate: IntermediateMap,
    num_reducers: usize,
) -> Result<Vec<ReducePartition>, SubmitError> {
    if num_reducers == 0 {
        return Err(SubmitError::InvalidReducerCount(0));
    }

    let mut partitions: BTreeMap<usize, ReducePartition> = BTreeMap::new();
    for (key, values) in intermediate {
        let index = reducer_for(&key, num_reducers);
        partitions
            .entry(index)
            .or_insert_with(|| ReducePartition::new(index))
            .entries
            .insert(key, values);
    }
    Ok(partitions.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intermediate(keys: &[&str]) -> IntermediateMap {
        keys.iter().map(|k| (k.to_string(), vec![json!(1)])).collect()
    }

    #[test]
    fn fold_accumulates_across_results() {
        let mut acc = IntermediateMap::new();
        fold(&mut acc, [("a".to_string(), vec![json!(1)])].into_iter().collect());
        fold(
            &mut acc,
            [
                ("a".to_string(), vec![json!(1), json!(1)]),
                ("b".to_string(), vec![json!(1)]),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(acc["a"].len(), 3);
        assert_eq!(acc["b"].len(), 1);
    }

    #[test]
    fn every_key_lands_in_exactly_one_partition() {
        let keys = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta"];
        for reducers in 1..=5 {
            let parts = partition(intermediate(&keys), reducers).unwrap();
            assert!(parts.len() <= reducers);
            assert!(parts.iter().all(|p| !p.is_empty() && p.index < reducers));
            for key in keys {
                let owners: Vec<usize> = parts
                    .iter()
                    .filter(|p| p.entries.contains_key(key))
                    .map(|p| p.index)
                    .collect();
                assert_eq!(owners, vec![reducer_for(key, reducers)]);
            }
        }
    }

    #[test]
    fn partitioning_is_deterministic() {
        let keys = ["x", "y", "z", "w", "v"];
        let first = partition(intermediate(&keys), 3).unwrap();
        let second = partition(intermediate(&keys), 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn only_owning_partitions_are_built() {
        let parts = partition(intermediate(&["only"]), 4).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].index, reducer_for("only", 4));
        assert_eq!(parts[0].len(), 1);
    }

    #[test]
    fn huge_reducer_count_allocates_per_key() {
        let reducers = usize::MAX;
        let parts = partition(intermediate(&["a", "b"]), reducers).unwrap();
        assert_eq!(parts.iter().map(ReducePartition::len).sum::<usize>(), 2);
        assert!(parts.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[test]
    fn zero_reducers_is_rejected() {
        assert!(partition(intermediate(&["a"]), 0).is_err());
    }

    #[test]
    fn values_travel_with_their_key() {
        let mut acc = IntermediateMap::new();
        acc.insert("k".to_string(), vec![json!(1), json!(2), json!(3)]);
        let parts = partition(acc, 2).unwrap();
        let owner = &parts[0];
        assert_eq!(owner.index, reducer_for("k", 2));
        assert_eq!(owner.entries["k"], vec![json!(1), json!(2), json!(3)]);
        assert_eq!(owner.reduce_id(), format!("reduce_{}", owner.index));
    }
}
