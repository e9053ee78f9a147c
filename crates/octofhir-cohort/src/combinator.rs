//! Order-dependent set algebra over per-query results.
//!
//! The first result initializes the accumulated list. Every later result is
//! intersected with it (include) or subtracted from it (exclude). Steps are
//! applied to the running list, not to the whole patient population, so
//! reordering queries changes the outcome.

use std::collections::HashSet;

use crate::model::{PatientIdSet, Query};

/// Running state of the fold.
#[derive(Debug, Clone, Default)]
pub struct SetAccumulator {
    current: Option<Vec<String>>,
}

impl SetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one query result into the accumulated list.
    ///
    /// The first call takes `results` as-is whatever `exclude` says. Each step
    /// is linear in the size of both lists.
    pub fn fold(&mut self, exclude: bool, results: Vec<String>) {
        let Some(current) = self.current.as_mut() else {
            self.current = Some(results);
            return;
        };

        let other: HashSet<&str> = results.iter().map(String::as_str).collect();
        current.retain(|id| other.contains(id.as_str()) != exclude);
    }

    /// The accumulated list, duplicates included. Empty before the first fold.
    pub fn current(&self) -> &[String] {
        self.current.as_deref().unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    /// Deduplicates the accumulated list, keeping first-appearance order.
    pub fn finish(self) -> PatientIdSet {
        self.current.unwrap_or_default().into_iter().collect()
    }
}

/// Folds an ordered list of `(query, results)` pairs into one patient set.
pub fn combine<'q>(results: impl IntoIterator<Item = (&'q Query, Vec<String>)>) -> PatientIdSet {
    let mut accumulator = SetAccumulator::new();
    for (query, ids) in results {
        accumulator.fold(query.exclude, ids);
    }
    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_fold_is_empty() {
        let accumulator = SetAccumulator::new();
        assert!(!accumulator.is_initialized());
        assert!(accumulator.current().is_empty());
        assert!(accumulator.finish().is_empty());
    }

    #[test]
    fn test_first_result_initializes_verbatim() {
        let mut accumulator = SetAccumulator::new();
        accumulator.fold(false, ids(&["b", "a", "b"]));
        assert_eq!(accumulator.current(), ids(&["b", "a", "b"]).as_slice());
    }

    #[test]
    fn test_first_exclude_flag_has_no_effect() {
        let mut accumulator = SetAccumulator::new();
        accumulator.fold(true, ids(&["2"]));
        assert_eq!(accumulator.current(), ids(&["2"]).as_slice());
    }

    #[test]
    fn test_include_keeps_current_order() {
        let mut accumulator = SetAccumulator::new();
        accumulator.fold(false, ids(&["3", "1", "2", "1"]));
        accumulator.fold(false, ids(&["1", "3", "9"]));
        assert_eq!(accumulator.current(), ids(&["3", "1", "1"]).as_slice());
        assert_eq!(accumulator.finish().to_vec(), ids(&["3", "1"]));
    }

    #[test]
    fn test_exclude_drops_every_occurrence() {
        let mut accumulator = SetAccumulator::new();
        accumulator.fold(false, ids(&["1", "2", "3", "2"]));
        accumulator.fold(true, ids(&["2"]));
        assert_eq!(accumulator.current(), ids(&["1", "3"]).as_slice());
    }

    #[test]
    fn test_emptied_accumulator_stays_empty() {
        let mut accumulator = SetAccumulator::new();
        accumulator.fold(false, ids(&["1"]));
        accumulator.fold(false, ids(&["2"]));
        assert!(accumulator.current().is_empty());
        accumulator.fold(false, ids(&["2"]));
        assert!(accumulator.finish().is_empty());
    }

    #[test]
    fn test_combine_is_order_dependent() {
        let a = Query::include(ResourceKind::Patient, "a");
        let b = Query::exclude(ResourceKind::Condition, "b");

        let forward = combine([(&a, ids(&["1", "2", "3"])), (&b, ids(&["2"]))]);
        assert_eq!(forward.to_vec(), ids(&["1", "3"]));

        let reversed = combine([(&b, ids(&["2"])), (&a, ids(&["1", "2", "3"]))]);
        assert_eq!(reversed.to_vec(), ids(&["2"]));
    }
}
