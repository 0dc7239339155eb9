//! Frequency table over integer keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counts of observed integer values.
///
/// Keys iterate in ascending order (`BTreeMap`), so two histograms with the
/// same contents always serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    counts: BTreeMap<i32, u64>,
    total: u64,
}

impl Histogram {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of `value`.
    pub fn record(&mut self, value: i32) {
        *self.counts.entry(value).or_insert(0) += 1;
        self.total += 1;
    }

    /// Folds another histogram into this one.
    pub fn merge(&mut self, other: &Self) {
        for (value, count) in &other.counts {
            *self.counts.entry(*value).or_insert(0) += count;
        }
        self.total += other.total;
    }

    /// Number of times `value` was observed.
    #[must_use]
    pub fn count(&self, value: i32) -> u64 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    /// Total number of observations.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterates `(value, count)` pairs in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.counts.iter().map(|(v, c)| (*v, *c))
    }

    /// Distinct observed values in ascending order.
    #[must_use]
    pub fn values(&self) -> Vec<i32> {
        self.counts.keys().copied().collect()
    }

    /// Fraction of observations equal to `value`, or 0 when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency(&self, value: i32) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(value) as f64 / self.total as f64
        }
    }

    /// Most frequent value; ties resolve to the smallest value.
    #[must_use]
    pub fn mode(&self) -> Option<i32> {
        self.counts
            .iter()
            .fold(None, |best: Option<(i32, u64)>, (v, c)| match best {
                Some((_, best_count)) if best_count >= *c => best,
                _ => Some((*v, *c)),
            })
            .map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_counts() {
        let mut h = Histogram::new();
        h.record(3);
        h.record(-2);
        h.record(3);

        assert_eq!(h.count(3), 2);
        assert_eq!(h.count(-2), 1);
        assert_eq!(h.count(7), 0);
        assert_eq!(h.total(), 3);
        assert_eq!(h.values(), vec![-2, 3]);
    }

    #[test]
    fn merge_sums_counts() {
        let mut a = Histogram::new();
        a.record(1);
        let mut b = Histogram::new();
        b.record(1);
        b.record(4);

        a.merge(&b);
        assert_eq!(a.count(1), 2);
        assert_eq!(a.count(4), 1);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn mode_prefers_smallest_on_tie() {
        let mut h = Histogram::new();
        assert_eq!(h.mode(), None);
        h.record(5);
        h.record(2);
        assert_eq!(h.mode(), Some(2));
        h.record(5);
        assert_eq!(h.mode(), Some(5));
    }

    #[test]
    fn empty_frequency_is_zero() {
        let h = Histogram::new();
        assert!(h.frequency(0).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_in_key_order() {
        let mut h = Histogram::new();
        h.record(9);
        h.record(-1);
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.find("-1").unwrap() < json.find('9').unwrap());
    }
}
