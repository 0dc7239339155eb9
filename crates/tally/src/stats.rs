//! Running summary of a numeric sample stream.
//!
//! Each worker pushes its trial values into a local [`ScalarStats`]; the
//! scheduler merges the partial summaries once the workers join. `push` is the
//! online Welford update and `merge` is its two-partition form (Chan et al.),
//! so pushing every value into one summary and merging per-worker summaries
//! agree up to rounding.

use serde::{Deserialize, Serialize};

/// Count, mean, population variance and range of the values seen so far.
///
/// An empty summary has `min = +inf` and `max = -inf` so that either bound
/// is replaced by the first value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarStats {
    /// Values pushed
    pub count: u64,
    /// Mean of the values
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl Default for ScalarStats {
    fn default() -> Self {
        Self::empty()
    }
}

impl ScalarStats {
    /// A summary of no values.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            variance: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// A summary of exactly one value.
    #[must_use]
    pub fn single(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            variance: 0.0,
            min: value,
            max: value,
        }
    }

    /// Adds one value.
    #[allow(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let n = self.count as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        // Sum of squared deviations, rebuilt from the previous variance.
        let m2 = self.variance * (n - 1.0) + delta * (value - self.mean);
        self.variance = m2 / n;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Combines the summaries of two disjoint sample sets.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merge(a: &Self, b: &Self) -> Self {
        if a.count == 0 {
            return *b;
        }
        if b.count == 0 {
            return *a;
        }

        let (n_a, n_b) = (a.count as f64, b.count as f64);
        let n = n_a + n_b;
        let delta = b.mean - a.mean;
        let m2 = a.variance * n_a + b.variance * n_b + delta * delta * n_a * n_b / n;

        Self {
            count: a.count + b.count,
            mean: a.mean + delta * n_b / n,
            variance: m2 / n,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Square root of the variance.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Standard error of the mean; 0 below two values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn standard_error(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.std_dev() / (self.count as f64).sqrt()
    }

    /// True before the first push.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl FromIterator<f64> for ScalarStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::empty();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

impl Extend<f64> for ScalarStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn damage_samples_summarize() {
        let stats: ScalarStats = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().collect();
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.variance - 4.0).abs() < 1e-12);
        assert!((stats.std_dev() - 2.0).abs() < 1e-12);
        assert!((stats.min - 2.0).abs() < f64::EPSILON);
        assert!((stats.max - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_worker_summaries_merge_away() {
        let busy = ScalarStats::single(-3.0);
        assert_eq!(ScalarStats::merge(&ScalarStats::empty(), &busy), busy);
        assert_eq!(ScalarStats::merge(&busy, &ScalarStats::default()), busy);
        assert!(ScalarStats::empty().is_empty());
    }

    #[test]
    fn merging_two_workers() {
        let merged = ScalarStats::merge(&ScalarStats::single(10.0), &ScalarStats::single(20.0));
        assert_eq!(merged.count, 2);
        assert!((merged.mean - 15.0).abs() < 1e-12);
        assert!((merged.variance - 25.0).abs() < 1e-12);
    }

    #[test]
    fn standard_error_shrinks_with_samples() {
        assert!(ScalarStats::single(3.0).standard_error().abs() < f64::EPSILON);
        let mut stats: ScalarStats = [0.0, 2.0].into_iter().collect();
        let two = stats.standard_error();
        stats.extend([0.0, 2.0, 0.0, 2.0]);
        assert!(stats.standard_error() < two);
    }

    proptest! {
        #[test]
        fn partitioned_pushes_agree_with_one_stream(
            values in prop::collection::vec(-50.0f64..50.0, 1..64),
            split in 0usize..64,
        ) {
            let split = split.min(values.len());
            let left: ScalarStats = values[..split].iter().copied().collect();
            let right: ScalarStats = values[split..].iter().copied().collect();
            let all: ScalarStats = values.iter().copied().collect();
            let merged = ScalarStats::merge(&left, &right);
            prop_assert_eq!(merged.count, all.count);
            prop_assert!((merged.mean - all.mean).abs() < 1e-6);
            prop_assert!((merged.variance - all.variance).abs() < 1e-6);
        }
    }
}
