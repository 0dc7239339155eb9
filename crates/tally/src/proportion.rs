//! Binomial proportion estimates.

use serde::{Deserialize, Serialize};

/// A count of successes out of a number of trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proportion {
    /// Trials that counted as a success
    pub successes: u64,
    /// Trials observed
    pub trials: u64,
}

impl Proportion {
    /// Creates a proportion. `successes` is clamped to `trials`.
    #[must_use]
    pub fn new(successes: u64, trials: u64) -> Self {
        Self {
            successes: successes.min(trials),
            trials,
        }
    }

    /// Point estimate, or 0 when there are no trials.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.successes as f64 / self.trials as f64
        }
    }

    /// Wilson score interval for critical value `z` (1.96 for 95%).
    ///
    /// Returns `(0.0, 1.0)` when there are no trials.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn wilson_interval(&self, z: f64) -> (f64, f64) {
        if self.trials == 0 {
            return (0.0, 1.0);
        }
        let n = self.trials as f64;
        let p = self.rate();
        let z2 = z * z;
        let denom = 1.0 + z2 / n;
        let centre = (p + z2 / (2.0 * n)) / denom;
        let margin = z * ((p * (1.0 - p) / n) + z2 / (4.0 * n * n)).sqrt() / denom;
        ((centre - margin).max(0.0), (centre + margin).min(1.0))
    }

    /// Half the width of the Wilson interval.
    #[must_use]
    pub fn margin(&self, z: f64) -> f64 {
        let (low, high) = self.wilson_interval(z);
        (high - low) / 2.0
    }

    /// Sum of two disjoint samples of the same event.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        Self {
            successes: a.successes + b.successes,
            trials: a.trials + b.trials,
        }
    }
}
