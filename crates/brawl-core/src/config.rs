//! Tunable run parameters.
//!
//! Values normally come from remote configuration as JSON. Every field has a
//! default, so a partial document only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::{CombatResolver, FirstAttacker, DEFAULT_MAX_ATTACKS};
use crate::snapshot::BoardSnapshot;

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for a config.
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value outside its range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings for simulation runs and their validation.
///
/// # Example
///
/// ```
/// use brawl_core::config::SimulationConfig;
///
/// let config = SimulationConfig::from_json(r#"{ "iterations": 2000, "seed": 7 }"#).unwrap();
/// assert_eq!(config.iterations, 2000);
/// assert_eq!(config.max_duration_ms, 1500);
/// assert!(config.worker_count() >= 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Trial cap per run
    pub iterations: u64,
    /// Deadline for simple boards
    pub max_duration_ms: u64,
    /// Deadline when either board is complex
    pub complex_max_duration_ms: u64,
    /// Boards with more minions than this are complex
    pub complex_board_threshold: usize,
    /// Time-limited runs need more trials than this to show rates
    pub min_trials_for_display: u64,
    /// Runs with fewer trials are never validated
    pub min_trials_for_diagnostics: u64,
    /// Probability of emitting a metric event after validation
    pub metric_sampling: f64,
    /// Send mismatches to the diagnostics sink
    pub diagnostics_enabled: bool,
    /// Probability that an individual mismatch is sent
    pub diagnostics_sampling: f64,
    /// Re-runs allowed per combat after hand reveals
    pub max_reruns: u32,
    /// Lethal mismatches on turns up to this one are ignored
    pub lethal_grace_turns: u32,
    /// Recent log lines kept for diagnostics
    pub log_lines_kept: usize,
    /// Worker threads; half the hardware threads when unset
    pub worker_count: Option<usize>,
    /// Base seed; random per run when unset
    pub seed: Option<u64>,
    /// First attacker when boards are the same size
    pub first_attacker: FirstAttacker,
    /// Attacks after which a trial is a tie
    pub max_attacks: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            max_duration_ms: 1_500,
            complex_max_duration_ms: 3_000,
            complex_board_threshold: 6,
            min_trials_for_display: 500,
            min_trials_for_diagnostics: 2_500,
            metric_sampling: 0.0,
            diagnostics_enabled: false,
            diagnostics_sampling: 1.0,
            max_reruns: 10,
            lethal_grace_turns: 5,
            log_lines_kept: 100,
            worker_count: None,
            seed: None,
            first_attacker: FirstAttacker::CoinFlip,
            max_attacks: DEFAULT_MAX_ATTACKS,
        }
    }
}

impl SimulationConfig {
    /// Parses and validates a config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first field out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> Result<(), ConfigError> {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        }

        if self.iterations == 0 {
            return invalid("iterations", "must be at least 1");
        }
        if self.max_duration_ms == 0 {
            return invalid("max_duration_ms", "must be at least 1");
        }
        if self.complex_max_duration_ms < self.max_duration_ms {
            return invalid("complex_max_duration_ms", "must not be below max_duration_ms");
        }
        if !(0.0..=1.0).contains(&self.metric_sampling) {
            return invalid("metric_sampling", "must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.diagnostics_sampling) {
            return invalid("diagnostics_sampling", "must be within [0, 1]");
        }
        if self.worker_count == Some(0) {
            return invalid("worker_count", "must be at least 1 when set");
        }
        if self.log_lines_kept == 0 {
            return invalid("log_lines_kept", "must be at least 1");
        }
        if self.max_attacks == 0 {
            return invalid("max_attacks", "must be at least 1");
        }
        Ok(())
    }

    /// Worker threads to run trials on.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() / 2)
                .unwrap_or(1)
                .max(1)
        })
    }

    /// Deadline for a run over `snapshot`.
    #[must_use]
    pub fn deadline_for(&self, snapshot: &BoardSnapshot) -> Duration {
        if snapshot.is_complex(self.complex_board_threshold) {
            Duration::from_millis(self.complex_max_duration_ms)
        } else {
            Duration::from_millis(self.max_duration_ms)
        }
    }

    /// Resolver configured with the tie-break and attack guard.
    #[must_use]
    pub fn resolver(&self) -> CombatResolver {
        CombatResolver::new()
            .with_first_attacker(self.first_attacker)
            .with_max_attacks(self.max_attacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MinionSnapshot, SideSnapshot};

    #[test]
    fn defaults_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SimulationConfig::from_json(r#"{ "first_attacker": "player", "max_reruns": 3 }"#)
                .unwrap();
        assert_eq!(config.first_attacker, FirstAttacker::Player);
        assert_eq!(config.max_reruns, 3);
        assert_eq!(config.min_trials_for_diagnostics, 2_500);
        assert!(!config.diagnostics_enabled);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = SimulationConfig::from_json(r#"{ "metric_sampling": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "metric_sampling",
                ..
            }
        ));
        assert!(SimulationConfig::from_json(r#"{ "diagnostics_sampling": -0.1 }"#).is_err());
        assert!(SimulationConfig::from_json(r#"{ "worker_count": 0 }"#).is_err());
        assert!(SimulationConfig::from_json(r#"{ "iterations": "many" }"#).is_err());
    }

    #[test]
    fn complex_boards_get_the_longer_deadline() {
        let config = SimulationConfig::default();
        let seven = (0..7).map(|_| MinionSnapshot::vanilla("a", 1, 1)).collect();
        let complex = BoardSnapshot::new(SideSnapshot::new(seven), SideSnapshot::default());
        let simple = BoardSnapshot::new(SideSnapshot::default(), SideSnapshot::default());
        assert_eq!(config.deadline_for(&complex), Duration::from_millis(3_000));
        assert_eq!(config.deadline_for(&simple), Duration::from_millis(1_500));
    }

    #[test]
    fn explicit_worker_count_wins() {
        let config = SimulationConfig {
            worker_count: Some(3),
            ..SimulationConfig::default()
        };
        assert_eq!(config.worker_count(), 3);
    }
}
