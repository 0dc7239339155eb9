//! Trial scheduler.
//!
//! A run fans trials out over a fixed rayon pool. Workers claim trial indices
//! from a shared atomic counter and stop when the cap is reached, the deadline
//! passes, or any worker raises the stop flag.
//!
//! # Determinism
//!
//! Trial `i` always runs with seed `trial_seed(base, i)`, whichever worker
//! claims it. A run that reaches its trial cap therefore produces the same
//! counts and damage histogram for the same base seed, regardless of thread
//! interleaving.
//!
//! # Exit Conditions
//!
//! In priority order:
//!
//! 1. Unsupported interaction: outcomes discarded
//! 2. Internal error: outcomes discarded
//! 3. Trial cap reached
//! 4. Deadline reached, flagged insufficient when too few trials completed

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use tracing::{debug, error, warn};

use crate::aggregate::{AggregatedResult, Aggregator, ExitCondition};
use crate::config::SimulationConfig;
use crate::resolver::{CombatResolver, TrialError, TrialResolver};
use crate::snapshot::BoardSnapshot;

// =============================================================================
// Parameters
// =============================================================================

/// Parameters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParameters {
    /// Trial cap
    pub max_trials: u64,
    /// Worker threads
    pub worker_count: usize,
    /// Wall-clock budget
    pub max_duration: Duration,
    /// Time-limited runs need more trials than this
    pub min_trials: u64,
    /// Base seed for per-trial seeds
    pub seed: u64,
}

impl RunParameters {
    /// Derives the parameters for `snapshot` from a config.
    ///
    /// The deadline tier depends on board complexity; the seed is random unless
    /// the config pins it.
    #[must_use]
    pub fn from_config(config: &SimulationConfig, snapshot: &BoardSnapshot) -> Self {
        Self {
            max_trials: config.iterations,
            worker_count: config.worker_count(),
            max_duration: config.deadline_for(snapshot),
            min_trials: config.min_trials_for_display,
            seed: config.seed.unwrap_or_else(rand::random),
        }
    }
}

/// Seed of trial `index` in a run with base seed `base` (one SplitMix64 step).
#[must_use]
pub fn trial_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// =============================================================================
// Runner
// =============================================================================

#[derive(Debug, Default)]
struct RunState {
    next_trial: AtomicU64,
    stop: AtomicBool,
    unsupported: AtomicBool,
    internal_error: AtomicBool,
    time_limited: AtomicBool,
}

/// Runs many independent trials of one snapshot and aggregates them.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use brawl_core::simulation::{RunParameters, SimulationRunner};
/// use brawl_core::snapshot::{BoardSnapshot, MinionSnapshot, SideSnapshot};
/// use brawl_core::aggregate::ExitCondition;
/// use brawl_core::resolver::CombatResolver;
///
/// let snapshot = BoardSnapshot::new(
///     SideSnapshot::new(vec![MinionSnapshot::vanilla("ogre", 5, 5)]),
///     SideSnapshot::new(vec![MinionSnapshot::vanilla("wisp", 1, 1)]),
/// );
/// let params = RunParameters {
///     max_trials: 200,
///     worker_count: 2,
///     max_duration: Duration::from_secs(30),
///     min_trials: 0,
///     seed: 1,
/// };
/// let result = SimulationRunner::new(CombatResolver::new()).run(&snapshot, &params);
/// assert_eq!(result.exit_condition, ExitCondition::IterationCap);
/// assert_eq!(result.wins, 200);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationRunner<R = CombatResolver> {
    resolver: R,
}

impl SimulationRunner<CombatResolver> {
    /// A runner whose resolver uses the config's tie-break and attack guard.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.resolver())
    }
}

impl<R: TrialResolver> SimulationRunner<R> {
    /// Creates a runner over a resolver.
    #[must_use]
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The resolver trials run through.
    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Runs trials until the cap, the deadline or a stop signal.
    #[must_use]
    pub fn run(&self, snapshot: &BoardSnapshot, params: &RunParameters) -> AggregatedResult {
        let started = Instant::now();
        let deadline = started + params.max_duration;
        let workers = params.worker_count.max(1);
        debug!(
            max_trials = params.max_trials,
            workers,
            budget = ?params.max_duration,
            seed = params.seed,
            "Starting simulation run"
        );

        let state = RunState::default();
        let pool = match ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("brawl-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                error!(error = %err, "Failed to build worker pool");
                return Self::stamp(
                    AggregatedResult::empty(ExitCondition::InternalError),
                    started,
                    workers,
                    params.seed,
                );
            }
        };

        let aggregator = pool
            .broadcast(|_| self.worker(snapshot, params, &state, deadline))
            .into_iter()
            .fold(Aggregator::new(), Aggregator::merge);

        let total = aggregator.total();
        let exit_condition = if state.unsupported.load(Ordering::Acquire) {
            ExitCondition::UnsupportedInteraction
        } else if state.internal_error.load(Ordering::Acquire) {
            ExitCondition::InternalError
        } else if total >= params.max_trials {
            ExitCondition::IterationCap
        } else if total > params.min_trials {
            ExitCondition::TimeLimit
        } else {
            ExitCondition::TimeLimitInsufficient
        };
        if exit_condition != ExitCondition::IterationCap {
            debug!(
                time_limited = state.time_limited.load(Ordering::Relaxed),
                total, "Run stopped before the trial cap"
            );
        }

        let result = match exit_condition {
            ExitCondition::UnsupportedInteraction | ExitCondition::InternalError => {
                AggregatedResult::empty(exit_condition)
            }
            _ => aggregator.finish(exit_condition),
        };
        let result = Self::stamp(result, started, workers, params.seed);
        debug!(
            exit = exit_condition.label(),
            trials = result.total(),
            elapsed_ms = result.elapsed_ms,
            "Simulation run finished"
        );
        result
    }

    fn stamp(
        mut result: AggregatedResult,
        started: Instant,
        workers: usize,
        seed: u64,
    ) -> AggregatedResult {
        result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result.worker_count = workers;
        result.seed = seed;
        result
    }

    fn worker(
        &self,
        snapshot: &BoardSnapshot,
        params: &RunParameters,
        state: &RunState,
        deadline: Instant,
    ) -> Aggregator {
        let mut aggregator = Aggregator::new();
        loop {
            if state.stop.load(Ordering::Acquire) {
                break;
            }
            if Instant::now() >= deadline {
                state.time_limited.store(true, Ordering::Relaxed);
                state.stop.store(true, Ordering::Release);
                break;
            }
            let index = state.next_trial.fetch_add(1, Ordering::Relaxed);
            if index >= params.max_trials {
                break;
            }

            let seed = trial_seed(params.seed, index);
            match catch_unwind(AssertUnwindSafe(|| self.resolver.resolve(snapshot, seed))) {
                Ok(Ok(outcome)) => aggregator.record(&outcome),
                Ok(Err(TrialError::UnsupportedInteraction { card_id, reason })) => {
                    warn!(
                        card_id = %card_id,
                        reason = %reason,
                        trial = index,
                        "Unsupported interaction, invalidating run"
                    );
                    state.unsupported.store(true, Ordering::Release);
                    state.stop.store(true, Ordering::Release);
                    break;
                }
                Ok(Err(err)) => {
                    error!(error = %err, trial = index, "Trial failed");
                    state.internal_error.store(true, Ordering::Release);
                    state.stop.store(true, Ordering::Release);
                    break;
                }
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(ToString::to_string)
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(panic = %message, trial = index, "Trial panicked");
                    state.internal_error.store(true, Ordering::Release);
                    state.stop.store(true, Ordering::Release);
                    break;
                }
            }
        }
        aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::TrialOutcome;
    use crate::snapshot::{MinionSnapshot, SideSnapshot};

    fn params(max_trials: u64, workers: usize) -> RunParameters {
        RunParameters {
            max_trials,
            worker_count: workers,
            max_duration: Duration::from_secs(60),
            min_trials: 0,
            seed: 99,
        }
    }

    struct Failing(TrialError);

    impl TrialResolver for Failing {
        fn resolve(&self, _: &BoardSnapshot, _: u64) -> Result<TrialOutcome, TrialError> {
            Err(self.0.clone())
        }
    }

    struct Panicking;

    impl TrialResolver for Panicking {
        fn resolve(&self, _: &BoardSnapshot, _: u64) -> Result<TrialOutcome, TrialError> {
            panic!("resolver exploded");
        }
    }

    const SLOW_TRIAL: Duration = Duration::from_millis(25);

    struct Slow;

    impl TrialResolver for Slow {
        fn resolve(&self, _: &BoardSnapshot, _: u64) -> Result<TrialOutcome, TrialError> {
            std::thread::sleep(SLOW_TRIAL);
            Ok(TrialOutcome::tie(0))
        }
    }

    fn slow_run(min_trials: u64) -> (AggregatedResult, Duration) {
        let params = RunParameters {
            max_duration: Duration::from_millis(100),
            min_trials,
            ..params(1_000_000, 2)
        };
        let started = Instant::now();
        let result = SimulationRunner::new(Slow).run(&empty(), &params);
        (result, started.elapsed())
    }

    fn empty() -> BoardSnapshot {
        BoardSnapshot::new(SideSnapshot::default(), SideSnapshot::default())
    }

    #[test]
    fn trial_seeds_differ_per_index() {
        let seeds: Vec<u64> = (0..100).map(|i| trial_seed(5, i)).collect();
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len());
        assert_eq!(trial_seed(5, 3), seeds[3]);
        assert_ne!(trial_seed(6, 3), seeds[3]);
    }

    #[test]
    fn cap_is_reached_exactly() {
        let result = SimulationRunner::from_config(&SimulationConfig::default())
            .run(&empty(), &params(1_000, 4));
        assert_eq!(result.total(), 1_000);
        assert_eq!(result.ties, 1_000);
        assert_eq!(result.exit_condition, ExitCondition::IterationCap);
        assert_eq!(result.worker_count, 4);
        assert_eq!(result.seed, 99);
    }

    #[test]
    fn unsupported_interaction_discards_outcomes() {
        let runner = SimulationRunner::new(Failing(TrialError::UnsupportedInteraction {
            card_id: "x".to_string(),
            reason: "y".to_string(),
        }));
        let result = runner.run(&empty(), &params(500, 2));
        assert_eq!(result.exit_condition, ExitCondition::UnsupportedInteraction);
        assert_eq!(result.total(), 0);
        assert!(!result.is_valid_distribution());
    }

    #[test]
    fn internal_failures_and_panics_are_contained() {
        let runner = SimulationRunner::new(Failing(TrialError::Internal("boom".to_string())));
        let result = runner.run(&empty(), &params(100, 2));
        assert_eq!(result.exit_condition, ExitCondition::InternalError);

        let result = SimulationRunner::new(Panicking).run(&empty(), &params(100, 2));
        assert_eq!(result.exit_condition, ExitCondition::InternalError);
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn expired_deadline_is_insufficient() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![MinionSnapshot::vanilla("a", 1, 1)]),
            SideSnapshot::default(),
        );
        let params = RunParameters {
            max_duration: Duration::ZERO,
            min_trials: 500,
            ..params(10_000, 2)
        };
        let result = SimulationRunner::new(CombatResolver::new()).run(&snapshot, &params);
        assert_eq!(result.exit_condition, ExitCondition::TimeLimitInsufficient);
        assert!(result.not_enough_data());
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn deadline_overrun_is_bounded_by_one_trial() {
        let (result, elapsed) = slow_run(1);
        // Thread start-up and join get a little slack on top of the bound.
        let bound = Duration::from_millis(100) + SLOW_TRIAL + Duration::from_millis(150);
        assert!(elapsed <= bound, "run took {elapsed:?}");
        assert!(result.total() > 1);
        assert!(result.total() < 1_000_000);
        assert_eq!(result.exit_condition, ExitCondition::TimeLimit);
        assert!(result.is_valid_distribution());
    }

    #[test]
    fn deadline_with_too_few_trials_is_insufficient() {
        let (result, _) = slow_run(10_000);
        assert!(result.total() <= 10_000);
        assert_eq!(result.exit_condition, ExitCondition::TimeLimitInsufficient);
        assert!(result.not_enough_data());
    }

    #[test]
    fn params_follow_config() {
        let config = SimulationConfig {
            seed: Some(12),
            worker_count: Some(2),
            ..SimulationConfig::default()
        };
        let params = RunParameters::from_config(&config, &empty());
        assert_eq!(params.seed, 12);
        assert_eq!(params.worker_count, 2);
        assert_eq!(params.max_trials, 10_000);
        assert_eq!(params.min_trials, 500);
        assert_eq!(params.max_duration, Duration::from_millis(1_500));
    }
}
