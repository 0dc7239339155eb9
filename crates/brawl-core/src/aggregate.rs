//! Reduction of trial outcomes into rates and a damage distribution.
//!
//! Each worker fills its own [`Aggregator`]; the scheduler merges them when
//! the run ends. Merging is associative and commutative, so the result does
//! not depend on how trials were split across workers.

use serde::{Deserialize, Serialize};
use tally::{Histogram, Proportion, ScalarStats};

use crate::outcome::{CombatResult, TrialOutcome};

/// Why a run stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCondition {
    /// Every requested trial completed
    IterationCap,
    /// The deadline fired with enough trials to trust the rates
    TimeLimit,
    /// The deadline fired before the minimum trial count
    TimeLimitInsufficient,
    /// A trial reached an interaction the resolver cannot model
    UnsupportedInteraction,
    /// A trial failed unexpectedly
    InternalError,
}

impl ExitCondition {
    /// Label used in logs and diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::IterationCap => "iteration_cap",
            Self::TimeLimit => "time_limit",
            Self::TimeLimitInsufficient => "time_limit_insufficient",
            Self::UnsupportedInteraction => "unsupported_interaction",
            Self::InternalError => "internal_error",
        }
    }

    /// True when the run's rates may be shown.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::IterationCap | Self::TimeLimit)
    }
}

/// Running totals over completed trials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    wins: u64,
    ties: u64,
    losses: u64,
    player_deaths: u64,
    opponent_deaths: u64,
    damage: Histogram,
    damage_stats: ScalarStats,
}

impl Aggregator {
    /// An empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one outcome.
    pub fn record(&mut self, outcome: &TrialOutcome) {
        match outcome.result {
            CombatResult::Win => self.wins += 1,
            CombatResult::Tie => self.ties += 1,
            CombatResult::Loss => self.losses += 1,
        }
        self.player_deaths += u64::from(outcome.player_died);
        self.opponent_deaths += u64::from(outcome.opponent_died);
        let damage = outcome.signed_damage();
        self.damage.record(damage);
        self.damage_stats.push(f64::from(damage));
    }

    /// Combines two aggregators.
    #[must_use]
    pub fn merge(mut a: Self, b: Self) -> Self {
        a.wins += b.wins;
        a.ties += b.ties;
        a.losses += b.losses;
        a.player_deaths += b.player_deaths;
        a.opponent_deaths += b.opponent_deaths;
        a.damage.merge(&b.damage);
        a.damage_stats = ScalarStats::merge(&a.damage_stats, &b.damage_stats);
        a
    }

    /// Trials recorded so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.wins + self.ties + self.losses
    }

    /// Freezes the totals into a result.
    #[must_use]
    pub fn finish(self, exit_condition: ExitCondition) -> AggregatedResult {
        AggregatedResult {
            wins: self.wins,
            ties: self.ties,
            losses: self.losses,
            player_deaths: self.player_deaths,
            opponent_deaths: self.opponent_deaths,
            damage: self.damage,
            damage_stats: self.damage_stats,
            exit_condition,
            elapsed_ms: 0,
            worker_count: 0,
            seed: 0,
        }
    }
}

/// Reduces a set of outcomes.
#[must_use]
pub fn aggregate<'a, I>(outcomes: I) -> Aggregator
where
    I: IntoIterator<Item = &'a TrialOutcome>,
{
    let mut aggregator = Aggregator::new();
    for outcome in outcomes {
        aggregator.record(outcome);
    }
    aggregator
}

/// Summary of one simulation run.
///
/// Rates are 0 when no trial completed. Runs that ended on an unsupported
/// interaction or internal error carry no trials at all.
///
/// # Example
///
/// ```
/// use brawl_core::aggregate::{aggregate, ExitCondition};
/// use brawl_core::outcome::{CombatResult, TrialOutcome};
///
/// let win = TrialOutcome { result: CombatResult::Win, damage: 5, ..TrialOutcome::tie(4) };
/// let tie = TrialOutcome::tie(6);
/// let result = aggregate([&win, &tie, &win, &win]).finish(ExitCondition::IterationCap);
///
/// assert_eq!(result.total(), 4);
/// assert!((result.win_rate() - 0.75).abs() < 1e-12);
/// assert_eq!(result.possible_results()[0], (0, 0.25));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Trials the player won
    pub wins: u64,
    /// Trials that tied
    pub ties: u64,
    /// Trials the player lost
    pub losses: u64,
    /// Trials in which the player's hero took lethal damage
    pub player_deaths: u64,
    /// Trials in which the opponent's hero took lethal damage
    pub opponent_deaths: u64,
    /// Frequency of signed damage values; positive when the player dealt it
    pub damage: Histogram,
    /// Running statistics of signed damage
    pub damage_stats: ScalarStats,
    /// Why the run stopped
    pub exit_condition: ExitCondition,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Workers that ran trials
    pub worker_count: usize,
    /// Base seed the trial seeds were derived from
    pub seed: u64,
}

impl AggregatedResult {
    /// A result with no trials.
    #[must_use]
    pub fn empty(exit_condition: ExitCondition) -> Self {
        Aggregator::new().finish(exit_condition)
    }

    /// Completed trials.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.wins + self.ties + self.losses
    }

    #[allow(clippy::cast_precision_loss)]
    fn rate(&self, count: u64) -> f64 {
        match self.total() {
            0 => 0.0,
            total => count as f64 / total as f64,
        }
    }

    /// Fraction of trials the player won.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    /// Fraction of trials that tied.
    #[must_use]
    pub fn tie_rate(&self) -> f64 {
        self.rate(self.ties)
    }

    /// Fraction of trials the player lost.
    #[must_use]
    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    /// Fraction of trials in which the player's hero died.
    #[must_use]
    pub fn my_death_rate(&self) -> f64 {
        self.rate(self.player_deaths)
    }

    /// Fraction of trials in which the opponent's hero died.
    #[must_use]
    pub fn their_death_rate(&self) -> f64 {
        self.rate(self.opponent_deaths)
    }

    /// Win count as a proportion, for confidence intervals.
    #[must_use]
    pub fn win_proportion(&self) -> Proportion {
        Proportion::new(self.wins, self.total())
    }

    /// True when the rates form a distribution that may be displayed.
    #[must_use]
    pub fn is_valid_distribution(&self) -> bool {
        self.exit_condition.is_success() && self.total() > 0
    }

    /// True when the deadline fired before enough trials completed.
    #[must_use]
    pub fn not_enough_data(&self) -> bool {
        self.exit_condition == ExitCondition::TimeLimitInsufficient
    }

    /// Each observed signed damage value with its frequency, ascending.
    #[must_use]
    pub fn possible_results(&self) -> Vec<(i32, f64)> {
        self.damage
            .iter()
            .map(|(value, _)| (value, self.damage.frequency(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(result: CombatResult, damage: i32, died: bool) -> TrialOutcome {
        TrialOutcome {
            result,
            damage,
            player_died: died && result == CombatResult::Loss,
            opponent_died: died && result == CombatResult::Win,
            survivors: 1,
            attacks: 3,
        }
    }

    #[test]
    fn empty_result_reports_zero_rates() {
        let result = AggregatedResult::empty(ExitCondition::UnsupportedInteraction);
        assert_eq!(result.total(), 0);
        assert_eq!(result.win_rate(), 0.0);
        assert_eq!(result.their_death_rate(), 0.0);
        assert!(!result.is_valid_distribution());
        assert!(result.possible_results().is_empty());
    }

    #[test]
    fn rates_and_deaths() {
        let outcomes = [
            outcome(CombatResult::Win, 8, true),
            outcome(CombatResult::Win, 3, false),
            outcome(CombatResult::Loss, 6, true),
            TrialOutcome::tie(2),
        ];
        let result = aggregate(&outcomes).finish(ExitCondition::TimeLimit);
        assert!((result.win_rate() - 0.5).abs() < 1e-12);
        assert!((result.loss_rate() - 0.25).abs() < 1e-12);
        assert!((result.my_death_rate() - 0.25).abs() < 1e-12);
        assert!((result.their_death_rate() - 0.25).abs() < 1e-12);
        assert_eq!(result.damage.count(-6), 1);
        assert_eq!(result.damage.values(), vec![-6, 0, 3, 8]);
        assert!(result.is_valid_distribution());
    }

    #[test]
    fn merge_matches_single_pass() {
        let outcomes: Vec<TrialOutcome> = (0..40)
            .map(|i| match i % 3 {
                0 => outcome(CombatResult::Win, i % 7, i % 5 == 0),
                1 => outcome(CombatResult::Loss, i % 4, false),
                _ => TrialOutcome::tie(1),
            })
            .collect();
        let whole = aggregate(&outcomes);
        let (left, right) = outcomes.split_at(17);
        let merged = Aggregator::merge(aggregate(left), aggregate(right));
        assert_eq!(merged.total(), whole.total());
        let merged = merged.finish(ExitCondition::IterationCap);
        let whole = whole.finish(ExitCondition::IterationCap);
        assert_eq!(merged.damage, whole.damage);
        assert_eq!(merged.wins, whole.wins);
        assert_eq!(merged.opponent_deaths, whole.opponent_deaths);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let outcomes = [
            outcome(CombatResult::Win, 4, false),
            outcome(CombatResult::Loss, 9, true),
        ];
        let first = aggregate(&outcomes).finish(ExitCondition::IterationCap);
        let second = aggregate(&outcomes).finish(ExitCondition::IterationCap);
        assert_eq!(first, second);
    }

    #[test]
    fn insufficient_runs_are_flagged() {
        let result = aggregate(&[TrialOutcome::tie(1)]).finish(ExitCondition::TimeLimitInsufficient);
        assert!(result.not_enough_data());
        assert!(!result.is_valid_distribution());
    }
}
