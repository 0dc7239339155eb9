//! Checks a committed prediction against the combat that actually happened.
//!
//! An observed outcome the simulator gave a rate of exactly zero is almost
//! always a simulator defect, so those cases are flagged for diagnostics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::AggregatedResult;
use crate::card::CardTable;
use crate::config::SimulationConfig;
use crate::outcome::CombatResult;
use crate::snapshot::{BoardSnapshot, Side};

/// A hero as seen in the log when it attacked or was attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroObservation {
    /// Owner
    pub side: Side,
    /// Attack of the hero, equal to the damage it deals
    pub attack: i32,
    /// Health
    pub health: i32,
    /// Armor
    pub armor: i32,
}

/// What the log showed once combat ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedCombat {
    /// Hero that attacked after combat; none on a tie
    pub attacking_hero: Option<HeroObservation>,
    /// Hero that was attacked
    pub defending_hero: Option<HeroObservation>,
    /// The local player conceded
    pub conceded: bool,
}

/// Which hero, if any, died to the combat damage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LethalResult {
    /// Both heroes survived
    NoOneDied,
    /// The player's hero died
    FriendlyDied,
    /// The opponent's hero died
    OpponentDied,
}

impl LethalResult {
    /// Label used in logs and diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NoOneDied => "no_one_died",
            Self::FriendlyDied => "friendly_died",
            Self::OpponentDied => "opponent_died",
        }
    }
}

impl ObservedCombat {
    /// A combat that ended without hero damage.
    #[must_use]
    pub fn tie() -> Self {
        Self::default()
    }

    /// A combat whose winner hit the other hero.
    #[must_use]
    pub fn hero_attack(attacker: HeroObservation, defender: HeroObservation) -> Self {
        Self {
            attacking_hero: Some(attacker),
            defending_hero: Some(defender),
            conceded: false,
        }
    }

    /// Marks the game as conceded.
    #[must_use]
    pub fn conceded(mut self) -> Self {
        self.conceded = true;
        self
    }

    /// Combat result from the player's point of view.
    #[must_use]
    pub fn result(&self) -> CombatResult {
        match self.attacking_hero {
            None => CombatResult::Tie,
            Some(hero) if hero.side == Side::Player => CombatResult::Win,
            Some(_) => CombatResult::Loss,
        }
    }

    /// Lethal outcome implied by the attack against the defender's health and armor.
    #[must_use]
    pub fn lethal(&self) -> LethalResult {
        let (Some(attacker), Some(defender)) = (self.attacking_hero, self.defending_hero) else {
            return LethalResult::NoOneDied;
        };
        if attacker.attack < defender.health + defender.armor {
            return LethalResult::NoOneDied;
        }
        match attacker.side {
            Side::Player => LethalResult::OpponentDied,
            Side::Opponent => LethalResult::FriendlyDied,
        }
    }
}

/// Why a validation did not compare anything.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No simulation result was committed
    NoOutput,
    /// The run completed too few trials to judge
    TooFewTrials,
    /// Neither diagnostics nor metrics are enabled
    NothingToReport,
    /// The player conceded, so their death says nothing about the prediction
    Conceded,
}

/// Comparison of one prediction with the observed combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Observed combat result
    pub result: CombatResult,
    /// Observed lethal outcome
    pub lethal: LethalResult,
    /// The observed result had a predicted rate of zero
    pub combat_mismatch: bool,
    /// The observed death had a predicted rate of zero and is not excused
    pub lethal_mismatch: bool,
}

impl ValidationReport {
    /// True when either comparison failed.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        self.combat_mismatch || self.lethal_mismatch
    }
}

/// Result of validating a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Validation {
    /// Nothing was compared
    Skipped {
        /// Why
        reason: SkipReason,
    },
    /// The prediction was compared
    Checked(ValidationReport),
}

/// Applies the validation rules of a config.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    config: &'a SimulationConfig,
    table: &'a CardTable,
}

impl<'a> Validator<'a> {
    /// Creates a validator.
    #[must_use]
    pub fn new(config: &'a SimulationConfig, table: &'a CardTable) -> Self {
        Self { config, table }
    }

    /// Compares `output`, predicted for `snapshot`, with what was observed.
    #[must_use]
    pub fn validate(
        &self,
        snapshot: &BoardSnapshot,
        output: Option<&AggregatedResult>,
        observed: &ObservedCombat,
    ) -> Validation {
        debug!("Validating results...");
        let Some(output) = output else {
            debug!("No simulation result. Exiting");
            return Validation::Skipped {
                reason: SkipReason::NoOutput,
            };
        };
        if output.total() < self.config.min_trials_for_diagnostics {
            debug!("Did not complete enough simulations to report terminal cases. Exiting.");
            return Validation::Skipped {
                reason: SkipReason::TooFewTrials,
            };
        }
        if !self.config.diagnostics_enabled && self.config.metric_sampling <= 0.0 {
            debug!("Nothing to report. Exiting.");
            return Validation::Skipped {
                reason: SkipReason::NothingToReport,
            };
        }

        let result = observed.result();
        let lethal = observed.lethal();
        debug!(result = result.label(), lethal = lethal.label(), "Observed combat");

        if lethal == LethalResult::FriendlyDied && observed.conceded {
            debug!("Game was conceded. Not reporting.");
            return Validation::Skipped {
                reason: SkipReason::Conceded,
            };
        }

        let combat_mismatch = match result {
            CombatResult::Win => output.wins == 0,
            CombatResult::Tie => output.ties == 0,
            CombatResult::Loss => output.losses == 0,
        };
        let lethal_mismatch = match lethal {
            LethalResult::NoOneDied => false,
            LethalResult::FriendlyDied => output.player_deaths == 0,
            LethalResult::OpponentDied => output.opponent_deaths == 0,
        } && !self.lethal_excused(snapshot, lethal);

        ValidationReport {
            result,
            lethal,
            combat_mismatch,
            lethal_mismatch,
        }
        .into()
    }

    fn lethal_excused(&self, snapshot: &BoardSnapshot, lethal: LethalResult) -> bool {
        let power = self.table.hero_power(&snapshot.opponent().hero_power.card_id);
        if lethal == LethalResult::OpponentDied && power.is_some_and(|p| p.skip_death_validation) {
            debug!("Opponent hero death is not trusted for this hero power.");
            return true;
        }
        if power.is_some_and(|p| p.skip_lethal_validation) {
            debug!("Lethal results are not reported against this hero power.");
            return true;
        }
        if snapshot.turn() <= self.config.lethal_grace_turns {
            debug!(turn = snapshot.turn(), "Missed lethal this early is not reported.");
            return true;
        }
        false
    }
}

impl From<ValidationReport> for Validation {
    fn from(report: ValidationReport) -> Self {
        Self::Checked(report)
    }
}
