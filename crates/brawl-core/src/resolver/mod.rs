//! Single-trial combat resolution.
//!
//! A resolver replays one full combat from a [`BoardSnapshot`] and a seed. It
//! reads the snapshot only; every mutation happens on a per-trial
//! [`CombatBoard`](crate::board::CombatBoard).
//!
//! # Invariants
//!
//! - Resolvers MUST be deterministic given the same snapshot and seed
//! - Resolvers MUST NOT share mutable state between concurrent calls
//! - Interactions the resolver cannot model are reported as
//!   [`TrialError::UnsupportedInteraction`], never as a skewed outcome
//!
//! # Available Resolvers
//!
//! - [`CombatResolver`]: Interprets the structured card effects of the snapshot

mod combat;
mod deaths;
mod targeting;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{Ability, AnomalyEffect, HeroPowerEffect, SecretEffect};
use crate::outcome::TrialOutcome;
use crate::snapshot::{BoardSnapshot, Side};

use combat::Combat;

/// Attacks after which a trial is called a tie.
pub const DEFAULT_MAX_ATTACKS: u32 = 500;

/// Why a trial could not produce an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    /// The board holds a card or effect the resolver cannot model.
    #[error("unsupported interaction with {card_id}: {reason}")]
    UnsupportedInteraction {
        /// Card that caused it
        card_id: String,
        /// What is not modelled
        reason: String,
    },
    /// The trial failed unexpectedly.
    #[error("internal trial failure: {0}")]
    Internal(String),
}

impl TrialError {
    fn unsupported(card_id: impl ToString, reason: &str) -> Self {
        Self::UnsupportedInteraction {
            card_id: card_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Who attacks first when both boards have the same number of minions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstAttacker {
    /// Seeded coin flip
    #[default]
    CoinFlip,
    /// Always the player
    Player,
    /// Always the opponent
    Opponent,
}

/// Replays one combat.
///
/// # Example
///
/// ```
/// use brawl_core::resolver::{CombatResolver, TrialResolver};
/// use brawl_core::snapshot::{BoardSnapshot, MinionSnapshot, SideSnapshot};
/// use brawl_core::outcome::CombatResult;
///
/// let snapshot = BoardSnapshot::new(
///     SideSnapshot::new(vec![MinionSnapshot::vanilla("ogre", 5, 5)]),
///     SideSnapshot::new(vec![MinionSnapshot::vanilla("wisp", 1, 1)]),
/// );
/// let outcome = CombatResolver::new().resolve(&snapshot, 42).unwrap();
/// assert_eq!(outcome.result, CombatResult::Win);
/// ```
pub trait TrialResolver: Send + Sync {
    /// Resolves one combat.
    ///
    /// # Errors
    ///
    /// Returns [`TrialError::UnsupportedInteraction`] when the combat reaches
    /// an effect that cannot be modelled.
    fn resolve(&self, snapshot: &BoardSnapshot, seed: u64) -> Result<TrialOutcome, TrialError>;
}

/// Resolver that interprets the structured effects carried by a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver {
    first_attacker: FirstAttacker,
    max_attacks: u32,
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatResolver {
    /// Creates a resolver with coin-flip tie-breaking and the default attack guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            first_attacker: FirstAttacker::CoinFlip,
            max_attacks: DEFAULT_MAX_ATTACKS,
        }
    }

    /// Sets the first-attacker tie-break.
    #[must_use]
    pub fn with_first_attacker(mut self, first_attacker: FirstAttacker) -> Self {
        self.first_attacker = first_attacker;
        self
    }

    /// Sets the attack guard.
    #[must_use]
    pub fn with_max_attacks(mut self, max_attacks: u32) -> Self {
        self.max_attacks = max_attacks;
        self
    }

    /// Checks the effects that apply before the first attack.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported anomaly, activated hero power, secret or
    /// minion ability.
    pub fn check_supported(snapshot: &BoardSnapshot) -> Result<(), TrialError> {
        if let Some(anomaly) = &snapshot.globals().anomaly {
            if let AnomalyEffect::Unsupported { reason } = &anomaly.effect {
                return Err(TrialError::unsupported(&anomaly.card_id, reason));
            }
        }
        for side in [Side::Player, Side::Opponent] {
            let state = snapshot.side(side);
            if let HeroPowerEffect::Unsupported { reason } = &state.hero_power.effect {
                if state.hero_power.activated {
                    return Err(TrialError::unsupported(&state.hero_power.card_id, reason));
                }
            }
            for secret in &state.secrets {
                if let SecretEffect::Unsupported { reason } = &secret.effect {
                    return Err(TrialError::unsupported(&secret.card_id, reason));
                }
            }
            for minion in &state.minions {
                for ability in &minion.abilities {
                    if let Ability::Unsupported { reason } = ability {
                        return Err(TrialError::unsupported(&minion.card_id, reason));
                    }
                }
            }
        }
        Ok(())
    }
}

impl TrialResolver for CombatResolver {
    fn resolve(&self, snapshot: &BoardSnapshot, seed: u64) -> Result<TrialOutcome, TrialError> {
        Self::check_supported(snapshot)?;
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Combat::new(snapshot, rng, self.max_attacks).run(self.first_attacker)
    }
}
