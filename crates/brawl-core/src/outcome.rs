//! Result of one completed trial.

use serde::{Deserialize, Serialize};

/// Winner of a combat from the player's point of view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatResult {
    /// The player's board survived
    Win,
    /// Both boards died, neither could attack, or the attack guard tripped
    Tie,
    /// The opponent's board survived
    Loss,
}

impl CombatResult {
    /// Lowercase label used in logs and diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Tie => "tie",
            Self::Loss => "loss",
        }
    }
}

/// Outcome of one trial.
///
/// Consumed by the aggregator immediately and never retained individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Who won
    pub result: CombatResult,
    /// Damage dealt to the losing hero; 0 on a tie
    pub damage: i32,
    /// The player's hero reached lethal damage
    pub player_died: bool,
    /// The opponent's hero reached lethal damage
    pub opponent_died: bool,
    /// Minions left on the winning side
    pub survivors: u8,
    /// Attacks made during the trial
    pub attacks: u32,
}

impl TrialOutcome {
    /// A tie with no damage.
    #[must_use]
    pub fn tie(attacks: u32) -> Self {
        Self {
            result: CombatResult::Tie,
            damage: 0,
            player_died: false,
            opponent_died: false,
            survivors: 0,
            attacks,
        }
    }

    /// Damage signed from the player's point of view: positive when the player
    /// dealt it, negative when the player took it.
    #[must_use]
    pub fn signed_damage(&self) -> i32 {
        match self.result {
            CombatResult::Win => self.damage,
            CombatResult::Tie => 0,
            CombatResult::Loss => -self.damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_damage_follows_result() {
        let mut outcome = TrialOutcome::tie(3);
        assert_eq!(outcome.signed_damage(), 0);
        outcome.damage = 7;
        outcome.result = CombatResult::Win;
        assert_eq!(outcome.signed_damage(), 7);
        outcome.result = CombatResult::Loss;
        assert_eq!(outcome.signed_damage(), -7);
    }
}
