//! Caller-facing error states.
//!
//! Every failure the engine can hit is recovered at the scheduler or
//! orchestrator boundary and folded into one [`ErrorState`], so a consumer can
//! render specific guidance instead of a generic failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::ExitCondition;
use crate::snapshot::SnapshotError;

/// Discrete error overlay shown alongside the orchestrator state.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorState {
    /// No error
    #[default]
    None,
    /// A board card has not been identified yet
    UnknownCards,
    /// A board card cannot be simulated
    UnsupportedCards,
    /// A trial hit an interaction that cannot be modelled
    UnsupportedInteraction,
    /// The deadline fired before enough trials completed
    NotEnoughData,
    /// The run failed unexpectedly
    FailedToLoad,
    /// The log has not provided every entity a snapshot needs
    IncompleteInput,
}

impl ErrorState {
    /// True when no error is set.
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Human-readable guidance for the state.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::None => "",
            Self::UnknownCards => "Could not identify every card on the board",
            Self::UnsupportedCards => "A card on the board is not supported yet",
            Self::UnsupportedInteraction => "This combat has an interaction that is not supported yet",
            Self::NotEnoughData => "Not enough simulations completed in time",
            Self::FailedToLoad => "The simulation failed to run",
            Self::IncompleteInput => "Waiting for the game to provide the full board",
        }
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&SnapshotError> for ErrorState {
    fn from(err: &SnapshotError) -> Self {
        match err {
            SnapshotError::MissingAvailableRaces | SnapshotError::UnknownCard { .. } => {
                Self::UnknownCards
            }
            SnapshotError::UnsupportedCard { .. } => Self::UnsupportedCards,
            SnapshotError::MissingGameEntity
            | SnapshotError::MissingPlayer(_)
            | SnapshotError::MissingHero(_) => Self::IncompleteInput,
        }
    }
}

impl From<ExitCondition> for ErrorState {
    fn from(exit: ExitCondition) -> Self {
        match exit {
            ExitCondition::IterationCap | ExitCondition::TimeLimit => Self::None,
            ExitCondition::TimeLimitInsufficient => Self::NotEnoughData,
            ExitCondition::UnsupportedInteraction => Self::UnsupportedInteraction,
            ExitCondition::InternalError => Self::FailedToLoad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Side;

    #[test]
    fn snapshot_errors_map_to_distinct_states() {
        assert_eq!(
            ErrorState::from(&SnapshotError::UnknownCard {
                side: Side::Opponent,
                position: 2
            }),
            ErrorState::UnknownCards
        );
        assert_eq!(
            ErrorState::from(&SnapshotError::UnsupportedCard {
                side: Side::Player,
                card_id: "x".to_string()
            }),
            ErrorState::UnsupportedCards
        );
        assert_eq!(
            ErrorState::from(&SnapshotError::MissingHero(Side::Player)),
            ErrorState::IncompleteInput
        );
    }

    #[test]
    fn exit_conditions_map_to_states() {
        assert!(ErrorState::from(ExitCondition::TimeLimit).is_none());
        assert_eq!(
            ErrorState::from(ExitCondition::TimeLimitInsufficient),
            ErrorState::NotEnoughData
        );
        assert_eq!(
            ErrorState::from(ExitCondition::UnsupportedInteraction),
            ErrorState::UnsupportedInteraction
        );
        assert_eq!(ErrorState::from(ExitCondition::InternalError), ErrorState::FailedToLoad);
    }

    #[test]
    fn every_error_has_a_message() {
        for state in [
            ErrorState::UnknownCards,
            ErrorState::UnsupportedCards,
            ErrorState::UnsupportedInteraction,
            ErrorState::NotEnoughData,
            ErrorState::FailedToLoad,
            ErrorState::IncompleteInput,
        ] {
            assert!(!state.to_string().is_empty());
        }
    }
}
