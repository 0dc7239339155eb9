//! Factories for raw log state, snapshots and run parameters.

use std::time::Duration;

use crate::aggregate::AggregatedResult;
use crate::card::Tribe;
use crate::outcome::TrialOutcome;
use crate::resolver::{CombatResolver, TrialResolver};
use crate::simulation::{RunParameters, SimulationRunner};
use crate::snapshot::{
    BoardSnapshot, MinionSnapshot, RawCombatState, RawGame, RawHero, RawMinion, RawSide,
    SideSnapshot,
};

// =============================================================================
// Raw state
// =============================================================================

/// A raw minion with no tags.
pub fn raw_minion(card_id: &str, position: i32, attack: i32, health: i32) -> RawMinion {
    RawMinion {
        card_id: card_id.to_string(),
        zone_position: position,
        attack,
        health,
        ..RawMinion::default()
    }
}

/// A raw side with a 30 health, 5 armor, tier 3 hero.
pub fn raw_side(board: Vec<RawMinion>) -> RawSide {
    RawSide {
        hero: Some(RawHero {
            health: 30,
            armor: 5,
            tavern_tier: 3,
        }),
        board,
        ..RawSide::default()
    }
}

/// A complete raw state on turn 6.
pub fn raw_state(player: Vec<RawMinion>, opponent: Vec<RawMinion>) -> RawCombatState {
    RawCombatState {
        game: Some(RawGame::default()),
        player: Some(raw_side(player)),
        opponent: Some(raw_side(opponent)),
        available_races: Some(vec![Tribe::Beast, Tribe::Mech, Tribe::Undead]),
        turn: 6,
    }
}

// =============================================================================
// Snapshots and runs
// =============================================================================

/// A snapshot of two vanilla boards given as (attack, health) pairs.
pub fn vanilla_board(player: &[(i32, i32)], opponent: &[(i32, i32)]) -> BoardSnapshot {
    let side = |stats: &[(i32, i32)], prefix: &str| {
        SideSnapshot::new(
            stats
                .iter()
                .enumerate()
                .map(|(i, &(attack, health))| {
                    MinionSnapshot::vanilla(&format!("{prefix}_{i}"), attack, health)
                })
                .collect(),
        )
    };
    BoardSnapshot::new(side(player, "p"), side(opponent, "o"))
}

/// Parameters that only stop on the trial cap.
pub fn capped(max_trials: u64, worker_count: usize, seed: u64) -> RunParameters {
    RunParameters {
        max_trials,
        worker_count,
        max_duration: Duration::from_secs(120),
        min_trials: 0,
        seed,
    }
}

/// Runs a snapshot with the default resolver.
pub fn run(snapshot: &BoardSnapshot, params: &RunParameters) -> AggregatedResult {
    SimulationRunner::new(CombatResolver::new()).run(snapshot, params)
}

/// Resolves one trial per seed, in order.
pub fn resolve_all(snapshot: &BoardSnapshot, seeds: impl IntoIterator<Item = u64>) -> Vec<TrialOutcome> {
    let resolver = CombatResolver::new();
    seeds
        .into_iter()
        .map(|seed| {
            resolver
                .resolve(snapshot, seed)
                .unwrap_or_else(|err| panic!("trial with seed {seed} failed: {err}"))
        })
        .collect()
}
