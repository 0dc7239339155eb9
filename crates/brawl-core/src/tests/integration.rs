//! End-to-end tests: raw log state through snapshot, scheduler and aggregate.

use std::time::Duration;

use proptest::prelude::*;

use crate::aggregate::{aggregate, Aggregator, ExitCondition};
use crate::card::CardTable;
use crate::config::SimulationConfig;
use crate::error::ErrorState;
use crate::invoker::{InvocationState, Orchestrator};
use crate::outcome::CombatResult;
use crate::simulation::{trial_seed, RunParameters};
use crate::snapshot::{
    BoardSnapshot, MinionSnapshot, RawCombatState, SideSnapshot, SnapshotBuilder, SnapshotError,
};

use super::helpers::{capped, raw_minion, raw_state, resolve_all, run, vanilla_board};

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn ogre_always_beats_wisp() {
    let snapshot = vanilla_board(&[(5, 5)], &[(1, 1)]);
    for outcome in resolve_all(&snapshot, 0..100) {
        assert_eq!(outcome.result, CombatResult::Win);
        assert_eq!(outcome.survivors, 1);
        assert!(outcome.attacks <= 2);
    }

    let result = run(&snapshot, &capped(1_000, 2, 5));
    assert_eq!(result.exit_condition, ExitCondition::IterationCap);
    assert!((result.win_rate() - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.losses, 0);
}

#[test]
fn empty_boards_tie_without_damage() {
    let snapshot = vanilla_board(&[], &[]);
    let result = run(&snapshot, &capped(300, 2, 1));
    assert!((result.tie_rate() - 1.0).abs() < f64::EPSILON);
    assert!(result.win_rate().abs() < f64::EPSILON);
    assert!(result.loss_rate().abs() < f64::EPSILON);
    assert_eq!(result.possible_results(), vec![(0, 1.0)]);
}

#[test]
fn surviving_board_can_be_lethal() {
    let snapshot = BoardSnapshot::new(
        SideSnapshot::new(vec![MinionSnapshot::vanilla("ogre", 5, 5).with_tier(3)]),
        SideSnapshot::default().with_hero(4, 1),
    );
    let result = run(&snapshot, &capped(200, 1, 9));
    assert!((result.their_death_rate() - 1.0).abs() < f64::EPSILON);
    assert!(result.my_death_rate().abs() < f64::EPSILON);
    assert_eq!(result.damage.values(), vec![4]);
}

#[test]
fn unsupported_card_blocks_before_any_trial() {
    let raw = raw_state(
        vec![raw_minion("professor_putricide_festergut", 1, 3, 6)],
        vec![raw_minion("wisp", 1, 1, 1)],
    );
    let table = CardTable::standard();
    let err = SnapshotBuilder::new(&table).build(&raw).unwrap_err();
    assert!(matches!(err, SnapshotError::UnsupportedCard { .. }));
    assert_eq!(ErrorState::from(&err), ErrorState::UnsupportedCards);

    let orchestrator = Orchestrator::new(SimulationConfig::default(), table);
    let invocation = orchestrator.instance("m1", 6, true).unwrap();
    assert!(invocation.start_combat(&raw).is_none());
    assert_eq!(invocation.error_state(), ErrorState::UnsupportedCards);
    assert!(invocation.output().is_none());
}

#[test]
fn unsupported_interaction_invalidates_the_run() {
    let raw = raw_state(
        vec![raw_minion("unstable_portal", 1, 2, 2)],
        vec![raw_minion("ogre", 1, 5, 5)],
    );
    let table = CardTable::standard();
    let snapshot = SnapshotBuilder::new(&table).build(&raw).unwrap();

    let result = run(&snapshot, &capped(1_000, 2, 4));
    assert_eq!(result.exit_condition, ExitCondition::UnsupportedInteraction);
    assert_eq!(result.total(), 0);
    assert!(!result.is_valid_distribution());
    assert_eq!(ErrorState::from(result.exit_condition), ErrorState::UnsupportedInteraction);
}

#[test]
fn expired_deadline_reports_not_enough_data() {
    let snapshot = vanilla_board(&[(2, 3), (1, 1)], &[(3, 2)]);
    let params = RunParameters {
        max_duration: Duration::ZERO,
        min_trials: 500,
        ..capped(10_000, 2, 8)
    };
    let result = run(&snapshot, &params);
    assert!(result.not_enough_data());
    assert!(!result.is_valid_distribution());
    assert_eq!(ErrorState::from(result.exit_condition), ErrorState::NotEnoughData);
}

#[test]
fn json_state_runs_end_to_end() {
    let json = r#"{
        "game": { "damage_cap": 0 },
        "available_races": ["beast", "mech"],
        "turn": 8,
        "player": {
            "hero": { "health": 20, "armor": 0, "tavern_tier": 4 },
            "board": [
                { "card_id": "harvest_golem", "zone_position": 1, "attack": 2, "health": 3 },
                { "card_id": "rat_pack", "zone_position": 2, "attack": 4, "health": 4 }
            ]
        },
        "opponent": {
            "hero": { "health": 15, "armor": 2, "tavern_tier": 3 },
            "board": [
                { "card_id": "kaboom_bot", "zone_position": 1, "attack": 2, "health": 2, "taunt": true }
            ]
        }
    }"#;
    let raw: RawCombatState = serde_json::from_str(json).unwrap();
    let table = CardTable::standard();
    let snapshot = SnapshotBuilder::new(&table).build(&raw).unwrap();
    assert_eq!(snapshot.turn(), 8);
    assert_eq!(snapshot.opponent().hero.effective_health, 17);

    let result = run(&snapshot, &capped(500, 2, 21));
    assert_eq!(result.total(), 500);
    assert!(result.wins > result.losses);
}

#[test]
fn next_turn_takes_over_the_display() {
    let config = SimulationConfig {
        iterations: 400,
        worker_count: Some(2),
        seed: Some(5),
        min_trials_for_diagnostics: 100,
        ..SimulationConfig::default()
    };
    let orchestrator = Orchestrator::new(config, CardTable::standard());
    let invocation = orchestrator.instance("game", 6, true).unwrap();
    let raw = raw_state(vec![raw_minion("ogre", 1, 5, 5)], vec![raw_minion("wisp", 1, 1, 1)]);

    let report = invocation.start_combat(&raw).unwrap().wait().unwrap();
    assert_eq!(report.result.wins, 400);
    assert_eq!(invocation.state(), InvocationState::Combat);

    let next = orchestrator.instance("game", 7, true).unwrap();
    assert!(!invocation.is_displayed());
    assert!(next.is_displayed());
    assert_eq!(orchestrator.len(), 2);
}

// =============================================================================
// Properties
// =============================================================================

fn boards() -> impl Strategy<Value = BoardSnapshot> {
    let side = prop::collection::vec((0i32..10, 1i32..10), 0..=7);
    (side.clone(), side).prop_map(|(player, opponent)| vanilla_board(&player, &opponent))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn rates_sum_to_one(snapshot in boards(), seed in any::<u64>()) {
        let result = run(&snapshot, &capped(60, 1, seed));
        prop_assert_eq!(result.total(), 60);
        let sum = result.win_rate() + result.tie_rate() + result.loss_rate();
        prop_assert!((sum - 1.0).abs() < 1e-9);
        prop_assert!(result.my_death_rate() <= result.loss_rate() + 1e-12);
        prop_assert!(result.their_death_rate() <= result.win_rate() + 1e-12);
    }

    #[test]
    fn trial_cap_is_never_exceeded(max_trials in 1u64..400, workers in 1usize..5) {
        let snapshot = vanilla_board(&[(3, 3), (2, 1)], &[(1, 4), (2, 2)]);
        let result = run(&snapshot, &capped(max_trials, workers, max_trials));
        prop_assert_eq!(result.total(), max_trials);
        prop_assert_eq!(result.exit_condition, ExitCondition::IterationCap);
    }

    #[test]
    fn aggregation_ignores_partitioning(split in 0usize..=80, seed in any::<u64>()) {
        let snapshot = vanilla_board(&[(2, 2), (3, 1), (1, 5)], &[(2, 3), (4, 1)]);
        let outcomes = resolve_all(&snapshot, (0..80).map(|i| trial_seed(seed, i)));
        let (left, right) = outcomes.split_at(split);
        let merged = Aggregator::merge(aggregate(left), aggregate(right))
            .finish(ExitCondition::IterationCap);
        let whole = aggregate(&outcomes).finish(ExitCondition::IterationCap);
        prop_assert_eq!(&merged.damage, &whole.damage);
        prop_assert_eq!((merged.wins, merged.ties, merged.losses), (whole.wins, whole.ties, whole.losses));
        prop_assert_eq!(aggregate(&outcomes).finish(ExitCondition::IterationCap), whole);
    }
}
