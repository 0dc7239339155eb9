use std::time::Duration;

use brawl_core::card::CardTable;
use brawl_core::resolver::{CombatResolver, TrialResolver};
use brawl_core::simulation::{RunParameters, SimulationRunner};
use brawl_core::snapshot::{
    BoardSnapshot, MinionSnapshot, RawCombatState, RawGame, RawHero, RawMinion, RawSide,
    SideSnapshot, SnapshotBuilder,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn raw_side(cards: &[&str]) -> RawSide {
    RawSide {
        hero: Some(RawHero {
            health: 30,
            armor: 0,
            tavern_tier: 4,
        }),
        board: cards
            .iter()
            .zip(1..)
            .map(|(card_id, position)| RawMinion {
                card_id: (*card_id).to_string(),
                zone_position: position,
                attack: 4,
                health: 4,
                ..RawMinion::default()
            })
            .collect(),
        ..RawSide::default()
    }
}

/// Two full boards with deathrattles, cleave and start-of-combat damage.
fn full_boards() -> BoardSnapshot {
    let raw = RawCombatState {
        game: Some(RawGame::default()),
        player: Some(raw_side(&[
            "harvest_golem",
            "kaboom_bot",
            "selfless_hero",
            "scavenging_hyena",
            "rat_pack",
            "cave_hydra",
            "red_whelp",
        ])),
        opponent: Some(raw_side(&[
            "imprisoner",
            "spawn_of_nzoth",
            "replicating_menace",
            "lich_summoner",
            "foe_reaper_4000",
            "kaboom_bot",
            "red_whelp",
        ])),
        available_races: Some(Vec::new()),
        turn: 10,
    };
    let table = CardTable::standard();
    match SnapshotBuilder::new(&table).build(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => panic!("bench board failed to build: {err}"),
    }
}

fn bench_single_trial_vanilla(c: &mut Criterion) {
    let side = |n: i32| SideSnapshot::new((0..n).map(|i| MinionSnapshot::vanilla("m", 2 + i, 3 + i)).collect());
    let snapshot = BoardSnapshot::new(side(7), side(6));
    let resolver = CombatResolver::new();
    let mut seed = 0u64;

    c.bench_function("single_trial_vanilla", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(resolver.resolve(black_box(&snapshot), seed))
        })
    });
}

fn bench_single_trial_full(c: &mut Criterion) {
    let snapshot = full_boards();
    let resolver = CombatResolver::new();
    let mut seed = 0u64;

    c.bench_function("single_trial_full", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(resolver.resolve(black_box(&snapshot), seed))
        })
    });
}

fn bench_run_1000(c: &mut Criterion) {
    let snapshot = full_boards();
    let runner = SimulationRunner::new(CombatResolver::new());
    let params = RunParameters {
        max_trials: 1_000,
        worker_count: 2,
        max_duration: Duration::from_secs(30),
        min_trials: 0,
        seed: 1,
    };

    c.bench_function("run_1000_trials", |b| {
        b.iter(|| black_box(runner.run(&snapshot, &params)))
    });
}

criterion_group!(
    benches,
    bench_single_trial_vanilla,
    bench_single_trial_full,
    bench_run_1000
);
criterion_main!(benches);
