use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use zone_core::config::{GameRules, WorldConfig};
use zone_core::{
    AssignmentSearch, DecisionEngine, EngineConfig, GameSetup, Position, ScoringPolicy,
    SearchLimits, TeamId, TurnObservation, WallClock, WorldState,
};

const MAP_WIDTH: i32 = 4_000;
const MAP_HEIGHT: i32 = 1_800;

fn random_position(rng: &mut SmallRng) -> Position {
    Position::new(rng.gen_range(0..MAP_WIDTH), rng.gen_range(0..MAP_HEIGHT))
}

fn random_game(seed: u64, teams: usize, agents: usize, zones: usize) -> (GameSetup, TurnObservation) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let setup = GameSetup {
        team_count: teams,
        my_team: TeamId(0),
        agents_per_team: agents,
        zones: (0..zones).map(|_| random_position(&mut rng)).collect(),
    };
    let turn = TurnObservation {
        owners: (0..zones)
            .map(|_| {
                let owner = rng.gen_range(-1..teams as i64);
                (owner >= 0).then(|| TeamId(owner as usize))
            })
            .collect(),
        positions: (0..teams)
            .map(|_| (0..agents).map(|_| random_position(&mut rng)).collect())
            .collect(),
    };
    (setup, turn)
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("assignment_search");
    let (setup, turn) = random_game(7, 4, 5, 6);
    let world = WorldState::from_observation(
        &setup,
        &turn,
        &GameRules::default(),
        &WorldConfig::default(),
    )
    .expect("benchmark world");
    let policy = ScoringPolicy::default();

    for width in [2usize, 3, 5] {
        group.bench_with_input(BenchmarkId::new("width", width), &width, |b, &width| {
            b.iter(|| {
                let clock = WallClock::start();
                let limits = SearchLimits {
                    width,
                    deadline: Some(Duration::from_millis(90)),
                };
                AssignmentSearch::new(&world, &policy, &clock, limits).run()
            });
        });
    }

    group.finish();
}

fn bench_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");

    for zones in [4usize, 6, 8] {
        group.bench_with_input(BenchmarkId::new("zones", zones), &zones, |b, &zones| {
            let (setup, turn) = random_game(11, 4, 5, zones);
            b.iter_batched(
                || {
                    DecisionEngine::new(&setup, EngineConfig::builtin()).expect("benchmark engine")
                },
                |mut engine| engine.decide(&turn).expect("benchmark turn"),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(search_benches, bench_search, bench_turn);
criterion_main!(search_benches);
