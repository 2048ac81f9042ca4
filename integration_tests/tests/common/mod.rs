#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Once;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use zone_core::{TurnDecision, ENGINE_CONFIG_ENV};
use zone_protocol::{read_dump, GameSetup, Position, TeamId, TurnObservation};

static INIT: Once = Once::new();

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path("test_engine_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test engine config at {}",
            config_path.display()
        );

        std::env::set_var(ENGINE_CONFIG_ENV, &config_path);
    });
}

pub fn load_dump(name: &str) -> (GameSetup, TurnObservation) {
    let path = fixture_path(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    read_dump(&text).unwrap_or_else(|err| panic!("invalid dump {}: {err}", path.display()))
}

/// A seeded match where every agent walks toward a random waypoint at full
/// speed, picking a new one whenever it arrives.
pub fn random_match(
    seed: u64,
    teams: usize,
    agents: usize,
    zones: usize,
    turns: usize,
) -> (GameSetup, Vec<TurnObservation>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let setup = GameSetup {
        team_count: teams,
        my_team: TeamId(rng.gen_range(0..teams)),
        agents_per_team: agents,
        zones: (0..zones).map(|_| random_point(&mut rng)).collect(),
    };

    let mut positions: Vec<Vec<Position>> = (0..teams)
        .map(|_| (0..agents).map(|_| random_point(&mut rng)).collect())
        .collect();
    let mut waypoints = positions.clone();

    let mut observations = Vec::with_capacity(turns);
    for _ in 0..turns {
        for (team_positions, team_waypoints) in positions.iter_mut().zip(&mut waypoints) {
            for (position, waypoint) in team_positions.iter_mut().zip(team_waypoints.iter_mut()) {
                if position == waypoint {
                    *waypoint = setup.zones[rng.gen_range(0..zones)];
                }
                *position = step_toward(*position, *waypoint, 100.0);
            }
        }
        let owners = (0..zones)
            .map(|_| {
                let owner = rng.gen_range(0..=teams);
                (owner < teams).then_some(TeamId(owner))
            })
            .collect();
        observations.push(TurnObservation {
            owners,
            positions: positions.clone(),
        });
    }

    (setup, observations)
}

fn random_point(rng: &mut SmallRng) -> Position {
    Position::new(rng.gen_range(0..4_000), rng.gen_range(0..1_800))
}

fn step_toward(from: Position, to: Position, speed: f64) -> Position {
    let distance = from.distance(to);
    if distance <= speed {
        return to;
    }
    let dx = f64::from(to.x - from.x) * speed / distance;
    let dy = f64::from(to.y - from.y) * speed / distance;
    Position::new(from.x + dx as i32, from.y + dy as i32)
}

/// Agents and zones are used at most once, and every own agent has a target.
pub fn assert_valid_decision(setup: &GameSetup, decision: &TurnDecision) {
    assert_eq!(decision.targets.len(), setup.agents_per_team);

    let mut zones = HashSet::new();
    let mut agents = HashSet::new();
    for commitment in &decision.assignment.commitments {
        assert!(commitment.zone.0 < setup.zones.len());
        assert!(zones.insert(commitment.zone), "zone {} claimed twice", commitment.zone);
        for agent in &commitment.agents {
            assert!(agent.0 < setup.agents_per_team);
            assert!(agents.insert(*agent), "agent {agent} committed twice");
        }
    }
    assert!(decision.assignment.score >= 0.0);
    assert_eq!(
        decision.metrics.committed_agents + decision.metrics.fallback_agents,
        setup.agents_per_team
    );
}
