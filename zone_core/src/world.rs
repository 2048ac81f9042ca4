//! Per-turn world snapshot.
//!
//! A [`WorldState`] is never edited in place: [`WorldState::observe`] builds
//! the next turn's snapshot from the previous one, carrying over the values
//! that persist across turns (occupation scores, previous positions, the
//! per-zone distance order).

use thiserror::Error;
use zone_protocol::{GameSetup, Position, TeamId, TurnObservation};

use crate::config::{GameRules, OccupationMeasure, WorldConfig};
use crate::ids::{AgentId, AgentRef, AgentSet, IdSet, ZoneId, ZoneSet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("game has no zones")]
    NoZones,
    #[error("game has no teams")]
    NoTeams,
    #[error("{what} count {count} exceeds the supported maximum of {max}")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },
    #[error("team {team} is outside the {team_count} teams in play")]
    UnknownTeam { team: TeamId, team_count: usize },
    #[error("observation lists {found} {what}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub team: TeamId,
    pub position: Position,
    /// Position on the previous turn; `None` until a second observation.
    pub previous: Option<Position>,
    /// Zone closest to the straight-line continuation of the last move.
    pub heading_zone: ZoneId,
    pub nearest_zone: ZoneId,
}

impl Agent {
    pub fn reference(&self) -> AgentRef {
        AgentRef::new(self.team, self.id)
    }

    /// Distance from `point` to the agent's forward ray. Falls back to the raw
    /// distance when the agent has not moved.
    pub fn path_distance(&self, point: Position) -> f64 {
        let Some(origin) = self.previous.filter(|prev| *prev != self.position) else {
            return self.position.distance(point);
        };

        let dir_x = f64::from(self.position.x - origin.x);
        let dir_y = f64::from(self.position.y - origin.y);
        let rel_x = f64::from(point.x - origin.x);
        let rel_y = f64::from(point.y - origin.y);
        let u = ((rel_x * dir_x + rel_y * dir_y) / (dir_x * dir_x + dir_y * dir_y)).max(0.0);

        let proj_x = f64::from(origin.x) + u * dir_x;
        let proj_y = f64::from(origin.y) + u * dir_y;
        (proj_x - f64::from(point.x)).hypot(proj_y - f64::from(point.y))
    }
}

/// Entry of a zone's distance-ordered agent list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedAgent {
    pub agent: AgentRef,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub position: Position,
    pub owner: Option<TeamId>,
    /// Exponentially smoothed head count inside the capture radius.
    pub occupation: f64,
    /// Every agent of every team, nearest first.
    pub by_distance: Vec<RankedAgent>,
}

impl Zone {
    pub fn is_owned_by(&self, team: TeamId) -> bool {
        self.owner == Some(team)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    turn: u32,
    my_team: TeamId,
    agents_per_team: usize,
    rules: GameRules,
    config: WorldConfig,
    teams: Vec<Vec<Agent>>,
    zones: Vec<Zone>,
    core_zones: ZoneSet,
}

impl WorldState {
    /// Snapshot before the first observation: agents are unplaced and every
    /// zone is unowned.
    pub fn new(
        setup: &GameSetup,
        rules: &GameRules,
        config: &WorldConfig,
    ) -> Result<Self, WorldError> {
        if setup.zones.is_empty() {
            return Err(WorldError::NoZones);
        }
        if setup.team_count == 0 {
            return Err(WorldError::NoTeams);
        }
        check_capacity("zone", setup.zones.len())?;
        check_capacity("agent per team", setup.agents_per_team)?;
        if setup.my_team.0 >= setup.team_count {
            return Err(WorldError::UnknownTeam {
                team: setup.my_team,
                team_count: setup.team_count,
            });
        }

        let teams: Vec<Vec<Agent>> = (0..setup.team_count)
            .map(|team| {
                (0..setup.agents_per_team)
                    .map(|agent| Agent {
                        id: AgentId(agent),
                        team: TeamId(team),
                        position: Position::default(),
                        previous: None,
                        heading_zone: ZoneId(0),
                        nearest_zone: ZoneId(0),
                    })
                    .collect()
            })
            .collect();

        let zones = setup
            .zones
            .iter()
            .enumerate()
            .map(|(index, position)| Zone {
                id: ZoneId(index),
                position: *position,
                owner: None,
                occupation: 1.0,
                by_distance: teams
                    .iter()
                    .flatten()
                    .map(|agent| RankedAgent {
                        agent: agent.reference(),
                        distance: agent.position.distance(*position),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        let core_zones = core_triad(&setup.zones);

        Ok(Self {
            turn: 0,
            my_team: setup.my_team,
            agents_per_team: setup.agents_per_team,
            rules: rules.clone(),
            config: config.clone(),
            teams,
            zones,
            core_zones,
        })
    }

    /// Convenience for tools and tests: setup followed by a single turn.
    pub fn from_observation(
        setup: &GameSetup,
        turn: &TurnObservation,
        rules: &GameRules,
        config: &WorldConfig,
    ) -> Result<Self, WorldError> {
        WorldState::new(setup, rules, config)?.observe(turn)
    }

    /// Builds the snapshot for the next turn.
    pub fn observe(&self, turn: &TurnObservation) -> Result<WorldState, WorldError> {
        self.check_shape(turn)?;

        let first_observation = self.turn == 0;
        let teams: Vec<Vec<Agent>> = self
            .teams
            .iter()
            .zip(&turn.positions)
            .map(|(agents, positions)| {
                agents
                    .iter()
                    .zip(positions)
                    .map(|(agent, position)| {
                        let moved = Agent {
                            previous: (!first_observation).then_some(agent.position),
                            position: *position,
                            ..agent.clone()
                        };
                        let heading_zone = self.closest_zone(|zone| moved.path_distance(zone));
                        let nearest_zone = self.closest_zone(|zone| moved.position.distance(zone));
                        Agent {
                            heading_zone,
                            nearest_zone,
                            ..moved
                        }
                    })
                    .collect()
            })
            .collect();

        let zones = self
            .zones
            .iter()
            .zip(&turn.owners)
            .map(|(zone, owner)| self.advance_zone(zone, *owner, &teams))
            .collect();

        Ok(WorldState {
            turn: self.turn + 1,
            my_team: self.my_team,
            agents_per_team: self.agents_per_team,
            rules: self.rules.clone(),
            config: self.config.clone(),
            teams,
            zones,
            core_zones: self.core_zones,
        })
    }

    fn check_shape(&self, turn: &TurnObservation) -> Result<(), WorldError> {
        if turn.owners.len() != self.zones.len() {
            return Err(WorldError::ShapeMismatch {
                what: "zone owners",
                expected: self.zones.len(),
                found: turn.owners.len(),
            });
        }
        if let Some(team) = turn
            .owners
            .iter()
            .flatten()
            .find(|team| team.0 >= self.teams.len())
        {
            return Err(WorldError::UnknownTeam {
                team: *team,
                team_count: self.teams.len(),
            });
        }
        if turn.positions.len() != self.teams.len() {
            return Err(WorldError::ShapeMismatch {
                what: "teams",
                expected: self.teams.len(),
                found: turn.positions.len(),
            });
        }
        if let Some(team) = turn
            .positions
            .iter()
            .find(|team| team.len() != self.agents_per_team)
        {
            return Err(WorldError::ShapeMismatch {
                what: "agents in a team",
                expected: self.agents_per_team,
                found: team.len(),
            });
        }
        Ok(())
    }

    fn closest_zone(&self, mut distance: impl FnMut(Position) -> f64) -> ZoneId {
        let mut best = ZoneId(0);
        let mut best_distance = f64::INFINITY;
        for zone in &self.zones {
            let d = distance(zone.position);
            if d < best_distance {
                best_distance = d;
                best = zone.id;
            }
        }
        best
    }

    fn advance_zone(&self, zone: &Zone, owner: Option<TeamId>, teams: &[Vec<Agent>]) -> Zone {
        let mut by_distance: Vec<RankedAgent> = zone
            .by_distance
            .iter()
            .map(|ranked| {
                let agent = &teams[ranked.agent.team.0][ranked.agent.agent.0];
                RankedAgent {
                    agent: ranked.agent,
                    distance: agent.position.distance(zone.position),
                }
            })
            .collect();
        // Stable and adaptive: the order barely changes between turns.
        by_distance.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let inside = by_distance
            .iter()
            .take_while(|ranked| ranked.distance <= self.rules.zone_radius);
        let head_count = match self.config.occupation_measure {
            OccupationMeasure::AllAgents => inside.count(),
            OccupationMeasure::Plurality => {
                let mut per_team = vec![0usize; teams.len()];
                for ranked in inside {
                    per_team[ranked.agent.team.0] += 1;
                }
                per_team.into_iter().max().unwrap_or(0)
            }
        };
        let tau = self.config.occupation_tau;

        Zone {
            id: zone.id,
            position: zone.position,
            owner,
            occupation: tau * zone.occupation + (1.0 - tau) * head_count as f64,
            by_distance,
        }
    }

    /// Number of observations folded into this snapshot.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn my_team(&self) -> TeamId {
        self.my_team
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn agents_per_team(&self) -> usize {
        self.agents_per_team
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> &Zone {
        &self.zones[id.0]
    }

    pub fn team(&self, team: TeamId) -> &[Agent] {
        &self.teams[team.0]
    }

    pub fn own_agents(&self) -> &[Agent] {
        self.team(self.my_team)
    }

    pub fn agent(&self, agent: AgentRef) -> &Agent {
        &self.teams[agent.team.0][agent.agent.0]
    }

    pub fn all_zones(&self) -> ZoneSet {
        IdSet::first(self.zones.len())
    }

    pub fn all_own_agents(&self) -> AgentSet {
        IdSet::first(self.agents_per_team)
    }

    pub fn is_core(&self, zone: ZoneId) -> bool {
        self.core_zones.contains(zone.0)
    }

    /// Turns left to play, when the match length is known.
    pub fn remaining_turns(&self) -> Option<u32> {
        self.rules
            .match_length
            .map(|length| length.saturating_sub(self.turn))
    }

    /// Zone whose capture radius contains the agent, nearest first.
    pub fn zone_containing(&self, agent: &Agent) -> Option<ZoneId> {
        let nearest = self.zone(agent.nearest_zone);
        (agent.position.distance(nearest.position) <= self.rules.zone_radius)
            .then_some(nearest.id)
    }
}

fn check_capacity(what: &'static str, count: usize) -> Result<(), WorldError> {
    if count > IdSet::CAPACITY {
        return Err(WorldError::TooMany {
            what,
            count,
            max: IdSet::CAPACITY,
        });
    }
    Ok(())
}

/// The three zones forming the most compact triangle, weighting its longest
/// side twice. Every zone when fewer than three exist.
fn core_triad(zones: &[Position]) -> ZoneSet {
    if zones.len() < 3 {
        return IdSet::first(zones.len());
    }

    let mut best = IdSet::empty();
    let mut best_score = f64::INFINITY;
    for a in 0..zones.len() {
        for b in a + 1..zones.len() {
            for c in b + 1..zones.len() {
                let ab = zones[a].distance(zones[b]);
                let bc = zones[b].distance(zones[c]);
                let ac = zones[a].distance(zones[c]);
                let score = ab + bc + ac + 2.0 * ab.max(bc).max(ac);
                if score < best_score {
                    best_score = score;
                    best = [a, b, c].into_iter().collect();
                }
            }
        }
    }
    best
}
