//! Turns an [`Assignment`] into one movement target per own agent.

use zone_protocol::Position;

use crate::config::{FallbackPolicy, ProjectorConfig};
use crate::ids::{AgentId, ZoneId};
use crate::search::Assignment;
use crate::world::{Agent, WorldState, Zone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedTargets {
    /// Indexed by own agent id.
    pub targets: Vec<Position>,
    /// Agents the assignment left idle, in id order.
    pub fallback: Vec<AgentId>,
}

pub struct PositionProjector<'a> {
    world: &'a WorldState,
    config: &'a ProjectorConfig,
}

impl<'a> PositionProjector<'a> {
    pub fn new(world: &'a WorldState, config: &'a ProjectorConfig) -> Self {
        Self { world, config }
    }

    pub fn project(&self, assignment: &Assignment) -> ProjectedTargets {
        let mut fallback = Vec::new();
        let mut danger = None;

        let targets = self
            .world
            .own_agents()
            .iter()
            .map(|agent| match assignment.zone_for(agent.id) {
                Some(zone) => self.assigned_target(agent, zone),
                None => {
                    fallback.push(agent.id);
                    let danger = danger.get_or_insert_with(|| self.zone_danger());
                    let target = self.fallback_target(agent, danger);
                    tracing::warn!(
                        target: "zone_control::projector",
                        agent = %agent.id,
                        target = %target,
                        "projector.fallback"
                    );
                    target
                }
            })
            .collect();

        ProjectedTargets { targets, fallback }
    }

    /// Zone center while outside the capture radius; once inside, the agent
    /// keeps its spot, pulled in from the rim by the turn's inset.
    fn assigned_target(&self, agent: &Agent, zone: ZoneId) -> Position {
        let center = self.world.zone(zone).position;
        let radius = self.world.rules().zone_radius;
        let distance = agent.position.distance(center);
        if distance > radius {
            return center;
        }

        let limit = (radius - self.config.inset(self.world.turn())).max(0.0);
        if distance <= limit {
            return agent.position;
        }
        let dx = f64::from(agent.position.x - center.x) * limit / distance;
        let dy = f64::from(agent.position.y - center.y) * limit / distance;
        Position::new(center.x + dx.trunc() as i32, center.y + dy.trunc() as i32)
    }

    fn fallback_target(&self, agent: &Agent, danger: &[f64]) -> Position {
        let world = self.world;
        let my_team = world.my_team();
        let zone = match self.config.fallback {
            FallbackPolicy::GuardHeld => world
                .zone_containing(agent)
                .filter(|zone| world.zone(*zone).is_owned_by(my_team))
                .unwrap_or_else(|| {
                    self.cheapest_zone(|zone| {
                        agent.position.distance(zone.position)
                            - self.config.danger_weight * danger[zone.id.0]
                    })
                }),
            FallbackPolicy::AvoidHeld => self.cheapest_zone(|zone| {
                let penalty = if zone.is_owned_by(my_team) {
                    self.config.held_zone_penalty
                } else {
                    0.0
                };
                penalty + agent.position.distance(zone.position)
            }),
        };
        world.zone(zone).position
    }

    /// Per zone: the strongest opposing team heading there minus own agents
    /// already inside.
    fn zone_danger(&self) -> Vec<f64> {
        let world = self.world;
        let my_team = world.my_team();
        let radius = world.rules().zone_radius;

        world
            .zones()
            .iter()
            .map(|zone| {
                let mut per_team = vec![0usize; world.team_count()];
                let mut own_inside = 0usize;
                for ranked in &zone.by_distance {
                    let agent = world.agent(ranked.agent);
                    if agent.team == my_team {
                        if ranked.distance <= radius {
                            own_inside += 1;
                        }
                    } else if agent.heading_zone == zone.id {
                        per_team[agent.team.0] += 1;
                    }
                }
                let threat = per_team.into_iter().max().unwrap_or(0);
                threat as f64 - own_inside as f64
            })
            .collect()
    }

    fn cheapest_zone(&self, mut cost: impl FnMut(&Zone) -> f64) -> ZoneId {
        let mut best = ZoneId(0);
        let mut best_cost = f64::INFINITY;
        for zone in self.world.zones() {
            let c = cost(zone);
            if c < best_cost {
                best_cost = c;
                best = zone.id;
            }
        }
        best
    }
}
