//! Width-limited, deadline-bounded search over zone commitments.

use std::time::Duration;

use serde::Serialize;

use crate::clock::SearchClock;
use crate::config::ScoringPolicy;
use crate::ids::{AgentId, AgentSet, ZoneId, ZoneSet};
use crate::scorer::{Commitment, ZoneScorer};
use crate::world::WorldState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneCommitment {
    pub zone: ZoneId,
    pub agents: Vec<AgentId>,
}

/// Zones claimed in search order, each with the agents sent to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assignment {
    pub score: f64,
    pub commitments: Vec<ZoneCommitment>,
}

impl Assignment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn zone_for(&self, agent: AgentId) -> Option<ZoneId> {
        self.commitments
            .iter()
            .find(|commitment| commitment.agents.contains(&agent))
            .map(|commitment| commitment.zone)
    }

    pub fn committed_agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.commitments
            .iter()
            .flat_map(|commitment| commitment.agents.iter().copied())
    }

    fn prefixed(mut self, commitment: ZoneCommitment) -> Self {
        self.commitments.insert(0, commitment);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Candidates explored at every level.
    pub width: usize,
    /// `None` searches to exhaustion.
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub deadline_hit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub assignment: Assignment,
    pub stats: SearchStats,
    pub elapsed: Duration,
}

pub struct AssignmentSearch<'a, C> {
    scorer: ZoneScorer<'a>,
    clock: &'a C,
    limits: SearchLimits,
    stats: SearchStats,
}

impl<'a, C: SearchClock> AssignmentSearch<'a, C> {
    pub fn new(
        world: &'a WorldState,
        policy: &'a ScoringPolicy,
        clock: &'a C,
        limits: SearchLimits,
    ) -> Self {
        Self {
            scorer: ZoneScorer::new(world, policy),
            clock,
            limits,
            stats: SearchStats::default(),
        }
    }

    /// Searches every zone with every own agent.
    pub fn run(mut self) -> SearchOutcome {
        let world = self.scorer.world();
        let assignment = self.solve(world.all_zones(), world.all_own_agents());
        SearchOutcome {
            assignment,
            stats: self.stats,
            elapsed: self.clock.elapsed(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Best assignment of `agents` over `zones`. Each branch receives its own
    /// copy of the remaining sets.
    pub fn solve(&mut self, zones: ZoneSet, agents: AgentSet) -> Assignment {
        debug_assert!(agents.is_subset(self.scorer.world().all_own_agents()));
        if zones.is_empty() || agents.is_empty() || self.expired() {
            return Assignment::empty();
        }
        self.stats.nodes += 1;

        let mut best = Assignment::empty();
        for candidate in self.candidates(zones, agents) {
            let remaining_zones = zones.without(candidate.zone.0);
            let remaining_agents = candidate
                .agents
                .iter()
                .fold(agents, |set, agent| set.without(agent.0));

            let mut branch = self.solve(remaining_zones, remaining_agents);
            branch.score += candidate.score;
            if branch.score > best.score {
                best = branch.prefixed(ZoneCommitment {
                    zone: candidate.zone,
                    agents: candidate.agents,
                });
            }
        }
        best
    }

    /// Top `width` zone commitments by priority. The sort is stable, so equal
    /// priorities keep zone order.
    fn candidates(&self, zones: ZoneSet, agents: AgentSet) -> Vec<Commitment> {
        let mut candidates: Vec<Commitment> = zones
            .iter()
            .filter_map(|zone| self.scorer.best_commitment(ZoneId(zone), agents))
            .collect();
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        candidates.truncate(self.limits.width);
        candidates
    }

    fn expired(&mut self) -> bool {
        let Some(deadline) = self.limits.deadline else {
            return false;
        };
        if self.clock.elapsed() > deadline {
            self.stats.deadline_hit = true;
            return true;
        }
        false
    }
}
