//! One decision per turn: observe, search, project, adjust the budget.

use std::time::Duration;

use zone_protocol::{GameSetup, Position, TurnObservation};

use crate::budget::BudgetController;
use crate::clock::{SearchClock, WallClock};
use crate::config::EngineConfig;
use crate::metrics::TurnMetrics;
use crate::projector::PositionProjector;
use crate::search::{Assignment, AssignmentSearch, SearchLimits};
use crate::world::{WorldError, WorldState};

#[derive(Debug, Clone, PartialEq)]
pub struct TurnDecision {
    /// One target per own agent, in agent-id order.
    pub targets: Vec<Position>,
    pub assignment: Assignment,
    pub metrics: TurnMetrics,
}

/// Owns the state carried between turns: the latest world snapshot and the
/// search width.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
    deadline: Option<Duration>,
    world: WorldState,
    budget: BudgetController,
}

impl DecisionEngine {
    pub fn new(setup: &GameSetup, config: EngineConfig) -> Result<Self, WorldError> {
        let world = WorldState::new(setup, &config.rules, &config.world)?;
        let budget = BudgetController::new(&config.budget);
        Ok(Self {
            deadline: Some(config.search.deadline()),
            config,
            world,
            budget,
        })
    }

    /// Replaces the configured deadline. `None` searches to exhaustion and
    /// leaves the width untouched.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn width(&self) -> usize {
        self.budget.width()
    }

    pub fn decide(&mut self, observation: &TurnObservation) -> Result<TurnDecision, WorldError> {
        let clock = WallClock::start();
        self.decide_with_clock(observation, &clock)
    }

    pub fn decide_with_clock<C: SearchClock>(
        &mut self,
        observation: &TurnObservation,
        clock: &C,
    ) -> Result<TurnDecision, WorldError> {
        self.world = self.world.observe(observation)?;
        let world = &self.world;

        let limits = SearchLimits {
            width: self.budget.width(),
            deadline: self.deadline,
        };
        let outcome = AssignmentSearch::new(world, &self.config.scoring, clock, limits).run();
        let projected = PositionProjector::new(world, &self.config.projector)
            .project(&outcome.assignment);

        let elapsed = clock.elapsed();
        let width_before = self.budget.width();
        let width_after = match self.deadline {
            Some(deadline) => self.budget.record(elapsed, deadline).after,
            None => width_before,
        };

        let metrics = TurnMetrics {
            turn: world.turn(),
            nodes: outcome.stats.nodes,
            width_before,
            width_after,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            score: outcome.assignment.score,
            committed_agents: outcome.assignment.committed_agents().count(),
            fallback_agents: projected.fallback.len(),
            deadline_hit: outcome.stats.deadline_hit,
        };

        tracing::info!(
            target: "zone_control::engine",
            turn = metrics.turn,
            nodes = metrics.nodes,
            width = metrics.width_before,
            elapsed_ms = metrics.elapsed_ms,
            score = metrics.score,
            fallback_agents = metrics.fallback_agents,
            "turn.completed"
        );

        Ok(TurnDecision {
            targets: projected.targets,
            assignment: outcome.assignment,
            metrics,
        })
    }
}
