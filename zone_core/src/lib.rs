//! Decision engine for the zone-control bot.
//!
//! Every turn the engine folds the referee's observation into a fresh
//! [`WorldState`], searches for the zone commitments with the best discounted
//! control value before the deadline, and projects the winning assignment
//! onto one target per own agent via [`DecisionEngine::decide`].

pub mod budget;
pub mod clock;
pub mod config;
mod engine;
mod ids;
pub mod metrics;
pub mod projector;
pub mod scorer;
pub mod search;
pub mod world;

pub use budget::{BudgetController, WidthChange};
pub use clock::{FrozenClock, SearchClock, SteppingClock, WallClock};
pub use config::{
    load_engine_config_from_env, EngineConfig, EngineConfigError, ScoringPolicy,
    BUILTIN_ENGINE_CONFIG, ENGINE_CONFIG_ENV,
};
pub use engine::{DecisionEngine, TurnDecision};
pub use ids::{AgentId, AgentRef, AgentSet, IdSet, ZoneId, ZoneSet};
pub use metrics::TurnMetrics;
pub use projector::{PositionProjector, ProjectedTargets};
pub use scorer::{Commitment, ZoneProjection, ZoneScorer};
pub use search::{
    Assignment, AssignmentSearch, SearchLimits, SearchOutcome, SearchStats, ZoneCommitment,
};
pub use world::{WorldError, WorldState};

pub use zone_protocol::{GameSetup, Position, TeamId, TurnObservation};
