use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.json");
pub const ENGINE_CONFIG_ENV: &str = "ZONE_ENGINE_CONFIG_PATH";

/// Every tunable of the decision engine. Scoring variants are selected here
/// rather than by swapping code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: GameRules,
    pub world: WorldConfig,
    pub scoring: ScoringPolicy,
    pub search: SearchConfig,
    pub budget: BudgetConfig,
    pub projector: ProjectorConfig,
}

impl EngineConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_ENGINE_CONFIG).expect("builtin engine config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| EngineConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        EngineConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), EngineConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> EngineConfigError {
            EngineConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.rules.speed > 0.0) {
            return Err(invalid("rules.speed", "must be positive"));
        }
        if !(self.rules.zone_radius >= 0.0) {
            return Err(invalid("rules.zone_radius", "must not be negative"));
        }
        if !(0.0..1.0).contains(&self.world.occupation_tau) {
            return Err(invalid("world.occupation_tau", "must lie in [0, 1)"));
        }
        match self.scoring.discount.convention {
            DiscountConvention::Decay if !(self.scoring.discount.rate > 0.0) => {
                return Err(invalid(
                    "scoring.discount.rate",
                    "decay convention expects a positive rate",
                ));
            }
            DiscountConvention::Signed if !(self.scoring.discount.rate < 0.0) => {
                return Err(invalid(
                    "scoring.discount.rate",
                    "signed convention expects a negative rate",
                ));
            }
            _ => {}
        }
        if !(self.scoring.occupation_floor > 0.0) {
            return Err(invalid("scoring.occupation_floor", "must be positive"));
        }
        if let Some(fraction) = self.scoring.max_commit_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(invalid("scoring.max_commit_fraction", "must lie in (0, 1]"));
            }
        }
        if self.budget.floor == 0 {
            return Err(invalid("budget.floor", "must be at least 1"));
        }
        if self.budget.overrun_ceiling < self.budget.floor {
            return Err(invalid("budget.overrun_ceiling", "must not be below the floor"));
        }
        if let Some(cap) = self.budget.cap {
            if cap < self.budget.floor {
                return Err(invalid("budget.cap", "must not be below the floor"));
            }
        }
        if self.projector.inset_even < 0.0 || self.projector.inset_odd < 0.0 {
            return Err(invalid("projector.inset", "must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Game constants shared by every agent and zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub speed: f64,
    pub zone_radius: f64,
    /// Total turns in a match; `None` projects over an unbounded horizon.
    pub match_length: Option<u32>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            speed: 100.0,
            zone_radius: 100.0,
            match_length: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationMeasure {
    /// Every agent inside the capture radius.
    AllAgents,
    /// Largest single-team head count inside the capture radius.
    Plurality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Smoothing factor applied to the previous occupation score each turn.
    pub occupation_tau: f64,
    pub occupation_measure: OccupationMeasure,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            occupation_tau: 0.99,
            occupation_measure: OccupationMeasure::AllAgents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountConvention {
    /// `w(t) = exp(-t * rate)`, rate > 0.
    Decay,
    /// `w(t) = exp(t * rate)`, rate < 0.
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discount {
    pub rate: f64,
    pub convention: DiscountConvention,
}

impl Discount {
    pub fn weight(&self, t: f64) -> f64 {
        match self.convention {
            DiscountConvention::Decay => (-t * self.rate).exp(),
            DiscountConvention::Signed => (t * self.rate).exp(),
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self {
            rate: 0.02,
            convention: DiscountConvention::Decay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieRule {
    /// The current possessor keeps the zone on equal counts.
    Hysteresis,
    /// Equal counts hand the zone to nobody.
    Contested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    Absolute,
    /// Score divided by committed agents (an empty commitment counts as 0.1).
    PerAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationWeighting {
    Ignore,
    Divide,
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoeFilter {
    /// Every opposing agent counts toward every zone.
    All,
    /// Opposing agents count only toward their heading or nearest zone.
    Approaching,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub discount: Discount,
    pub tie_rule: TieRule,
    pub normalization: Normalization,
    pub occupation_weighting: OccupationWeighting,
    pub occupation_floor: f64,
    pub foe_filter: FoeFilter,
    /// Cap on a single zone's commitment, as a fraction of the team size.
    pub max_commit_fraction: Option<f64>,
    /// Multiplier applied to the three mutually closest zones.
    pub core_zone_bonus: f64,
    /// Stop growing a commitment once the projection ends with the zone held.
    pub stop_when_secured: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            discount: Discount::default(),
            tie_rule: TieRule::Hysteresis,
            normalization: Normalization::PerAgent,
            occupation_weighting: OccupationWeighting::Ignore,
            occupation_floor: 0.01,
            foe_filter: FoeFilter::Approaching,
            max_commit_fraction: None,
            core_zone_bonus: 1.0,
            stop_when_secured: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub deadline_ms: u64,
}

impl SearchConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { deadline_ms: 90 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub initial_width: usize,
    pub floor: usize,
    /// Width is clamped to this value on the first overrun.
    pub overrun_ceiling: usize,
    pub growth: usize,
    pub cap: Option<usize>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            initial_width: 10,
            floor: 2,
            overrun_ceiling: 5,
            growth: 1,
            cap: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Hold an owned zone the agent stands in, otherwise reinforce danger.
    GuardHeld,
    /// Nearest zone not already owned.
    AvoidHeld,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    pub inset_even: f64,
    pub inset_odd: f64,
    pub fallback: FallbackPolicy,
    /// Distance traded for one unit of danger by the guard fallback.
    pub danger_weight: f64,
    /// Distance penalty applied to owned zones by the avoid fallback.
    pub held_zone_penalty: f64,
}

impl ProjectorConfig {
    pub fn inset(&self, turn: u32) -> f64 {
        if turn % 2 == 0 {
            self.inset_even
        } else {
            self.inset_odd
        }
    }
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            inset_even: 5.0,
            inset_odd: 10.0,
            fallback: FallbackPolicy::GuardHeld,
            danger_weight: 100.0,
            held_zone_penalty: 10_000.0,
        }
    }
}

/// Resolves the engine config from `ZONE_ENGINE_CONFIG_PATH`, falling back to
/// the builtin copy when the variable is unset or the file is unusable.
pub fn load_engine_config_from_env() -> (EngineConfig, Option<PathBuf>) {
    if let Some(path) = env::var_os(ENGINE_CONFIG_ENV).map(PathBuf::from) {
        match EngineConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "zone_control::config",
                    path = %path.display(),
                    "engine_config.loaded=file"
                );
                return (config, Some(path));
            }
            Err(err) => {
                tracing::warn!(
                    target: "zone_control::config",
                    path = %path.display(),
                    error = %err,
                    "engine_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "zone_control::config", "engine_config.loaded=builtin");
    (EngineConfig::builtin(), None)
}
