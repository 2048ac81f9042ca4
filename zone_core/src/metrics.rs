use serde::Serialize;

/// Counters reported for every decided turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnMetrics {
    pub turn: u32,
    pub nodes: u64,
    pub width_before: usize,
    pub width_after: usize,
    pub elapsed_ms: f64,
    pub score: f64,
    pub committed_agents: usize,
    pub fallback_agents: usize,
    pub deadline_hit: bool,
}
