//! Projected control value of a single zone.
//!
//! The projection replays the arrival order of every agent around the zone:
//! each simulated turn the arrival ring `t * speed + radius` grows, agents
//! inside it are counted for their side, and the zone flips to whoever holds
//! the strict majority over the strongest opposing team. Time jumps straight
//! from one arrival to the next, so the cost is linear in the agent count and
//! independent of the horizon.

use crate::config::{FoeFilter, Normalization, OccupationWeighting, ScoringPolicy, TieRule};
use crate::ids::{AgentId, AgentRef, AgentSet, ZoneId};
use crate::world::WorldState;

/// Horizon used when the match length is not modelled. The discount makes
/// anything past it negligible.
pub const UNBOUNDED_HORIZON: u32 = 1_000_000;

/// Priority divisor standing in for an empty commitment.
const EMPTY_COMMITMENT_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneProjection {
    pub score: f64,
    /// Whether the zone is still held when the last arrival has been counted.
    pub secured: bool,
    pub my_count: usize,
    pub foe_count: usize,
}

/// Best way found to contest one zone from the agents still free.
#[derive(Debug, Clone, PartialEq)]
pub struct Commitment {
    pub zone: ZoneId,
    /// Nearest free own agents first.
    pub agents: Vec<AgentId>,
    pub score: f64,
    /// Ordering key for the search, see [`Normalization`].
    pub priority: f64,
}

/// Control after one simulation step.
pub fn resolve_control(my_count: usize, foe_count: usize, was_mine: bool, rule: TieRule) -> bool {
    match rule {
        TieRule::Hysteresis => my_count > foe_count || (my_count == foe_count && was_mine),
        TieRule::Contested => my_count > foe_count,
    }
}

pub struct ZoneScorer<'a> {
    world: &'a WorldState,
    policy: &'a ScoringPolicy,
}

impl<'a> ZoneScorer<'a> {
    pub fn new(world: &'a WorldState, policy: &'a ScoringPolicy) -> Self {
        Self { world, policy }
    }

    pub fn world(&self) -> &'a WorldState {
        self.world
    }

    /// Projects the zone's value when the `k` nearest agents of `available`
    /// are sent to it.
    pub fn project(&self, zone_id: ZoneId, available: AgentSet, k: usize) -> ZoneProjection {
        let world = self.world;
        let zone = world.zone(zone_id);
        let rules = world.rules();
        let my_team = world.my_team();
        let horizon = world.remaining_turns().unwrap_or(UNBOUNDED_HORIZON);
        let discount = self.policy.discount;

        let mut team_counts = vec![0usize; world.team_count()];
        let mut my_count = 0usize;
        let mut foe_count = 0usize;
        let mut is_mine = zone.is_owned_by(my_team);
        let mut score = 0.0;

        let ranked = &zone.by_distance;
        let mut cursor = 0;
        let mut t = 1u32;
        while t < horizon {
            let reach = f64::from(t) * rules.speed + rules.zone_radius;
            while let Some(entry) = ranked.get(cursor).filter(|entry| entry.distance <= reach) {
                let agent = entry.agent;
                if agent.team == my_team {
                    if my_count < k && available.contains(agent.agent.0) {
                        my_count += 1;
                    }
                } else if self.counts_toward(agent, zone_id) {
                    let count = &mut team_counts[agent.team.0];
                    *count += 1;
                    foe_count = foe_count.max(*count);
                }
                cursor += 1;
            }

            is_mine = resolve_control(my_count, foe_count, is_mine, self.policy.tie_rule);

            let next = ranked
                .get(cursor)
                .map_or(horizon, |entry| self.arrival_turn(entry.distance).max(t + 1))
                .min(horizon);
            if is_mine {
                score += discount.weight(f64::from(t)) - discount.weight(f64::from(next));
            }
            t = next;
        }

        ZoneProjection {
            score: self.weighted(zone_id, score),
            secured: is_mine,
            my_count,
            foe_count,
        }
    }

    /// Sweeps the commitment size upward and keeps the smallest one with the
    /// strictly best positive score. `None` when no size improves on zero.
    pub fn best_commitment(&self, zone: ZoneId, available: AgentSet) -> Option<Commitment> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = 0.0;

        for k in 0..=self.max_commitment(available) {
            let projection = self.project(zone, available, k);
            if projection.score > best_score {
                best_score = projection.score;
                best = Some((k, projection.score));
            }
            if self.policy.stop_when_secured && projection.secured {
                break;
            }
        }

        best.map(|(k, score)| {
            let agents = self.nearest_available(zone, available, k);
            let priority = match self.policy.normalization {
                Normalization::Absolute => score,
                Normalization::PerAgent if k == 0 => score / EMPTY_COMMITMENT_WEIGHT,
                Normalization::PerAgent => score / k as f64,
            };
            Commitment {
                zone,
                agents,
                score,
                priority,
            }
        })
    }

    /// Largest commitment tried for a zone.
    pub fn max_commitment(&self, available: AgentSet) -> usize {
        let free = available.len();
        match self.policy.max_commit_fraction {
            Some(fraction) => {
                let cap = (fraction * self.world.agents_per_team() as f64).ceil() as usize;
                free.min(cap.max(1))
            }
            None => free,
        }
    }

    /// The `k` free own agents closest to the zone.
    pub fn nearest_available(&self, zone: ZoneId, available: AgentSet, k: usize) -> Vec<AgentId> {
        let my_team = self.world.my_team();
        self.world
            .zone(zone)
            .by_distance
            .iter()
            .map(|entry| entry.agent)
            .filter(|agent| agent.team == my_team && available.contains(agent.agent.0))
            .map(|agent| agent.agent)
            .take(k)
            .collect()
    }

    fn counts_toward(&self, foe: AgentRef, zone: ZoneId) -> bool {
        match self.policy.foe_filter {
            FoeFilter::All => true,
            FoeFilter::Approaching => {
                let agent = self.world.agent(foe);
                agent.heading_zone == zone || agent.nearest_zone == zone
            }
        }
    }

    /// First simulated turn whose arrival ring reaches `distance`.
    fn arrival_turn(&self, distance: f64) -> u32 {
        let rules = self.world.rules();
        let turns = ((distance - rules.zone_radius) / rules.speed).ceil();
        if !(turns > 1.0) {
            return 1;
        }
        if turns >= f64::from(UNBOUNDED_HORIZON) {
            return UNBOUNDED_HORIZON;
        }
        let turns = turns as u32;
        // Guard against the division rounding up past an exact hit.
        if f64::from(turns - 1) * rules.speed + rules.zone_radius >= distance {
            turns - 1
        } else {
            turns
        }
    }

    fn weighted(&self, zone: ZoneId, score: f64) -> f64 {
        let occupation = self.world.zone(zone).occupation;
        let score = match self.policy.occupation_weighting {
            OccupationWeighting::Ignore => score,
            OccupationWeighting::Divide => score / occupation.max(self.policy.occupation_floor),
            OccupationWeighting::Multiply => score * occupation,
        };
        if self.world.is_core(zone) {
            score * self.policy.core_zone_bonus
        } else {
            score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Discount, DiscountConvention, GameRules, WorldConfig};
    use crate::ids::IdSet;
    use zone_protocol::{GameSetup, Position, TeamId, TurnObservation};

    fn world_with(
        zones: Vec<Position>,
        owners: Vec<Option<TeamId>>,
        positions: Vec<Vec<Position>>,
        rules: GameRules,
    ) -> WorldState {
        let setup = GameSetup {
            team_count: positions.len(),
            my_team: TeamId(0),
            agents_per_team: positions[0].len(),
            zones,
        };
        WorldState::from_observation(
            &setup,
            &TurnObservation { owners, positions },
            &rules,
            &WorldConfig::default(),
        )
        .unwrap()
    }

    /// One contested zone, two own agents 300 away, one foe 600 away and a
    /// second foe parked on a distant zone.
    fn equidistant_world() -> WorldState {
        world_with(
            vec![Position::new(0, 0), Position::new(10_000, 0)],
            vec![None, Some(TeamId(1))],
            vec![
                vec![Position::new(300, 0), Position::new(0, 300)],
                vec![Position::new(600, 0), Position::new(10_000, 0)],
            ],
            GameRules::default(),
        )
    }

    #[test]
    fn tie_keeps_previous_holder_for_every_history() {
        for my_count in 0..4 {
            for foe_count in 0..4 {
                for was_mine in [false, true] {
                    let held = resolve_control(my_count, foe_count, was_mine, TieRule::Hysteresis);
                    if my_count == foe_count {
                        assert_eq!(held, was_mine);
                    } else {
                        assert_eq!(held, my_count > foe_count);
                    }
                    let contested =
                        resolve_control(my_count, foe_count, was_mine, TieRule::Contested);
                    assert_eq!(contested, my_count > foe_count);
                }
            }
        }
    }

    #[test]
    fn one_agent_is_enough_against_a_later_foe() {
        let world = equidistant_world();
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        let commitment = scorer
            .best_commitment(ZoneId(0), available)
            .expect("zone is worth contesting");
        assert_eq!(commitment.agents, vec![AgentId(0)]);

        let one = scorer.project(ZoneId(0), available, 1);
        let two = scorer.project(ZoneId(0), available, 2);
        assert!(one.secured);
        assert_eq!(one.foe_count, 1);
        assert_eq!(one.score, two.score);

        let expected = (-0.02f64 * 2.0).exp() - (-0.02f64 * f64::from(UNBOUNDED_HORIZON)).exp();
        assert!((one.score - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_commitment_yields_to_arriving_foe() {
        let world = equidistant_world();
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);

        let projection = scorer.project(ZoneId(0), world.all_own_agents(), 0);
        assert_eq!(projection.score, 0.0);
        assert!(!projection.secured);
    }

    #[test]
    fn score_never_drops_while_adding_agents_before_securing() {
        // Foe owns the zone with two agents inside; three own agents approach
        // from increasing distances.
        let world = world_with(
            vec![Position::new(0, 0), Position::new(9_000, 9_000)],
            vec![Some(TeamId(1)), None],
            vec![
                vec![Position::new(200, 0), Position::new(0, 400), Position::new(-600, 0)],
                vec![Position::new(50, 0), Position::new(0, 50), Position::new(9_000, 9_000)],
            ],
            GameRules::default(),
        );
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        let scores: Vec<f64> = (0..=3)
            .map(|k| scorer.project(ZoneId(0), available, k))
            .take_while(|projection| !projection.secured)
            .map(|projection| projection.score)
            .collect();
        assert_eq!(scores, vec![0.0, 0.0, 0.0]);

        let three = scorer.project(ZoneId(0), available, 3);
        assert!(three.secured);
        assert!(three.score > 0.0);

        let commitment = scorer.best_commitment(ZoneId(0), available).unwrap();
        assert_eq!(commitment.agents, vec![AgentId(0), AgentId(1), AgentId(2)]);
    }

    #[test]
    fn held_zone_score_grows_with_each_arrival_until_overrun() {
        // We hold the zone. Own agents land at t=1, 19 and 24; one foe lands
        // at t=2 and two more at t=4, so the zone falls for every k.
        let world = world_with(
            vec![Position::new(0, 0)],
            vec![Some(TeamId(0))],
            vec![
                vec![Position::new(150, 0), Position::new(2_000, 0), Position::new(0, 2_500)],
                vec![Position::new(250, 0), Position::new(450, 0), Position::new(0, 450)],
            ],
            GameRules::default(),
        );
        let policy = ScoringPolicy {
            foe_filter: FoeFilter::All,
            ..ScoringPolicy::default()
        };
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        let projections: Vec<ZoneProjection> =
            (0..=3).map(|k| scorer.project(ZoneId(0), available, k)).collect();
        assert!(projections.iter().all(|projection| !projection.secured));
        assert!(projections[0].score > 0.0);
        assert!(projections[1].score > projections[0].score);
        for pair in projections.windows(2) {
            assert!(pair[1].score >= pair[0].score);
        }

        // Held for [1, 2) alone, then [1, 4) with the first agent.
        let w = |t: f64| (-0.02 * t).exp();
        assert!((projections[0].score - (w(1.0) - w(2.0))).abs() < 1e-12);
        assert!((projections[1].score - (w(1.0) - w(4.0))).abs() < 1e-12);

        let commitment = scorer.best_commitment(ZoneId(0), available).unwrap();
        assert_eq!(commitment.agents, vec![AgentId(0)]);
    }

    #[test]
    fn no_gain_after_securing() {
        let world = equidistant_world();
        let policy = ScoringPolicy {
            stop_when_secured: false,
            ..ScoringPolicy::default()
        };
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        let projections: Vec<ZoneProjection> =
            (0..=2).map(|k| scorer.project(ZoneId(0), available, k)).collect();
        let first_secured = projections
            .iter()
            .position(|projection| projection.secured)
            .expect("zone is secured by some commitment");
        for later in &projections[first_secured..] {
            assert!(later.secured);
            assert_eq!(later.score, projections[first_secured].score);
        }

        // Without the early stop the sweep still keeps the smallest commitment.
        let commitment = scorer.best_commitment(ZoneId(0), available).unwrap();
        assert_eq!(commitment.agents.len(), first_secured);
    }

    #[test]
    fn agent_arriving_after_the_final_turn_is_never_committed() {
        // Ten turns remain. The first own agent lands at t=2, two foes at t=5
        // and the second own agent only at t=19.
        let world = world_with(
            vec![Position::new(0, 0)],
            vec![None],
            vec![
                vec![Position::new(300, 0), Position::new(0, 2_000)],
                vec![Position::new(600, 0), Position::new(0, 600)],
            ],
            GameRules {
                match_length: Some(11),
                ..GameRules::default()
            },
        );
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        let one = scorer.project(ZoneId(0), available, 1);
        let two = scorer.project(ZoneId(0), available, 2);
        assert_eq!(two.my_count, 1);
        assert_eq!(one.score, two.score);

        // Per-agent priority divides by agents that actually arrive.
        let commitment = scorer.best_commitment(ZoneId(0), available).unwrap();
        assert_eq!(commitment.agents, vec![AgentId(0)]);
        assert_eq!(commitment.priority, commitment.score / one.my_count as f64);
    }

    #[test]
    fn held_zone_without_threat_needs_nobody() {
        let world = world_with(
            vec![Position::new(0, 0), Position::new(1000, 0)],
            vec![Some(TeamId(0)), Some(TeamId(1))],
            vec![vec![Position::new(50, 0)], vec![Position::new(950, 0)]],
            GameRules::default(),
        );
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);

        let commitment = scorer
            .best_commitment(ZoneId(0), world.all_own_agents())
            .unwrap();
        assert!(commitment.agents.is_empty());
        assert_eq!(commitment.priority, commitment.score / 0.1);

        // The foe's zone cannot be taken one against one.
        assert!(scorer
            .best_commitment(ZoneId(1), world.all_own_agents())
            .is_none());
    }

    #[test]
    fn unavailable_agents_are_ignored() {
        let world = equidistant_world();
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);

        let only_second = IdSet::first(2).without(0);
        let commitment = scorer.best_commitment(ZoneId(0), only_second).unwrap();
        assert_eq!(commitment.agents, vec![AgentId(1)]);
        assert!(scorer.best_commitment(ZoneId(0), IdSet::empty()).is_none());
    }

    #[test]
    fn foe_filter_controls_who_threatens_a_zone() {
        // The second foe sits on zone 1; only the `all` filter lets it count
        // against zone 0.
        let world = world_with(
            vec![Position::new(0, 0), Position::new(700, 0)],
            vec![None, None],
            vec![
                vec![Position::new(200, 0), Position::new(-5_000, 0)],
                vec![Position::new(-400, 0), Position::new(700, 0)],
            ],
            GameRules::default(),
        );
        let approaching = ScoringPolicy::default();
        let all = ScoringPolicy {
            foe_filter: FoeFilter::All,
            ..ScoringPolicy::default()
        };

        let near = ZoneScorer::new(&world, &approaching).project(ZoneId(0), world.all_own_agents(), 1);
        let far = ZoneScorer::new(&world, &all).project(ZoneId(0), world.all_own_agents(), 1);
        assert_eq!(near.foe_count, 1);
        assert_eq!(far.foe_count, 2);
        assert!(near.secured);
        assert!(!far.secured);
        assert!(near.score > far.score);
    }

    #[test]
    fn contested_tie_rule_loses_on_equal_counts() {
        let world = equidistant_world();
        let policy = ScoringPolicy {
            tie_rule: TieRule::Contested,
            ..ScoringPolicy::default()
        };
        let scorer = ZoneScorer::new(&world, &policy);
        let available = world.all_own_agents();

        assert!(!scorer.project(ZoneId(0), available, 1).secured);
        assert!(scorer.project(ZoneId(0), available, 2).secured);
        assert_eq!(
            scorer.best_commitment(ZoneId(0), available).unwrap().agents.len(),
            2
        );
    }

    #[test]
    fn match_length_bounds_the_reward() {
        let short = world_with(
            vec![Position::new(0, 0)],
            vec![Some(TeamId(0))],
            vec![vec![Position::new(0, 0)]],
            GameRules {
                match_length: Some(11),
                ..GameRules::default()
            },
        );
        let policy = ScoringPolicy::default();
        let projection = ZoneScorer::new(&short, &policy).project(ZoneId(0), short.all_own_agents(), 0);

        // Observed once, so ten turns remain: reward covers [1, 10).
        let expected = (-0.02f64).exp() - (-0.2f64).exp();
        assert!((projection.score - expected).abs() < 1e-12);
    }

    #[test]
    fn signed_convention_matches_decay() {
        let world = equidistant_world();
        let decay = ScoringPolicy::default();
        let signed = ScoringPolicy {
            discount: Discount {
                rate: -0.02,
                convention: DiscountConvention::Signed,
            },
            ..ScoringPolicy::default()
        };
        let available = world.all_own_agents();
        let a = ZoneScorer::new(&world, &decay).project(ZoneId(0), available, 1);
        let b = ZoneScorer::new(&world, &signed).project(ZoneId(0), available, 1);
        assert!((a.score - b.score).abs() < 1e-12);
    }

    #[test]
    fn occupation_weighting_scales_score() {
        let world = equidistant_world();
        let available = world.all_own_agents();
        let plain = ZoneScorer::new(&world, &ScoringPolicy::default())
            .project(ZoneId(0), available, 1)
            .score;

        let divide = ScoringPolicy {
            occupation_weighting: OccupationWeighting::Divide,
            ..ScoringPolicy::default()
        };
        let multiply = ScoringPolicy {
            occupation_weighting: OccupationWeighting::Multiply,
            ..ScoringPolicy::default()
        };
        let occupation = world.zone(ZoneId(0)).occupation;
        let divided = ZoneScorer::new(&world, &divide).project(ZoneId(0), available, 1).score;
        let multiplied = ZoneScorer::new(&world, &multiply)
            .project(ZoneId(0), available, 1)
            .score;
        assert!((divided - plain / occupation).abs() < 1e-12);
        assert!((multiplied - plain * occupation).abs() < 1e-12);
    }

    #[test]
    fn commitment_cap_limits_sweep() {
        let world = equidistant_world();
        let policy = ScoringPolicy {
            max_commit_fraction: Some(0.25),
            ..ScoringPolicy::default()
        };
        let scorer = ZoneScorer::new(&world, &policy);
        assert_eq!(scorer.max_commitment(world.all_own_agents()), 1);
        assert_eq!(scorer.max_commitment(IdSet::empty()), 0);
    }

    #[test]
    fn arrival_turn_is_exact_on_ring_boundaries() {
        let world = equidistant_world();
        let policy = ScoringPolicy::default();
        let scorer = ZoneScorer::new(&world, &policy);
        assert_eq!(scorer.arrival_turn(0.0), 1);
        assert_eq!(scorer.arrival_turn(200.0), 1);
        assert_eq!(scorer.arrival_turn(200.5), 2);
        assert_eq!(scorer.arrival_turn(300.0), 2);
        assert_eq!(scorer.arrival_turn(1e12), UNBOUNDED_HORIZON);
    }
}
