//! Zone reaction detector
//!
//! Every `check_interval` ticks the zone is sampled; materials with at least
//! `threshold` particles there are eligible. Mixed pairs are tried before
//! same-material pairs (which need twice the threshold), and at most one
//! reaction fires per tick. A pair that reacted is suppressed for
//! `cooldown_ticks`.

use std::collections::HashMap;

use super::geometry::Rect;
use super::state::{ParticlePool, ZoneCounts};
use crate::catalog::{MaterialId, canonical_pair};
use crate::ledger::Combination;
use crate::tuning::ReactionConfig;

/// Anything that can resolve a pair of materials to a recipe result
pub trait Combiner {
    fn combine(&mut self, a: MaterialId, b: MaterialId) -> Combination;
}

/// Emitted when particles in the zone were consumed by a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionEvent {
    pub result: MaterialId,
    /// First time this result was discovered
    pub is_new: bool,
    /// Canonical ingredient pair (equal for same-material reactions)
    pub ingredients: (MaterialId, MaterialId),
    /// Particles removed from the pool
    pub consumed: usize,
}

#[derive(Debug, Clone)]
pub struct ReactionDetector {
    config: ReactionConfig,
    zone: Rect,
    cooldowns: HashMap<(MaterialId, MaterialId), u32>,
    tick_count: u64,
    /// Reused across samples
    counts: ZoneCounts,
}

impl ReactionDetector {
    pub fn new(config: ReactionConfig) -> Self {
        Self {
            config: config.sanitized(),
            zone: Rect::default(),
            cooldowns: HashMap::new(),
            tick_count: 0,
            counts: ZoneCounts::new(),
        }
    }

    pub fn config(&self) -> &ReactionConfig {
        &self.config
    }

    pub fn zone(&self) -> Rect {
        self.zone
    }

    pub fn set_zone(&mut self, zone: Rect) {
        self.zone = zone;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether the pair is currently suppressed
    pub fn is_cooling(&self, a: MaterialId, b: MaterialId) -> bool {
        self.cooldowns.contains_key(&canonical_pair(a, b))
    }

    /// Ticks left on a pair's cooldown (0 when not cooling)
    pub fn cooldown_remaining(&self, a: MaterialId, b: MaterialId) -> u32 {
        self.cooldowns
            .get(&canonical_pair(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn active_cooldowns(&self) -> usize {
        self.cooldowns.len()
    }

    /// Forget cooldowns and restart the tick counter
    pub fn reset(&mut self) {
        self.cooldowns.clear();
        self.tick_count = 0;
    }

    /// Run one tick of detection; returns the reaction that fired, if any
    pub fn update(
        &mut self,
        pool: &mut ParticlePool,
        combiner: &mut impl Combiner,
    ) -> Option<ReactionEvent> {
        self.tick_count += 1;

        self.cooldowns.retain(|_, ticks| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });

        if !self.tick_count.is_multiple_of(self.config.check_interval as u64) {
            return None;
        }

        let zone = self.zone;
        let threshold = self.config.threshold;
        pool.count_in_zone_into(&zone, &mut self.counts);
        let counts = &self.counts;
        let cooldowns = &mut self.cooldowns;
        let cooldown_ticks = self.config.cooldown_ticks;

        // Mixed pairs first
        for (i, a) in counts.at_least(threshold).enumerate() {
            for b in counts.at_least(threshold).skip(i + 1) {
                let key = canonical_pair(a, b);
                if cooldowns.contains_key(&key) {
                    continue;
                }
                let Combination { result: Some(result), is_new } = combiner.combine(a, b) else {
                    continue;
                };
                let consumed = pool.remove_from_zone(a, threshold as usize, &zone)
                    + pool.remove_from_zone(b, threshold as usize, &zone);
                return Some(fire(cooldowns, cooldown_ticks, key, result, is_new, consumed));
            }
        }

        // Same-material pairs need twice the threshold
        let double = threshold.saturating_mul(2);
        for m in counts.at_least(double) {
            let key = (m, m);
            if cooldowns.contains_key(&key) {
                continue;
            }
            let Combination { result: Some(result), is_new } = combiner.combine(m, m) else {
                continue;
            };
            let consumed = pool.remove_from_zone(m, double as usize, &zone);
            return Some(fire(cooldowns, cooldown_ticks, key, result, is_new, consumed));
        }

        None
    }
}

/// Start the pair's cooldown and build the event
fn fire(
    cooldowns: &mut HashMap<(MaterialId, MaterialId), u32>,
    cooldown_ticks: u32,
    key: (MaterialId, MaterialId),
    result: MaterialId,
    is_new: bool,
    consumed: usize,
) -> ReactionEvent {
    cooldowns.insert(key, cooldown_ticks);
    log::debug!(
        "Reaction {}+{} -> {} (new: {}, consumed {})",
        key.0,
        key.1,
        result,
        is_new,
        consumed
    );
    ReactionEvent {
        result,
        is_new,
        ingredients: key,
        consumed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::ArenaBounds;
    use crate::tuning::PhysicsConfig;
    use glam::Vec2;

    const A: MaterialId = MaterialId(0);
    const B: MaterialId = MaterialId(1);
    const C: MaterialId = MaterialId(2);
    const AB: MaterialId = MaterialId(10);
    const AA: MaterialId = MaterialId(11);

    /// Recipes: A+B -> AB, A+A -> AA
    #[derive(Default)]
    struct StubCombiner {
        calls: Vec<(MaterialId, MaterialId)>,
    }

    impl Combiner for StubCombiner {
        fn combine(&mut self, a: MaterialId, b: MaterialId) -> Combination {
            self.calls.push((a, b));
            let result = match canonical_pair(a, b) {
                (A, B) => Some(AB),
                (A, A) => Some(AA),
                _ => None,
            };
            Combination {
                result,
                is_new: result.is_some(),
            }
        }
    }

    fn setup(threshold: u32, cooldown: u32, interval: u32) -> (ParticlePool, ReactionDetector) {
        let pool = ParticlePool::with_bounds(
            PhysicsConfig {
                max_particles: 500,
                ..Default::default()
            },
            ArenaBounds::new(200.0, 200.0),
        );
        let mut detector = ReactionDetector::new(ReactionConfig {
            threshold,
            cooldown_ticks: cooldown,
            check_interval: interval,
        });
        detector.set_zone(Rect::new(0.0, 0.0, 200.0, 200.0));
        (pool, detector)
    }

    fn fill(pool: &mut ParticlePool, m: MaterialId, n: usize) {
        for i in 0..n {
            assert!(pool.spawn(Vec2::new(20.0 + i as f32, 50.0), Vec2::ZERO, m, 0, Some(2.0)));
        }
    }

    #[test]
    fn test_mixed_pair_reacts_once_and_consumes_threshold() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 8);
        fill(&mut pool, B, 7);

        let event = detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(event.result, AB);
        assert!(event.is_new);
        assert_eq!(event.ingredients, (A, B));
        assert_eq!(event.consumed, 10);
        assert_eq!(pool.active_count(), 5);

        let zone = detector.zone();
        let counts = pool.count_in_zone(&zone);
        assert_eq!(counts.get(A), 3);
        assert_eq!(counts.get(B), 2);
    }

    #[test]
    fn test_below_threshold_does_nothing() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 4);
        fill(&mut pool, B, 4);
        for _ in 0..5 {
            assert!(detector.update(&mut pool, &mut combiner).is_none());
        }
        assert!(combiner.calls.is_empty());
        assert_eq!(pool.active_count(), 8);
    }

    #[test]
    fn test_only_samples_on_interval_ticks() {
        let (mut pool, mut detector) = setup(5, 10, 3);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        assert!(detector.update(&mut pool, &mut combiner).is_none());
        assert!(detector.update(&mut pool, &mut combiner).is_none());
        assert!(detector.update(&mut pool, &mut combiner).is_some());
        assert_eq!(detector.tick_count(), 3);
    }

    #[test]
    fn test_cooldown_blocks_then_expires() {
        let (mut pool, mut detector) = setup(5, 4, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        assert!(detector.update(&mut pool, &mut combiner).is_some());
        assert!(detector.is_cooling(B, A));
        assert_eq!(detector.cooldown_remaining(A, B), 4);

        // Refill immediately: still cooling for the next three ticks
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        for _ in 0..3 {
            assert!(detector.update(&mut pool, &mut combiner).is_none());
        }
        assert_eq!(pool.active_count(), 10);

        // Fourth tick drains the cooldown and the pair reacts again
        let event = detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(event.result, AB);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_same_material_needs_double_threshold() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 9);
        assert!(detector.update(&mut pool, &mut combiner).is_none());
        assert_eq!(pool.active_count(), 9);

        fill(&mut pool, A, 1);
        let event = detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(event.result, AA);
        assert_eq!(event.ingredients, (A, A));
        assert_eq!(event.consumed, 10);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_mixed_pair_wins_over_same_material() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 12);
        fill(&mut pool, B, 5);
        let event = detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(event.result, AB);
        assert_eq!(pool.count_in_zone(&detector.zone()).get(A), 7);
    }

    #[test]
    fn test_falls_through_to_same_material_when_pair_has_no_recipe() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 10);
        fill(&mut pool, C, 5);
        let event = detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(event.result, AA);
        assert_eq!(combiner.calls, vec![(A, C), (A, A)]);
        assert_eq!(pool.count_in_zone(&detector.zone()).get(C), 5);
    }

    #[test]
    fn test_counts_do_not_carry_over_between_samples() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 4);
        assert!(detector.update(&mut pool, &mut combiner).is_none());

        pool.clear_all();
        fill(&mut pool, B, 5);
        assert!(detector.update(&mut pool, &mut combiner).is_none());
        assert!(combiner.calls.is_empty());
        assert_eq!(pool.active_count(), 5);
    }

    #[test]
    fn test_particles_outside_zone_ignored() {
        let (mut pool, mut detector) = setup(5, 10, 1);
        let mut combiner = StubCombiner::default();
        detector.set_zone(Rect::new(0.0, 0.0, 10.0, 10.0));
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        assert!(detector.update(&mut pool, &mut combiner).is_none());
    }

    #[test]
    fn test_reset_clears_cooldowns_and_counter() {
        let (mut pool, mut detector) = setup(5, 100, 1);
        let mut combiner = StubCombiner::default();
        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        detector.update(&mut pool, &mut combiner).unwrap();
        assert_eq!(detector.active_cooldowns(), 1);

        detector.reset();
        detector.reset();
        assert_eq!(detector.active_cooldowns(), 0);
        assert_eq!(detector.tick_count(), 0);

        fill(&mut pool, A, 5);
        fill(&mut pool, B, 5);
        assert!(detector.update(&mut pool, &mut combiner).is_some());
    }
}
