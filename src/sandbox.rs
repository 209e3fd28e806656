//! The simulation context a host loop drives
//!
//! `Sandbox` owns the particle pool, the reaction detector and the discovery
//! ledger. The host calls [`Sandbox::tick`] once per frame with whatever the
//! input layer gathered; there is no internal timing.

use std::sync::Arc;

use glam::Vec2;

use crate::catalog::{Catalog, MaterialId};
use crate::ledger::DiscoveryLedger;
use crate::persistence::KeyValueStore;
use crate::pour::{AdaptiveRate, Spout};
use crate::sim::{ArenaBounds, ParticlePool, ReactionDetector, ReactionEvent, Rect};
use crate::tuning::Tuning;

/// An active pour for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PourRequest {
    /// Spout position, arena-local
    pub at: Vec2,
    pub material: MaterialId,
    /// Packed 0xRRGGBB
    pub color: u32,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pour at a point (pointer held / pour toggled on)
    pub pour: Option<PourRequest>,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Particles emitted by the spout
    pub spawned: u32,
    /// The reaction that fired, if any (at most one per tick)
    pub reaction: Option<ReactionEvent>,
}

/// Diagnostics for a debug overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxStats {
    pub active: usize,
    pub capacity: usize,
    pub discovered: usize,
    pub total: usize,
    pub pour_rate: u32,
}

#[derive(Debug)]
pub struct Sandbox {
    catalog: Arc<Catalog>,
    pool: ParticlePool,
    detector: ReactionDetector,
    ledger: DiscoveryLedger,
    spout: Spout,
    adaptive: AdaptiveRate,
}

impl Sandbox {
    pub fn new(catalog: Arc<Catalog>, tuning: Tuning, store: Box<dyn KeyValueStore>) -> Self {
        let tuning = tuning.sanitized();
        let ledger = DiscoveryLedger::new(catalog.clone(), store);
        let pool = ParticlePool::new(tuning.physics.clone());
        let mut detector = ReactionDetector::new(tuning.reaction.clone());
        // Until the renderer reports a layout, the whole arena reacts
        detector.set_zone(pool.bounds().rect());
        log::info!(
            "Sandbox ready: {} particle slots, threshold {}, {}/{} discovered",
            pool.capacity(),
            detector.config().threshold,
            ledger.discovered_count(),
            ledger.total_count()
        );
        Self {
            spout: Spout::new(&tuning.pour, tuning.physics.seed.wrapping_add(1)),
            adaptive: AdaptiveRate::new(&tuning.pour),
            catalog,
            pool,
            detector,
            ledger,
        }
    }

    /// Advance one simulation step
    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        let spawned = match input.pour {
            Some(pour) if self.catalog.contains(pour.material) => self.spout.pour(
                &mut self.pool,
                pour.at,
                pour.material,
                pour.color,
                self.adaptive.rate(),
            ),
            Some(pour) => {
                log::warn!("Ignoring pour of unknown material {}", pour.material);
                0
            }
            None => 0,
        };

        self.pool.update();
        let reaction = self.detector.update(&mut self.pool, &mut self.ledger);
        if let Some(event) = reaction
            && event.is_new
        {
            log::info!("New discovery: {}", self.catalog.info(event.result).name);
        }

        TickReport { spawned, reaction }
    }

    /// Renderer layout change
    pub fn set_arena_bounds(&mut self, width: f32, height: f32) {
        self.pool.set_arena_bounds(width, height);
    }

    pub fn set_zone(&mut self, zone: Rect) {
        self.detector.set_zone(zone);
    }

    pub fn arena_bounds(&self) -> ArenaBounds {
        self.pool.bounds()
    }

    pub fn zone(&self) -> Rect {
        self.detector.zone()
    }

    /// Feed one host frame time into the adaptive pour rate
    pub fn record_frame_time(&mut self, frame_ms: f32) {
        self.adaptive.record_frame(frame_ms);
    }

    pub fn set_adaptive_quality(&mut self, enabled: bool) {
        self.adaptive.set_enabled(enabled);
    }

    /// Remove every particle and forget cooldowns; discoveries are kept
    pub fn clear_workspace(&mut self) {
        self.pool.clear_all();
        self.detector.reset();
        log::info!("Workspace cleared");
    }

    /// Forget all discoveries and clear the workspace
    pub fn reset_progress(&mut self) {
        self.ledger.reset();
        self.clear_workspace();
    }

    pub fn stats(&self) -> SandboxStats {
        SandboxStats {
            active: self.pool.active_count(),
            capacity: self.pool.capacity(),
            discovered: self.ledger.discovered_count(),
            total: self.ledger.total_count(),
            pour_rate: self.adaptive.rate(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Direct pool access for hosts that spawn without the spout
    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut self.pool
    }

    pub fn detector(&self) -> &ReactionDetector {
        &self.detector
    }

    pub fn ledger(&self) -> &DiscoveryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DiscoveryLedger {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::tuning::{PhysicsConfig, ReactionConfig};

    fn sandbox(threshold: u32, interval: u32) -> Sandbox {
        let tuning = Tuning {
            physics: PhysicsConfig {
                max_particles: 200,
                ..Default::default()
            },
            reaction: ReactionConfig {
                threshold,
                cooldown_ticks: 10,
                check_interval: interval,
            },
            ..Default::default()
        };
        let mut sandbox = Sandbox::new(
            Arc::new(Catalog::demo().unwrap()),
            tuning,
            Box::new(MemoryStore::new()),
        );
        sandbox.set_arena_bounds(200.0, 200.0);
        sandbox.set_zone(Rect::new(0.0, 0.0, 200.0, 200.0));
        sandbox
    }

    fn material(sandbox: &Sandbox, key: &str) -> MaterialId {
        sandbox.catalog().id(key).unwrap()
    }

    fn spawn_row(sandbox: &mut Sandbox, key: &str, n: usize, y: f32) {
        let m = material(sandbox, key);
        for i in 0..n {
            let pos = Vec2::new(40.0 + i as f32 * 6.0, y);
            assert!(sandbox.pool_mut().spawn(pos, Vec2::ZERO, m, 0, Some(2.0)));
        }
    }

    #[test]
    fn test_water_and_fire_make_steam() {
        let mut sandbox = sandbox(5, 1);
        spawn_row(&mut sandbox, "water", 10, 100.0);
        spawn_row(&mut sandbox, "fire", 10, 120.0);
        assert_eq!(sandbox.stats().active, 20);

        let report = sandbox.tick(&TickInput::default());
        let event = report.reaction.unwrap();
        let steam = material(&sandbox, "steam");
        assert_eq!(event.result, steam);
        assert!(event.is_new);
        assert_eq!(sandbox.stats().active, 10);
        assert!(sandbox.ledger().is_discovered(steam));
    }

    #[test]
    fn test_one_reaction_within_cooldown_window() {
        let mut sandbox = sandbox(5, 1);
        spawn_row(&mut sandbox, "water", 10, 100.0);
        spawn_row(&mut sandbox, "fire", 10, 120.0);
        let mut reactions = Vec::new();
        for _ in 0..10 {
            if let Some(event) = sandbox.tick(&TickInput::default()).reaction {
                reactions.push(event);
            }
        }
        assert_eq!(reactions.len(), 1);
        assert_eq!(sandbox.stats().active, 10);

        // Cooldown over: the remaining 5 + 5 react
        let event = sandbox.tick(&TickInput::default()).reaction.unwrap();
        assert!(!event.is_new);
        assert_eq!(sandbox.stats().active, 0);
    }

    #[test]
    fn test_same_material_in_sandbox() {
        let mut sandbox = sandbox(5, 1);
        spawn_row(&mut sandbox, "water", 9, 100.0);
        assert!(sandbox.tick(&TickInput::default()).reaction.is_none());
        spawn_row(&mut sandbox, "water", 1, 140.0);
        let event = sandbox.tick(&TickInput::default()).reaction.unwrap();
        assert_eq!(event.result, material(&sandbox, "puddle"));
        assert_eq!(sandbox.stats().active, 0);
    }

    #[test]
    fn test_pour_input_spawns() {
        let mut sandbox = sandbox(30, 6);
        let water = material(&sandbox, "water");
        let input = TickInput {
            pour: Some(PourRequest {
                at: Vec2::new(100.0, 20.0),
                material: water,
                color: 0x0077ff,
            }),
        };
        let report = sandbox.tick(&input);
        assert_eq!(report.spawned, sandbox.stats().pour_rate);
        assert_eq!(sandbox.stats().active as u32, report.spawned);
    }

    #[test]
    fn test_pour_saturates_quietly() {
        let mut sandbox = sandbox(1000, 6);
        let water = material(&sandbox, "water");
        let input = TickInput {
            pour: Some(PourRequest {
                at: Vec2::new(100.0, 20.0),
                material: water,
                color: 0,
            }),
        };
        for _ in 0..200 {
            sandbox.tick(&input);
        }
        assert_eq!(sandbox.stats().active, sandbox.stats().capacity);
        assert_eq!(sandbox.tick(&input).spawned, 0);
    }

    #[test]
    fn test_unknown_material_pour_ignored() {
        let mut sandbox = sandbox(5, 1);
        let input = TickInput {
            pour: Some(PourRequest {
                at: Vec2::new(100.0, 20.0),
                material: MaterialId(9999),
                color: 0,
            }),
        };
        assert_eq!(sandbox.tick(&input).spawned, 0);
        assert_eq!(sandbox.stats().active, 0);
    }

    #[test]
    fn test_clear_workspace_keeps_discoveries() {
        let mut sandbox = sandbox(5, 1);
        spawn_row(&mut sandbox, "earth", 5, 100.0);
        spawn_row(&mut sandbox, "water", 5, 120.0);
        spawn_row(&mut sandbox, "fire", 5, 140.0);
        assert!(sandbox.tick(&TickInput::default()).reaction.is_some());
        assert_eq!(sandbox.detector().active_cooldowns(), 1);

        sandbox.clear_workspace();
        assert_eq!(sandbox.stats().active, 0);
        assert_eq!(sandbox.detector().active_cooldowns(), 0);
        assert_eq!(sandbox.stats().discovered, 5);
    }

    #[test]
    fn test_reset_progress_twice() {
        let mut sandbox = sandbox(5, 1);
        spawn_row(&mut sandbox, "air", 5, 100.0);
        spawn_row(&mut sandbox, "fire", 5, 120.0);
        sandbox.tick(&TickInput::default());
        assert_eq!(sandbox.stats().discovered, 5);

        sandbox.reset_progress();
        sandbox.reset_progress();
        assert_eq!(sandbox.stats().discovered, 4);
        assert_eq!(sandbox.detector().active_cooldowns(), 0);
        assert_eq!(sandbox.detector().tick_count(), 0);
    }

    #[test]
    fn test_default_zone_is_whole_arena() {
        let sandbox = Sandbox::new(
            Arc::new(Catalog::demo().unwrap()),
            Tuning::default(),
            Box::new(MemoryStore::new()),
        );
        assert_eq!(sandbox.zone(), sandbox.arena_bounds().rect());
    }
}
