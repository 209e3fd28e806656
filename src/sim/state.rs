//! Particle pool
//!
//! A fixed-length array of `Copy` particle records with an occupancy flag.
//! Nothing is allocated after construction: spawning claims the first free
//! slot, removal clears the flag. Slot order therefore says nothing about
//! spawn order once particles have been removed.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::geometry::{ArenaBounds, Rect};
use super::grid::SpatialGrid;
use crate::catalog::MaterialId;
use crate::tuning::PhysicsConfig;

/// One pool slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub material: MaterialId,
    /// Packed 0xRRGGBB, render hint only
    pub color: u32,
    /// Ticks since spawn
    pub age: u32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            active: false,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: 2.0,
            material: MaterialId(0),
            color: 0xFF_FF_FF,
            age: 0,
        }
    }
}

/// Per-material particle counts inside a zone
///
/// Counts are indexed by `MaterialId`; materials are listed in the order
/// their first particle was met while scanning slots. Clearing keeps the
/// buffers, so a long-lived instance stops allocating once it has seen the
/// highest material id.
#[derive(Debug, Clone, Default)]
pub struct ZoneCounts {
    order: Vec<MaterialId>,
    counts: Vec<u32>,
}

impl ZoneCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        for m in self.order.drain(..) {
            self.counts[m.index()] = 0;
        }
    }

    pub fn add(&mut self, material: MaterialId) {
        let i = material.index();
        if i >= self.counts.len() {
            self.counts.resize(i + 1, 0);
        }
        if self.counts[i] == 0 {
            self.order.push(material);
        }
        self.counts[i] += 1;
    }

    /// Count for a material; 0 when absent
    pub fn get(&self, material: MaterialId) -> u32 {
        self.counts.get(material.index()).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of distinct materials
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn total(&self) -> u32 {
        self.iter().map(|(_, count)| count).sum()
    }

    /// `(material, count)` in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, u32)> + '_ {
        self.order.iter().map(|&m| (m, self.counts[m.index()]))
    }

    /// Materials with at least `threshold` particles, first-seen order
    pub fn at_least(&self, threshold: u32) -> impl Iterator<Item = MaterialId> + '_ {
        self.iter()
            .filter(move |&(_, count)| count >= threshold)
            .map(|(m, _)| m)
    }
}

/// Fixed-capacity particle store and physics state
#[derive(Debug, Clone)]
pub struct ParticlePool {
    pub(super) particles: Vec<Particle>,
    pub(super) active_count: usize,
    pub(super) bounds: ArenaBounds,
    pub(super) config: PhysicsConfig,
    pub(super) grid: SpatialGrid,
    rng: Pcg32,
}

impl ParticlePool {
    pub fn new(config: PhysicsConfig) -> Self {
        Self::with_bounds(config, ArenaBounds::default())
    }

    pub fn with_bounds(config: PhysicsConfig, bounds: ArenaBounds) -> Self {
        let config = config.sanitized();
        let grid = SpatialGrid::new(
            bounds.width,
            bounds.height,
            config.grid_cell_size,
            config.max_neighbors_per_cell,
        );
        Self {
            particles: vec![Particle::default(); config.max_particles],
            active_count: 0,
            bounds,
            rng: Pcg32::seed_from_u64(config.seed),
            grid,
            config,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn bounds(&self) -> ArenaBounds {
        self.bounds
    }

    /// Resize the arena (renderer layout change); rebuilds the grid
    pub fn set_arena_bounds(&mut self, width: f32, height: f32) {
        self.bounds = ArenaBounds::new(width, height);
        self.grid.resize(self.bounds.width, self.bounds.height);
        log::debug!("Arena resized to {}x{}", self.bounds.width, self.bounds.height);
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_full(&self) -> bool {
        self.active_count >= self.particles.len()
    }

    /// All slots, including inactive ones (check `active` before drawing)
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// `(slot, particle)` for active slots
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.particles.iter().enumerate().filter(|(_, p)| p.active)
    }

    /// Claim the first free slot. Returns false when the pool is saturated.
    ///
    /// Without an explicit radius one is drawn from the configured range.
    pub fn spawn(
        &mut self,
        pos: Vec2,
        vel: Vec2,
        material: MaterialId,
        color: u32,
        radius: Option<f32>,
    ) -> bool {
        let Some(slot) = self.particles.iter().position(|p| !p.active) else {
            return false;
        };
        let radius = match radius {
            Some(r) => r,
            None => self.random_radius(),
        };
        self.particles[slot] = Particle {
            active: true,
            pos,
            vel,
            radius,
            material,
            color,
            age: 0,
        };
        self.active_count += 1;
        true
    }

    fn random_radius(&mut self) -> f32 {
        let (min, max) = (self.config.radius_min, self.config.radius_max);
        if min >= max {
            min
        } else {
            self.rng.random_range(min..=max)
        }
    }

    /// Deactivate one slot; out-of-range or inactive slots are ignored
    pub fn remove(&mut self, index: usize) {
        if let Some(p) = self.particles.get_mut(index)
            && p.active
        {
            p.active = false;
            self.active_count -= 1;
        }
    }

    pub fn clear_all(&mut self) {
        for p in &mut self.particles {
            p.active = false;
        }
        self.active_count = 0;
    }

    /// Count active particles per material inside `zone`
    pub fn count_in_zone(&self, zone: &Rect) -> ZoneCounts {
        let mut counts = ZoneCounts::new();
        self.count_in_zone_into(zone, &mut counts);
        counts
    }

    /// Like [`count_in_zone`](Self::count_in_zone), refilling `counts` in place
    pub fn count_in_zone_into(&self, zone: &Rect, counts: &mut ZoneCounts) {
        counts.clear();
        for p in &self.particles {
            if p.active && zone.contains(p.pos) {
                counts.add(p.material);
            }
        }
    }

    /// Deactivate up to `max_count` particles of `material` inside `zone`,
    /// lowest slot first. Returns how many were removed.
    pub fn remove_from_zone(
        &mut self,
        material: MaterialId,
        max_count: usize,
        zone: &Rect,
    ) -> usize {
        let mut removed = 0;
        for p in &mut self.particles {
            if removed >= max_count {
                break;
            }
            if p.active && p.material == material && zone.contains(p.pos) {
                p.active = false;
                removed += 1;
            }
        }
        self.active_count -= removed;
        removed
    }
}
