//! Data-driven simulation balance
//!
//! Every knob has a default from [`crate::consts`]; a tuning file only needs
//! to name the values it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Largest jitter or spout speed magnitude accepted from a tuning file
const POUR_LIMIT: f32 = 1.0e4;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Particle pool and physics parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub max_particles: usize,
    pub gravity: f32,
    pub damping: f32,
    pub floor_damping: f32,
    pub wall_bounce: f32,
    pub settle_threshold: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    pub grid_cell_size: f32,
    pub max_neighbors_per_cell: usize,
    pub separation_force: f32,
    pub separation_margin: f32,
    /// Seed for the spawn-radius RNG
    pub seed: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_particles: MAX_PARTICLES,
            gravity: GRAVITY,
            damping: DAMPING,
            floor_damping: FLOOR_DAMPING,
            wall_bounce: WALL_BOUNCE,
            settle_threshold: SETTLE_THRESHOLD,
            radius_min: PARTICLE_RADIUS_MIN,
            radius_max: PARTICLE_RADIUS_MAX,
            grid_cell_size: GRID_CELL_SIZE,
            max_neighbors_per_cell: MAX_NEIGHBORS_CHECK,
            separation_force: SEPARATION_FORCE,
            separation_margin: SEPARATION_MARGIN,
            seed: 0x5a4d_a1c4,
        }
    }
}

impl PhysicsConfig {
    /// Clamp values that would otherwise break the grid or the radius sampler
    pub fn sanitized(mut self) -> Self {
        if !self.radius_min.is_finite() {
            self.radius_min = PARTICLE_RADIUS_MIN;
        }
        if !self.radius_max.is_finite() {
            self.radius_max = PARTICLE_RADIUS_MAX;
        }
        if self.radius_min > self.radius_max {
            std::mem::swap(&mut self.radius_min, &mut self.radius_max);
        }
        self.radius_min = self.radius_min.max(0.0);
        if !(self.grid_cell_size > 0.0 && self.grid_cell_size.is_finite()) {
            self.grid_cell_size = GRID_CELL_SIZE;
        }
        self.max_neighbors_per_cell = self.max_neighbors_per_cell.max(1);
        self
    }
}

/// Reaction detector parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    pub threshold: u32,
    pub cooldown_ticks: u32,
    pub check_interval: u32,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            threshold: REACTION_THRESHOLD,
            cooldown_ticks: COOLDOWN_TICKS,
            check_interval: CHECK_INTERVAL,
        }
    }
}

impl ReactionConfig {
    /// Zero values fall back to defaults, matching "unset" in a tuning file
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            threshold: if self.threshold == 0 { defaults.threshold } else { self.threshold },
            cooldown_ticks: if self.cooldown_ticks == 0 {
                defaults.cooldown_ticks
            } else {
                self.cooldown_ticks
            },
            check_interval: if self.check_interval == 0 {
                defaults.check_interval
            } else {
                self.check_interval
            },
        }
    }
}

/// Spout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PourConfig {
    /// Particles per tick at full quality
    pub rate: u32,
    /// Lowest rate the adaptive policy may drop to
    pub min_rate: u32,
    pub jitter: f32,
    /// Initial downward speed range
    pub speed_min: f32,
    pub speed_max: f32,
    pub adaptive: bool,
    pub frame_budget_ms: f32,
}

impl PourConfig {
    /// Replace non-finite values and order the speed range
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.jitter = if self.jitter.is_finite() {
            self.jitter.abs().min(POUR_LIMIT)
        } else {
            defaults.jitter
        };
        if !self.speed_min.is_finite() {
            self.speed_min = defaults.speed_min;
        }
        if !self.speed_max.is_finite() {
            self.speed_max = defaults.speed_max;
        }
        self.speed_min = self.speed_min.clamp(-POUR_LIMIT, POUR_LIMIT);
        self.speed_max = self.speed_max.clamp(-POUR_LIMIT, POUR_LIMIT);
        if self.speed_min > self.speed_max {
            std::mem::swap(&mut self.speed_min, &mut self.speed_max);
        }
        if !(self.frame_budget_ms > 0.0 && self.frame_budget_ms.is_finite()) {
            self.frame_budget_ms = defaults.frame_budget_ms;
        }
        self
    }
}

impl Default for PourConfig {
    fn default() -> Self {
        Self {
            rate: POUR_RATE,
            min_rate: 1,
            jitter: POUR_JITTER,
            speed_min: 0.5,
            speed_max: 1.5,
            adaptive: true,
            frame_budget_ms: FRAME_BUDGET_MS,
        }
    }
}

/// All tunable parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsConfig,
    pub reaction: ReactionConfig,
    pub pour: PourConfig,
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    pub fn sanitized(self) -> Self {
        Self {
            physics: self.physics.sanitized(),
            reaction: self.reaction.sanitized(),
            pour: self.pour.sanitized(),
        }
    }
}
