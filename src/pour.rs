//! Pouring: turning a held pointer into particle spawns
//!
//! The spout emits a few particles per tick around the pour point. Under
//! sustained slow frames the adaptive rate lowers how many, and raises it
//! again once frames are comfortably inside budget.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::catalog::MaterialId;
use crate::sandbox::PourRequest;
use crate::sim::ParticlePool;
use crate::tuning::PourConfig;

/// Frame samples per adaptive decision
pub const FRAME_WINDOW: usize = 60;

/// Emits particles around a pour point
#[derive(Debug, Clone)]
pub struct Spout {
    jitter: f32,
    speed_min: f32,
    speed_max: f32,
    rng: Pcg32,
}

impl Spout {
    pub fn new(config: &PourConfig, seed: u64) -> Self {
        let config = config.clone().sanitized();
        Self {
            jitter: config.jitter,
            speed_min: config.speed_min,
            speed_max: config.speed_max,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Spawn up to `count` particles at `at`; stops at the first refusal
    /// (pool saturated). Returns how many were spawned.
    pub fn pour(
        &mut self,
        pool: &mut ParticlePool,
        at: Vec2,
        material: MaterialId,
        color: u32,
        count: u32,
    ) -> u32 {
        let mut spawned = 0;
        for _ in 0..count {
            let dx = if self.jitter > 0.0 {
                self.rng.random_range(-self.jitter..=self.jitter)
            } else {
                0.0
            };
            let speed = if self.speed_min < self.speed_max {
                self.rng.random_range(self.speed_min..=self.speed_max)
            } else {
                self.speed_min
            };
            let drift = self.rng.random_range(-0.25f32..=0.25);
            let pos = at + Vec2::new(dx, 0.0);
            if !pool.spawn(pos, Vec2::new(drift, speed), material, color, None) {
                break;
            }
            spawned += 1;
        }
        spawned
    }
}

/// Turns pointer gestures into a pour state
///
/// By default pouring lasts while the pointer is held. In tap-to-toggle mode
/// each press flips pouring on or off and the spout keeps following pointer
/// moves after release. Only one pointer is tracked at a time.
#[derive(Debug, Clone, Default)]
pub struct PourControl {
    toggle_mode: bool,
    pointer: Option<u32>,
    pouring: bool,
    at: Vec2,
}

impl PourControl {
    pub fn new(toggle_mode: bool) -> Self {
        Self {
            toggle_mode,
            ..Default::default()
        }
    }

    pub fn toggle_mode(&self) -> bool {
        self.toggle_mode
    }

    /// Leaving toggle mode with no pointer down stops a latched pour
    pub fn set_toggle_mode(&mut self, enabled: bool) {
        self.toggle_mode = enabled;
        if !enabled && self.pointer.is_none() {
            self.pouring = false;
        }
    }

    pub fn is_pouring(&self) -> bool {
        self.pouring
    }

    /// Current spout position, arena-local
    pub fn position(&self) -> Vec2 {
        self.at
    }

    pub fn pointer_down(&mut self, id: u32, at: Vec2) {
        if self.pointer.is_some_and(|tracked| tracked != id) {
            return;
        }
        self.pointer = Some(id);
        self.at = at;
        self.pouring = if self.toggle_mode { !self.pouring } else { true };
    }

    pub fn pointer_move(&mut self, id: u32, at: Vec2) {
        match self.pointer {
            Some(tracked) if tracked != id => {}
            None if !self.toggle_mode => {}
            _ => self.at = at,
        }
    }

    pub fn pointer_up(&mut self, id: u32) {
        if self.pointer != Some(id) {
            return;
        }
        self.pointer = None;
        if !self.toggle_mode {
            self.pouring = false;
        }
    }

    /// The pointer was taken away (system gesture); always stops pouring
    pub fn pointer_cancel(&mut self, id: u32) {
        if self.pointer != Some(id) {
            return;
        }
        self.pointer = None;
        self.pouring = false;
    }

    /// The pour for this tick, if pouring
    pub fn request(&self, material: MaterialId, color: u32) -> Option<PourRequest> {
        self.pouring.then_some(PourRequest {
            at: self.at,
            material,
            color,
        })
    }
}

/// Pour-rate policy driven by host frame times
#[derive(Debug, Clone)]
pub struct AdaptiveRate {
    enabled: bool,
    budget_ms: f32,
    min: u32,
    max: u32,
    rate: u32,
    frame_times: [f32; FRAME_WINDOW],
    frame_index: usize,
    filled: usize,
}

impl AdaptiveRate {
    pub fn new(config: &PourConfig) -> Self {
        let config = config.clone().sanitized();
        let max = config.rate.max(1);
        Self {
            enabled: config.adaptive,
            budget_ms: config.frame_budget_ms,
            min: config.min_rate.clamp(1, max),
            max,
            rate: max,
            frame_times: [0.0; FRAME_WINDOW],
            frame_index: 0,
            filled: 0,
        }
    }

    pub fn rate(&self) -> u32 {
        if self.enabled { self.rate } else { self.max }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.rate = self.max;
        }
    }

    /// Average of the current window (ms)
    pub fn average_ms(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        self.frame_times[..self.filled].iter().sum::<f32>() / self.filled as f32
    }

    /// Record one frame; after a full window the rate may step by one
    pub fn record_frame(&mut self, frame_ms: f32) {
        if !self.enabled || !frame_ms.is_finite() {
            return;
        }
        self.frame_times[self.frame_index] = frame_ms.max(0.0);
        self.frame_index = (self.frame_index + 1) % FRAME_WINDOW;
        self.filled = (self.filled + 1).min(FRAME_WINDOW);
        if self.filled < FRAME_WINDOW {
            return;
        }

        let avg = self.average_ms();
        let before = self.rate;
        if avg > self.budget_ms && self.rate > self.min {
            self.rate -= 1;
        } else if avg < self.budget_ms * 0.8 && self.rate < self.max {
            self.rate += 1;
        } else {
            return;
        }
        log::info!(
            "Pour rate {} -> {} (avg frame {:.1} ms)",
            before,
            self.rate,
            avg
        );
        // Each step needs a fresh full window
        self.filled = 0;
        self.frame_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ArenaBounds;
    use crate::tuning::PhysicsConfig;

    fn config() -> PourConfig {
        PourConfig {
            rate: 4,
            min_rate: 1,
            frame_budget_ms: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_pour_spawns_near_point() {
        let mut pool = ParticlePool::with_bounds(
            PhysicsConfig {
                max_particles: 16,
                ..Default::default()
            },
            ArenaBounds::new(200.0, 200.0),
        );
        let mut spout = Spout::new(&config(), 7);
        let at = Vec2::new(100.0, 20.0);
        assert_eq!(spout.pour(&mut pool, at, MaterialId(3), 0xff0000, 4), 4);
        assert_eq!(pool.active_count(), 4);
        for (_, p) in pool.iter_active() {
            assert!((p.pos.x - at.x).abs() <= config().jitter);
            assert_eq!(p.pos.y, at.y);
            assert!(p.vel.y > 0.0);
            assert_eq!(p.material, MaterialId(3));
        }
    }

    #[test]
    fn test_pour_stops_when_pool_full() {
        let mut pool = ParticlePool::with_bounds(
            PhysicsConfig {
                max_particles: 3,
                ..Default::default()
            },
            ArenaBounds::new(200.0, 200.0),
        );
        let mut spout = Spout::new(&config(), 7);
        assert_eq!(spout.pour(&mut pool, Vec2::new(50.0, 50.0), MaterialId(0), 0, 5), 3);
        assert_eq!(spout.pour(&mut pool, Vec2::new(50.0, 50.0), MaterialId(0), 0, 5), 0);
    }

    #[test]
    fn test_non_finite_config_pours_without_panic() {
        let mut pool = ParticlePool::with_bounds(
            PhysicsConfig {
                max_particles: 8,
                ..Default::default()
            },
            ArenaBounds::new(200.0, 200.0),
        );
        let bad = PourConfig {
            jitter: f32::INFINITY,
            speed_min: f32::NAN,
            speed_max: f32::NEG_INFINITY,
            ..config()
        };
        let mut spout = Spout::new(&bad, 3);
        assert_eq!(spout.pour(&mut pool, Vec2::new(100.0, 20.0), MaterialId(0), 0, 4), 4);
        assert!(pool.iter_active().all(|(_, p)| p.pos.is_finite() && p.vel.is_finite()));
    }

    #[test]
    fn test_hold_to_pour() {
        let mut control = PourControl::new(false);
        assert!(control.request(MaterialId(0), 0).is_none());

        control.pointer_down(1, Vec2::new(10.0, 20.0));
        control.pointer_move(1, Vec2::new(30.0, 20.0));
        let pour = control.request(MaterialId(2), 0xabcdef).unwrap();
        assert_eq!(pour.at, Vec2::new(30.0, 20.0));
        assert_eq!(pour.material, MaterialId(2));

        control.pointer_up(1);
        assert!(!control.is_pouring());
        // Moves without a pointer down are ignored
        control.pointer_move(1, Vec2::new(90.0, 90.0));
        assert_eq!(control.position(), Vec2::new(30.0, 20.0));
    }

    #[test]
    fn test_tap_to_toggle() {
        let mut control = PourControl::new(true);
        control.pointer_down(1, Vec2::new(10.0, 10.0));
        control.pointer_up(1);
        assert!(control.is_pouring());
        control.pointer_move(1, Vec2::new(50.0, 10.0));
        assert_eq!(control.position(), Vec2::new(50.0, 10.0));

        control.pointer_down(1, Vec2::new(50.0, 10.0));
        control.pointer_up(1);
        assert!(!control.is_pouring());
    }

    #[test]
    fn test_second_pointer_ignored_and_cancel_stops() {
        let mut control = PourControl::new(true);
        control.pointer_down(1, Vec2::new(10.0, 10.0));
        control.pointer_down(2, Vec2::new(80.0, 80.0));
        control.pointer_move(2, Vec2::new(80.0, 80.0));
        control.pointer_up(2);
        assert!(control.is_pouring());
        assert_eq!(control.position(), Vec2::new(10.0, 10.0));

        control.pointer_cancel(1);
        assert!(!control.is_pouring());
    }

    #[test]
    fn test_leaving_toggle_mode_stops_latched_pour() {
        let mut control = PourControl::new(true);
        control.pointer_down(1, Vec2::ZERO);
        control.pointer_up(1);
        assert!(control.is_pouring());
        control.set_toggle_mode(false);
        assert!(!control.toggle_mode());
        assert!(!control.is_pouring());
    }

    #[test]
    fn test_rate_drops_under_slow_frames() {
        let mut adaptive = AdaptiveRate::new(&config());
        assert_eq!(adaptive.rate(), 4);
        for _ in 0..FRAME_WINDOW - 1 {
            adaptive.record_frame(40.0);
        }
        assert_eq!(adaptive.rate(), 4);
        adaptive.record_frame(40.0);
        assert_eq!(adaptive.rate(), 3);

        for _ in 0..FRAME_WINDOW * 10 {
            adaptive.record_frame(40.0);
        }
        assert_eq!(adaptive.rate(), 1);
    }

    #[test]
    fn test_rate_recovers_when_fast() {
        let mut adaptive = AdaptiveRate::new(&config());
        for _ in 0..FRAME_WINDOW * 2 {
            adaptive.record_frame(40.0);
        }
        assert_eq!(adaptive.rate(), 2);
        for _ in 0..FRAME_WINDOW {
            adaptive.record_frame(5.0);
        }
        assert_eq!(adaptive.rate(), 3);
        for _ in 0..FRAME_WINDOW * 5 {
            adaptive.record_frame(5.0);
        }
        assert_eq!(adaptive.rate(), 4);
    }

    #[test]
    fn test_rate_holds_inside_band() {
        let mut adaptive = AdaptiveRate::new(&config());
        for _ in 0..FRAME_WINDOW * 3 {
            adaptive.record_frame(18.0);
        }
        assert_eq!(adaptive.rate(), 4);
    }

    #[test]
    fn test_disabled_always_max() {
        let mut adaptive = AdaptiveRate::new(&PourConfig {
            adaptive: false,
            ..config()
        });
        for _ in 0..FRAME_WINDOW * 3 {
            adaptive.record_frame(100.0);
        }
        assert_eq!(adaptive.rate(), 4);
    }
}
