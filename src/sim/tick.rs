//! Fixed-step particle physics
//!
//! One call advances every active particle by one step. Separation is a
//! single-pass soft repulsion, not a rigid solver: particles may overlap
//! briefly under heavy pouring.

use glam::Vec2;

use super::state::ParticlePool;
use crate::consts::MIN_SEPARATION_DIST_SQ;

impl ParticlePool {
    /// Advance the whole pool by one fixed step
    pub fn update(&mut self) {
        self.rebuild_grid();

        let cfg = &self.config;
        let (gravity, damping) = (cfg.gravity, cfg.damping);
        let (floor_damping, wall_bounce) = (cfg.floor_damping, cfg.wall_bounce);
        let (sep_force, margin) = (cfg.separation_force, cfg.separation_margin);
        let settle = cfg.settle_threshold;
        let (width, height) = (self.bounds.width, self.bounds.height);

        for i in 0..self.particles.len() {
            // Work on a copy; neighbors read the live array, so particles
            // earlier in slot order are seen at their updated positions
            let mut p = self.particles[i];
            if !p.active {
                continue;
            }

            p.vel.y += gravity;

            let (col, row) = self.grid.cell_of(p.pos);
            for j in self.grid.neighborhood(col, row) {
                let j = j as usize;
                if j == i {
                    continue;
                }
                let q = &self.particles[j];
                let delta = p.pos - q.pos;
                let dist_sq = delta.length_squared();
                let min_dist = p.radius + q.radius + margin;
                if dist_sq < min_dist * min_dist && dist_sq > MIN_SEPARATION_DIST_SQ {
                    let dist = dist_sq.sqrt();
                    let overlap = min_dist - dist;
                    p.vel += (delta / dist) * overlap * sep_force;
                }
            }

            p.pos += p.vel;

            let r = p.radius;
            // Floor
            if p.pos.y + r > height {
                p.pos.y = height - r;
                p.vel.y *= -floor_damping;
                p.vel.x *= damping;
                if p.vel.y.abs() < settle {
                    p.vel.y = 0.0;
                }
            }
            // Ceiling
            if p.pos.y - r < 0.0 {
                p.pos.y = r;
                p.vel.y *= -floor_damping;
            }
            // Walls
            if p.pos.x - r < 0.0 {
                p.pos.x = r;
                p.vel.x *= -wall_bounce;
            }
            if p.pos.x + r > width {
                p.pos.x = width - r;
                p.vel.x *= -wall_bounce;
            }

            p.vel *= Vec2::splat(damping);
            p.age = p.age.wrapping_add(1);

            self.particles[i] = p;
        }
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (i, p) in self.particles.iter().enumerate() {
            if p.active {
                // A full cell drops the particle from neighbor lists this tick
                self.grid.insert(i as u32, p.pos);
            }
        }
    }
}
