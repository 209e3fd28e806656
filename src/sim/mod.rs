//! Particle simulation module
//!
//! Everything that runs per tick lives here:
//! - Fixed step only, no variable timestep
//! - Seeded RNG only (spawn radius)
//! - Stable iteration order (by pool slot)
//! - No rendering or platform dependencies

pub mod geometry;
pub mod grid;
pub mod reaction;
pub mod state;
pub mod tick;

pub use geometry::{ArenaBounds, Rect};
pub use grid::SpatialGrid;
pub use reaction::{Combiner, ReactionDetector, ReactionEvent};
pub use state::{Particle, ParticlePool, ZoneCounts};
