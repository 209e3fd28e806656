//! Sand Alchemy - pour particles, mix materials, discover new ones
//!
//! Core modules:
//! - `sim`: Particle pool, spatial-hash physics, zone reaction detector
//! - `catalog`: Static material/recipe tables interned to integer IDs
//! - `ledger`: Discovery state with best-effort persistence
//! - `persistence`: Key-value store abstraction (memory, file, LocalStorage)
//! - `tuning`: Data-driven simulation balance
//! - `sandbox`: The context object a host loop ticks once per frame

pub mod catalog;
pub mod ledger;
pub mod persistence;
pub mod pour;
pub mod sandbox;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use catalog::{Catalog, CatalogError, MaterialId, MaterialInfo, RecipeDef};
pub use ledger::{Combination, DiscoveryLedger};
pub use persistence::{KeyValueStore, MemoryStore, StoreError};
pub use pour::{AdaptiveRate, PourControl, Spout};
pub use sandbox::{PourRequest, Sandbox, SandboxStats, TickInput, TickReport};
pub use settings::{QualityPreset, Settings};
pub use tuning::{PhysicsConfig, PourConfig, ReactionConfig, Tuning};

/// Simulation defaults
pub mod consts {
    /// Default pool capacity
    pub const MAX_PARTICLES: usize = 8000;

    /// Added to vertical velocity every tick (pixels/tick²)
    pub const GRAVITY: f32 = 0.15;
    /// Multiplicative velocity decay applied every tick
    pub const DAMPING: f32 = 0.97;
    /// Vertical restitution on floor/ceiling contact
    pub const FLOOR_DAMPING: f32 = 0.4;
    /// Horizontal restitution on wall contact
    pub const WALL_BOUNCE: f32 = 0.3;
    /// Floor contacts slower than this stop bouncing
    pub const SETTLE_THRESHOLD: f32 = 0.5;

    /// Spawn radius range
    pub const PARTICLE_RADIUS_MIN: f32 = 1.5;
    pub const PARTICLE_RADIUS_MAX: f32 = 2.5;

    /// Spatial hash cell edge length (pixels)
    pub const GRID_CELL_SIZE: f32 = 8.0;
    /// Occupants kept per grid cell; extra particles are skipped for separation
    pub const MAX_NEIGHBORS_CHECK: usize = 4;
    /// Impulse per pixel of overlap
    pub const SEPARATION_FORCE: f32 = 0.3;
    /// Extra gap added to the sum of radii when testing overlap
    pub const SEPARATION_MARGIN: f32 = 1.0;
    /// Pairs closer than sqrt of this are treated as coincident and skipped
    pub const MIN_SEPARATION_DIST_SQ: f32 = 0.01;

    /// Default arena size until the renderer reports one
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    /// Particles of one material needed in the zone to react
    pub const REACTION_THRESHOLD: u32 = 30;
    /// Ticks before the same pair may react again (~1s at 60 Hz)
    pub const COOLDOWN_TICKS: u32 = 60;
    /// Zone is sampled every N ticks
    pub const CHECK_INTERVAL: u32 = 6;

    /// Particles emitted per tick while pouring
    pub const POUR_RATE: u32 = 4;
    /// Horizontal spawn spread around the spout (pixels)
    pub const POUR_JITTER: f32 = 6.0;
    /// Frame-time budget used by the adaptive pour rate (ms)
    pub const FRAME_BUDGET_MS: f32 = 1000.0 / 50.0;
}
