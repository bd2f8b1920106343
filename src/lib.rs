//! Suika core - tiered drop-and-merge puzzle simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tiers, spawning, collision-driven merging)
//! - `settings`: Data-driven world and stepping configuration
//! - `error`: Error types surfaced to the host
//!
//! Rendering, input capture and the production physics engine are the host's
//! concern; the core talks to physics through [`sim::PhysicsAdapter`].

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{MergeError, MergeResult};
pub use settings::{PlayArea, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Contact passes per step in the built-in world
    pub const SOLVER_ITERATIONS: u32 = 4;

    /// Container dimensions (screen space, +y down)
    pub const PLAY_AREA_WIDTH: f32 = 400.0;
    pub const PLAY_AREA_HEIGHT: f32 = 600.0;
    pub const WALL_THICKNESS: f32 = 50.0;

    /// Downward acceleration (px/s²)
    pub const GRAVITY: f32 = 1000.0;
    /// Vertical position new drops appear at
    pub const DROP_HEIGHT: f32 = 50.0;
}
