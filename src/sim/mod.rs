//! Deterministic merge simulation
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - Merges applied only after a step's collision scan is complete

pub mod driver;
pub mod physics;
pub mod registry;
pub mod resolver;
pub mod spawn;
pub mod tier;
pub mod world;

pub use driver::{BodySnapshot, SimEvent, Simulation, SpawnSender, StepReport};
pub use physics::{BodyId, BodyShape, BodySpec, CollisionPair, Kinematics, PhysicsAdapter};
pub use registry::BodyRegistry;
pub use resolver::{MergeInstruction, MergePlan, Resolution, SkipCounts, resolve};
pub use spawn::{SpawnController, SpawnInstruction, SpawnRequest};
pub use tier::{Tier, TierCatalog, TierDef};
pub use world::CircleWorld;
