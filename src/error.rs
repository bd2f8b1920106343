//! Error types for the merge core
//!
//! Only programmer errors and configuration problems surface here. Stale
//! collision pairs are part of normal operation and never become errors.

use thiserror::Error;

use crate::sim::BodyId;

/// Everything the core can report to a caller
#[derive(Debug, Error)]
pub enum MergeError {
    /// Tier index past the end of the catalog, or a `next_tier` query on the terminal tier
    #[error("invalid tier index {index}")]
    InvalidTier { index: usize },

    /// Registry query for a body that was never registered or is already dead
    #[error("unknown or dead body {id}")]
    UnknownBody { id: BodyId },

    /// Every non-terminal tier has zero spawn weight
    #[error("no spawnable tier (all non-terminal spawn weights are zero)")]
    NoSpawnableTier,

    /// Spawn request with a NaN or infinite coordinate
    #[error("spawn position ({x}, {y}) is not finite")]
    NonFinitePosition { x: f32, y: f32 },

    #[error("invalid tier catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the crate
pub type MergeResult<T> = Result<T, MergeError>;
