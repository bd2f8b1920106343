//! Simulation settings
//!
//! Loaded from JSON by the host; every field has a default so a partial file
//! only overrides what it names.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{MergeError, MergeResult};

/// Playable rectangle (screen coordinates, +y is down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayArea {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::new(PLAY_AREA_WIDTH, PLAY_AREA_HEIGHT),
        }
    }
}

impl PlayArea {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Clamp a circle center so the whole circle stays inside.
    ///
    /// A circle wider than the area is centered on that axis.
    pub fn clamp_circle(&self, pos: Vec2, radius: f32) -> Vec2 {
        let clamp_axis = |v: f32, lo: f32, hi: f32| {
            if lo > hi { (lo + hi) * 0.5 } else { v.clamp(lo, hi) }
        };
        Vec2::new(
            clamp_axis(pos.x, self.min.x + radius, self.max.x - radius),
            clamp_axis(pos.y, self.min.y + radius, self.max.y - radius),
        )
    }
}

/// Simulation settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run seed for spawn tier selection
    pub seed: u64,

    // === World ===
    pub play_area: PlayArea,
    /// Downward acceleration in px/s²
    pub gravity: f32,
    /// Build left, right and bottom walls around the play area
    pub walls: bool,
    pub wall_thickness: f32,

    // === Stepping ===
    /// Fixed simulation timestep (seconds)
    pub fixed_dt: f32,
    /// Maximum fixed steps per `advance` call
    pub max_substeps: u32,
    /// Contact solver passes per step (built-in world only)
    pub solver_iterations: u32,

    // === Spawning ===
    /// Vertical drop position. `None` keeps the request's own y.
    pub drop_height: Option<f32>,
    /// Cap on queued spawn requests drained per step. `None` drains all.
    pub max_spawns_per_step: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0,

            play_area: PlayArea::default(),
            gravity: GRAVITY,
            walls: true,
            wall_thickness: WALL_THICKNESS,

            fixed_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            solver_iterations: SOLVER_ITERATIONS,

            drop_height: Some(DROP_HEIGHT),
            max_spawns_per_step: None,
        }
    }
}

impl Settings {
    /// Default settings with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Reject values the stepping loop cannot work with
    pub fn validate(&self) -> MergeResult<()> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(MergeError::InvalidSettings(format!(
                "fixed_dt must be positive, got {}",
                self.fixed_dt
            )));
        }
        if self.max_substeps == 0 {
            return Err(MergeError::InvalidSettings(
                "max_substeps must be at least 1".into(),
            ));
        }
        let area = self.play_area;
        if !(area.min.is_finite() && area.max.is_finite())
            || area.width() <= 0.0
            || area.height() <= 0.0
        {
            return Err(MergeError::InvalidSettings(format!(
                "play area is empty or not finite: {:?}",
                area
            )));
        }
        if !self.gravity.is_finite() {
            return Err(MergeError::InvalidSettings("gravity must be finite".into()));
        }
        if self.max_spawns_per_step == Some(0) {
            return Err(MergeError::InvalidSettings(
                "max_spawns_per_step of 0 would never spawn; use null to disable the cap".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> MergeResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> MergeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> MergeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> MergeResult<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
