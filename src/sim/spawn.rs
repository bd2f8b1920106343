//! Spawn policy
//!
//! Turns an external drop request into a concrete tier and position. Only the
//! horizontal position of a request matters when a drop height is configured.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::tier::TierCatalog;
use crate::error::{MergeError, MergeResult};
use crate::settings::{PlayArea, Settings};

/// Request coming from input capture (click/tap position)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub tier_override: Option<usize>,
}

impl SpawnRequest {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            tier_override: None,
        }
    }

    pub fn with_tier(x: f32, y: f32, tier: usize) -> Self {
        Self {
            x,
            y,
            tier_override: Some(tier),
        }
    }
}

/// Accepted spawn: what to create and where
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnInstruction {
    pub tier: usize,
    pub position: Vec2,
}

/// Decides tier and position for new bodies
#[derive(Debug, Clone)]
pub struct SpawnController {
    area: PlayArea,
    drop_height: Option<f32>,
    rng: Pcg32,
}

impl SpawnController {
    pub fn new(area: PlayArea, drop_height: Option<f32>, seed: u64) -> Self {
        Self {
            area,
            drop_height,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.play_area, settings.drop_height, settings.seed)
    }

    /// Resolve a request. Out-of-bounds positions are clamped, never rejected;
    /// an out-of-range tier override fails with `InvalidTier` and a NaN or
    /// infinite coordinate with `NonFinitePosition`.
    pub fn request_spawn(
        &mut self,
        catalog: &TierCatalog,
        request: SpawnRequest,
    ) -> MergeResult<SpawnInstruction> {
        let y = self.drop_height.unwrap_or(request.y);
        if !(request.x.is_finite() && y.is_finite()) {
            return Err(MergeError::NonFinitePosition { x: request.x, y });
        }

        let tier = match request.tier_override {
            Some(index) => catalog.tier_at(index)?,
            None => catalog.random_spawn_tier(&mut self.rng)?,
        };

        let position = self
            .area
            .clamp_circle(Vec2::new(request.x, y), tier.radius);

        Ok(SpawnInstruction {
            tier: tier.index,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tier::TierDef;

    fn area() -> PlayArea {
        PlayArea {
            min: Vec2::ZERO,
            max: Vec2::new(400.0, 600.0),
        }
    }

    #[test]
    fn test_fixed_drop_height_ignores_request_y() {
        let mut spawner = SpawnController::new(area(), Some(50.0), 1);
        let catalog = TierCatalog::fruit();
        let inst = spawner
            .request_spawn(&catalog, SpawnRequest::at(120.0, 480.0))
            .unwrap();
        assert_eq!(inst.position, Vec2::new(120.0, 50.0));
        assert_eq!(inst.tier, 0);
    }

    #[test]
    fn test_out_of_bounds_is_clamped_not_rejected() {
        let mut spawner = SpawnController::new(area(), Some(50.0), 1);
        let catalog = TierCatalog::fruit();

        let left = spawner
            .request_spawn(&catalog, SpawnRequest::with_tier(-300.0, 0.0, 1))
            .unwrap();
        assert_eq!(left.position.x, 25.0);

        let right = spawner
            .request_spawn(&catalog, SpawnRequest::at(9000.0, 0.0))
            .unwrap();
        assert_eq!(right.position.x, 390.0);
    }

    #[test]
    fn test_request_y_used_without_drop_height() {
        let mut spawner = SpawnController::new(area(), None, 1);
        let catalog = TierCatalog::fruit();
        let inst = spawner
            .request_spawn(&catalog, SpawnRequest::at(200.0, 700.0))
            .unwrap();
        assert_eq!(inst.position, Vec2::new(200.0, 590.0));
    }

    #[test]
    fn test_invalid_override() {
        let mut spawner = SpawnController::new(area(), Some(50.0), 1);
        let catalog = TierCatalog::fruit();
        let err = spawner
            .request_spawn(&catalog, SpawnRequest::with_tier(10.0, 10.0, 3))
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidTier { index: 3 }));
    }

    #[test]
    fn test_non_finite_position_rejected() {
        let mut spawner = SpawnController::new(area(), Some(50.0), 1);
        let catalog = TierCatalog::fruit();
        for x in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = spawner
                .request_spawn(&catalog, SpawnRequest::at(x, 0.0))
                .unwrap_err();
            assert!(matches!(err, MergeError::NonFinitePosition { .. }));
        }

        // y only matters without a drop height
        assert!(
            spawner
                .request_spawn(&catalog, SpawnRequest::at(100.0, f32::NAN))
                .is_ok()
        );
        let mut free = SpawnController::new(area(), None, 1);
        assert!(matches!(
            free.request_spawn(&catalog, SpawnRequest::at(100.0, f32::NAN)),
            Err(MergeError::NonFinitePosition { .. })
        ));
    }

    #[test]
    fn test_override_may_pick_terminal() {
        let mut spawner = SpawnController::new(area(), Some(80.0), 1);
        let catalog = TierCatalog::fruit();
        let inst = spawner
            .request_spawn(&catalog, SpawnRequest::with_tier(200.0, 0.0, 2))
            .unwrap();
        assert_eq!(inst.tier, 2);
    }

    #[test]
    fn test_same_seed_same_tiers() {
        let catalog = TierCatalog::new(vec![
            TierDef::new("a", 5.0, 0.1, 1.0),
            TierDef::new("b", 10.0, 0.1, 1.0),
            TierDef::new("c", 15.0, 0.1, 1.0),
            TierDef::new("d", 20.0, 0.1, 0.0),
        ])
        .unwrap();
        let mut s1 = SpawnController::new(area(), Some(50.0), 1234);
        let mut s2 = SpawnController::new(area(), Some(50.0), 1234);
        for i in 0..50 {
            let req = SpawnRequest::at(i as f32 * 7.0, 0.0);
            assert_eq!(
                s1.request_spawn(&catalog, req).unwrap(),
                s2.request_spawn(&catalog, req).unwrap()
            );
        }
    }
}
