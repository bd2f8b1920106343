//! Tier catalog
//!
//! Tiers are ordered smallest to largest. Index and terminal flag are assigned
//! when the catalog is built, so the last tier is always the only terminal one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::physics::{BodyShape, BodySpec};
use crate::error::{MergeError, MergeResult};
use glam::Vec2;

/// Density used to derive the default tier masses from their area
pub const DEFAULT_DENSITY: f32 = 0.001;

/// Serializable tier definition (what a catalog file contains)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDef {
    pub name: String,
    pub radius: f32,
    /// Defaults to `DEFAULT_DENSITY * area` when omitted
    #[serde(default)]
    pub mass: Option<f32>,
    pub restitution: f32,
    #[serde(default)]
    pub spawn_weight: f32,
    /// Opaque to the core; handed through to render snapshots
    #[serde(default)]
    pub visual: String,
}

impl TierDef {
    pub fn new(name: &str, radius: f32, restitution: f32, spawn_weight: f32) -> Self {
        Self {
            name: name.to_string(),
            radius,
            mass: None,
            restitution,
            spawn_weight,
            visual: name.to_string(),
        }
    }
}

/// An immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tier {
    pub index: usize,
    pub name: String,
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    pub spawn_weight: f32,
    pub terminal: bool,
    pub visual: String,
}

impl Tier {
    /// Physics body description for a body of this tier at rest at `position`
    pub fn body_spec(&self, position: Vec2) -> BodySpec {
        BodySpec {
            shape: BodyShape::Circle {
                radius: self.radius,
            },
            position,
            velocity: Vec2::ZERO,
            restitution: self.restitution,
            mass: self.mass,
            is_static: false,
        }
    }
}

/// Ordered, validated set of tiers
#[derive(Debug, Clone, PartialEq)]
pub struct TierCatalog {
    tiers: Vec<Tier>,
}

impl Default for TierCatalog {
    /// The three fruits of the original game; only the smallest is dropped
    fn default() -> Self {
        Self::fruit()
    }
}

impl TierCatalog {
    /// Build a catalog, assigning indices and marking the last tier terminal
    pub fn new(defs: Vec<TierDef>) -> MergeResult<Self> {
        if defs.is_empty() {
            return Err(MergeError::InvalidCatalog("catalog has no tiers".into()));
        }

        let mut prev_radius = 0.0_f32;
        for (index, def) in defs.iter().enumerate() {
            if !def.radius.is_finite() || def.radius <= 0.0 {
                return Err(MergeError::InvalidCatalog(format!(
                    "tier {} ({}) has non-positive radius {}",
                    index, def.name, def.radius
                )));
            }
            if def.radius < prev_radius {
                return Err(MergeError::InvalidCatalog(format!(
                    "tier {} ({}) is smaller than the tier before it",
                    index, def.name
                )));
            }
            if !(0.0..=1.0).contains(&def.restitution) {
                return Err(MergeError::InvalidCatalog(format!(
                    "tier {} ({}) restitution {} outside [0, 1]",
                    index, def.name, def.restitution
                )));
            }
            if !def.spawn_weight.is_finite() || def.spawn_weight < 0.0 {
                return Err(MergeError::InvalidCatalog(format!(
                    "tier {} ({}) has invalid spawn weight {}",
                    index, def.name, def.spawn_weight
                )));
            }
            if let Some(mass) = def.mass {
                if !mass.is_finite() || mass <= 0.0 {
                    return Err(MergeError::InvalidCatalog(format!(
                        "tier {} ({}) has non-positive mass {}",
                        index, def.name, mass
                    )));
                }
            }
            prev_radius = def.radius;
        }

        Ok(Self::build(defs))
    }

    fn build(defs: Vec<TierDef>) -> Self {
        let last = defs.len().saturating_sub(1);
        let tiers = defs
            .into_iter()
            .enumerate()
            .map(|(index, def)| Tier {
                index,
                mass: def
                    .mass
                    .unwrap_or(DEFAULT_DENSITY * std::f32::consts::PI * def.radius * def.radius),
                name: def.name,
                radius: def.radius,
                restitution: def.restitution,
                spawn_weight: def.spawn_weight,
                terminal: index == last,
                visual: def.visual,
            })
            .collect();
        Self { tiers }
    }

    /// Watermelon seed, lemon, grape
    pub fn fruit() -> Self {
        Self::build(vec![
            TierDef::new("watermelon", 10.0, 0.1, 1.0),
            TierDef::new("lemon", 25.0, 0.3, 0.0),
            TierDef::new("podo", 60.0, 0.6, 0.0),
        ])
    }

    /// Parse a JSON array of tier definitions
    pub fn from_json(json: &str) -> MergeResult<Self> {
        let defs: Vec<TierDef> = serde_json::from_str(json)?;
        Self::new(defs)
    }

    /// Load a catalog file
    pub fn load(path: impl AsRef<std::path::Path>) -> MergeResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        log::info!("Loaded tier catalog with {} tiers", catalog.tier_count());
        Ok(catalog)
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier_at(&self, index: usize) -> MergeResult<&Tier> {
        self.tiers
            .get(index)
            .ok_or(MergeError::InvalidTier { index })
    }

    /// False for out-of-range indices
    pub fn is_terminal(&self, index: usize) -> bool {
        self.tiers.get(index).is_some_and(|t| t.terminal)
    }

    /// The tier a merge of two `index` bodies produces
    pub fn next_tier(&self, index: usize) -> MergeResult<&Tier> {
        let tier = self.tier_at(index)?;
        if tier.terminal {
            return Err(MergeError::InvalidTier { index });
        }
        self.tier_at(index + 1)
    }

    /// Pick a spawn tier using each tier's own spawn weight
    pub fn random_spawn_tier<R: Rng + ?Sized>(&self, rng: &mut R) -> MergeResult<&Tier> {
        let weights: Vec<f32> = self.tiers.iter().map(|t| t.spawn_weight).collect();
        self.random_spawn_tier_weighted(&weights, rng)
    }

    /// Pick a spawn tier proportionally to `weights` (indexed like the catalog).
    ///
    /// Terminal tiers, zero weights and entries past the end of `weights` are
    /// never chosen.
    pub fn random_spawn_tier_weighted<R: Rng + ?Sized>(
        &self,
        weights: &[f32],
        rng: &mut R,
    ) -> MergeResult<&Tier> {
        let eligible: Vec<(usize, f32)> = self
            .tiers
            .iter()
            .filter(|t| !t.terminal)
            .filter_map(|t| {
                let w = weights.get(t.index).copied().unwrap_or(0.0);
                (w.is_finite() && w > 0.0).then_some((t.index, w))
            })
            .collect();

        // Scale by the largest weight so the sum cannot overflow to infinity
        let max = eligible.iter().map(|&(_, w)| w).fold(0.0_f32, f32::max);
        if eligible.is_empty() || max <= 0.0 {
            return Err(MergeError::NoSpawnableTier);
        }
        let eligible: Vec<(usize, f32)> = eligible
            .into_iter()
            .map(|(index, w)| (index, w / max))
            .collect();
        let total: f32 = eligible.iter().map(|(_, w)| w).sum();

        let mut roll = rng.random_range(0.0..total);
        for &(index, w) in &eligible {
            if roll < w {
                return self.tier_at(index);
            }
            roll -= w;
        }
        // Float slop at the top of the range lands on the last eligible tier
        let (index, _) = eligible[eligible.len() - 1];
        self.tier_at(index)
    }
}
