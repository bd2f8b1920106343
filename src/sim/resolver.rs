//! Collision resolution
//!
//! Turns one step's collision-start pairs into a merge plan. The resolver only
//! reads: it never touches the registry or the physics world, so a body that
//! is consumed early in the scan is still readable by later pairs. Those pairs
//! are rejected through the claimed set instead.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyId, CollisionPair, PhysicsAdapter};
use super::registry::BodyRegistry;
use super::tier::TierCatalog;

/// Merge two bodies of `tier - 1` into one body of `tier` at `position`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeInstruction {
    pub a: BodyId,
    pub b: BodyId,
    /// Resulting tier (source tier + 1)
    pub tier: usize,
    pub position: Vec2,
}

/// Ordered merge instructions for one step
pub type MergePlan = Vec<MergeInstruction>;

/// Why pairs were passed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// A member is unknown, dead, or has no kinematic state (includes walls)
    pub stale: u32,
    pub cross_tier: u32,
    pub terminal: u32,
    /// A member was already committed to an earlier merge this step
    pub claimed: u32,
}

impl SkipCounts {
    pub fn total(&self) -> u32 {
        self.stale + self.cross_tier + self.terminal + self.claimed
    }
}

/// Resolver output for one step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub plan: MergePlan,
    pub skipped: SkipCounts,
}

/// Build the merge plan for one step.
///
/// Pairs are processed in reported order; the first qualifying pair wins
/// when a body touches several same-tier bodies at once.
pub fn resolve<P: PhysicsAdapter + ?Sized>(
    pairs: &[CollisionPair],
    registry: &BodyRegistry,
    catalog: &TierCatalog,
    physics: &P,
) -> Resolution {
    let mut claimed: HashSet<BodyId> = HashSet::new();
    let mut out = Resolution::default();

    for pair in pairs {
        // Self-pairs cannot merge; treat like any other invalid report
        if pair.a == pair.b {
            out.skipped.stale += 1;
            continue;
        }

        let (tier_a, tier_b) = match (registry.tier_of(pair.a), registry.tier_of(pair.b)) {
            (Ok(a), Ok(b)) => (a, b),
            _ => {
                log::trace!("Dropping stale pair {} / {}", pair.a, pair.b);
                out.skipped.stale += 1;
                continue;
            }
        };

        if tier_a != tier_b {
            out.skipped.cross_tier += 1;
            continue;
        }

        if claimed.contains(&pair.a) || claimed.contains(&pair.b) {
            log::trace!("Pair {} / {} already claimed this step", pair.a, pair.b);
            out.skipped.claimed += 1;
            continue;
        }

        let next = match catalog.next_tier(tier_a) {
            Ok(tier) => tier.index,
            Err(_) => {
                out.skipped.terminal += 1;
                continue;
            }
        };

        let (Some(ka), Some(kb)) = (physics.kinematics(pair.a), physics.kinematics(pair.b)) else {
            out.skipped.stale += 1;
            continue;
        };

        claimed.insert(pair.a);
        claimed.insert(pair.b);
        out.plan.push(MergeInstruction {
            a: pair.a,
            b: pair.b,
            tier: next,
            position: (ka.position + kb.position) * 0.5,
        });
    }

    out
}
