//! Body registry
//!
//! The authoritative record of which bodies exist and which tier they are.
//! Only the simulation driver writes to it. A body leaves the registry the
//! moment it dies, so lookups on it fail the same way as for an id that was
//! never registered.

use std::collections::BTreeMap;

use super::physics::BodyId;
use crate::error::{MergeError, MergeResult};

/// Live identity → tier. Iterates in identity order for determinism.
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    live: BTreeMap<BodyId, usize>,
    retired: u64,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly created body
    pub fn register(&mut self, id: BodyId, tier: usize) {
        if let Some(prev) = self.live.insert(id, tier) {
            // Adapters hand out unique ids; reuse means the adapter broke its contract.
            log::warn!("Body {} re-registered (was tier {})", id, prev);
        }
    }

    /// Mark a body dead. Returns `true` only on the alive → dead transition.
    pub fn mark_dead(&mut self, id: BodyId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            self.retired += 1;
        }
        removed
    }

    pub fn is_alive(&self, id: BodyId) -> bool {
        self.live.contains_key(&id)
    }

    /// Tier index of a live body
    pub fn tier_of(&self, id: BodyId) -> MergeResult<usize> {
        self.live
            .get(&id)
            .copied()
            .ok_or(MergeError::UnknownBody { id })
    }

    /// Live bodies as `(id, tier)`, ascending by id
    pub fn live(&self) -> impl Iterator<Item = (BodyId, usize)> + '_ {
        self.live.iter().map(|(id, tier)| (*id, *tier))
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of live bodies of one tier
    pub fn live_count_of(&self, tier: usize) -> usize {
        self.live.values().filter(|&&t| t == tier).count()
    }

    /// Bodies that have died since the registry was created
    pub fn retired_count(&self) -> u64 {
        self.retired
    }
}
