//! Sparse ally/rival bookkeeping.
//!
//! A peer is never recorded as both ally and rival: inserting into one map
//! removes the id from the other.

use ecosim_data::{AgentId, Relationship, Relationships};
use std::collections::BTreeMap;

/// Strength below which an old relationship is forgotten.
pub const PRUNE_STRENGTH: f32 = 0.05;

pub trait RelationshipLogic {
    /// Adds `strength` to the bond with `peer`, capped at 1.0.
    fn add_ally(&mut self, peer: AgentId, strength: f32, tick: u64);
    fn add_rival(&mut self, peer: AgentId, strength: f32, tick: u64);
    fn is_ally(&self, peer: AgentId) -> bool;
    fn is_rival(&self, peer: AgentId) -> bool;
    /// Multiplies every strength by `factor` and drops bonds older than
    /// `memory` ticks that have weakened below [`PRUNE_STRENGTH`].
    fn decay(&mut self, factor: f32, memory: u64, tick: u64);
    /// Drops every id for which `alive` returns false.
    fn retain_peers<F: Fn(AgentId) -> bool>(&mut self, alive: F);
    fn forget(&mut self, peer: AgentId);
}

fn strengthen(map: &mut BTreeMap<AgentId, Relationship>, peer: AgentId, strength: f32, tick: u64) {
    let strength = if strength.is_finite() { strength.max(0.0) } else { 0.0 };
    map.entry(peer)
        .and_modify(|r| r.strength = (r.strength + strength).min(1.0))
        .or_insert(Relationship {
            strength: strength.min(1.0),
            since_tick: tick,
        });
}

fn decay_map(map: &mut BTreeMap<AgentId, Relationship>, factor: f32, memory: u64, tick: u64) {
    map.retain(|_, r| {
        r.strength *= factor;
        !(r.strength < PRUNE_STRENGTH && tick.saturating_sub(r.since_tick) > memory)
    });
}

impl RelationshipLogic for Relationships {
    fn add_ally(&mut self, peer: AgentId, strength: f32, tick: u64) {
        self.rivals.remove(&peer);
        strengthen(&mut self.allies, peer, strength, tick);
    }

    fn add_rival(&mut self, peer: AgentId, strength: f32, tick: u64) {
        self.allies.remove(&peer);
        strengthen(&mut self.rivals, peer, strength, tick);
    }

    #[inline]
    fn is_ally(&self, peer: AgentId) -> bool {
        self.allies.contains_key(&peer)
    }

    #[inline]
    fn is_rival(&self, peer: AgentId) -> bool {
        self.rivals.contains_key(&peer)
    }

    fn decay(&mut self, factor: f32, memory: u64, tick: u64) {
        let factor = factor.clamp(0.0, 1.0);
        decay_map(&mut self.allies, factor, memory, tick);
        decay_map(&mut self.rivals, factor, memory, tick);
    }

    fn retain_peers<F: Fn(AgentId) -> bool>(&mut self, alive: F) {
        self.allies.retain(|id, _| alive(*id));
        self.rivals.retain(|id, _| alive(*id));
    }

    fn forget(&mut self, peer: AgentId) {
        self.allies.remove(&peer);
        self.rivals.remove(&peer);
    }
}
