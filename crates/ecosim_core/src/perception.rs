//! Environment perception.
//!
//! Every category is scanned through a radius query on its spatial index,
//! so cost scales with local density rather than population size. The
//! nearest candidate per category wins; on equal distance the one earlier
//! in the input list is kept, independent of grid scan order.

use crate::config::PerceptionConfig;
use crate::relationships::RelationshipLogic;
use crate::snapshot::AgentSnapshot;
use crate::spatial_hash::SpatialHash;
use ecosim_data::{Agent, AgentId, Conditions, Food, Obstacle, Position, Predator, Target};
use std::collections::HashMap;

/// Indexed view of everything an agent may perceive this tick.
///
/// Food and predators are keyed by their slice index; agents by id.
pub struct PerceptionContext<'a> {
    pub config: &'a PerceptionConfig,
    pub food: &'a [Food],
    pub food_index: &'a SpatialHash,
    pub predators: &'a [Predator],
    pub predator_index: &'a SpatialHash,
    pub obstacles: &'a [Obstacle],
    pub peers: &'a [AgentSnapshot],
    pub peer_lookup: &'a HashMap<AgentId, usize>,
    pub peer_index: &'a SpatialHash,
}

/// Builds the food and predator indices keyed by slice position.
pub fn index_positions(
    positions: impl Iterator<Item = Position>,
    cell_size: f64,
    width: u16,
    height: u16,
) -> SpatialHash {
    let mut index = SpatialHash::new(cell_size, width, height);
    let data: Vec<(u64, Position)> = positions
        .enumerate()
        .map(|(i, p)| (i as u64, p))
        .collect();
    index.rebuild(&data);
    index
}

/// Closest candidate so far, with its list rank as the tie-breaker.
type Nearest = Option<(usize, Target)>;

#[inline]
fn consider(best: &mut Nearest, rank: usize, id: u64, position: Position, distance: f64) {
    match best {
        Some((r, t)) if (t.distance, *r) <= (distance, rank) => {}
        _ => {
            *best = Some((
                rank,
                Target {
                    id,
                    position,
                    distance,
                },
            ))
        }
    }
}

fn mate_eligible(agent: &Agent, peer: &AgentSnapshot, threshold: f64) -> bool {
    peer.alive
        && peer.id != agent.id
        && peer.sex == agent.sex.opposite()
        && peer.can_reproduce
        && peer.energy >= threshold
}

/// Produces the perception snapshot for one agent.
///
/// Malformed agents (dead, non-finite position or radius) perceive nothing.
pub fn analyze(agent: &Agent, ctx: &PerceptionContext) -> Conditions {
    let radius = agent.perception_radius;
    if !agent.is_alive() || !agent.position.is_finite() || !radius.is_finite() || radius < 0.0 {
        return Conditions::neutral();
    }
    let here = agent.position;
    let mut cond = Conditions::neutral();
    let mut buf = Vec::new();
    let (mut food, mut predator, mut mate): (Nearest, Nearest, Nearest) = (None, None, None);

    ctx.food_index.query_into(&here, radius, &mut buf);
    for &idx in &buf {
        if let Some(f) = ctx.food.get(idx as usize) {
            consider(
                &mut food,
                idx as usize,
                f.id,
                f.position,
                here.distance(&f.position),
            );
        }
    }

    ctx.predator_index.query_into(&here, radius, &mut buf);
    for &idx in &buf {
        if let Some(p) = ctx.predators.get(idx as usize) {
            consider(
                &mut predator,
                idx as usize,
                p.id,
                p.position,
                here.distance(&p.position),
            );
        }
    }

    let threshold = ctx.config.mate_energy_threshold;
    let self_ready = agent.can_reproduce && agent.energy >= threshold;
    ctx.peer_index.query_into(&here, radius, &mut buf);
    for &id in &buf {
        let Some((rank, peer)) = ctx
            .peer_lookup
            .get(&id)
            .and_then(|&i| ctx.peers.get(i).map(|p| (i, p)))
        else {
            continue;
        };
        if !peer.alive || peer.id == agent.id {
            continue;
        }
        if agent.relationships.is_ally(id) {
            cond.allies.push(id);
        } else if agent.relationships.is_rival(id) {
            cond.rivals.push(id);
        }
        if !self_ready || !mate_eligible(agent, peer, threshold) {
            continue;
        }
        let eligible = match agent.mate_lock {
            // While the cooldown runs only the locked partner is tracked.
            Some(lock) if agent.mate_cooldown > 0 => lock == id,
            _ => agent.mate_cooldown == 0 && peer.mate_cooldown == 0,
        };
        if eligible {
            consider(
                &mut mate,
                rank,
                id,
                peer.position,
                here.distance(&peer.position),
            );
        }
    }

    let margin = ctx.config.obstacle_margin_factor * agent.size;
    cond.obstacle_nearby = ctx.obstacles.iter().any(|o| o.collides(&here, margin));

    cond.nearest_food = food.map(|(_, t)| t);
    cond.nearest_predator = predator.map(|(_, t)| t);
    cond.nearest_mate = mate.map(|(_, t)| t);
    cond.food_nearby = cond.nearest_food.is_some();
    cond.predator_nearby = cond.nearest_predator.is_some();
    cond.mate_nearby = cond.nearest_mate.is_some();
    cond.allies_nearby = !cond.allies.is_empty();
    cond.rivals_nearby = !cond.rivals.is_empty();
    cond
}

/// Convenience entry point over plain lists. Builds throwaway indices, so
/// prefer [`analyze`] with a shared context when perceiving many agents.
pub fn analyze_lists(
    agent: &Agent,
    config: &PerceptionConfig,
    food: &[Food],
    predators: &[Predator],
    obstacles: &[Obstacle],
    peers: &[AgentSnapshot],
) -> Conditions {
    let cell = agent.perception_radius.max(1.0);
    let (w, h) = bounds(
        food.iter()
            .map(|f| f.position)
            .chain(predators.iter().map(|p| p.position))
            .chain(peers.iter().map(|p| p.position))
            .chain(std::iter::once(agent.position)),
    );
    let food_index = index_positions(food.iter().map(|f| f.position), cell, w, h);
    let predator_index = index_positions(predators.iter().map(|p| p.position), cell, w, h);
    let mut peer_index = SpatialHash::new(cell, w, h);
    let mut peer_lookup = HashMap::with_capacity(peers.len());
    for (i, p) in peers.iter().enumerate() {
        peer_index.insert(p.id, p.position);
        peer_lookup.insert(p.id, i);
    }
    analyze(
        agent,
        &PerceptionContext {
            config,
            food,
            food_index: &food_index,
            predators,
            predator_index: &predator_index,
            obstacles,
            peers,
            peer_lookup: &peer_lookup,
            peer_index: &peer_index,
        },
    )
}

fn bounds(points: impl Iterator<Item = Position>) -> (u16, u16) {
    let (mut w, mut h) = (1.0_f64, 1.0_f64);
    for p in points.filter(Position::is_finite) {
        w = w.max(p.x);
        h = h.max(p.y);
    }
    (
        w.ceil().min(f64::from(u16::MAX)) as u16,
        h.ceil().min(f64::from(u16::MAX)) as u16,
    )
}
