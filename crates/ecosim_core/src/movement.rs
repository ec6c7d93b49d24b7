//! Steering and the once-per-tick invariant repair pass.

use ecosim_data::{Agent, BehaviorState, Conditions, MotionParams, Obstacle, Position};
use rand::Rng;
use std::f64::consts::PI;

/// Max wander-heading drift per tick, radians.
const WANDER_DRIFT: f64 = 0.3;

fn state_speed_factor(state: BehaviorState) -> f64 {
    match state {
        BehaviorState::Fleeing => 1.0,
        BehaviorState::SeekingFood | BehaviorState::SeekingMate => 0.8,
        BehaviorState::Exploring => 0.6,
        BehaviorState::Resting => 0.0,
    }
}

#[inline]
fn heading_vec(h: f64) -> (f64, f64) {
    (h.cos(), h.sin())
}

fn normalize((x, y): (f64, f64)) -> Option<(f64, f64)> {
    let len = (x * x + y * y).sqrt();
    (len > f64::EPSILON && len.is_finite()).then(|| (x / len, y / len))
}

/// Direction toward the state's target, if the state has one and it was seen.
fn target_direction(agent: &Agent, cond: &Conditions) -> Option<(f64, f64)> {
    let here = agent.position;
    match agent.state {
        BehaviorState::Fleeing => cond.nearest_predator.and_then(|p| {
            let (x, y) = here.direction_to(&p.position);
            normalize((-x, -y))
        }),
        BehaviorState::SeekingFood => cond
            .nearest_food
            .and_then(|t| normalize(here.direction_to(&t.position))),
        BehaviorState::SeekingMate => cond
            .nearest_mate
            .and_then(|t| normalize(here.direction_to(&t.position))),
        BehaviorState::Exploring | BehaviorState::Resting => None,
    }
}

/// Sets the agent's velocity for this tick.
///
/// Target-seeking states without a visible target fall back to a random
/// walk. In continuous mode the motion parameters blend target, wander and
/// noise directions; fleeing and resting always use the reflex.
pub fn steer<R: Rng>(
    agent: &mut Agent,
    cond: &Conditions,
    motion: Option<&MotionParams>,
    rng: &mut R,
) {
    agent.wander_heading += rng.gen_range(-WANDER_DRIFT..=WANDER_DRIFT);
    let max_speed = agent.max_speed * agent.speed_multiplier;
    let target = target_direction(agent, cond);

    let (dir, speed) = match (motion, agent.state) {
        (_, BehaviorState::Resting) => ((0.0, 0.0), 0.0),
        (Some(m), state) if state != BehaviorState::Fleeing => {
            let wander = heading_vec(agent.wander_heading + m.heading);
            let noise = heading_vec(rng.gen_range(-PI..PI));
            let (tx, ty) = target.unwrap_or((0.0, 0.0));
            let blended = (
                m.target_weight * tx + m.wander * wander.0 + m.noise * noise.0,
                m.target_weight * ty + m.wander * wander.1 + m.noise * noise.1,
            );
            (
                normalize(blended).unwrap_or(wander),
                max_speed * m.speed.clamp(0.0, 1.0),
            )
        }
        (_, state) => (
            target.unwrap_or_else(|| heading_vec(agent.wander_heading)),
            max_speed * state_speed_factor(state),
        ),
    };
    agent.vx = dir.0 * speed;
    agent.vy = dir.1 * speed;
}

/// Integrates velocity over `dt`. A step into an obstacle or across the
/// world edge is cancelled and the wander heading turned around.
pub fn integrate(agent: &mut Agent, dt: f64, obstacles: &[Obstacle], width: f64, height: f64) {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    let next = Position::new(agent.position.x + agent.vx * dt, agent.position.y + agent.vy * dt);
    let blocked = !next.is_finite()
        || next.x < 0.0
        || next.y < 0.0
        || next.x > width
        || next.y > height
        || obstacles.iter().any(|o| o.collides(&next, agent.size * 0.5));
    if blocked {
        agent.vx = 0.0;
        agent.vy = 0.0;
        agent.wander_heading += PI;
    } else {
        agent.position = next;
    }
}

/// Repairs invariant violations in place. Returns `true` when anything had
/// to be fixed.
pub fn sanitize(agent: &mut Agent, width: f64, height: f64) -> bool {
    let mut repaired = false;
    if !agent.position.is_finite() {
        agent.position = Position::new(width * 0.5, height * 0.5);
        repaired = true;
    }
    let clamped = Position::new(
        agent.position.x.clamp(0.0, width),
        agent.position.y.clamp(0.0, height),
    );
    if clamped != agent.position {
        agent.position = clamped;
        repaired = true;
    }
    if !agent.vx.is_finite() || !agent.vy.is_finite() {
        agent.vx = 0.0;
        agent.vy = 0.0;
        repaired = true;
    }
    if !agent.wander_heading.is_finite() {
        agent.wander_heading = 0.0;
        repaired = true;
    } else {
        agent.wander_heading = agent.wander_heading.rem_euclid(2.0 * PI);
    }
    for value in [&mut agent.health, &mut agent.energy] {
        let fixed = if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            0.0
        };
        if fixed != *value {
            *value = fixed;
            repaired = true;
        }
    }
    if !agent.speed_multiplier.is_finite() {
        agent.speed_multiplier = 1.0;
        repaired = true;
    }
    repaired
}
