//! Per-tick reward shaping shared by both policies.

use crate::config::DecisionConfig;
use ecosim_data::{Action, Conditions};

pub struct RewardContext<'a> {
    pub action: Action,
    pub health: f64,
    pub energy: f64,
    pub conditions: &'a Conditions,
    /// Ticks since the last meal exceeded the starvation threshold.
    pub starving: bool,
    /// Energy needed before seeking a mate pays off.
    pub mate_threshold: f64,
    pub config: &'a DecisionConfig,
}

fn band(value: f64) -> f32 {
    if value > 70.0 {
        0.5
    } else if value < 30.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sum of health band, energy band, action/context match, predator
/// response, survival bonus and starvation penalty.
pub fn compute_reward(ctx: &RewardContext) -> f32 {
    let c = ctx.conditions;
    let hungry = ctx.energy < ctx.config.hungry_threshold;
    let sated = ctx.energy > ctx.config.sated_threshold;

    let mut reward = band(ctx.health) + band(ctx.energy);

    reward += match ctx.action {
        Action::SeekFood if hungry => {
            if c.food_nearby {
                1.5
            } else {
                1.0
            }
        }
        Action::SeekFood if sated => -0.5,
        Action::SeekFood => 0.0,
        Action::Rest if hungry && c.food_nearby => -0.5,
        Action::Rest if !hungry => 0.3,
        Action::Rest => 0.1,
        Action::SeekMate if ctx.energy >= ctx.mate_threshold && c.mate_nearby => 1.0,
        Action::SeekMate if hungry => -0.5,
        Action::SeekMate => 0.0,
        Action::Explore if !c.food_nearby && !c.mate_nearby && !c.predator_nearby => 0.1,
        Action::Explore if hungry && c.food_nearby => -0.2,
        Action::Explore => 0.0,
    };

    if c.predator_nearby {
        reward += if ctx.action == Action::Rest { -1.0 } else { 0.5 };
    }

    reward += 0.1;
    if ctx.starving || ctx.energy <= 0.0 {
        reward -= 1.0;
    }
    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward(action: Action, energy: f64, conditions: &Conditions) -> f32 {
        compute_reward(&RewardContext {
            action,
            health: 60.0,
            energy,
            conditions,
            starving: false,
            mate_threshold: 60.0,
            config: &DecisionConfig::default(),
        })
    }

    #[test]
    fn test_hungry_forager_beats_rester() {
        let c = Conditions {
            food_nearby: true,
            ..Conditions::neutral()
        };
        assert!(reward(Action::SeekFood, 20.0, &c) > reward(Action::Rest, 20.0, &c));
        assert!(reward(Action::SeekFood, 20.0, &c) > reward(Action::Explore, 20.0, &c));
    }

    #[test]
    fn test_sated_foraging_penalized() {
        let c = Conditions::neutral();
        assert!(reward(Action::SeekFood, 95.0, &c) < reward(Action::Rest, 95.0, &c));
    }

    #[test]
    fn test_resting_near_predator_penalized() {
        let c = Conditions {
            predator_nearby: true,
            ..Conditions::neutral()
        };
        assert!(reward(Action::Rest, 60.0, &c) < reward(Action::Explore, 60.0, &c));
    }

    #[test]
    fn test_mate_seeking_rewarded_when_ready() {
        let c = Conditions {
            mate_nearby: true,
            ..Conditions::neutral()
        };
        assert!(reward(Action::SeekMate, 80.0, &c) > reward(Action::SeekMate, 40.0, &c));
    }

    #[test]
    fn test_starvation_penalty() {
        let c = Conditions::neutral();
        let fed = reward(Action::Rest, 40.0, &c);
        let starving = compute_reward(&RewardContext {
            action: Action::Rest,
            health: 60.0,
            energy: 40.0,
            conditions: &c,
            starving: true,
            mate_threshold: 60.0,
            config: &DecisionConfig::default(),
        });
        assert!((fed - starving - 1.0).abs() < 1e-6);
    }
}
