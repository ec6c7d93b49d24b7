//! Hybrid decision policy.
//!
//! Both controllers consume the same normalized [`Features`] and are
//! dispatched through [`DecisionPolicy`]; an agent's [`Policy`] variant is
//! fixed at construction.

pub mod neural;
pub mod reward;
pub mod tabular;

use crate::config::{AppConfig, DecisionConfig, PolicyKind};
use ecosim_data::{Action, Agent, Conditions, MotionParams, NeuralNet, Policy, QTable, StateKey};
pub use ecosim_data::{ACTION_COUNT, FEATURE_COUNT};
use rand::Rng;

pub use neural::NeuralLogic;
pub use tabular::TabularLogic;
pub use reward::{compute_reward, RewardContext};

/// Feature slots.
pub mod feature {
    pub const HEALTH: usize = 0;
    pub const ENERGY: usize = 1;
    pub const FOOD: usize = 2;
    pub const MATE: usize = 3;
    pub const PREDATOR: usize = 4;
    pub const ALLIES: usize = 5;
    pub const RIVALS: usize = 6;
    pub const OBSTACLE: usize = 7;
    pub const AGE: usize = 8;
    pub const AGGRESSIVENESS: usize = 9;
    pub const CURIOSITY: usize = 10;
}

/// Normalized policy input, every slot in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features(pub [f32; FEATURE_COUNT]);

#[inline]
fn unit(v: f64) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

#[inline]
fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Features {
    pub fn from_agent(agent: &Agent, cond: &Conditions) -> Self {
        let mut v = [0.0; FEATURE_COUNT];
        v[feature::HEALTH] = unit(agent.health / 100.0);
        v[feature::ENERGY] = unit(agent.energy / 100.0);
        v[feature::FOOD] = flag(cond.food_nearby);
        v[feature::MATE] = flag(cond.mate_nearby);
        v[feature::PREDATOR] = flag(cond.predator_nearby);
        v[feature::ALLIES] = flag(cond.allies_nearby);
        v[feature::RIVALS] = flag(cond.rivals_nearby);
        v[feature::OBSTACLE] = flag(cond.obstacle_nearby);
        v[feature::AGE] = unit(agent.age as f64 / agent.lifespan.max(1) as f64);
        v[feature::AGGRESSIVENESS] = unit(f64::from(agent.genome.aggressiveness));
        v[feature::CURIOSITY] = unit(f64::from(agent.genome.curiosity));
        Self(v)
    }

    /// Coarse key for the tabular policy: ten buckets each for health and
    /// energy plus the five social/resource flags.
    pub fn state_key(&self) -> StateKey {
        let bucket = |v: f32| (v * 10.0).floor().clamp(0.0, 9.0) as u8;
        let f = |i: usize| self.0[i] > 0.5;
        StateKey::new(
            bucket(self.0[feature::HEALTH]),
            bucket(self.0[feature::ENERGY]),
            [
                f(feature::FOOD),
                f(feature::MATE),
                f(feature::PREDATOR),
                f(feature::ALLIES),
                f(feature::RIVALS),
            ],
        )
    }
}

/// Output of one decision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Present only for a neural policy in continuous-control mode.
    pub motion: Option<MotionParams>,
}

pub trait DecisionPolicy {
    /// Chooses an action and remembers it for the next [`feedback`](Self::feedback).
    fn decide<R: Rng>(&mut self, features: &Features, rng: &mut R) -> Decision;
    /// Credits `reward` to the last decided action. `next` is the state the
    /// action led to. A no-op when nothing was decided yet.
    fn feedback(&mut self, reward: f32, next: &Features);
    /// Reward outside the decide/feedback cycle (eating). Does not consume
    /// the pending action.
    fn reinforce(&mut self, reward: f32, features: &Features);
}

impl DecisionPolicy for Policy {
    fn decide<R: Rng>(&mut self, features: &Features, rng: &mut R) -> Decision {
        match self {
            Policy::Tabular(t) => t.decide(features, rng),
            Policy::Neural(n) => n.decide(features, rng),
        }
    }

    fn feedback(&mut self, reward: f32, next: &Features) {
        match self {
            Policy::Tabular(t) => t.feedback(reward, next),
            Policy::Neural(n) => n.feedback(reward, next),
        }
    }

    fn reinforce(&mut self, reward: f32, features: &Features) {
        match self {
            Policy::Tabular(t) => t.reinforce(reward, features),
            Policy::Neural(n) => n.reinforce(reward, features),
        }
    }
}

/// A fresh controller of the configured kind.
pub fn new_policy<R: Rng>(config: &DecisionConfig, rng: &mut R) -> Policy {
    match config.policy {
        PolicyKind::Tabular => Policy::Tabular(QTable::new(
            config.epsilon,
            config.learning_rate,
            config.discount,
            config.reward_limit,
        )),
        PolicyKind::Neural => {
            let mut net = NeuralNet::new_random_with_rng(
                config.neural_learning_rate,
                config.continuous_control,
                config.neural_init_scale,
                rng,
            );
            net.epsilon = config.epsilon;
            Policy::Neural(net)
        }
    }
}

/// Offspring controller. Two neural parents pass on recombined, mutated
/// weights; anything else yields a fresh policy of the configured kind.
pub fn inherit_policy<R: Rng>(a: &Policy, b: &Policy, config: &AppConfig, rng: &mut R) -> Policy {
    match (a, b, config.decision.policy) {
        (Policy::Neural(na), Policy::Neural(nb), PolicyKind::Neural)
            if na.is_well_formed() && nb.is_well_formed() =>
        {
            let mut child = na.crossover_with_rng(nb, rng);
            child.epsilon = config.decision.epsilon;
            child.mutate_with_config(&config.evolution, rng);
            Policy::Neural(child)
        }
        _ => new_policy(&config.decision, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle;
    use ecosim_data::{Genome, Position};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_features_are_normalized() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut agent = lifecycle::create_agent(
            1,
            Position::new(0.0, 0.0),
            Genome::default(),
            80.0,
            0,
            &AppConfig::default(),
            &mut rng,
        );
        agent.age = agent.lifespan * 3;
        let cond = Conditions {
            food_nearby: true,
            predator_nearby: true,
            ..Conditions::neutral()
        };
        let f = Features::from_agent(&agent, &cond);
        assert!(f.0.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(f.0[feature::ENERGY], 0.8);
        assert_eq!(f.0[feature::AGE], 1.0);
        assert_eq!(f.0[feature::FOOD], 1.0);
        assert_eq!(f.0[feature::MATE], 0.0);
    }

    #[test]
    fn test_state_key_buckets() {
        let mut v = [0.0; FEATURE_COUNT];
        v[feature::HEALTH] = 1.0;
        v[feature::ENERGY] = 0.25;
        v[feature::PREDATOR] = 1.0;
        let key = Features(v).state_key();
        assert_eq!(key.health_bucket(), 9);
        assert_eq!(key.energy_bucket(), 2);
        assert!(key.flag(2));
        assert!(!key.flag(0));
    }

    #[test]
    fn test_new_policy_respects_kind() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut config = DecisionConfig::default();
        config.epsilon = 0.3;
        match new_policy(&config, &mut rng) {
            Policy::Neural(net) => assert_eq!(net.epsilon, 0.3),
            other => panic!("expected neural policy, got {other:?}"),
        }
        config.policy = PolicyKind::Tabular;
        assert!(matches!(new_policy(&config, &mut rng), Policy::Tabular(_)));
    }
}
