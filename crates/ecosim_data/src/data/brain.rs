use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Length of the normalized feature vector fed to every policy.
pub const FEATURE_COUNT: usize = 11;
/// Number of learnable discrete actions.
pub const ACTION_COUNT: usize = 4;
/// Continuous movement parameters: heading, speed, wander, noise, target weight.
pub const MOTION_OUTPUTS: usize = 5;
/// Hidden layer width of the neural policy.
pub const HIDDEN_SIZE: usize = 8;
/// Total network outputs: action logits followed by motion parameters.
pub const NET_OUTPUTS: usize = ACTION_COUNT + MOTION_OUTPUTS;

/// Learnable behaviour choices. Fleeing is a reflex, not a learned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Explore,
    SeekFood,
    SeekMate,
    Rest,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::Explore,
        Action::SeekFood,
        Action::SeekMate,
        Action::Rest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Action::Explore => 0,
            Action::SeekFood => 1,
            Action::SeekMate => 2,
            Action::Rest => 3,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        Self::ALL.get(idx).copied().unwrap_or(Action::Explore)
    }
}

/// Continuous steering parameters produced in continuous-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionParams {
    /// Heading offset in radians, `[-PI, PI]`.
    pub heading: f64,
    /// Fraction of max speed, `[0, 1]`.
    pub speed: f64,
    /// Weight of the persistent wander direction, `[0, 1]`.
    pub wander: f64,
    /// Weight of per-tick random noise, `[0, 1]`.
    pub noise: f64,
    /// Weight of the perceived target direction, `[0, 1]`.
    pub target_weight: f64,
}

/// Coarse discretized state of the tabular policy, packed into one integer:
/// health bucket, energy bucket and five perception flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub u32);

impl StateKey {
    pub fn new(health_bucket: u8, energy_bucket: u8, flags: [bool; 5]) -> Self {
        let mut packed = (u32::from(health_bucket.min(10)) << 8) | u32::from(energy_bucket.min(10));
        for (i, &flag) in flags.iter().enumerate() {
            if flag {
                packed |= 1 << (16 + i);
            }
        }
        Self(packed)
    }

    pub const fn health_bucket(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub const fn energy_bucket(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn flag(self, i: usize) -> bool {
        i < 5 && (self.0 >> (16 + i)) & 1 == 1
    }
}

/// Tabular Q-learning controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    pub values: HashMap<StateKey, [f32; ACTION_COUNT]>,
    pub epsilon: f32,
    pub learning_rate: f32,
    pub discount: f32,
    /// Bound applied to incoming rewards; keeps `|Q| <= reward_limit / (1 - discount)`.
    pub reward_limit: f32,
    #[serde(skip)]
    pub last: Option<(StateKey, Action)>,
}

impl QTable {
    pub fn new(epsilon: f32, learning_rate: f32, discount: f32, reward_limit: f32) -> Self {
        Self {
            values: HashMap::new(),
            epsilon,
            learning_rate,
            discount,
            reward_limit,
            last: None,
        }
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new(0.1, 0.1, 0.9, 5.0)
    }
}

/// Small two-layer feed-forward network (tanh hidden layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    /// Row-major `HIDDEN_SIZE x FEATURE_COUNT`.
    pub w1: Vec<f32>,
    pub b1: Vec<f32>,
    /// Row-major `NET_OUTPUTS x HIDDEN_SIZE`.
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
    pub learning_rate: f32,
    pub continuous: bool,
    /// Chance of taking a uniformly random action instead of the arg-max.
    #[serde(default)]
    pub epsilon: f32,
    #[serde(skip)]
    pub last_hidden: Option<[f32; HIDDEN_SIZE]>,
    #[serde(skip)]
    pub last_action: Option<Action>,
}

impl NeuralNet {
    /// A network with all weights zero. Mostly useful as a template.
    pub fn zeroed(learning_rate: f32, continuous: bool) -> Self {
        Self {
            w1: vec![0.0; HIDDEN_SIZE * FEATURE_COUNT],
            b1: vec![0.0; HIDDEN_SIZE],
            w2: vec![0.0; NET_OUTPUTS * HIDDEN_SIZE],
            b2: vec![0.0; NET_OUTPUTS],
            learning_rate,
            continuous,
            epsilon: 0.0,
            last_hidden: None,
            last_action: None,
        }
    }

    /// True when every weight buffer has the expected length.
    pub fn is_well_formed(&self) -> bool {
        self.w1.len() == HIDDEN_SIZE * FEATURE_COUNT
            && self.b1.len() == HIDDEN_SIZE
            && self.w2.len() == NET_OUTPUTS * HIDDEN_SIZE
            && self.b2.len() == NET_OUTPUTS
    }
}

/// The controller an agent was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Tabular(QTable),
    Neural(NeuralNet),
}
