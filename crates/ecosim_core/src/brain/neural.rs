use super::{Decision, DecisionPolicy, Features};
use crate::config::EvolutionConfig;
use ecosim_data::{
    Action, MotionParams, NeuralNet, ACTION_COUNT, FEATURE_COUNT, HIDDEN_SIZE, NET_OUTPUTS,
};
use rand::Rng;
use std::f64::consts::PI;

const WEIGHT_LIMIT: f32 = 5.0;
/// Rewards beyond this magnitude are treated as this magnitude.
const REWARD_LIMIT: f32 = 10.0;

pub trait NeuralLogic {
    fn new_random_with_rng<R: Rng>(
        learning_rate: f32,
        continuous: bool,
        scale: f32,
        rng: &mut R,
    ) -> Self;
    /// Returns the hidden activations and the raw output layer.
    fn forward(&self, features: &Features) -> ([f32; HIDDEN_SIZE], [f32; NET_OUTPUTS]);
    /// Raw logit for `action`, the quantity training pushes up or down.
    fn propensity(&self, features: &Features, action: Action) -> f32;
    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;
    fn mutate_with_config<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R);
}

#[inline]
fn sigmoid(x: f32) -> f64 {
    1.0 / (1.0 + (-f64::from(x)).exp())
}

fn motion_from_outputs(out: &[f32; NET_OUTPUTS]) -> MotionParams {
    let m = &out[ACTION_COUNT..];
    MotionParams {
        heading: f64::from(m[0].tanh()) * PI,
        speed: sigmoid(m[1]),
        wander: sigmoid(m[2]),
        noise: sigmoid(m[3]),
        target_weight: sigmoid(m[4]),
    }
}

fn sanitize(weights: &mut [f32]) {
    for w in weights {
        *w = if w.is_finite() {
            w.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT)
        } else {
            0.0
        };
    }
}

impl NeuralLogic for NeuralNet {
    fn new_random_with_rng<R: Rng>(
        learning_rate: f32,
        continuous: bool,
        scale: f32,
        rng: &mut R,
    ) -> Self {
        let mut net = NeuralNet::zeroed(learning_rate, continuous);
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.min(WEIGHT_LIMIT)
        } else {
            0.5
        };
        for w in net
            .w1
            .iter_mut()
            .chain(net.b1.iter_mut())
            .chain(net.w2.iter_mut())
            .chain(net.b2.iter_mut())
        {
            *w = rng.gen_range(-scale..=scale);
        }
        net
    }

    fn forward(&self, features: &Features) -> ([f32; HIDDEN_SIZE], [f32; NET_OUTPUTS]) {
        let mut hidden = [0.0; HIDDEN_SIZE];
        let mut out = [0.0; NET_OUTPUTS];
        if !self.is_well_formed() {
            return (hidden, out);
        }
        for (h, slot) in hidden.iter_mut().enumerate() {
            let row = &self.w1[h * FEATURE_COUNT..(h + 1) * FEATURE_COUNT];
            let sum: f32 = row.iter().zip(features.0.iter()).map(|(w, x)| w * x).sum();
            *slot = (sum + self.b1[h]).tanh();
        }
        for (o, slot) in out.iter_mut().enumerate() {
            let row = &self.w2[o * HIDDEN_SIZE..(o + 1) * HIDDEN_SIZE];
            let sum: f32 = row.iter().zip(hidden.iter()).map(|(w, h)| w * h).sum();
            *slot = sum + self.b2[o];
        }
        (hidden, out)
    }

    fn propensity(&self, features: &Features, action: Action) -> f32 {
        self.forward(features).1[action.index()]
    }

    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let mut child = NeuralNet::zeroed(self.learning_rate, self.continuous);
        child.epsilon = self.epsilon;
        let pairs = [
            (&mut child.w1, &self.w1, &other.w1),
            (&mut child.b1, &self.b1, &other.b1),
            (&mut child.w2, &self.w2, &other.w2),
            (&mut child.b2, &self.b2, &other.b2),
        ];
        for (dst, a, b) in pairs {
            for (i, w) in dst.iter_mut().enumerate() {
                let (x, y) = (
                    a.get(i).copied().unwrap_or(0.0),
                    b.get(i).copied().unwrap_or(0.0),
                );
                *w = if rng.gen_bool(0.5) { x } else { y };
            }
        }
        child
    }

    fn mutate_with_config<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        let chance = f64::from(config.mutation_probability_cap.clamp(0.0, 1.0));
        let amount = config.mutation_amount.max(0.0);
        if amount > 0.0 {
            for w in self
                .w1
                .iter_mut()
                .chain(self.b1.iter_mut())
                .chain(self.w2.iter_mut())
                .chain(self.b2.iter_mut())
            {
                if rng.gen_bool(chance) {
                    *w += rng.gen_range(-amount..=amount);
                }
            }
        }
        sanitize(&mut self.w1);
        sanitize(&mut self.b1);
        sanitize(&mut self.w2);
        sanitize(&mut self.b2);
    }
}

/// Moves `w` by `delta`, clamped to the weight limit without ever moving
/// against `delta`.
#[inline]
fn nudge(w: f32, delta: f32) -> f32 {
    (w + delta).clamp(w.min(-WEIGHT_LIMIT), w.max(WEIGHT_LIMIT))
}

/// Nudges the taken action's output row by `lr * reward * hidden`.
///
/// Every weight moves so that its contribution to the logit changes with the
/// sign of `reward`, so the action's propensity for the same input never
/// moves against the reward.
fn train(net: &mut NeuralNet, action: Action, hidden: &[f32; HIDDEN_SIZE], reward: f32) {
    if !reward.is_finite() || !net.is_well_formed() {
        return;
    }
    let step = net.learning_rate.max(0.0) * reward.clamp(-REWARD_LIMIT, REWARD_LIMIT);
    if step == 0.0 {
        return;
    }
    let row = action.index();
    for (j, h) in hidden.iter().enumerate() {
        let w = &mut net.w2[row * HIDDEN_SIZE + j];
        *w = nudge(*w, step * h);
    }
    net.b2[row] = nudge(net.b2[row], step);
}

impl DecisionPolicy for NeuralNet {
    /// Arg-max over the action logits, first index on ties, or a random
    /// action with probability `epsilon`. In continuous mode the motion head
    /// is decoded as well.
    fn decide<R: Rng>(&mut self, features: &Features, rng: &mut R) -> Decision {
        let (hidden, out) = self.forward(features);
        let action = if self.epsilon > 0.0 && rng.gen::<f32>() < self.epsilon {
            Action::from_index(rng.gen_range(0..ACTION_COUNT))
        } else {
            let mut best = 0;
            for i in 1..ACTION_COUNT {
                if out[i] > out[best] {
                    best = i;
                }
            }
            Action::from_index(best)
        };
        self.last_hidden = Some(hidden);
        self.last_action = Some(action);
        Decision {
            action,
            motion: self.continuous.then(|| motion_from_outputs(&out)),
        }
    }

    fn feedback(&mut self, reward: f32, _next: &Features) {
        if let (Some(hidden), Some(action)) = (self.last_hidden.take(), self.last_action.take()) {
            train(self, action, &hidden, reward);
        }
    }

    fn reinforce(&mut self, reward: f32, _features: &Features) {
        if let (Some(hidden), Some(action)) = (self.last_hidden, self.last_action) {
            train(self, action, &hidden, reward);
        }
    }
}
