use super::{Decision, DecisionPolicy, Features};
use ecosim_data::{Action, QTable, StateKey, ACTION_COUNT};
use rand::Rng;

fn best_action(values: &[f32; ACTION_COUNT]) -> Action {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    Action::from_index(best)
}

pub trait TabularLogic {
    /// Values for `key`, zero when unseen.
    fn q_values(&self, key: StateKey) -> [f32; ACTION_COUNT];
    /// Largest absolute value the table can reach for its reward limit.
    fn value_bound(&self) -> f32;
}

impl TabularLogic for QTable {
    fn q_values(&self, key: StateKey) -> [f32; ACTION_COUNT] {
        self.values.get(&key).copied().unwrap_or([0.0; ACTION_COUNT])
    }

    fn value_bound(&self) -> f32 {
        self.reward_limit.abs() / (1.0 - self.discount.clamp(0.0, 0.999))
    }
}

/// `Q[s,a] += lr * (r + discount * max Q[s'] - Q[s,a])` with `r` clamped to
/// the table's reward limit. Non-finite rewards count as zero.
fn bellman(table: &mut QTable, state: StateKey, action: Action, reward: f32, next: StateKey) {
    let limit = table.reward_limit.abs();
    let r = if reward.is_finite() {
        reward.clamp(-limit, limit)
    } else {
        0.0
    };
    let max_next = table
        .q_values(next)
        .into_iter()
        .fold(f32::NEG_INFINITY, f32::max);
    let lr = table.learning_rate.clamp(0.0, 1.0);
    let discount = table.discount.clamp(0.0, 0.999);
    let row = table.values.entry(state).or_insert([0.0; ACTION_COUNT]);
    let q = &mut row[action.index()];
    *q += lr * (r + discount * max_next - *q);
    if !q.is_finite() {
        *q = 0.0;
    }
}

impl DecisionPolicy for QTable {
    /// Epsilon-greedy over the row for the current state. Unknown states are
    /// initialized to zero.
    fn decide<R: Rng>(&mut self, features: &Features, rng: &mut R) -> Decision {
        let key = features.state_key();
        let values = *self.values.entry(key).or_insert([0.0; ACTION_COUNT]);
        let action = if rng.gen::<f32>() < self.epsilon {
            Action::from_index(rng.gen_range(0..ACTION_COUNT))
        } else {
            best_action(&values)
        };
        self.last = Some((key, action));
        Decision {
            action,
            motion: None,
        }
    }

    fn feedback(&mut self, reward: f32, next: &Features) {
        if let Some((state, action)) = self.last.take() {
            bellman(self, state, action, reward, next.state_key());
        }
    }

    fn reinforce(&mut self, reward: f32, features: &Features) {
        if let Some((state, action)) = self.last {
            bellman(self, state, action, reward, features.state_key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::feature;
    use ecosim_data::FEATURE_COUNT;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hungry_with_food() -> Features {
        let mut v = [0.0; FEATURE_COUNT];
        v[feature::HEALTH] = 0.8;
        v[feature::ENERGY] = 0.2;
        v[feature::FOOD] = 1.0;
        Features(v)
    }

    #[test]
    fn test_unknown_state_initialized_to_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut table = QTable::new(0.0, 0.1, 0.9, 5.0);
        let f = hungry_with_food();
        let d = table.decide(&f, &mut rng);
        assert_eq!(d.action, Action::Explore);
        assert_eq!(table.q_values(f.state_key()), [0.0; ACTION_COUNT]);
    }

    #[test]
    fn test_bellman_update() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut table = QTable::new(0.0, 0.1, 0.9, 5.0);
        let f = hungry_with_food();
        table.decide(&f, &mut rng);
        table.feedback(1.0, &f);
        let q = table.q_values(f.state_key())[Action::Explore.index()];
        assert!((q - 0.1).abs() < 1e-6);
        // Greedy choice follows the learned value.
        assert_eq!(table.decide(&f, &mut rng).action, Action::Explore);
    }

    #[test]
    fn test_zero_reward_never_diverges() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut table = QTable::new(0.5, 0.1, 0.9, 5.0);
        let f = hungry_with_food();
        for _ in 0..10_000 {
            table.decide(&f, &mut rng);
            table.feedback(0.0, &f);
        }
        assert!(table.values.values().flatten().all(|q| *q == 0.0));
    }

    #[test]
    fn test_values_stay_bounded_under_extreme_rewards() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut table = QTable::new(0.3, 1.0, 0.9, 5.0);
        let f = hungry_with_food();
        let bound = table.value_bound() + 1e-3;
        for i in 0..5_000 {
            table.decide(&f, &mut rng);
            let r = if i % 2 == 0 { 1e9 } else { f32::NAN };
            table.feedback(r, &f);
        }
        assert!(table.values.values().flatten().all(|q| q.abs() <= bound));
    }

    #[test]
    fn test_feedback_without_decision_is_noop() {
        let mut table = QTable::default();
        table.feedback(3.0, &hungry_with_food());
        assert!(table.values.is_empty());
    }
}
