//! Agent construction, resource bookkeeping and death.

use crate::brain::{self, DecisionPolicy, Features};
use crate::config::{AppConfig, LifecycleConfig};
use crate::genome;
use crate::reproduction::{self, ReproductionContext};
use ecosim_data::{
    Agent, AgentId, BehaviorState, DeathCause, Food, Genome, Position, Relationships, Sex,
};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

/// Operations callers perform on a single agent.
pub trait AgentLogic {
    fn is_dead(&self) -> bool;
    /// Consumes `food` when it is within reach. Returns whether it was eaten.
    fn eat(&mut self, food: &Food, tick: u64, config: &LifecycleConfig) -> bool;
    /// Attempts to conceive with `partner`. Neither agent changes on failure.
    fn reproduce<R: Rng>(
        &mut self,
        partner: &mut Agent,
        ctx: &mut ReproductionContext<'_, R>,
    ) -> Option<Agent>;
}

impl AgentLogic for Agent {
    #[inline]
    fn is_dead(&self) -> bool {
        !self.is_alive()
    }

    fn eat(&mut self, food: &Food, tick: u64, config: &LifecycleConfig) -> bool {
        if self.is_dead() || !food.nutrition.is_finite() || food.nutrition <= 0.0 {
            return false;
        }
        let reach = self.size + config.eat_range;
        if !food.position.is_finite() || self.position.distance_sq(&food.position) > reach * reach
        {
            return false;
        }
        self.health = (self.health + food.nutrition * config.eat_health_fraction).clamp(0.0, 100.0);
        self.energy = (self.energy + food.nutrition).clamp(0.0, 100.0);
        self.last_meal_tick = tick;
        if let Some(raw) = self.last_features {
            self.policy.reinforce(config.eat_reward, &Features(raw));
        }
        true
    }

    fn reproduce<R: Rng>(
        &mut self,
        partner: &mut Agent,
        ctx: &mut ReproductionContext<'_, R>,
    ) -> Option<Agent> {
        reproduction::reproduce(self, partner, ctx)
    }
}

/// Builds a living agent with phenotype derived from `genome`.
pub fn create_agent<R: Rng>(
    id: AgentId,
    position: Position,
    mut genome: Genome,
    initial_energy: f64,
    tick: u64,
    config: &AppConfig,
    rng: &mut R,
) -> Agent {
    genome.clamp_traits();
    let lc = &config.lifecycle;
    let energy = if initial_energy.is_finite() {
        initial_energy.clamp(0.0, 100.0)
    } else {
        0.0
    };
    Agent {
        id,
        parent_ids: None,
        generation: 0,
        position,
        vx: 0.0,
        vy: 0.0,
        wander_heading: rng.gen_range(0.0..TAU),
        size: genome::derive_size(&genome, lc),
        sex: if rng.gen_bool(0.5) {
            Sex::Female
        } else {
            Sex::Male
        },
        lifespan: genome::derive_lifespan(&genome),
        max_speed: genome::derive_max_speed(&genome, lc),
        perception_radius: genome::derive_perception_radius(&genome, lc),
        genome,
        health: 100.0,
        energy,
        age: 0,
        birth_tick: tick,
        state: BehaviorState::Exploring,
        policy: brain::new_policy(&config.decision, rng),
        last_action: None,
        last_features: None,
        infections: BTreeMap::new(),
        immunities: BTreeSet::new(),
        relationships: Relationships::default(),
        last_meal_tick: tick,
        mate_cooldown: 0,
        mate_lock: None,
        reproduction_cooldown: 0,
        can_reproduce: true,
        speed_multiplier: 1.0,
        offspring_count: 0,
        death: None,
    }
}

/// Energy cost per unit `dt` of the current state, before metabolism.
pub fn state_energy_cost(state: BehaviorState, config: &LifecycleConfig) -> f64 {
    match state {
        BehaviorState::Exploring => config.energy_cost_explore,
        BehaviorState::SeekingFood => config.energy_cost_seek_food,
        BehaviorState::SeekingMate => config.energy_cost_seek_mate,
        BehaviorState::Fleeing => config.energy_cost_flee,
        BehaviorState::Resting => config.energy_cost_rest,
    }
}

/// Ages the agent one tick and applies health and energy decay.
///
/// Fast metabolisms burn energy faster while active and recover it faster
/// while resting.
pub fn apply_resource_tick(agent: &mut Agent, dt: f64, tick: u64, config: &LifecycleConfig) {
    if agent.is_dead() {
        return;
    }
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    agent.age += 1;

    let metabolism = 0.5 + f64::from(agent.genome.metabolism);
    agent.health -= config.health_loss_rate * dt;
    agent.energy -= state_energy_cost(agent.state, config) * metabolism * dt;

    if is_starving(agent, tick, config) {
        agent.health -= config.starvation_damage * dt;
    }
    if agent.energy <= 0.0 {
        agent.health -= config.exhaustion_damage * dt;
    }
    agent.health = agent.health.clamp(0.0, 100.0);
    agent.energy = agent.energy.clamp(0.0, 100.0);
}

/// First matching death condition, in order: health depleted, old age,
/// disease. The disease check is a Bernoulli trial.
pub fn check_death<R: Rng>(
    agent: &Agent,
    config: &LifecycleConfig,
    rng: &mut R,
) -> Option<DeathCause> {
    if agent.health <= 0.0 {
        return Some(DeathCause::Starvation);
    }
    if agent.age >= agent.lifespan {
        return Some(DeathCause::OldAge);
    }
    if agent.is_infected() {
        let chance = disease_death_chance(agent, config);
        if chance > 0.0 && rng.gen_bool(chance) {
            return Some(DeathCause::Disease);
        }
    }
    None
}

pub fn disease_death_chance(agent: &Agent, config: &LifecycleConfig) -> f64 {
    let immunity = f64::from(agent.genome.immunity).clamp(0.0, 1.0);
    (config.disease_death_base
        * agent.infections.len() as f64
        * (1.0 - immunity * config.immunity_mortality_factor))
        .clamp(0.0, 1.0)
}

pub fn decrement_cooldowns(agent: &mut Agent) {
    agent.mate_cooldown = agent.mate_cooldown.saturating_sub(1);
    if agent.mate_cooldown == 0 {
        agent.mate_lock = None;
    }
    agent.reproduction_cooldown = agent.reproduction_cooldown.saturating_sub(1);
}

/// Ticks since the agent last ate exceed the starvation threshold.
pub fn is_starving(agent: &Agent, tick: u64, config: &LifecycleConfig) -> bool {
    tick.saturating_sub(agent.last_meal_tick) > config.starvation_threshold
}

/// Marks the agent dead. Already-dead agents keep their first cause.
pub fn kill(agent: &mut Agent, cause: DeathCause) {
    if agent.death.is_none() {
        agent.death = Some(cause);
        agent.last_features = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agent(rng: &mut ChaCha8Rng) -> Agent {
        create_agent(
            1,
            Position::new(10.0, 10.0),
            Genome::default(),
            50.0,
            0,
            &AppConfig::default(),
            rng,
        )
    }

    #[test]
    fn test_create_agent_defaults() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = agent(&mut rng);
        assert!(a.is_alive());
        assert_eq!(a.state, BehaviorState::Exploring);
        assert_eq!(a.health, 100.0);
        assert_eq!(a.energy, 50.0);
        assert_eq!(a.lifespan, genome::derive_lifespan(&a.genome));
        let over = create_agent(
            2,
            Position::new(0.0, 0.0),
            Genome::default(),
            f64::NAN,
            0,
            &AppConfig::default(),
            &mut rng,
        );
        assert_eq!(over.energy, 0.0);
    }

    #[test]
    fn test_resting_recovers_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = LifecycleConfig::default();
        let mut a = agent(&mut rng);
        a.state = BehaviorState::Resting;
        apply_resource_tick(&mut a, 1.0, 1, &config);
        assert!(a.energy > 50.0);
        a.state = BehaviorState::Fleeing;
        let before = a.energy;
        apply_resource_tick(&mut a, 1.0, 2, &config);
        assert!(a.energy < before);
        assert_eq!(a.age, 2);
    }

    #[test]
    fn test_starvation_damage_after_threshold() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = LifecycleConfig::default();
        let mut a = agent(&mut rng);
        a.state = BehaviorState::Resting;
        apply_resource_tick(&mut a, 1.0, config.starvation_threshold, &config);
        let fed_health = a.health;
        apply_resource_tick(&mut a, 1.0, config.starvation_threshold + 10, &config);
        let expected = fed_health - config.health_loss_rate - config.starvation_damage;
        assert!((a.health - expected).abs() < 1e-9);
    }

    #[test]
    fn test_death_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = LifecycleConfig::default();
        let mut a = agent(&mut rng);
        a.health = 0.0;
        a.age = a.lifespan;
        assert_eq!(check_death(&a, &config, &mut rng), Some(DeathCause::Starvation));
        a.health = 50.0;
        assert_eq!(check_death(&a, &config, &mut rng), Some(DeathCause::OldAge));
        a.age = 0;
        assert_eq!(check_death(&a, &config, &mut rng), None);
    }

    #[test]
    fn test_disease_death_chance_scales() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = LifecycleConfig::default();
        let mut a = agent(&mut rng);
        a.genome.immunity = 0.0;
        a.infections.insert("A".into(), 0);
        a.infections.insert("B".into(), 0);
        assert!((disease_death_chance(&a, &config) - 0.0002).abs() < 1e-12);
        a.genome.immunity = 1.0;
        assert!((disease_death_chance(&a, &config) - 0.0002 * 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_eat_within_reach() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let config = LifecycleConfig::default();
        let mut a = agent(&mut rng);
        a.health = 40.0;
        let far = Food::new(1, 100.0, 100.0, 30.0);
        assert!(!a.eat(&far, 5, &config));
        let near = Food::new(2, 11.0, 10.0, 30.0);
        assert!(a.eat(&near, 5, &config));
        assert_eq!(a.energy, 80.0);
        assert_eq!(a.health, 55.0);
        assert_eq!(a.last_meal_tick, 5);
        assert!(a.eat(&near, 6, &config));
        assert_eq!(a.energy, 100.0);
    }

    #[test]
    fn test_cooldowns_release_mate_lock() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut a = agent(&mut rng);
        a.mate_cooldown = 1;
        a.mate_lock = Some(9);
        decrement_cooldowns(&mut a);
        assert_eq!(a.mate_lock, None);
    }
}
