use super::{Surroundings, World};
use crate::brain::{compute_reward, DecisionPolicy, Features, RewardContext};
use crate::history::LiveEvent;
use crate::lifecycle::{self, AgentLogic};
use crate::movement;
use crate::pathogen::ContagionContext;
use crate::perception::{self, PerceptionContext};
use crate::relationships::RelationshipLogic;
use crate::reproduction::ReproductionContext;
use crate::snapshot::AgentSnapshot;
use ecosim_data::{Agent, BehaviorState, Conditions};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// Bond strength added when two agents converge on the same food item.
pub const COMPETITION_BOND: f32 = 0.1;

/// Disjoint mutable borrows of two slice elements.
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i >= items.len() || j >= items.len() {
        return None;
    }
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        Some((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(i);
        Some((&mut hi[0], &mut lo[j]))
    }
}

impl World {
    /// Advances the simulation by one tick.
    ///
    /// Phases run to completion in order:
    /// - index refresh and perception against a start-of-tick snapshot
    /// - reward feedback, decision and movement, then one repair pass
    /// - resource decay, eating and death checks
    /// - reproduction
    /// - contagion
    /// - deferred removal of the dead, offspring insertion, bookkeeping
    ///
    /// # Returns
    /// Live events (births, deaths, disease activity, snapshots) of this tick.
    pub fn tick(&mut self, env: &mut Surroundings, dt: f64) -> Vec<LiveEvent> {
        let started = Instant::now();
        self.tick += 1;
        let had_agents = !self.agents.is_empty();

        self.refresh_index();
        let conditions = self.pass_perception(env);
        self.pass_food_competition(&conditions);
        self.pass_decide_and_move(env, &conditions, dt);
        let eaten = self.pass_lifecycle(env, &conditions, dt);
        let offspring = self.pass_reproduction(&conditions);

        let mut events = {
            let mut ctx = ContagionContext {
                agents: &mut self.agents,
                lookup: &self.lookup,
                index: &mut self.spatial_hash,
                tick: self.tick,
                config: &self.config.contagion,
                rng: &mut self.rng,
            };
            self.diseases.update(&mut ctx)
        };

        remove_eaten(&mut env.food, &eaten);
        self.finalize_tick(&mut events, offspring, had_agents, started.elapsed());
        events
    }

    /// Perceives for every agent in parallel. Peers are read from a snapshot
    /// taken before anyone acts.
    fn pass_perception(&mut self, env: &Surroundings) -> Vec<Conditions> {
        let cell = self.config.world.cell_size;
        let (w, h) = (self.width, self.height);
        let food_index =
            perception::index_positions(env.food.iter().map(|f| f.position), cell, w, h);
        let predator_index =
            perception::index_positions(env.predators.iter().map(|p| p.position), cell, w, h);
        let snapshots: Vec<AgentSnapshot> = self.agents.iter().map(AgentSnapshot::from).collect();

        let ctx = PerceptionContext {
            config: &self.config.perception,
            food: &env.food,
            food_index: &food_index,
            predators: &env.predators,
            predator_index: &predator_index,
            obstacles: &env.obstacles,
            peers: &snapshots,
            peer_lookup: &self.lookup,
            peer_index: &self.spatial_hash,
        };
        let conditions: Vec<Conditions> = self
            .agents
            .par_iter()
            .map(|agent| perception::analyze(agent, &ctx))
            .collect();

        let cooldown = self.config.perception.mate_detection_cooldown;
        for (agent, cond) in self.agents.iter_mut().zip(&conditions) {
            if let Some(mate) = cond.nearest_mate {
                if agent.mate_lock != Some(mate.id) {
                    agent.mate_lock = Some(mate.id);
                    agent.mate_cooldown = cooldown;
                }
            }
        }
        conditions
    }

    /// Agents converging on the same food item become rivals when their
    /// mean aggressiveness is high, or allies when their mean sociability is.
    fn pass_food_competition(&mut self, conditions: &[Conditions]) {
        let mut by_food: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (i, cond) in conditions.iter().enumerate() {
            if let Some(food) = cond.nearest_food {
                by_food.entry(food.id).or_default().push(i);
            }
        }
        let tick = self.tick;
        for group in by_food.values().filter(|g| g.len() > 1) {
            let pairs = group
                .iter()
                .enumerate()
                .flat_map(|(n, &i)| group[n + 1..].iter().map(move |&j| (i, j)));
            for (i, j) in pairs {
                let Some((a, b)) = pair_mut(&mut self.agents, i, j) else {
                    continue;
                };
                let aggression = (a.genome.aggressiveness + b.genome.aggressiveness) * 0.5;
                let sociability = (a.genome.sociability + b.genome.sociability) * 0.5;
                if aggression > 0.5 {
                    a.relationships.add_rival(b.id, COMPETITION_BOND, tick);
                    b.relationships.add_rival(a.id, COMPETITION_BOND, tick);
                } else if sociability > 0.5 {
                    a.relationships.add_ally(b.id, COMPETITION_BOND, tick);
                    b.relationships.add_ally(a.id, COMPETITION_BOND, tick);
                }
            }
        }
    }

    fn pass_decide_and_move(&mut self, env: &Surroundings, conditions: &[Conditions], dt: f64) {
        let tick = self.tick;
        let config = &self.config;
        let (w, h) = (f64::from(self.width), f64::from(self.height));

        for (agent, cond) in self.agents.iter_mut().zip(conditions) {
            if !agent.is_alive() {
                continue;
            }
            let features = Features::from_agent(agent, cond);
            if let Some(action) = agent.last_action {
                let reward = compute_reward(&RewardContext {
                    action,
                    health: agent.health,
                    energy: agent.energy,
                    conditions: cond,
                    starving: lifecycle::is_starving(agent, tick, &config.lifecycle),
                    mate_threshold: config.perception.mate_energy_threshold,
                    config: &config.decision,
                });
                agent.policy.feedback(reward, &features);
            }

            let decision = agent.policy.decide(&features, &mut self.rng);
            agent.last_action = Some(decision.action);
            agent.last_features = Some(features.0);
            agent.state = if cond.predator_nearby {
                BehaviorState::Fleeing
            } else {
                BehaviorState::from_action(decision.action)
            };

            movement::steer(agent, cond, decision.motion.as_ref(), &mut self.rng);
            movement::integrate(agent, dt, &env.obstacles, w, h);
        }

        for agent in &mut self.agents {
            if movement::sanitize(agent, w, h) {
                tracing::warn!(agent = agent.id, tick, "Repaired invalid agent state");
                self.metrics.increment_counter("repairs");
            }
            self.spatial_hash.update(agent.id, agent.position);
        }
    }

    /// Applies resource decay, lets foragers eat and marks the dead. Returns
    /// the slice indices of eaten food.
    fn pass_lifecycle(
        &mut self,
        env: &Surroundings,
        conditions: &[Conditions],
        dt: f64,
    ) -> BTreeSet<usize> {
        let tick = self.tick;
        let config = &self.config.lifecycle;
        let food_by_id: HashMap<u64, usize> = env
            .food
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect();
        let mut eaten = BTreeSet::new();

        for (agent, cond) in self.agents.iter_mut().zip(conditions) {
            if agent.is_dead() {
                continue;
            }
            lifecycle::apply_resource_tick(agent, dt, tick, config);
            if agent.state == BehaviorState::SeekingFood {
                let target = cond
                    .nearest_food
                    .and_then(|t| food_by_id.get(&t.id).copied())
                    .filter(|i| !eaten.contains(i));
                if let Some(i) = target {
                    if agent.eat(&env.food[i], tick, config) {
                        eaten.insert(i);
                    }
                }
            }
            if let Some(cause) = lifecycle::check_death(agent, config, &mut self.rng) {
                lifecycle::kill(agent, cause);
            }
            lifecycle::decrement_cooldowns(agent);
        }
        eaten
    }

    /// Mate seekers in contact with their perceived mate try to conceive.
    fn pass_reproduction(&mut self, conditions: &[Conditions]) -> Vec<Agent> {
        let mut offspring = Vec::new();
        let contact = self.config.reproduction.contact_range;
        for (i, cond) in conditions.iter().enumerate() {
            let Some(mate) = cond.nearest_mate else {
                continue;
            };
            let Some(&j) = self.lookup.get(&mate.id) else {
                continue;
            };
            let Some((a, b)) = pair_mut(&mut self.agents, i, j) else {
                continue;
            };
            if a.state != BehaviorState::SeekingMate {
                continue;
            }
            let reach = a.size + b.size + contact;
            if a.position.distance_sq(&b.position) > reach * reach {
                continue;
            }
            let mut ctx = ReproductionContext {
                tick: self.tick,
                config: &self.config,
                rng: &mut self.rng,
                next_id: &mut self.next_id,
            };
            if let Some(child) = a.reproduce(b, &mut ctx) {
                offspring.push(child);
            }
        }
        offspring
    }
}

fn remove_eaten<T>(items: &mut Vec<T>, eaten: &BTreeSet<usize>) {
    if eaten.is_empty() {
        return;
    }
    let mut idx = 0;
    items.retain(|_| {
        let keep = !eaten.contains(&idx);
        idx += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use ecosim_data::{Food, Position, Predator};

    fn world(seed: u64) -> World {
        let mut config = AppConfig::default();
        config.world.seed = Some(seed);
        config.contagion.emergence_chance = 0.0;
        World::new(config).expect("valid config")
    }

    #[test]
    fn test_pair_mut_rejects_aliasing() {
        let mut v = vec![1, 2, 3];
        assert!(pair_mut(&mut v, 1, 1).is_none());
        assert!(pair_mut(&mut v, 0, 3).is_none());
        let (a, b) = pair_mut(&mut v, 2, 0).expect("distinct");
        std::mem::swap(a, b);
        assert_eq!(v, vec![3, 2, 1]);
    }

    #[test]
    fn test_remove_eaten_by_index() {
        let mut v = vec!['a', 'b', 'c', 'd'];
        remove_eaten(&mut v, &BTreeSet::from([1, 3]));
        assert_eq!(v, vec!['a', 'c']);
    }

    fn foragers(w: &mut World, n: usize, aggressiveness: f32, sociability: f32) -> Vec<u64> {
        (0..n)
            .map(|k| {
                let id = w.spawn_agent(Position::new(10.0 + k as f64, 10.0), None, 50.0);
                if let Some(a) = w.agent_mut(id) {
                    a.genome.aggressiveness = aggressiveness;
                    a.genome.sociability = sociability;
                }
                id
            })
            .collect()
    }

    fn same_target(n: usize) -> Vec<Conditions> {
        let target = ecosim_data::Target {
            id: 3,
            position: Position::new(20.0, 10.0),
            distance: 5.0,
        };
        (0..n)
            .map(|_| Conditions {
                nearest_food: Some(target),
                food_nearby: true,
                ..Conditions::neutral()
            })
            .collect()
    }

    #[test]
    fn test_food_competition_bonds_every_pair() {
        let mut w = world(5);
        let ids = foragers(&mut w, 4, 0.9, 0.1);
        w.pass_food_competition(&same_target(ids.len()));
        for &a in &ids {
            let agent = w.agent(a).expect("spawned");
            for &b in ids.iter().filter(|&&b| b != a) {
                assert!(agent.relationships.is_rival(b), "{a} and {b} never bonded");
            }
            assert!(agent.relationships.allies.is_empty());
        }
    }

    #[test]
    fn test_sociable_competitors_become_allies() {
        let mut w = world(6);
        let ids = foragers(&mut w, 3, 0.1, 0.9);
        w.pass_food_competition(&same_target(ids.len()));
        let first = w.agent(ids[0]).expect("spawned");
        assert!(first.relationships.is_ally(ids[1]));
        assert!(first.relationships.is_ally(ids[2]));
        assert!(first.relationships.rivals.is_empty());
    }

    #[test]
    fn test_distinct_targets_do_not_bond() {
        let mut w = world(7);
        let ids = foragers(&mut w, 2, 0.9, 0.9);
        let mut conditions = same_target(2);
        if let Some(t) = conditions[1].nearest_food.as_mut() {
            t.id = 4;
        }
        w.pass_food_competition(&conditions);
        let agent = w.agent(ids[0]).expect("spawned");
        assert!(agent.relationships.rivals.is_empty());
        assert!(agent.relationships.allies.is_empty());
    }

    #[test]
    fn test_predator_forces_flee() {
        let mut w = world(1);
        let id = w.spawn_agent(Position::new(100.0, 100.0), None, 60.0);
        let mut env = Surroundings {
            predators: vec![Predator::new(1, 105.0, 100.0, 4.0)],
            ..Default::default()
        };
        w.tick(&mut env, 1.0);
        let agent = w.agent(id).expect("alive");
        assert_eq!(agent.state, BehaviorState::Fleeing);
        assert!(agent.position.x <= 100.0);
    }

    #[test]
    fn test_forager_eats_adjacent_food() {
        let mut config = AppConfig::default();
        config.world.seed = Some(2);
        config.contagion.emergence_chance = 0.0;
        config.decision.policy = crate::config::PolicyKind::Tabular;
        config.decision.epsilon = 1.0;
        let mut w = World::new(config).expect("valid config");
        let id = w.spawn_agent(Position::new(50.0, 50.0), None, 20.0);
        let mut env = Surroundings {
            food: vec![Food::new(7, 50.5, 50.0, 30.0)],
            ..Default::default()
        };
        for _ in 0..200 {
            if env.food.is_empty() {
                break;
            }
            if let Some(a) = w.agent_mut(id) {
                a.position = Position::new(50.0, 50.0);
            }
            w.tick(&mut env, 1.0);
        }
        assert!(env.food.is_empty(), "food never eaten");
        assert!(w.agent(id).is_some_and(|a| a.last_meal_tick > 0));
    }

    #[test]
    fn test_dead_agents_removed_at_end_of_tick() {
        let mut w = world(3);
        let id = w.spawn_agent(Position::new(10.0, 10.0), None, 50.0);
        if let Some(a) = w.agent_mut(id) {
            a.health = 0.0;
        }
        let events = w.tick(&mut Surroundings::default(), 1.0);
        assert!(w.agent(id).is_none());
        assert!(!w.spatial_hash.contains(id));
        assert!(events
            .iter()
            .any(|e| matches!(e, LiveEvent::Death { id: dead, .. } if *dead == id)));
        assert!(events
            .iter()
            .any(|e| matches!(e, LiveEvent::Extinction { .. })));
    }

    #[test]
    fn test_resources_stay_bounded() {
        let mut w = world(4);
        w.populate(40);
        let mut env = Surroundings::default();
        let mut food_id = 0;
        for _ in 0..100 {
            w.scatter_food(&mut env, 5, &mut food_id);
            w.tick(&mut env, 1.0);
            for a in &w.agents {
                assert!((0.0..=100.0).contains(&a.health));
                assert!((0.0..=100.0).contains(&a.energy));
                assert!(a.age <= a.lifespan);
            }
        }
        assert!(w.spatial_hash.is_consistent());
    }
}
