use super::World;
use crate::history::{timestamp, LiveEvent, PopulationStats};
use crate::relationships::RelationshipLogic;
use ecosim_data::Agent;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

impl World {
    /// End-of-tick bookkeeping. Removal of the dead is deferred to here so no
    /// earlier phase iterates over a shrinking collection.
    pub(crate) fn finalize_tick(
        &mut self,
        events: &mut Vec<LiveEvent>,
        offspring: Vec<Agent>,
        had_agents: bool,
        elapsed: Duration,
    ) {
        let tick = self.tick;
        let deaths = self.process_deaths(events);
        let births = self.process_births(offspring, events);
        self.rebuild_lookup();
        self.finalize_relationships();

        let stats = self.compute_stats(births, deaths);
        if tick % self.config.world.summary_interval.max(1) == 0 {
            events.push(LiveEvent::Snapshot {
                tick,
                stats: stats.clone(),
                timestamp: timestamp(),
            });
        }
        if had_agents && self.agents.is_empty() && !self.extinct {
            self.extinct = true;
            tracing::warn!(tick, "Population extinct");
            events.push(LiveEvent::Extinction {
                tick,
                timestamp: timestamp(),
            });
        }
        self.metrics
            .record_tick(elapsed, stats.population, stats.infected);
        self.pop_stats = stats;
    }

    fn process_deaths(&mut self, events: &mut Vec<LiveEvent>) -> BTreeMap<String, usize> {
        let tick = self.tick;
        let mut by_cause: BTreeMap<String, usize> = BTreeMap::new();
        for agent in self.agents.iter().filter(|a| !a.is_alive()) {
            let cause = agent.death.map_or("unknown", |c| c.label());
            *by_cause.entry(cause.to_string()).or_default() += 1;
            self.spatial_hash.remove(agent.id);
            self.metrics.increment_counter("deaths");
            tracing::debug!(
                id = agent.id,
                age = agent.age,
                cause,
                offspring = agent.offspring_count,
                "Agent died"
            );
            events.push(LiveEvent::Death {
                id: agent.id,
                age: agent.age,
                offspring: agent.offspring_count,
                tick,
                timestamp: timestamp(),
                cause: cause.to_string(),
            });
        }
        self.agents.retain(Agent::is_alive);
        by_cause
    }

    fn process_births(&mut self, offspring: Vec<Agent>, events: &mut Vec<LiveEvent>) -> usize {
        let tick = self.tick;
        let count = offspring.len();
        for child in offspring {
            if let Some(parents) = child.parent_ids {
                events.push(LiveEvent::Birth {
                    id: child.id,
                    parents,
                    gen: child.generation,
                    tick,
                    timestamp: timestamp(),
                });
            }
            self.metrics.increment_counter("births");
            self.spatial_hash.insert(child.id, child.position);
            self.agents.push(child);
        }
        count
    }

    /// Decays every bond and forgets peers that no longer exist.
    fn finalize_relationships(&mut self) {
        let tick = self.tick;
        let decay = self.config.world.relationship_decay;
        let memory = self.config.world.relationship_memory;
        let living: HashSet<u64> = self.agents.iter().map(|a| a.id).collect();
        for agent in &mut self.agents {
            agent.relationships.decay(decay, memory, tick);
            agent.relationships.retain_peers(|id| living.contains(&id));
        }
    }

    fn compute_stats(&self, births: usize, deaths: BTreeMap<String, usize>) -> PopulationStats {
        let population = self.agents.len();
        let n = population.max(1) as f64;
        let sum = |f: fn(&Agent) -> f64| self.agents.iter().map(f).sum::<f64>() / n;
        PopulationStats {
            population,
            mean_health: sum(|a| a.health),
            mean_energy: sum(|a| a.energy),
            mean_age: sum(|a| a.age as f64),
            max_generation: self.agents.iter().map(|a| a.generation).max().unwrap_or(0),
            births,
            deaths,
            infected: self.agents.iter().filter(|a| a.is_infected()).count(),
            active_diseases: self.diseases.active.len(),
        }
    }
}
