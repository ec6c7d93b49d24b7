//! Contagion model: disease emergence, physiological effects, recovery,
//! acquired immunity and proximity spread.
//!
//! The [`Disease`] infected map is authoritative; each agent's `infections`
//! map mirrors it and is only ever written from here.

use crate::config::ContagionConfig;
use crate::history::{timestamp, LiveEvent};
use crate::spatial_hash::SpatialHash;
use ecosim_data::{Agent, AgentId, Disease, DiseaseCategory, DiseaseRecord, Position};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::f64::consts::TAU;

const ADJECTIVES: [&str; 12] = [
    "Grey", "Crimson", "Hollow", "Creeping", "Pale", "Ashen", "Silent", "Bitter", "Marsh",
    "Withering", "Amber", "Restless",
];

fn category_noun(category: DiseaseCategory) -> &'static str {
    match category {
        DiseaseCategory::Metabolic => "Wasting",
        DiseaseCategory::Motor => "Palsy",
        DiseaseCategory::Reproductive => "Blight",
        DiseaseCategory::Neural => "Fever",
        DiseaseCategory::Degenerative => "Rot",
    }
}

/// Infection count of one active disease.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DiseaseBreakdown {
    pub name: String,
    pub category: DiseaseCategory,
    pub severity: f32,
    pub infected: usize,
    pub recovered: usize,
    pub peak_infected: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DiseaseStatistics {
    pub active_diseases: usize,
    /// Distinct agents carrying at least one disease.
    pub total_infected: usize,
    /// `total_infected / population`, zero for an empty population.
    pub infection_rate: f64,
    pub per_disease: Vec<DiseaseBreakdown>,
}

/// Mutable world view the contagion step works on.
pub struct ContagionContext<'a, R: Rng> {
    pub agents: &'a mut [Agent],
    /// Agent id -> index into `agents`.
    pub lookup: &'a HashMap<AgentId, usize>,
    /// Agent positions; kept in sync when an effect displaces an agent.
    pub index: &'a mut SpatialHash,
    pub tick: u64,
    pub config: &'a ContagionConfig,
    pub rng: &'a mut R,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DiseaseSystem {
    pub active: Vec<Disease>,
    history: Vec<DiseaseRecord>,
    used_names: HashSet<String>,
}

impl DiseaseSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retired diseases, oldest first.
    pub fn history(&self) -> &[DiseaseRecord] {
        &self.history
    }

    pub fn get(&self, name: &str) -> Option<&Disease> {
        self.active.iter().find(|d| d.name == name)
    }

    fn unique_name<R: Rng>(&mut self, category: DiseaseCategory, rng: &mut R) -> String {
        let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Grey");
        let base = format!("{} {}", adjective, category_noun(category));
        let mut name = base.clone();
        let mut n = 2;
        while self.used_names.contains(&name) {
            name = format!("{base} {n}");
            n += 1;
        }
        self.used_names.insert(name.clone());
        name
    }

    /// A new disease with randomized parameters drawn from the configured ranges.
    pub fn random_disease<R: Rng>(
        &mut self,
        config: &ContagionConfig,
        tick: u64,
        rng: &mut R,
    ) -> Disease {
        let category = *DiseaseCategory::ALL
            .choose(rng)
            .unwrap_or(&DiseaseCategory::Metabolic);
        let name = self.unique_name(category, rng);
        let duration =
            rng.gen_range(config.duration_min..=config.duration_max.max(config.duration_min));
        let contagion = rng.gen_range(
            config.contagion_min..=config.contagion_max.max(config.contagion_min),
        );
        Disease::new(
            name,
            category,
            rng.gen_range(0.1..=0.9),
            rng.gen_range(0.1..=1.0),
            duration,
            contagion,
            tick,
        )
    }

    /// Registers `disease` and infects `patient_zero`. Returns `None` (and
    /// registers nothing) when the patient is dead or immune.
    pub fn introduce(
        &mut self,
        mut disease: Disease,
        patient_zero: &mut Agent,
        tick: u64,
    ) -> Option<LiveEvent> {
        if !patient_zero.is_alive() || patient_zero.is_immune_to(&disease.name) {
            return None;
        }
        self.used_names.insert(disease.name.clone());
        infect(&mut disease, patient_zero);
        tracing::info!(
            disease = %disease.name,
            category = disease.category.label(),
            severity = disease.severity,
            duration = disease.duration,
            patient_zero = patient_zero.id,
            "Disease emerged"
        );
        let event = LiveEvent::DiseaseEmerged {
            name: disease.name.clone(),
            category: disease.category,
            patient_zero: patient_zero.id,
            tick,
            timestamp: timestamp(),
        };
        self.active.push(disease);
        Some(event)
    }

    /// Advances every disease one tick.
    pub fn update<R: Rng>(&mut self, ctx: &mut ContagionContext<'_, R>) -> Vec<LiveEvent> {
        let mut events = Vec::new();
        let mut touched: BTreeSet<AgentId> = BTreeSet::new();

        self.drop_stale(ctx, &mut touched);
        self.try_emerge(ctx, &mut events);

        for disease in &mut self.active {
            progress(disease, ctx, &mut events, &mut touched);
        }
        for disease in &mut self.active {
            spread(disease, ctx, &mut events, &mut touched);
        }

        for id in touched {
            if let Some(agent) = ctx.lookup.get(&id).and_then(|&i| ctx.agents.get_mut(i)) {
                refresh_effects(agent, &self.active, ctx.config);
            }
        }
        self.retire_empty(ctx.tick, &mut events);
        events
    }

    /// Silently forgets ids that no longer refer to a living agent.
    fn drop_stale<R: Rng>(
        &mut self,
        ctx: &mut ContagionContext<'_, R>,
        touched: &mut BTreeSet<AgentId>,
    ) {
        for disease in &mut self.active {
            disease.infected.retain(|id, _| {
                let alive = ctx
                    .lookup
                    .get(id)
                    .and_then(|&i| ctx.agents.get(i))
                    .is_some_and(|a| a.id == *id && a.is_alive());
                if !alive {
                    touched.insert(*id);
                }
                alive
            });
        }
        for id in touched.iter() {
            if let Some(agent) = ctx.lookup.get(id).and_then(|&i| ctx.agents.get_mut(i)) {
                let active = &self.active;
                agent.infections.retain(|name, _| {
                    active
                        .iter()
                        .any(|d| &d.name == name && d.infected.contains_key(id))
                });
            }
        }
    }

    fn try_emerge<R: Rng>(
        &mut self,
        ctx: &mut ContagionContext<'_, R>,
        events: &mut Vec<LiveEvent>,
    ) {
        let chance = ctx.config.emergence_chance.clamp(0.0, 1.0);
        if self.active.len() >= ctx.config.max_active_diseases || chance <= 0.0 {
            return;
        }
        if !ctx.rng.gen_bool(chance) {
            return;
        }
        let living: Vec<usize> = ctx
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_alive())
            .map(|(i, _)| i)
            .collect();
        let Some(&patient) = living.choose(ctx.rng) else {
            return;
        };
        let disease = self.random_disease(ctx.config, ctx.tick, ctx.rng);
        if let Some(event) = self.introduce(disease, &mut ctx.agents[patient], ctx.tick) {
            events.push(event);
        }
    }

    fn retire_empty(&mut self, tick: u64, events: &mut Vec<LiveEvent>) {
        let (done, active): (Vec<Disease>, Vec<Disease>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|d| d.infected.is_empty());
        self.active = active;
        for disease in done {
            let record = disease.record(tick);
            tracing::info!(
                disease = %record.name,
                peak_infected = record.peak_infected,
                recovered = record.total_recovered,
                lifetime = tick.saturating_sub(record.emerged_tick),
                "Disease retired"
            );
            events.push(LiveEvent::DiseaseRetired {
                record: record.clone(),
                tick,
                timestamp: timestamp(),
            });
            self.history.push(record);
        }
    }

    /// Snapshot of active diseases against a living `population`.
    pub fn statistics(&self, population: usize) -> DiseaseStatistics {
        let carriers: BTreeSet<AgentId> = self
            .active
            .iter()
            .flat_map(|d| d.infected.keys().copied())
            .collect();
        DiseaseStatistics {
            active_diseases: self.active.len(),
            total_infected: carriers.len(),
            infection_rate: if population == 0 {
                0.0
            } else {
                carriers.len() as f64 / population as f64
            },
            per_disease: self
                .active
                .iter()
                .map(|d| DiseaseBreakdown {
                    name: d.name.clone(),
                    category: d.category,
                    severity: d.severity,
                    infected: d.infected.len(),
                    recovered: d.recovered.len(),
                    peak_infected: d.peak_infected,
                })
                .collect(),
        }
    }
}

fn infect(disease: &mut Disease, agent: &mut Agent) {
    disease.infected.insert(agent.id, 0);
    agent.infections.insert(disease.name.clone(), 0);
    disease.peak_infected = disease.peak_infected.max(disease.infected.len());
}

/// Early recovery probability for an agent `elapsed` ticks into `disease`.
pub fn recovery_chance(
    agent: &Agent,
    disease: &Disease,
    elapsed: u64,
    config: &ContagionConfig,
) -> f64 {
    let immunity = f64::from(agent.genome.immunity);
    let regeneration = f64::from(agent.genome.regeneration);
    let progress = elapsed as f64 / disease.duration.max(1) as f64;
    (config.recovery_base * (immunity + regeneration * config.regeneration_factor) * progress)
        .clamp(0.0, 1.0)
}

/// Probability that `target` catches `disease` from one exposure.
pub fn contagion_chance(target: &Agent, disease: &Disease, config: &ContagionConfig) -> f64 {
    let immunity = f64::from(target.genome.immunity).clamp(0.0, 1.0);
    (f64::from(disease.contagion_rate) * (1.0 - immunity * config.immunity_factor)).clamp(0.0, 1.0)
}

/// Recomputes properties overridden by diseases from the agent's current
/// infections, restoring defaults for anything no longer active.
pub fn refresh_effects(agent: &mut Agent, active: &[Disease], config: &ContagionConfig) {
    let mut speed = 1.0;
    let mut fertile = true;
    for name in agent.infections.keys() {
        if let Some(d) = active.iter().find(|d| &d.name == name) {
            match d.category {
                DiseaseCategory::Motor => {
                    speed *= (1.0 - config.motor_speed_penalty * f64::from(d.severity)).clamp(0.0, 1.0)
                }
                DiseaseCategory::Reproductive => fertile = false,
                _ => {}
            }
        }
    }
    agent.speed_multiplier = speed;
    agent.can_reproduce = fertile;
}

fn apply_effect<R: Rng>(
    agent: &mut Agent,
    disease: &Disease,
    index: &mut SpatialHash,
    config: &ContagionConfig,
    rng: &mut R,
) {
    let severity = f64::from(disease.severity);
    match disease.category {
        // Speed penalty is folded in by `refresh_effects`.
        DiseaseCategory::Motor => {
            let jitter = config.motor_jitter * severity;
            if jitter > 0.0 {
                agent.wander_heading += rng.gen_range(-jitter..=jitter);
            }
        }
        DiseaseCategory::Reproductive => agent.can_reproduce = false,
        DiseaseCategory::Metabolic => {
            agent.energy = (agent.energy - config.metabolic_drain * severity).clamp(0.0, 100.0);
        }
        DiseaseCategory::Neural => {
            if rng.gen_bool((config.neural_impulse_chance * severity).clamp(0.0, 1.0)) {
                let heading = rng.gen_range(0.0..TAU);
                let strength = config.neural_impulse_strength;
                agent.wander_heading = heading;
                let x = (agent.position.x + heading.cos() * strength)
                    .clamp(0.0, f64::from(index.width));
                let y = (agent.position.y + heading.sin() * strength)
                    .clamp(0.0, f64::from(index.height));
                let moved = Position::new(x, y);
                if moved.is_finite() {
                    agent.position = moved;
                    index.update(agent.id, moved);
                }
            }
        }
        DiseaseCategory::Degenerative => {
            agent.health = (agent.health - config.degenerative_drain * severity).clamp(0.0, 100.0);
        }
    }
}

fn recover(disease: &mut Disease, agent: &mut Agent) {
    disease.infected.remove(&agent.id);
    disease.recovered.insert(agent.id);
    agent.infections.remove(&disease.name);
    agent.immunities.insert(disease.name.clone());
}

/// Effects, elapsed-time bookkeeping and recovery for every carrier.
fn progress<R: Rng>(
    disease: &mut Disease,
    ctx: &mut ContagionContext<'_, R>,
    events: &mut Vec<LiveEvent>,
    touched: &mut BTreeSet<AgentId>,
) {
    let carriers: Vec<AgentId> = disease.infected.keys().copied().collect();
    for id in carriers {
        let Some(agent) = ctx.lookup.get(&id).and_then(|&i| ctx.agents.get_mut(i)) else {
            continue;
        };
        apply_effect(agent, disease, ctx.index, ctx.config, ctx.rng);
        touched.insert(id);

        let elapsed = disease.infected.get(&id).copied().unwrap_or(0) + 1;
        disease.infected.insert(id, elapsed);
        agent.infections.insert(disease.name.clone(), elapsed);

        let recovered = elapsed >= disease.duration || {
            let chance = recovery_chance(agent, disease, elapsed, ctx.config);
            chance > 0.0 && ctx.rng.gen_bool(chance)
        };
        if recovered {
            recover(disease, agent);
            tracing::debug!(disease = %disease.name, agent = id, elapsed, "Recovered");
            events.push(LiveEvent::Recovery {
                disease: disease.name.clone(),
                id,
                tick: ctx.tick,
                timestamp: timestamp(),
            });
        }
    }
}

/// Exposure of susceptible neighbours. Only carriers infected before this
/// step transmit.
fn spread<R: Rng>(
    disease: &mut Disease,
    ctx: &mut ContagionContext<'_, R>,
    events: &mut Vec<LiveEvent>,
    touched: &mut BTreeSet<AgentId>,
) {
    let carriers: Vec<AgentId> = disease.infected.keys().copied().collect();
    let mut nearby = Vec::new();
    for id in carriers {
        let Some(position) = ctx
            .lookup
            .get(&id)
            .and_then(|&i| ctx.agents.get(i))
            .map(|a| a.position)
        else {
            continue;
        };
        ctx.index
            .query_into(&position, ctx.config.spread_radius, &mut nearby);
        for &other in &nearby {
            if other == id || disease.infected.contains_key(&other) {
                continue;
            }
            let Some(target) = ctx.lookup.get(&other).and_then(|&i| ctx.agents.get_mut(i)) else {
                continue;
            };
            if !target.is_alive() || target.is_immune_to(&disease.name) {
                continue;
            }
            let chance = contagion_chance(target, disease, ctx.config);
            if chance > 0.0 && ctx.rng.gen_bool(chance) {
                infect(disease, target);
                touched.insert(other);
                events.push(LiveEvent::Infection {
                    disease: disease.name.clone(),
                    id: other,
                    tick: ctx.tick,
                    timestamp: timestamp(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::lifecycle;
    use ecosim_data::Genome;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        agents: Vec<Agent>,
        lookup: HashMap<AgentId, usize>,
        index: SpatialHash,
        rng: ChaCha8Rng,
        config: ContagionConfig,
    }

    impl Fixture {
        fn new(positions: &[(f64, f64)]) -> Self {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let app = AppConfig::default();
            let mut index = SpatialHash::new(10.0, 100, 100);
            let mut lookup = HashMap::new();
            let agents: Vec<Agent> = positions
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| {
                    let a = lifecycle::create_agent(
                        i as u64 + 1,
                        Position::new(x, y),
                        Genome {
                            immunity: 0.0,
                            regeneration: 0.0,
                            ..Genome::default()
                        },
                        80.0,
                        0,
                        &app,
                        &mut rng,
                    );
                    index.insert(a.id, a.position);
                    lookup.insert(a.id, i);
                    a
                })
                .collect();
            Self {
                agents,
                lookup,
                index,
                rng,
                config: ContagionConfig {
                    emergence_chance: 0.0,
                    ..ContagionConfig::default()
                },
            }
        }

        fn step(&mut self, system: &mut DiseaseSystem, tick: u64) -> Vec<LiveEvent> {
            system.update(&mut ContagionContext {
                agents: &mut self.agents,
                lookup: &self.lookup,
                index: &mut self.index,
                tick,
                config: &self.config,
                rng: &mut self.rng,
            })
        }
    }

    #[test]
    fn test_forced_recovery_at_duration() {
        let mut fx = Fixture::new(&[(50.0, 50.0)]);
        let mut system = DiseaseSystem::new();
        let d = Disease::new("Test Pox", DiseaseCategory::Metabolic, 0.2, 0.5, 100, 0.5, 0);
        assert!(system.introduce(d, &mut fx.agents[0], 0).is_some());
        for tick in 1..100 {
            fx.step(&mut system, tick);
            assert!(fx.agents[0].is_infected(), "recovered early at {tick}");
        }
        fx.step(&mut system, 100);
        assert!(!fx.agents[0].is_infected());
        assert!(fx.agents[0].is_immune_to("Test Pox"));
        assert!(system.active.is_empty());
        assert_eq!(system.history().len(), 1);
        assert_eq!(system.history()[0].end_tick, 100);
    }

    #[test]
    fn test_spread_respects_immunity() {
        let mut fx = Fixture::new(&[(50.0, 50.0), (51.0, 50.0), (50.0, 51.0)]);
        fx.agents[2].immunities.insert("Test Pox".into());
        let mut system = DiseaseSystem::new();
        let d = Disease::new("Test Pox", DiseaseCategory::Neural, 0.1, 0.5, 10_000, 1.0, 0);
        system.introduce(d, &mut fx.agents[0], 0);
        for tick in 1..50 {
            fx.step(&mut system, tick);
        }
        assert!(fx.agents[1].infections.contains_key("Test Pox"));
        assert!(!fx.agents[2].is_infected());
        let stats = system.statistics(3);
        assert_eq!(stats.total_infected, 2);
        assert!((stats.infection_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.per_disease[0].peak_infected, 2);
    }

    #[test]
    fn test_effects_restored_on_recovery() {
        let mut fx = Fixture::new(&[(50.0, 50.0)]);
        let mut system = DiseaseSystem::new();
        system.introduce(
            Disease::new("Limp", DiseaseCategory::Motor, 0.8, 0.5, 3, 0.1, 0),
            &mut fx.agents[0],
            0,
        );
        system.introduce(
            Disease::new("Barren", DiseaseCategory::Reproductive, 0.5, 0.5, 6, 0.1, 0),
            &mut fx.agents[0],
            0,
        );
        fx.step(&mut system, 1);
        assert!(fx.agents[0].speed_multiplier < 1.0);
        assert!(!fx.agents[0].can_reproduce);
        for tick in 2..4 {
            fx.step(&mut system, tick);
        }
        assert_eq!(fx.agents[0].speed_multiplier, 1.0);
        assert!(!fx.agents[0].can_reproduce);
        for tick in 4..7 {
            fx.step(&mut system, tick);
        }
        assert!(fx.agents[0].can_reproduce);
        assert_eq!(system.history().len(), 2);
    }

    #[test]
    fn test_stale_carriers_dropped() {
        let mut fx = Fixture::new(&[(50.0, 50.0)]);
        let mut system = DiseaseSystem::new();
        system.introduce(
            Disease::new("Ghost", DiseaseCategory::Metabolic, 0.5, 0.5, 1000, 0.1, 0),
            &mut fx.agents[0],
            0,
        );
        fx.agents[0].death = Some(ecosim_data::DeathCause::OldAge);
        let events = fx.step(&mut system, 1);
        assert!(system.active.is_empty());
        assert_eq!(system.history()[0].total_recovered, 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, LiveEvent::DiseaseRetired { .. })));
    }

    #[test]
    fn test_emergence_respects_cap_and_unique_names() {
        let mut fx = Fixture::new(&[(10.0, 10.0), (90.0, 90.0), (10.0, 90.0), (90.0, 10.0)]);
        fx.config.emergence_chance = 1.0;
        fx.config.max_active_diseases = 3;
        fx.config.duration_min = 10_000;
        fx.config.duration_max = 10_000;
        let mut system = DiseaseSystem::new();
        for tick in 1..20 {
            fx.step(&mut system, tick);
        }
        assert_eq!(system.active.len(), 3);
        let names: HashSet<&str> = system.active.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_contagion_and_recovery_formulas() {
        let config = ContagionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut a = lifecycle::create_agent(
            1,
            Position::new(0.0, 0.0),
            Genome::default(),
            50.0,
            0,
            &AppConfig::default(),
            &mut rng,
        );
        a.genome.immunity = 0.5;
        a.genome.regeneration = 1.0;
        let d = Disease::new("X", DiseaseCategory::Neural, 0.5, 0.5, 100, 0.1, 0);
        assert!((contagion_chance(&a, &d, &config) - 0.1 * 0.6).abs() < 1e-6);
        assert!((recovery_chance(&a, &d, 50, &config) - 0.002 * 0.8 * 0.5).abs() < 1e-9);
    }
}
