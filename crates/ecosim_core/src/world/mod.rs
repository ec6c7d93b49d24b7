//! The world owns every agent and the shared structures agents are indexed
//! in. Agents refer to each other only by id.

use crate::config::AppConfig;
use crate::genome::GenomeLogic;
use crate::history::PopulationStats;
use crate::lifecycle;
use crate::metrics::Metrics;
use crate::pathogen::DiseaseSystem;
use crate::spatial_hash::SpatialHash;
use ecosim_data::{Agent, AgentId, Food, Genome, Obstacle, Position, Predator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

pub mod finalize;
pub mod update;

/// Entities owned by the caller that agents interact with. Eaten food is
/// removed from `food` during a tick.
#[derive(Debug, Clone, Default)]
pub struct Surroundings {
    pub food: Vec<Food>,
    pub predators: Vec<Predator>,
    pub obstacles: Vec<Obstacle>,
}

pub struct World {
    pub width: u16,
    pub height: u16,
    pub tick: u64,
    pub config: AppConfig,
    pub agents: Vec<Agent>,
    /// Agent id -> position in `agents`. Rebuilt whenever `agents` changes shape.
    lookup: HashMap<AgentId, usize>,
    pub spatial_hash: SpatialHash,
    pub diseases: DiseaseSystem,
    pub metrics: Metrics,
    pub pop_stats: PopulationStats,
    pub rng: ChaCha8Rng,
    next_id: AgentId,
    extinct: bool,
}

impl World {
    /// Creates an empty world. Fails only on invalid configuration.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = match config.world.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let (width, height) = (config.world.width, config.world.height);
        tracing::info!(
            width,
            height,
            seed = ?config.world.seed,
            fingerprint = %config.fingerprint(),
            "World created"
        );
        Ok(Self {
            width,
            height,
            tick: 0,
            spatial_hash: SpatialHash::new(config.world.cell_size, width, height),
            metrics: Metrics::new(config.world.summary_interval),
            config,
            agents: Vec::new(),
            lookup: HashMap::new(),
            diseases: DiseaseSystem::new(),
            pop_stats: PopulationStats::default(),
            rng,
            next_id: 1,
            extinct: false,
        })
    }

    /// Seeds `count` random agents at uniformly random positions.
    pub fn populate(&mut self, count: usize) {
        let energy = self.config.reproduction.offspring_energy;
        for _ in 0..count {
            let position = self.random_position();
            self.spawn_agent(position, None, energy);
        }
    }

    pub fn random_position(&mut self) -> Position {
        Position::new(
            self.rng.gen_range(0.0..f64::from(self.width)),
            self.rng.gen_range(0.0..f64::from(self.height)),
        )
    }

    /// Adds a new agent and returns its id.
    ///
    /// With a parent genome the child gets a mutated copy of it, otherwise a
    /// random genome. Non-finite positions are moved to the world centre and
    /// everything else is clamped into the world.
    pub fn spawn_agent(
        &mut self,
        position: Position,
        parent_genome: Option<&Genome>,
        initial_energy: f64,
    ) -> AgentId {
        let genome = match parent_genome {
            Some(parent) => {
                let mut g = parent.clone();
                g.mutate_with_config(&self.config.evolution, &mut self.rng);
                g
            }
            None => Genome::new_random_with_rng(&mut self.rng),
        };
        self.spawn_with_genome(position, genome, initial_energy)
    }

    /// Adds an agent carrying exactly `genome` (clamped into its domain).
    pub fn spawn_with_genome(
        &mut self,
        position: Position,
        genome: Genome,
        initial_energy: f64,
    ) -> AgentId {
        let position = self.clamp_position(position);
        let id = self.next_id;
        self.next_id += 1;
        let agent = lifecycle::create_agent(
            id,
            position,
            genome,
            initial_energy,
            self.tick,
            &self.config,
            &mut self.rng,
        );
        tracing::debug!(id, lifespan = agent.lifespan, "Agent spawned");
        self.spatial_hash.insert(id, agent.position);
        self.lookup.insert(id, self.agents.len());
        self.agents.push(agent);
        self.extinct = false;
        id
    }

    fn clamp_position(&self, p: Position) -> Position {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        if !p.is_finite() {
            return Position::new(w * 0.5, h * 0.5);
        }
        Position::new(p.x.clamp(0.0, w), p.y.clamp(0.0, h))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.lookup.get(&id).and_then(|&i| self.agents.get(i))
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.lookup.get(&id).and_then(|&i| self.agents.get_mut(i))
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn is_extinct(&self) -> bool {
        self.agents.is_empty()
    }

    pub(crate) fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        self.lookup
            .extend(self.agents.iter().enumerate().map(|(i, a)| (a.id, i)));
    }

    /// Re-registers every agent at its current position.
    pub(crate) fn refresh_index(&mut self) {
        let data: Vec<(u64, Position)> = self.agents.iter().map(|a| (a.id, a.position)).collect();
        self.spatial_hash.rebuild(&data);
    }

    /// Heritable distance between two living agents, if both exist.
    pub fn genetic_distance(&self, a: AgentId, b: AgentId) -> Option<f32> {
        Some(self.agent(a)?.genome.distance(&self.agent(b)?.genome))
    }

    /// Scatters `count` food items of the configured nutrition at random
    /// positions, respecting `max_food`.
    pub fn scatter_food(
        &mut self,
        surroundings: &mut Surroundings,
        count: usize,
        next_food_id: &mut u64,
    ) {
        let room = self
            .config
            .world
            .max_food
            .saturating_sub(surroundings.food.len());
        for _ in 0..count.min(room) {
            let p = self.random_position();
            surroundings.food.push(Food::new(
                *next_food_id,
                p.x,
                p.y,
                self.config.world.food_nutrition,
            ));
            *next_food_id += 1;
        }
    }
}
