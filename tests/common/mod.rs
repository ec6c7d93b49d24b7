pub mod macros;

use ecosim_core::config::AppConfig;
use ecosim_core::world::{Surroundings, World};
use ecosim_data::{AgentId, Food, Genome, Obstacle, Position, Predator, Sex};

type WorldMod = Box<dyn FnOnce(&mut World, &[AgentId])>;

#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    agents: Vec<AgentBuilder>,
    surroundings: Surroundings,
    mods: Vec<WorldMod>,
}

#[allow(dead_code)]
impl WorldBuilder {
    /// Empty, seeded world with spontaneous disease emergence switched off.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.world.initial_population = 0;
        config.world.initial_food = 0;
        config.world.seed = Some(0);
        config.contagion.emergence_chance = 0.0;
        Self {
            config,
            agents: Vec::new(),
            surroundings: Surroundings::default(),
            mods: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_agent(mut self, agent: AgentBuilder) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_food(mut self, x: f64, y: f64, nutrition: f64) -> Self {
        let id = self.surroundings.food.len() as u64;
        self.surroundings.food.push(Food::new(id, x, y, nutrition));
        self
    }

    pub fn with_predator(mut self, x: f64, y: f64) -> Self {
        let id = self.surroundings.predators.len() as u64;
        self.surroundings
            .predators
            .push(Predator::new(id, x, y, 4.0));
        self
    }

    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.surroundings.obstacles.push(obstacle);
        self
    }

    /// Runs `modifier` after every agent has been spawned. It receives the
    /// spawned ids in builder order.
    pub fn with_setup<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut World, &[AgentId]) + 'static,
    {
        self.mods.push(Box::new(modifier));
        self
    }

    pub fn build(self) -> (World, Surroundings, Vec<AgentId>) {
        let mut world = World::new(self.config).expect("Failed to create world in test builder");
        let ids: Vec<AgentId> = self
            .agents
            .into_iter()
            .map(|spec| spec.spawn(&mut world))
            .collect();
        for modifier in self.mods {
            modifier(&mut world, &ids);
        }
        (world, self.surroundings, ids)
    }
}

#[allow(dead_code)]
pub struct AgentBuilder {
    position: Position,
    energy: f64,
    genome: Genome,
    sex: Option<Sex>,
    frozen: bool,
}

#[allow(dead_code)]
impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            position: Position::new(10.0, 10.0),
            energy: 50.0,
            genome: Genome::default(),
            sex: None,
            frozen: false,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn energy(mut self, amount: f64) -> Self {
        self.energy = amount;
        self
    }

    pub fn genome(mut self, genome: Genome) -> Self {
        self.genome = genome;
        self
    }

    pub fn immunity(mut self, value: f32) -> Self {
        self.genome.immunity = value;
        self
    }

    pub fn sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    /// Zero speed: the agent never leaves its spawn point.
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    fn spawn(self, world: &mut World) -> AgentId {
        let id = world.spawn_with_genome(self.position, self.genome, self.energy);
        if let Some(agent) = world.agent_mut(id) {
            if let Some(sex) = self.sex {
                agent.sex = sex;
            }
            if self.frozen {
                agent.max_speed = 0.0;
            }
        }
        id
    }
}

/// Ticks `world` `n` times, collecting every event.
#[allow(dead_code)]
pub fn run_ticks(
    world: &mut World,
    env: &mut Surroundings,
    n: u64,
) -> Vec<ecosim_core::history::LiveEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(world.tick(env, 1.0));
    }
    events
}
