//! Configuration management for simulation parameters.
//!
//! Strongly typed sections mapping onto a `config.toml` file. Any section or
//! field left out of the file falls back to its default.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 400
//! height = 300
//! initial_population = 60
//! seed = 42
//!
//! [decision]
//! policy = "tabular"
//!
//! [contagion]
//! max_active_diseases = 2
//! ```

use serde::{Deserialize, Serialize};

/// World dimensions, seeding and bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u16,
    pub height: u16,
    /// Spatial hash cell width in world units.
    pub cell_size: f64,
    pub initial_population: usize,
    pub initial_food: usize,
    pub max_food: usize,
    pub food_per_tick: usize,
    pub food_nutrition: f64,
    pub seed: Option<u64>,
    /// Ticks between `info`-level population summaries.
    pub summary_interval: u64,
    /// Ticks a weak relationship is remembered before it is pruned.
    pub relationship_memory: u64,
    /// Multiplicative decay applied to relationship strength each tick.
    pub relationship_decay: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            cell_size: 20.0,
            initial_population: 60,
            initial_food: 120,
            max_food: 250,
            food_per_tick: 2,
            food_nutrition: 30.0,
            seed: None,
            summary_interval: 500,
            relationship_memory: 1000,
            relationship_decay: 0.999,
        }
    }
}

/// Resource decay, death and body parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Baseline health lost per unit of `dt`.
    pub health_loss_rate: f64,
    pub energy_cost_explore: f64,
    pub energy_cost_seek_food: f64,
    pub energy_cost_seek_mate: f64,
    pub energy_cost_flee: f64,
    /// Negative: resting recovers energy.
    pub energy_cost_rest: f64,
    /// Ticks without a meal before starvation damage applies.
    pub starvation_threshold: u64,
    pub starvation_damage: f64,
    /// Health damage per tick while energy is exhausted.
    pub exhaustion_damage: f64,
    pub eat_health_fraction: f64,
    pub eat_reward: f32,
    /// Reach added to body size when eating.
    pub eat_range: f64,
    pub disease_death_base: f64,
    pub immunity_mortality_factor: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub base_speed: f64,
    pub base_perception_radius: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            health_loss_rate: 0.01,
            energy_cost_explore: 0.08,
            energy_cost_seek_food: 0.1,
            energy_cost_seek_mate: 0.12,
            energy_cost_flee: 0.2,
            energy_cost_rest: -0.15,
            starvation_threshold: 400,
            starvation_damage: 0.2,
            exhaustion_damage: 0.5,
            eat_health_fraction: 0.5,
            eat_reward: 2.0,
            eat_range: 2.0,
            disease_death_base: 0.0001,
            immunity_mortality_factor: 0.8,
            min_size: 2.0,
            max_size: 6.0,
            base_speed: 2.0,
            base_perception_radius: 40.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Both parties must reach this energy for a mate to be detected.
    pub mate_energy_threshold: f64,
    /// Ticks a successful mate detection blocks the next one.
    pub mate_detection_cooldown: u64,
    /// Obstacle safety margin as a multiple of agent size.
    pub obstacle_margin_factor: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            mate_energy_threshold: 60.0,
            mate_detection_cooldown: 120,
            obstacle_margin_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Tabular,
    #[default]
    Neural,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DecisionConfig {
    pub policy: PolicyKind,
    /// Neural policy emits continuous steering parameters instead of
    /// target-seeking movement.
    pub continuous_control: bool,
    pub epsilon: f32,
    pub learning_rate: f32,
    pub discount: f32,
    pub reward_limit: f32,
    pub neural_learning_rate: f32,
    /// Initial neural weight range `[-scale, scale]`.
    pub neural_init_scale: f32,
    pub hungry_threshold: f64,
    pub sated_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Neural,
            continuous_control: false,
            epsilon: 0.1,
            learning_rate: 0.1,
            discount: 0.9,
            reward_limit: 5.0,
            neural_learning_rate: 0.05,
            neural_init_scale: 0.5,
            hungry_threshold: 50.0,
            sated_threshold: 80.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Minimum energy of both parents.
    pub energy_threshold: f64,
    /// Deducted from each parent on success.
    pub energy_cost: f64,
    pub offspring_energy: f64,
    pub cooldown_ticks: u64,
    /// Distance beyond the summed body radii at which a pair can mate.
    pub contact_range: f64,
    /// Max offset of the offspring from the parents' midpoint.
    pub spawn_spread: f64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 70.0,
            energy_cost: 25.0,
            offspring_energy: 50.0,
            cooldown_ticks: 200,
            contact_range: 4.0,
            spawn_spread: 3.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Scales the genome's own `mutation_rate` trait into a per-trait probability.
    pub mutation_probability_cap: f32,
    pub mutation_amount: f32,
    /// Relative lifespan perturbation on mutation.
    pub lifespan_mutation: f32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_probability_cap: 0.25,
            mutation_amount: 0.1,
            lifespan_mutation: 0.1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ContagionConfig {
    pub max_active_diseases: usize,
    /// Per-tick Bernoulli probability of a new disease while under the cap.
    pub emergence_chance: f64,
    pub spread_radius: f64,
    pub immunity_factor: f64,
    pub recovery_base: f64,
    pub regeneration_factor: f64,
    pub duration_min: u64,
    pub duration_max: u64,
    pub contagion_min: f32,
    pub contagion_max: f32,
    pub motor_speed_penalty: f64,
    pub motor_jitter: f64,
    pub metabolic_drain: f64,
    pub neural_impulse_chance: f64,
    pub neural_impulse_strength: f64,
    pub degenerative_drain: f64,
}

impl Default for ContagionConfig {
    fn default() -> Self {
        Self {
            max_active_diseases: 3,
            emergence_chance: 0.002,
            spread_radius: 12.0,
            immunity_factor: 0.8,
            recovery_base: 0.002,
            regeneration_factor: 0.3,
            duration_min: 200,
            duration_max: 800,
            contagion_min: 0.01,
            contagion_max: 0.1,
            motor_speed_penalty: 0.5,
            motor_jitter: 0.5,
            metabolic_drain: 0.05,
            neural_impulse_chance: 0.05,
            neural_impulse_strength: 3.0,
            degenerative_drain: 0.05,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub lifecycle: LifecycleConfig,
    pub perception: PerceptionConfig,
    pub decision: DecisionConfig,
    pub reproduction: ReproductionConfig,
    pub evolution: EvolutionConfig,
    pub contagion: ContagionConfig,
}

fn is_probability(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` describing the
    /// first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // World
        anyhow::ensure!(self.world.width > 0, "World width must be positive");
        anyhow::ensure!(self.world.width <= 10000, "World width too large (max 10000)");
        anyhow::ensure!(self.world.height > 0, "World height must be positive");
        anyhow::ensure!(
            self.world.height <= 10000,
            "World height too large (max 10000)"
        );
        anyhow::ensure!(
            self.world.cell_size.is_finite() && self.world.cell_size > 0.0,
            "Cell size must be positive"
        );
        anyhow::ensure!(
            self.world.initial_population <= 100_000,
            "Initial population too large (max 100000)"
        );
        anyhow::ensure!(
            self.world.food_nutrition > 0.0,
            "Food nutrition must be positive"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.world.relationship_decay),
            "Relationship decay must be in [0.0, 1.0]"
        );

        // Lifecycle
        anyhow::ensure!(
            self.lifecycle.health_loss_rate >= 0.0,
            "Health loss rate must be non-negative"
        );
        anyhow::ensure!(
            self.lifecycle.energy_cost_rest < 0.0,
            "Resting must recover energy (negative rest cost)"
        );
        anyhow::ensure!(
            self.lifecycle.energy_cost_explore >= 0.0
                && self.lifecycle.energy_cost_seek_food >= 0.0
                && self.lifecycle.energy_cost_seek_mate >= 0.0
                && self.lifecycle.energy_cost_flee >= 0.0,
            "Active state energy costs must be non-negative"
        );
        anyhow::ensure!(
            is_probability(self.lifecycle.eat_health_fraction),
            "Eat health fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            is_probability(self.lifecycle.disease_death_base),
            "Disease death base must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            is_probability(self.lifecycle.immunity_mortality_factor),
            "Immunity mortality factor must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.lifecycle.min_size > 0.0 && self.lifecycle.min_size <= self.lifecycle.max_size,
            "Size range must be positive and ordered"
        );
        anyhow::ensure!(
            self.lifecycle.base_speed > 0.0,
            "Base speed must be positive"
        );
        anyhow::ensure!(
            self.lifecycle.base_perception_radius > 0.0,
            "Perception radius must be positive"
        );

        // Perception
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.perception.mate_energy_threshold),
            "Mate energy threshold must be in [0, 100]"
        );
        anyhow::ensure!(
            self.perception.obstacle_margin_factor >= 0.0,
            "Obstacle margin factor must be non-negative"
        );

        // Decision
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.decision.epsilon),
            "Epsilon must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.decision.learning_rate > 0.0 && self.decision.learning_rate <= 1.0,
            "Learning rate must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.decision.discount),
            "Discount must be in [0.0, 1.0)"
        );
        anyhow::ensure!(
            self.decision.reward_limit > 0.0,
            "Reward limit must be positive"
        );
        anyhow::ensure!(
            self.decision.neural_learning_rate >= 0.0,
            "Neural learning rate must be non-negative"
        );

        // Reproduction
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.reproduction.energy_threshold),
            "Reproduction threshold must be in [0, 100]"
        );
        anyhow::ensure!(
            self.reproduction.energy_cost >= 0.0,
            "Reproduction energy cost must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.reproduction.offspring_energy),
            "Offspring energy must be in [0, 100]"
        );

        // Evolution
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.evolution.mutation_probability_cap),
            "Mutation probability cap must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.evolution.mutation_amount >= 0.0,
            "Mutation amount must be non-negative"
        );

        // Contagion
        anyhow::ensure!(
            is_probability(self.contagion.emergence_chance),
            "Emergence chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            is_probability(self.contagion.immunity_factor),
            "Immunity factor must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.contagion.spread_radius >= 0.0,
            "Spread radius must be non-negative"
        );
        anyhow::ensure!(
            self.contagion.duration_min > 0
                && self.contagion.duration_min <= self.contagion.duration_max,
            "Disease duration range must be positive and ordered"
        );
        anyhow::ensure!(
            self.contagion.contagion_min > 0.0
                && self.contagion.contagion_min <= self.contagion.contagion_max
                && self.contagion.contagion_max <= 1.0,
            "Contagion range must lie in (0.0, 1.0] and be ordered"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of every behavioural section. Two runs with the same fingerprint
    /// and seed share parameters.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.lifecycle).as_bytes());
        hasher.update(format!("{:?}", self.perception).as_bytes());
        hasher.update(format!("{:?}", self.decision).as_bytes());
        hasher.update(format!("{:?}", self.reproduction).as_bytes());
        hasher.update(format!("{:?}", self.evolution).as_bytes());
        hasher.update(format!("{:?}", self.contagion).as_bytes());
        hex::encode(hasher.finalize())
    }
}
