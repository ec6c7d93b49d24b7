//! Genome operators and phenotype derivation.

use crate::config::{AppConfig, EvolutionConfig, LifecycleConfig};
pub use ecosim_data::Genome;
use rand::Rng;

pub trait GenomeLogic {
    fn new_random_with_rng<R: Rng>(rng: &mut R) -> Self;
    /// Per trait: average of both parents or a pick from either, chosen at random.
    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;
    /// Perturbs each trait with probability `mutation_rate * cap`, then clamps.
    fn mutate_with_config<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R);
    fn distance(&self, other: &Self) -> f32;
}

impl GenomeLogic for Genome {
    fn new_random_with_rng<R: Rng>(rng: &mut R) -> Self {
        let mut genome = Genome {
            speed: rng.gen_range(0.2..0.8),
            size: rng.gen_range(0.2..0.8),
            aggressiveness: rng.gen_range(0.0..1.0),
            sociability: rng.gen_range(0.0..1.0),
            curiosity: rng.gen_range(0.0..1.0),
            fertility: rng.gen_range(0.3..1.0),
            immunity: rng.gen_range(0.0..1.0),
            metabolism: rng.gen_range(0.2..0.8),
            color: rng.gen_range(0.0..1.0),
            mutation_rate: rng.gen_range(0.05..0.3),
            regeneration: rng.gen_range(0.0..1.0),
            base_lifespan: rng.gen_range(1500..3000),
        };
        genome.clamp_traits();
        genome
    }

    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let mut child = self.clone();
        let theirs = other.unit_traits();
        for (slot, their) in child.unit_traits_mut().into_iter().zip(theirs) {
            *slot = match rng.gen_range(0..3) {
                0 => (*slot + their) * 0.5,
                1 => *slot,
                _ => their,
            };
        }
        child.base_lifespan = match rng.gen_range(0..3) {
            0 => (self.base_lifespan + other.base_lifespan) / 2,
            1 => self.base_lifespan,
            _ => other.base_lifespan,
        };
        child.clamp_traits();
        child
    }

    fn mutate_with_config<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        let chance = (self.mutation_rate.clamp(0.0, 1.0) * config.mutation_probability_cap)
            .clamp(0.0, 1.0);
        let amount = config.mutation_amount.max(0.0);
        if amount > 0.0 {
            for t in self.unit_traits_mut() {
                if rng.gen::<f32>() < chance {
                    *t += rng.gen_range(-amount..=amount);
                }
            }
        }
        if rng.gen::<f32>() < chance && config.lifespan_mutation > 0.0 {
            let rel = rng.gen_range(-config.lifespan_mutation..=config.lifespan_mutation);
            let lifespan = self.base_lifespan as f32 * (1.0 + rel);
            self.base_lifespan = lifespan.max(0.0) as u64;
        }
        self.clamp_traits();
    }

    fn distance(&self, other: &Self) -> f32 {
        self.unit_traits()
            .iter()
            .zip(other.unit_traits())
            .map(|(a, b)| (a - b).abs())
            .sum::<f32>()
            / Genome::TRAIT_COUNT as f32
    }
}

/// Crossover followed by mutation, as used for every offspring.
pub fn inherit<R: Rng>(a: &Genome, b: &Genome, config: &AppConfig, rng: &mut R) -> Genome {
    let mut child = a.crossover_with_rng(b, rng);
    child.mutate_with_config(&config.evolution, rng);
    child
}

/// Lifespan in ticks, fixed at birth. Fast metabolisms shorten life.
pub fn derive_lifespan(genome: &Genome) -> u64 {
    let factor = 1.1 - 0.2 * f64::from(genome.metabolism);
    ((genome.base_lifespan as f64) * factor).round().max(1.0) as u64
}

pub fn derive_size(genome: &Genome, config: &LifecycleConfig) -> f64 {
    config.min_size + f64::from(genome.size) * (config.max_size - config.min_size)
}

/// Larger bodies move slightly slower.
pub fn derive_max_speed(genome: &Genome, config: &LifecycleConfig) -> f64 {
    config.base_speed * (0.5 + f64::from(genome.speed)) * (1.1 - 0.2 * f64::from(genome.size))
}

pub fn derive_perception_radius(genome: &Genome, config: &LifecycleConfig) -> f64 {
    config.base_perception_radius * (0.75 + 0.5 * f64::from(genome.curiosity))
}
