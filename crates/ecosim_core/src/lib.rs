//! # Ecosim Core
//!
//! Agent cognition, lifecycle and contagion engine for a 2D population
//! simulation.
//!
//! This crate contains the step logic, including:
//! - Uniform-grid spatial indexing for radius queries
//! - Perception of food, mates, predators, allies, rivals and obstacles
//! - A hybrid decision policy (tabular Q-learning or a small feed-forward net)
//! - Resource decay, aging and death
//! - Genetic reproduction with crossover and mutation
//! - Disease emergence, spread, recovery and acquired immunity
//!
//! ## Architecture
//!
//! The [`world::World`] owns every agent. Each tick runs its phases to
//! completion against a snapshot taken at the start of the tick, so no agent
//! observes another mid-update. All randomness flows from the world's seeded
//! RNG.
//!
//! ## Example
//!
//! ```
//! use ecosim_core::config::AppConfig;
//! use ecosim_core::world::{Surroundings, World};
//!
//! let mut config = AppConfig::default();
//! config.world.seed = Some(42);
//! let mut world = World::new(config).unwrap();
//! world.populate(20);
//!
//! let mut env = Surroundings::default();
//! let events = world.tick(&mut env, 1.0);
//! assert!(world.population() <= 20 + events.len());
//! ```

/// Hybrid decision policy, feature encoding and reward shaping
pub mod brain;
/// Configuration management for simulation parameters
pub mod config;
/// Error types for the event history
pub mod error;
/// Genome crossover, mutation and phenotype derivation
pub mod genome;
/// Live event log and population statistics
pub mod history;
/// Agent construction, resource decay, eating and death
pub mod lifecycle;
/// Performance metrics collection and logging
pub mod metrics;
/// Steering, integration and invariant repair
pub mod movement;
/// Disease simulation with contagion and immunity
pub mod pathogen;
/// Environment perception
pub mod perception;
/// Ally and rival bookkeeping
pub mod relationships;
/// Mate compatibility and offspring creation
pub mod reproduction;
/// Agent snapshots for parallel perception
pub mod snapshot;
/// Spatial hashing for O(1) proximity queries
pub mod spatial_hash;
/// World ownership and the per-tick pipeline
pub mod world;

pub use brain::{DecisionPolicy, NeuralLogic, TabularLogic};
pub use config::AppConfig;
pub use genome::GenomeLogic;
pub use lifecycle::AgentLogic;
pub use metrics::{init_logging, Metrics};
pub use pathogen::{DiseaseStatistics, DiseaseSystem};
pub use relationships::RelationshipLogic;
pub use spatial_hash::SpatialHash;
pub use world::{Surroundings, World};
