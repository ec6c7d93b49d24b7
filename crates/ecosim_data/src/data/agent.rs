use super::brain::{Action, Policy, FEATURE_COUNT};
use super::environment::Position;
use super::genome::Genome;
use super::social::Relationships;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unique within a run; allocated monotonically by the world.
pub type AgentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub const fn opposite(self) -> Self {
        match self {
            Sex::Female => Sex::Male,
            Sex::Male => Sex::Female,
        }
    }
}

/// Behavioural state, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Exploring,
    SeekingFood,
    SeekingMate,
    Fleeing,
    Resting,
}

impl BehaviorState {
    pub const fn from_action(action: Action) -> Self {
        match action {
            Action::Explore => BehaviorState::Exploring,
            Action::SeekFood => BehaviorState::SeekingFood,
            Action::SeekMate => BehaviorState::SeekingMate,
            Action::Rest => BehaviorState::Resting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Health reached zero.
    Starvation,
    OldAge,
    Disease,
}

impl DeathCause {
    pub const fn label(self) -> &'static str {
        match self {
            DeathCause::Starvation => "starvation",
            DeathCause::OldAge => "old_age",
            DeathCause::Disease => "disease",
        }
    }
}

/// A simulated organism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub parent_ids: Option<(AgentId, AgentId)>,
    pub generation: u32,
    pub position: Position,
    pub vx: f64,
    pub vy: f64,
    /// Persistent wander direction in radians.
    pub wander_heading: f64,
    pub size: f64,
    pub sex: Sex,
    pub genome: Genome,
    /// `[0, 100]`
    pub health: f64,
    /// `[0, 100]`
    pub energy: f64,
    /// Ticks lived.
    pub age: u64,
    /// Fixed at birth from the genome.
    pub lifespan: u64,
    pub birth_tick: u64,
    pub max_speed: f64,
    pub perception_radius: f64,
    pub state: BehaviorState,
    pub policy: Policy,
    #[serde(skip)]
    pub last_action: Option<Action>,
    #[serde(skip)]
    pub last_features: Option<[f32; FEATURE_COUNT]>,
    /// Disease name -> elapsed infection ticks. Mirrors the disease registry.
    pub infections: BTreeMap<String, u64>,
    /// Disease names this agent can never catch again.
    pub immunities: BTreeSet<String>,
    pub relationships: Relationships,
    pub last_meal_tick: u64,
    /// Ticks before mate detection may fire again.
    pub mate_cooldown: u64,
    /// Partner locked in by the last detection, tracked while the cooldown runs.
    pub mate_lock: Option<AgentId>,
    /// Ticks before this agent may reproduce again.
    pub reproduction_cooldown: u64,
    /// Cleared while a reproductive disease is active.
    pub can_reproduce: bool,
    /// Product of active motor-disease penalties.
    pub speed_multiplier: f64,
    pub offspring_count: u32,
    pub death: Option<DeathCause>,
}

impl Agent {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    #[inline]
    pub fn is_infected(&self) -> bool {
        !self.infections.is_empty()
    }

    pub fn is_immune_to(&self, disease: &str) -> bool {
        self.immunities.contains(disease)
    }
}
