//! Plain data model shared by the engine and by external collaborators
//! (renderers, persistence, tooling).

pub mod data;

pub use data::agent::{Agent, AgentId, BehaviorState, DeathCause, Sex};
pub use data::brain::{
    Action, MotionParams, NeuralNet, Policy, QTable, StateKey, ACTION_COUNT, FEATURE_COUNT,
    HIDDEN_SIZE, MOTION_OUTPUTS, NET_OUTPUTS,
};
pub use data::disease::{Disease, DiseaseCategory, DiseaseRecord};
pub use data::environment::{Food, Obstacle, Position, Predator};
pub use data::genome::Genome;
pub use data::perception::{Conditions, Target};
pub use data::social::{Relationship, Relationships};
