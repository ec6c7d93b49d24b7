use super::agent::AgentId;
use super::environment::Position;
use serde::{Deserialize, Serialize};

/// Nearest perceived instance of a category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: u64,
    pub position: Position,
    pub distance: f64,
}

/// Snapshot of what an agent perceived this tick.
///
/// Always well-formed: flags default to `false`, targets to `None` and peer
/// lists to empty, so consumers only ever check whether a target is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub food_nearby: bool,
    pub mate_nearby: bool,
    pub predator_nearby: bool,
    pub obstacle_nearby: bool,
    pub allies_nearby: bool,
    pub rivals_nearby: bool,
    pub nearest_food: Option<Target>,
    pub nearest_mate: Option<Target>,
    pub nearest_predator: Option<Target>,
    pub allies: Vec<AgentId>,
    pub rivals: Vec<AgentId>,
}

impl Conditions {
    /// Neutral snapshot: nothing seen.
    pub fn neutral() -> Self {
        Self::default()
    }
}
