use ecosim_data::{Agent, AgentId, Position, Sex};
use serde::{Deserialize, Serialize};

/// Read-only copy of the fields other agents may observe. Taken once at the
/// start of a tick so perception sees the world as it was, never mid-update.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Position,
    pub sex: Sex,
    pub size: f64,
    pub energy: f64,
    pub alive: bool,
    pub mate_cooldown: u64,
    pub can_reproduce: bool,
    pub infected: bool,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            position: agent.position,
            sex: agent.sex,
            size: agent.size,
            energy: agent.energy,
            alive: agent.is_alive(),
            mate_cooldown: agent.mate_cooldown,
            can_reproduce: agent.can_reproduce,
            infected: agent.is_infected(),
        }
    }
}
