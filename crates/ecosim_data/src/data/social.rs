use super::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bond to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// `[0, 1]`
    pub strength: f32,
    pub since_tick: u64,
}

/// Sparse ally/rival maps of one agent. A peer id is never present in both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub allies: BTreeMap<AgentId, Relationship>,
    pub rivals: BTreeMap<AgentId, Relationship>,
}
