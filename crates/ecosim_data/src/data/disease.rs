use super::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Physiological system a disease attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseCategory {
    /// Extra energy drain.
    Metabolic,
    /// Speed penalty and movement jitter.
    Motor,
    /// Blocks reproduction.
    Reproductive,
    /// Occasional forced random movement.
    Neural,
    /// Extra health drain.
    Degenerative,
}

impl DiseaseCategory {
    pub const ALL: [DiseaseCategory; 5] = [
        DiseaseCategory::Metabolic,
        DiseaseCategory::Motor,
        DiseaseCategory::Reproductive,
        DiseaseCategory::Neural,
        DiseaseCategory::Degenerative,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DiseaseCategory::Metabolic => "metabolic",
            DiseaseCategory::Motor => "motor",
            DiseaseCategory::Reproductive => "reproductive",
            DiseaseCategory::Neural => "neural",
            DiseaseCategory::Degenerative => "degenerative",
        }
    }
}

/// A live disease strain. `infected` is the authoritative record of who
/// carries it; agents mirror it in their own infection map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    pub name: String,
    pub category: DiseaseCategory,
    /// `(0, 1]`
    pub severity: f32,
    /// `(0, 1]`
    pub immunity_difficulty: f32,
    /// Ticks until guaranteed recovery.
    pub duration: u64,
    /// `(0, 1]`
    pub contagion_rate: f32,
    /// Agent id -> elapsed infection ticks.
    pub infected: BTreeMap<AgentId, u64>,
    pub recovered: BTreeSet<AgentId>,
    pub peak_infected: usize,
    pub emerged_tick: u64,
}

impl Disease {
    pub fn new(
        name: impl Into<String>,
        category: DiseaseCategory,
        severity: f32,
        immunity_difficulty: f32,
        duration: u64,
        contagion_rate: f32,
        emerged_tick: u64,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            severity: clamp_unit_open(severity),
            immunity_difficulty: clamp_unit_open(immunity_difficulty),
            duration: duration.max(1),
            contagion_rate: clamp_unit_open(contagion_rate),
            infected: BTreeMap::new(),
            recovered: BTreeSet::new(),
            peak_infected: 0,
            emerged_tick,
        }
    }

    /// Archive entry for a disease retired at `end_tick`.
    pub fn record(&self, end_tick: u64) -> DiseaseRecord {
        DiseaseRecord {
            name: self.name.clone(),
            category: self.category,
            severity: self.severity,
            duration: self.duration,
            peak_infected: self.peak_infected,
            total_recovered: self.recovered.len(),
            emerged_tick: self.emerged_tick,
            end_tick,
        }
    }
}

fn clamp_unit_open(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.001, 1.0)
    } else {
        0.5
    }
}

/// Outcome of a retired disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub name: String,
    pub category: DiseaseCategory,
    pub severity: f32,
    pub duration: u64,
    pub peak_infected: usize,
    pub total_recovered: usize,
    pub emerged_tick: u64,
    pub end_tick: u64,
}
