use crate::error::Result;
use ecosim_data::{AgentId, DiseaseCategory, DiseaseRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Aggregate population figures for one tick.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PopulationStats {
    pub population: usize,
    pub mean_health: f64,
    pub mean_energy: f64,
    pub mean_age: f64,
    pub max_generation: u32,
    pub births: usize,
    /// Deaths this tick keyed by cause label.
    pub deaths: BTreeMap<String, usize>,
    pub infected: usize,
    pub active_diseases: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum LiveEvent {
    Birth {
        id: AgentId,
        parents: (AgentId, AgentId),
        gen: u32,
        tick: u64,
        timestamp: String,
    },
    Death {
        id: AgentId,
        age: u64,
        offspring: u32,
        tick: u64,
        timestamp: String,
        cause: String,
    },
    DiseaseEmerged {
        name: String,
        category: DiseaseCategory,
        patient_zero: AgentId,
        tick: u64,
        timestamp: String,
    },
    Infection {
        disease: String,
        id: AgentId,
        tick: u64,
        timestamp: String,
    },
    Recovery {
        disease: String,
        id: AgentId,
        tick: u64,
        timestamp: String,
    },
    DiseaseRetired {
        record: DiseaseRecord,
        tick: u64,
        timestamp: String,
    },
    Extinction {
        tick: u64,
        timestamp: String,
    },
    Snapshot {
        tick: u64,
        stats: PopulationStats,
        timestamp: String,
    },
}

impl LiveEvent {
    pub fn tick(&self) -> u64 {
        match self {
            LiveEvent::Birth { tick, .. }
            | LiveEvent::Death { tick, .. }
            | LiveEvent::DiseaseEmerged { tick, .. }
            | LiveEvent::Infection { tick, .. }
            | LiveEvent::Recovery { tick, .. }
            | LiveEvent::DiseaseRetired { tick, .. }
            | LiveEvent::Extinction { tick, .. }
            | LiveEvent::Snapshot { tick, .. } => *tick,
        }
    }
}

/// Wall-clock stamp attached to every event.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Appends events as JSON lines to `<dir>/live.jsonl`.
pub struct HistoryLogger {
    live_file: Option<BufWriter<File>>,
    log_dir: PathBuf,
}

impl HistoryLogger {
    pub fn new_at(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("live.jsonl"))?;
        Ok(Self {
            live_file: Some(BufWriter::new(file)),
            log_dir: dir.to_path_buf(),
        })
    }

    /// A logger that discards everything.
    pub fn new_dummy() -> Self {
        Self {
            live_file: None,
            log_dir: PathBuf::new(),
        }
    }

    pub fn log_event(&mut self, event: &LiveEvent) -> Result<()> {
        if let Some(ref mut file) = self.live_file {
            let json = serde_json::to_string(event)?;
            writeln!(file, "{}", json)?;
        }
        Ok(())
    }

    pub fn log_all(&mut self, events: &[LiveEvent]) -> Result<()> {
        for event in events {
            self.log_event(event)?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(ref mut file) = self.live_file {
            file.flush()?;
        }
        Ok(())
    }

    /// Reads back every parseable event. Malformed lines are skipped.
    pub fn read_events(&self) -> Result<Vec<LiveEvent>> {
        if self.live_file.is_none() {
            return Ok(vec![]);
        }
        let file = match File::open(self.log_dir.join("live.jsonl")) {
            Ok(f) => f,
            Err(_) => return Ok(vec![]),
        };
        let reader = BufReader::new(file);
        Ok(reader
            .lines()
            .map_while(std::io::Result::ok)
            .filter_map(|l| serde_json::from_str::<LiveEvent>(&l).ok())
            .collect())
    }

    pub fn get_snapshots(&self) -> Result<Vec<(u64, PopulationStats)>> {
        Ok(self
            .read_events()?
            .into_iter()
            .filter_map(|e| match e {
                LiveEvent::Snapshot { tick, stats, .. } => Some((tick, stats)),
                _ => None,
            })
            .collect())
    }

    pub fn get_disease_records(&self) -> Result<Vec<DiseaseRecord>> {
        Ok(self
            .read_events()?
            .into_iter()
            .filter_map(|e| match e {
                LiveEvent::DiseaseRetired { record, .. } => Some(record),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_writes_and_reads_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut logger = HistoryLogger::new_at(dir.path()).expect("logger");
        let record = DiseaseRecord {
            name: "Grey Fever".to_string(),
            category: DiseaseCategory::Metabolic,
            severity: 0.4,
            duration: 300,
            peak_infected: 12,
            total_recovered: 11,
            emerged_tick: 10,
            end_tick: 420,
        };
        logger
            .log_all(&[
                LiveEvent::Extinction {
                    tick: 3,
                    timestamp: timestamp(),
                },
                LiveEvent::DiseaseRetired {
                    record: record.clone(),
                    tick: 420,
                    timestamp: timestamp(),
                },
            ])
            .expect("write");

        let events = logger.read_events().expect("read");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick(), 3);
        assert_eq!(logger.get_disease_records().expect("read"), vec![record]);
    }

    #[test]
    fn test_dummy_logger_is_silent() {
        let mut logger = HistoryLogger::new_dummy();
        logger
            .log_event(&LiveEvent::Extinction {
                tick: 1,
                timestamp: timestamp(),
            })
            .expect("dummy never fails");
        assert!(logger.read_events().expect("read").is_empty());
    }
}
