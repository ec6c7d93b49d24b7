use anyhow::Context;
use ecosim_core::config::AppConfig;
use ecosim_core::history::{HistoryLogger, LiveEvent, PopulationStats};
use ecosim_core::pathogen::DiseaseStatistics;
use ecosim_core::world::{Surroundings, World};
use ecosim_data::DiseaseRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of one headless run. `None` fields fall back to the config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: AppConfig,
    pub ticks: u64,
    pub population: Option<usize>,
    pub seed: Option<u64>,
    pub history_dir: Option<PathBuf>,
}

/// Final report of a run, printed as JSON by the binary.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunSummary {
    pub fingerprint: String,
    pub seed: Option<u64>,
    pub ticks_run: u64,
    pub extinct: bool,
    pub total_births: u64,
    pub total_deaths: u64,
    pub final_stats: PopulationStats,
    pub diseases: DiseaseStatistics,
    pub retired_diseases: Vec<DiseaseRecord>,
    pub elapsed_ms: u64,
    pub slowest_tick_us: u64,
}

/// Reads a TOML config. A missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    AppConfig::from_toml(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Runs the simulation for up to `opts.ticks` ticks, stopping early when
/// the population dies out.
pub fn run(opts: RunOptions) -> anyhow::Result<RunSummary> {
    let mut config = opts.config;
    if opts.seed.is_some() {
        config.world.seed = opts.seed;
    }
    let population = opts.population.unwrap_or(config.world.initial_population);
    let (initial_food, food_per_tick) = (config.world.initial_food, config.world.food_per_tick);
    let fingerprint = config.fingerprint();

    let mut logger = match &opts.history_dir {
        Some(dir) => HistoryLogger::new_at(dir)
            .with_context(|| format!("Failed to open history log in {}", dir.display()))?,
        None => HistoryLogger::new_dummy(),
    };

    let mut world = World::new(config)?;
    world.populate(population);
    let mut env = Surroundings::default();
    let mut next_food_id = 0;
    world.scatter_food(&mut env, initial_food, &mut next_food_id);

    tracing::info!(
        %fingerprint,
        seed = ?world.config.world.seed,
        population,
        ticks = opts.ticks,
        "Starting run"
    );

    let mut ticks_run = 0;
    let mut extinct = world.is_extinct();
    while ticks_run < opts.ticks && !extinct {
        world.scatter_food(&mut env, food_per_tick, &mut next_food_id);
        let events = world.tick(&mut env, 1.0);
        ticks_run += 1;
        for event in &events {
            logger.log_event(event)?;
        }
        extinct = events
            .iter()
            .any(|e| matches!(e, LiveEvent::Extinction { .. }));
    }
    logger.flush()?;

    let summary = RunSummary {
        fingerprint,
        seed: world.config.world.seed,
        ticks_run,
        extinct: world.is_extinct(),
        total_births: world.metrics.counter("births"),
        total_deaths: world.metrics.counter("deaths"),
        diseases: world.diseases.statistics(world.population()),
        retired_diseases: world.diseases.history().to_vec(),
        final_stats: world.pop_stats.clone(),
        elapsed_ms: world.metrics.elapsed().as_millis() as u64,
        slowest_tick_us: world.metrics.slowest_tick().as_micros() as u64,
    };
    tracing::info!(
        ticks = summary.ticks_run,
        population = summary.final_stats.population,
        births = summary.total_births,
        deaths = summary.total_deaths,
        extinct = summary.extinct,
        "Run finished"
    );
    Ok(summary)
}
