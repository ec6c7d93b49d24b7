use anyhow::Result;
use clap::Parser;
use ecosim_core::init_logging;
use ecosim_lib::runner::{self, RunOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Maximum number of ticks to simulate
    #[arg(short, long, default_value_t = 5000)]
    ticks: u64,

    /// Initial population (overrides the config)
    #[arg(short, long)]
    population: Option<usize>,

    /// RNG seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Directory for the JSON-lines event log
    #[arg(long)]
    history_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = runner::load_config(&args.config)?;
    let summary = runner::run(RunOptions {
        config,
        ticks: args.ticks,
        population: args.population,
        seed: args.seed,
        history_dir: args.history_dir,
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
