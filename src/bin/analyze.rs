use clap::Parser;
use ecosim_core::history::LiveEvent;
use ecosim_data::{AgentId, DiseaseRecord};
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "logs/live.jsonl")]
    live_log: String,

    #[arg(short, long, default_value = "report.md")]
    output: String,
}

fn node(
    graph: &mut DiGraph<AgentId, ()>,
    nodes: &mut HashMap<AgentId, NodeIndex>,
    id: AgentId,
) -> NodeIndex {
    *nodes.entry(id).or_insert_with(|| graph.add_node(id))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Analyzing ecosim event history...");

    // 1. Build the family graph
    let mut graph = DiGraph::<AgentId, ()>::new();
    let mut nodes = HashMap::new();
    let mut birth_count = 0;
    let mut max_gen = 0;
    let mut total_age = 0;
    let mut deaths_by_cause: BTreeMap<String, u64> = BTreeMap::new();
    let mut diseases: Vec<DiseaseRecord> = Vec::new();
    let mut extinct_at = None;

    let reader = BufReader::new(File::open(&args.live_log)?);
    for line in reader.lines() {
        let line = line?;
        let Ok(event) = serde_json::from_str::<LiveEvent>(&line) else {
            continue;
        };
        match event {
            LiveEvent::Birth {
                id, parents, gen, ..
            } => {
                birth_count += 1;
                max_gen = max_gen.max(gen);
                let child = node(&mut graph, &mut nodes, id);
                for parent in [parents.0, parents.1] {
                    let p = node(&mut graph, &mut nodes, parent);
                    graph.add_edge(p, child, ());
                }
            }
            LiveEvent::Death { age, cause, .. } => {
                total_age += age;
                *deaths_by_cause.entry(cause).or_default() += 1;
            }
            LiveEvent::DiseaseRetired { record, .. } => diseases.push(record),
            LiveEvent::Extinction { tick, .. } => extinct_at = Some(tick),
            _ => {}
        }
    }

    // 2. Summarize
    let death_count: u64 = deaths_by_cause.values().sum();
    let avg_lifespan = if death_count > 0 {
        total_age as f64 / death_count as f64
    } else {
        0.0
    };
    let families = connected_components(&graph);
    let deaths = deaths_by_cause
        .iter()
        .map(|(cause, n)| format!("- {cause}: {n}\n"))
        .collect::<String>();
    let disease_rows = diseases
        .iter()
        .map(|d| {
            format!(
                "| {} | {} | {:.2} | {} | {} | {}-{} |\n",
                d.name,
                d.category.label(),
                d.severity,
                d.peak_infected,
                d.total_recovered,
                d.emerged_tick,
                d.end_tick
            )
        })
        .collect::<String>();

    // 3. Generate report
    let report = format!(
        "# Ecosim Evolution Report\n\n\
        ## Summary\n\
        - **Total Births**: {birth_count}\n\
        - **Total Deaths**: {death_count}\n\
        - **Average Lifespan**: {avg_lifespan:.2} ticks\n\
        - **Max Generation**: {max_gen}\n\
        - **Breeding Families**: {families}\n\
        - **Extinction**: {}\n\n\
        ## Deaths by Cause\n\
        {deaths}\n\
        ## Retired Diseases ({})\n\n\
        | Name | Category | Severity | Peak | Recovered | Ticks |\n\
        |---|---|---|---|---|---|\n\
        {disease_rows}",
        extinct_at.map_or_else(|| "none".to_string(), |t| format!("tick {t}")),
        diseases.len(),
    );

    std::fs::write(&args.output, report)?;
    println!("Report generated: {}", args.output);

    Ok(())
}
