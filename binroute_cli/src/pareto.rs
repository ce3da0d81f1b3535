use std::{path::PathBuf, sync::Arc};

use binroute_optimizer::{
    engine::Engine,
    pareto::weight_sweep::{MAX_SOLUTIONS, WeightSweepConfig},
    solver::solver_params::Threads,
};
use clap::Args;
use comfy_table::Table;

use crate::{input, optimize::engine_params, parsers, report};

#[derive(Args)]
pub struct ParetoArgs {
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Number of weight vectors to sweep
    #[arg(short, long, default_value_t = 6)]
    solutions: usize,

    #[arg(long, value_parser = parsers::parse_duration, default_value = "5s")]
    budget_per_run: jiff::SignedDuration,

    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "30s")]
    timeout: jiff::SignedDuration,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub async fn run(args: ParetoArgs) -> anyhow::Result<()> {
    let problem = Arc::new(input::load_problem(&args.input).await?);
    let engine = Engine::new(engine_params(args.threads, None, args.seed));

    let config = WeightSweepConfig {
        solutions: args.solutions.min(MAX_SOLUTIONS),
        base_weights: problem.weights().clone(),
        budget_per_run: args.budget_per_run,
        total_budget: args.timeout,
        seed: args.seed,
        threads: args.threads.map_or(Threads::Auto, Threads::Multi),
    };

    let set = tokio::task::block_in_place(|| engine.optimize_pareto(problem, &config));

    let mut table = Table::new();
    table.set_header(vec![
        "",
        "distance (km)",
        "cost",
        "service penalty",
        "emissions (kg)",
        "unassigned",
    ]);
    for (index, objectives) in set.objective_vectors.iter().enumerate() {
        table.add_row(vec![
            if index == set.recommended { "*" } else { "" }.to_owned(),
            format!("{:.2}", objectives.distance_km),
            format!("{:.2}", objectives.cost),
            format!("{:.2}", objectives.service_quality_penalty),
            format!("{:.2}", objectives.emissions_kg),
            objectives.unassigned.to_string(),
        ]);
    }
    println!("{table}");
    println!("{} of {} runs kept", set.solutions.len(), set.runs.len());

    report::write_json(&set, args.out.as_deref())?;

    Ok(())
}
