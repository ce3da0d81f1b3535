use std::{path::PathBuf, sync::Arc};

use binroute_optimizer::{
    engine::{Engine, EngineParams},
    solver::{ls::local_search::LocalSearchParams, solver_params::Threads},
};
use clap::Args;

use crate::{input, parsers, report};

#[derive(Args)]
pub struct OptimizeArgs {
    /// Problem file
    #[arg(short = 'i', long)]
    input: PathBuf,

    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "30s")]
    timeout: jiff::SignedDuration,

    /// Number of search threads, all cores by default
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Writes the solution JSON here instead of stdout
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub fn engine_params(threads: Option<usize>, iterations: Option<usize>, seed: u64) -> EngineParams {
    let defaults = LocalSearchParams::default();

    EngineParams {
        local_search: LocalSearchParams {
            max_iterations: iterations.unwrap_or(defaults.max_iterations),
            seed,
            ..defaults
        },
        threads: threads.map_or(Threads::Auto, Threads::Multi),
        ..EngineParams::default()
    }
}

pub async fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let problem = Arc::new(input::load_problem(&args.input).await?);
    let engine = Engine::new(engine_params(args.threads, args.iterations, args.seed));

    let solution = tokio::task::block_in_place(|| engine.optimize(problem, args.timeout));

    report::print_summary(&solution);
    report::write_json(&solution, args.out.as_deref())?;

    Ok(())
}
