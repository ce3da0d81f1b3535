use std::{path::PathBuf, sync::Arc};

use binroute_optimizer::{adaptation::change_set::ChangeSet, engine::Engine};
use clap::Args;
use tracing::info;

use crate::{input, optimize::engine_params, parsers, report};

#[derive(Args)]
pub struct AdaptArgs {
    /// Problem file the initial plan is computed for
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Change-set files, applied in order
    #[arg(short, long, required = true)]
    changes: Vec<PathBuf>,

    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "30s")]
    timeout: jiff::SignedDuration,

    /// Budget of every adaptation
    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "5s")]
    budget: jiff::SignedDuration,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub async fn run(args: AdaptArgs) -> anyhow::Result<()> {
    let problem = Arc::new(input::load_problem(&args.input).await?);
    let change_sets = args
        .changes
        .iter()
        .map(|path| input::read_json::<ChangeSet>(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let engine = Engine::new(engine_params(args.threads, None, args.seed));

    let mut solution = tokio::task::block_in_place(|| engine.optimize(problem, args.timeout));
    report::print_summary(&solution);

    for (path, changes) in args.changes.iter().zip(&change_sets) {
        info!(file = %path.display(), "Applying change-set");
        solution = tokio::task::block_in_place(|| engine.adapt(&solution, changes, args.budget));
        report::print_summary(&solution);
    }

    report::write_json(&solution, args.out.as_deref())?;

    Ok(())
}
