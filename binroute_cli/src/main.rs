use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{adapt::AdaptArgs, optimize::OptimizeArgs, pareto::ParetoArgs, schema::SchemaArgs};

mod adapt;
mod input;
mod optimize;
mod pareto;
mod parsers;
mod report;
mod schema;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plans the collection routes of a problem file
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Plans, then applies a change-set to the plan
    Adapt {
        #[command(flatten)]
        args: AdaptArgs,
    },
    /// Trade-off plans over a sweep of objective weights
    Pareto {
        #[command(flatten)]
        args: ParetoArgs,
    },
    /// Prints the JSON schema of the input files
    Schema {
        #[command(flatten)]
        args: SchemaArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Optimize { args }) => optimize::run(args).await?,
        Some(Commands::Adapt { args }) => adapt::run(args).await?,
        Some(Commands::Pareto { args }) => pareto::run(args).await?,
        Some(Commands::Schema { args }) => schema::run(args)?,
        None => {}
    }

    Ok(())
}
