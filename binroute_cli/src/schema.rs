use binroute_optimizer::{adaptation::change_set::ChangeSet, problem::input::ProblemInput};
use clap::{Args, ValueEnum};

#[derive(Clone, Copy, ValueEnum)]
pub enum SchemaKind {
    Problem,
    ChangeSet,
}

#[derive(Args)]
pub struct SchemaArgs {
    #[arg(value_enum, default_value_t = SchemaKind::Problem)]
    kind: SchemaKind,
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = match args.kind {
        SchemaKind::Problem => schemars::schema_for!(ProblemInput),
        SchemaKind::ChangeSet => schemars::schema_for!(ChangeSet),
    };

    println!("{}", serde_json::to_string_pretty(&schema)?);

    Ok(())
}
