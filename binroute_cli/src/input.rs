use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use binroute_matrix_providers::{
    cache::{FileMatricesCache, NoCache},
    travel_matrix_client::{TravelMatrixClient, TravelMatrixClientParams},
    travel_matrix_provider::NoExternalSource,
};
use binroute_optimizer::problem::{input::ProblemInput, problem::Problem};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(value)
}

/// Reads and validates a problem file. Matrices are cached on disk when
/// `BINROUTE_CACHE_FOLDER` points to a directory.
pub async fn load_problem(path: &Path) -> anyhow::Result<Problem> {
    let input: ProblemInput = read_json(path)?;
    let params = TravelMatrixClientParams::from_env();

    let problem = match FileMatricesCache::from_env() {
        Ok(cache) => {
            debug!(folder = %cache.folder().display(), "Using file matrix cache");
            let client = TravelMatrixClient::new(cache, NoExternalSource, params);
            input.build_problem(&client).await?
        }
        Err(_) => {
            let client = TravelMatrixClient::new(NoCache, NoExternalSource, params);
            input.build_problem(&client).await?
        }
    };

    info!(
        bins = problem.num_bins(),
        vehicles = problem.num_vehicles(),
        estimated_distances = problem.estimated_distances(),
        "Problem loaded"
    );

    Ok(problem)
}
