use binroute_matrix_providers::{
    cache::MatricesCache,
    travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::{MatrixSource, TravelMatrixProvider},
};
use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::ValidationError,
    problem::{
        bin::Bin,
        depot::{BoundingBox, Depot},
        location::Location,
        objective_weights::{ComplianceTargets, ObjectiveWeights},
        problem::Problem,
        validation::validate_input,
        vehicle::Vehicle,
    },
};

/// Raw optimization request.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct ProblemInput {
    pub bins: Vec<Bin>,
    pub vehicles: Vec<Vehicle>,

    #[serde(default)]
    pub depots: Vec<Depot>,

    #[serde(default)]
    pub weights: ObjectiveWeights,

    #[serde(default)]
    pub compliance_targets: ComplianceTargets,

    #[serde(default)]
    pub max_optimization_time: Option<SignedDuration>,

    #[serde(default)]
    pub organization_id: Option<String>,

    #[serde(default)]
    pub service_area: Option<BoundingBox>,

    /// Defaults to great-circle estimates at the mean fleet speed.
    #[serde(default)]
    pub matrix_provider: Option<TravelMatrixProvider>,
}

impl ProblemInput {
    /// Vehicle homes first, then bins, in input order.
    pub fn locations(&self) -> Vec<Location> {
        self.vehicles
            .iter()
            .map(|vehicle| vehicle.home)
            .chain(self.bins.iter().map(|bin| bin.location))
            .collect()
    }

    pub fn mean_fleet_speed_kmh(&self) -> f64 {
        mean_speed_kmh(&self.vehicles)
    }

    pub fn default_provider(&self) -> TravelMatrixProvider {
        TravelMatrixProvider::AsTheCrowFlies {
            speed_kmh: self.mean_fleet_speed_kmh(),
        }
    }

    /// Validates the input, then fetches the travel matrices once before any
    /// search happens.
    #[instrument(skip_all, level = "debug")]
    pub async fn build_problem<C, S>(
        self,
        client: &TravelMatrixClient<C, S>,
    ) -> Result<Problem, ValidationError>
    where
        C: MatricesCache,
        S: MatrixSource,
    {
        validate_input(&self)?;

        let provider = self
            .matrix_provider
            .clone()
            .unwrap_or_else(|| self.default_provider());
        let fetched = client.fetch_matrix(&self.locations(), provider).await?;

        Problem::build(self, fetched)
    }
}

pub(crate) fn mean_speed_kmh(vehicles: &[Vehicle]) -> f64 {
    if vehicles.is_empty() {
        return binroute_matrix_providers::travel_matrix_client::DEFAULT_FALLBACK_SPEED_KMH;
    }

    vehicles
        .iter()
        .map(|vehicle| vehicle.average_speed_kmh)
        .sum::<f64>()
        / vehicles.len() as f64
}
