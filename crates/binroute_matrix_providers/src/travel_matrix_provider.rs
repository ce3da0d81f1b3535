use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::MatrixProviderError, travel_matrices::TravelMatrices};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TravelMatrixProvider {
    /// Remote routing service reached through a [`MatrixSource`].
    External {
        profile: String,
    },

    AsTheCrowFlies {
        speed_kmh: f64,
    },

    Custom {
        matrices: TravelMatrices,
    },
}

impl Default for TravelMatrixProvider {
    fn default() -> Self {
        TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 30.0 }
    }
}

impl std::hash::Hash for TravelMatrixProvider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            TravelMatrixProvider::External { profile } => {
                state.write_u8(0);
                profile.hash(state);
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                state.write_u8(1);
                state.write_u64(speed_kmh.to_bits());
            }
            TravelMatrixProvider::Custom { matrices } => {
                state.write_u8(2);
                matrices.hash(state);
            }
        }
    }
}

/// An external travel-time service. Implementations are supplied by the
/// caller (OSRM, GraphHopper, ...), the optimizer only consumes them.
pub trait MatrixSource {
    fn fetch(
        &self,
        points: &[geo_types::Point],
        profile: &str,
    ) -> impl std::future::Future<Output = Result<TravelMatrices, MatrixProviderError>> + Send;
}

/// Source used when no external service is wired in.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoExternalSource;

impl MatrixSource for NoExternalSource {
    async fn fetch(
        &self,
        _points: &[geo_types::Point],
        profile: &str,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        Err(MatrixProviderError::Unavailable(format!(
            "no external matrix source configured for profile {profile}"
        )))
    }
}
