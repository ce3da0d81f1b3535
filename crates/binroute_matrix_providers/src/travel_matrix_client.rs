use std::{sync::Arc, time::Duration};

use tracing::{debug, instrument, warn};

use crate::{
    as_the_crow_flies::as_the_crow_flies_matrices,
    cache::{MatricesCache, NoCache},
    error::MatrixProviderError,
    travel_matrices::TravelMatrices,
    travel_matrix_provider::{MatrixSource, NoExternalSource, TravelMatrixProvider},
};

pub const FALLBACK_SPEED_ENV_VAR: &str = "BINROUTE_FALLBACK_SPEED_KMH";
pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct TravelMatrixClientParams {
    pub timeout: Duration,
    pub fallback_speed_kmh: f64,
}

impl Default for TravelMatrixClientParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
        }
    }
}

impl TravelMatrixClientParams {
    pub fn from_env() -> Self {
        let fallback_speed_kmh = std::env::var(FALLBACK_SPEED_ENV_VAR)
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|speed| *speed > 0.0)
            .unwrap_or(DEFAULT_FALLBACK_SPEED_KMH);

        Self {
            fallback_speed_kmh,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedMatrices {
    pub matrices: Arc<TravelMatrices>,

    /// Straight-line estimates rather than road-network values.
    pub estimated: bool,

    /// Set when the requested provider failed and a fallback was used.
    pub provider_error: Option<String>,
}

pub struct TravelMatrixClient<C = NoCache, S = NoExternalSource> {
    cache: C,
    source: S,
    params: TravelMatrixClientParams,
}

impl Default for TravelMatrixClient {
    fn default() -> Self {
        TravelMatrixClient::new(NoCache, NoExternalSource, TravelMatrixClientParams::default())
    }
}

impl<C, S> TravelMatrixClient<C, S>
where
    C: MatricesCache,
    S: MatrixSource,
{
    pub fn new(cache: C, source: S, params: TravelMatrixClientParams) -> Self {
        TravelMatrixClient {
            cache,
            source,
            params,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolves the matrices for `points`. A failing or slow external source
    /// never fails the call, the client degrades to great-circle estimates.
    #[instrument(skip_all, level = "debug")]
    pub async fn fetch_matrix<P>(
        &self,
        points: &[P],
        provider: TravelMatrixProvider,
    ) -> Result<FetchedMatrices, MatrixProviderError>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        if points.is_empty() {
            return Err(MatrixProviderError::EmptyInput);
        }

        match provider {
            TravelMatrixProvider::Custom { matrices } => {
                matrices.validate_dimensions(points.len())?;
                matrices.validate_values()?;
                Ok(FetchedMatrices {
                    matrices: Arc::new(matrices),
                    estimated: false,
                    provider_error: None,
                })
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => Ok(FetchedMatrices {
                matrices: Arc::new(as_the_crow_flies_matrices(points, speed_kmh)),
                estimated: true,
                provider_error: None,
            }),
            TravelMatrixProvider::External { ref profile } => {
                match self.cache.get_cached(&provider, points) {
                    Ok(Some(matrices)) => {
                        debug!("Travel matrices served from cache");
                        return Ok(FetchedMatrices {
                            matrices,
                            estimated: false,
                            provider_error: None,
                        });
                    }
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "Failed to read travel matrix cache"),
                }

                match self.fetch_external(points, profile).await {
                    Ok(matrices) => {
                        let matrices = Arc::new(matrices);
                        if let Err(err) = self.cache.cache(&provider, points, Arc::clone(&matrices)) {
                            warn!(error = %err, "Failed to write travel matrix cache");
                        }

                        Ok(FetchedMatrices {
                            matrices,
                            estimated: false,
                            provider_error: None,
                        })
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            speed_kmh = self.params.fallback_speed_kmh,
                            "External matrix provider failed, falling back to great-circle estimates"
                        );

                        Ok(FetchedMatrices {
                            matrices: Arc::new(as_the_crow_flies_matrices(
                                points,
                                self.params.fallback_speed_kmh,
                            )),
                            estimated: true,
                            provider_error: Some(err.to_string()),
                        })
                    }
                }
            }
        }
    }

    async fn fetch_external<P>(
        &self,
        points: &[P],
        profile: &str,
    ) -> Result<TravelMatrices, MatrixProviderError>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let points: Vec<geo_types::Point> = points.iter().map(|point| point.into()).collect();

        let matrices = tokio::time::timeout(self.params.timeout, self.source.fetch(&points, profile))
            .await
            .map_err(|_| MatrixProviderError::Timeout(self.params.timeout))??;

        matrices.validate_dimensions(points.len())?;
        matrices.validate_values()?;

        Ok(matrices)
    }
}
