use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::MatrixProviderError;

/// Upper bound for a single travel leg in seconds.
pub const MAX_TRAVEL_SECONDS: f64 = 10_000_000.0;

/// TravelMatrices holds the travel distance, time, and cost matrices.
/// Stored as flat vectors, `from * num_points + to`. Distances are in meters
/// and times in seconds.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    pub distances: Vec<f64>,
    pub times: Vec<f64>,

    // Some providers don't give us a cost
    pub costs: Option<Vec<f64>>,
}

impl TravelMatrices {
    pub fn from_rows(
        distances: Vec<Vec<f64>>,
        times: Vec<Vec<f64>>,
    ) -> Result<Self, MatrixProviderError> {
        let num_points = distances.len();
        if times.len() != num_points
            || distances.iter().chain(times.iter()).any(|row| row.len() != num_points)
        {
            return Err(MatrixProviderError::DimensionMismatch {
                expected: num_points,
                actual: times.len(),
            });
        }

        Ok(TravelMatrices {
            distances: distances.into_iter().flatten().collect(),
            times: times.into_iter().flatten().collect(),
            costs: None,
        })
    }

    pub fn num_points(&self) -> usize {
        self.distances.len().isqrt()
    }

    pub fn validate_dimensions(&self, num_points: usize) -> Result<(), MatrixProviderError> {
        let expected = num_points * num_points;
        for len in [
            Some(self.distances.len()),
            Some(self.times.len()),
            self.costs.as_ref().map(|costs| costs.len()),
        ]
        .into_iter()
        .flatten()
        {
            if len != expected {
                return Err(MatrixProviderError::DimensionMismatch {
                    expected: num_points,
                    actual: len.isqrt(),
                });
            }
        }

        Ok(())
    }

    /// Every entry must be finite and non-negative, times at most
    /// [`MAX_TRAVEL_SECONDS`].
    pub fn validate_values(&self) -> Result<(), MatrixProviderError> {
        let valid = |value: &f64| value.is_finite() && *value >= 0.0;

        let distances_ok = self.distances.iter().all(valid);
        let times_ok = self
            .times
            .iter()
            .all(|value| valid(value) && *value <= MAX_TRAVEL_SECONDS);
        let costs_ok = self
            .costs
            .as_ref()
            .is_none_or(|costs| costs.iter().all(valid));

        if !(distances_ok && times_ok && costs_ok) {
            return Err(MatrixProviderError::InvalidValue);
        }

        Ok(())
    }
}

impl std::hash::Hash for TravelMatrices {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for d in &self.distances {
            state.write_u64(d.to_bits());
        }
        for t in &self.times {
            state.write_u64(t.to_bits());
        }
        if let Some(costs) = &self.costs {
            for c in costs {
                state.write_u64(c.to_bits());
            }
        } else {
            state.write_u8(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![0.0, 10.0], vec![12.0, 0.0]],
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
        )
        .unwrap();

        assert_eq!(matrices.num_points(), 2);
        assert_eq!(matrices.distances, vec![0.0, 10.0, 12.0, 0.0]);
        assert!(matrices.validate_dimensions(2).is_ok());
        assert!(matrices.validate_dimensions(3).is_err());
    }

    #[test]
    fn test_validate_values() {
        let mut matrices = TravelMatrices::from_rows(
            vec![vec![0.0, 10.0], vec![12.0, 0.0]],
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
        )
        .unwrap();
        assert!(matrices.validate_values().is_ok());

        matrices.distances[1] = f64::NAN;
        assert!(matches!(
            matrices.validate_values(),
            Err(MatrixProviderError::InvalidValue)
        ));

        matrices.distances[1] = 10.0;
        matrices.times[2] = -5.0;
        assert!(matrices.validate_values().is_err());

        matrices.times[2] = MAX_TRAVEL_SECONDS * 2.0;
        assert!(matrices.validate_values().is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = TravelMatrices::from_rows(
            vec![vec![0.0, 10.0], vec![12.0]],
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
        );

        assert!(matches!(
            result,
            Err(MatrixProviderError::DimensionMismatch { .. })
        ));
    }
}
