use binroute_matrix_providers::error::MatrixProviderError;
use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or contradictory input. The only error that rejects a request
/// outright, every other condition surfaces as a [`Warning`].
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("at least one vehicle is required")]
    NoVehicles,

    #[error("at least one bin is required")]
    NoBins,

    #[error("objective weight {name} = {value} is outside [0, 1]")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("objective weights sum to {sum}, expected a value in [{min}, {max}]")]
    WeightSumOutOfRange { sum: f64, min: f64, max: f64 },

    #[error("bin {bin_id} has an invalid time window")]
    InvalidTimeWindow { bin_id: String },

    #[error("vehicle {vehicle_id} has invalid working hours")]
    InvalidWorkingHours { vehicle_id: String },

    #[error("vehicle {vehicle_id} must have a positive capacity")]
    NonPositiveCapacity { vehicle_id: String },

    #[error("vehicle {vehicle_id} has an invalid {field}")]
    InvalidVehicleParameter {
        vehicle_id: String,
        field: &'static str,
    },

    #[error("bin {bin_id} has a negative demand or weight")]
    NegativeDemand { bin_id: String },

    #[error("bin {bin_id} has a negative or oversized service duration")]
    InvalidServiceDuration { bin_id: String },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{id} has an invalid coordinate")]
    InvalidCoordinate { id: String },

    #[error("service area {id} has min bounds above max bounds")]
    InvalidServiceArea { id: String },

    #[error("travel matrices cover {actual} locations, expected {expected}")]
    MatrixDimensionMismatch { expected: usize, actual: usize },

    #[error("travel matrices contain a negative, non-finite or oversized value")]
    InvalidMatrixValue,

    #[error(transparent)]
    MatrixProvider(MatrixProviderError),
}

impl From<MatrixProviderError> for ValidationError {
    fn from(error: MatrixProviderError) -> Self {
        match error {
            MatrixProviderError::DimensionMismatch { expected, actual } => {
                ValidationError::MatrixDimensionMismatch { expected, actual }
            }
            MatrixProviderError::InvalidValue => ValidationError::InvalidMatrixValue,
            error => ValidationError::MatrixProvider(error),
        }
    }
}

/// Why a bin was left out of every route.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    Capacity,
    TimeWindow,
    NoVehicleAvailable,
    OutOfServiceArea,
    AdaptationTimeout,
}

impl std::fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            UnassignedReason::Capacity => "capacity",
            UnassignedReason::TimeWindow => "time window",
            UnassignedReason::NoVehicleAvailable => "no vehicle available",
            UnassignedReason::OutOfServiceArea => "out of service area",
            UnassignedReason::AdaptationTimeout => "adaptation timeout",
        };

        f.write_str(reason)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    InfeasibleNode {
        bin_id: String,
        reason: UnassignedReason,
    },
    BudgetExceeded {
        phase: &'static str,
        budget: SignedDuration,
    },
    ProviderUnavailable {
        message: String,
    },
    AdaptationConflict {
        message: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::InfeasibleNode { bin_id, reason } => {
                write!(f, "bin {bin_id} cannot be served ({reason})")
            }
            Warning::BudgetExceeded { phase, budget } => {
                write!(f, "{phase} ran out of its {budget:#} budget")
            }
            Warning::ProviderUnavailable { message } => {
                write!(f, "distance provider unavailable, using estimates: {message}")
            }
            Warning::AdaptationConflict { message } => write!(f, "change skipped: {message}"),
        }
    }
}
