use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatrixProviderError {
    #[error("at least one point is required to build a travel matrix")]
    EmptyInput,

    #[error("expected a {expected}x{expected} matrix, got {actual}x{actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("travel matrices contain a negative, non-finite or oversized value")]
    InvalidValue,

    #[error("matrix provider unavailable: {0}")]
    Unavailable(String),

    #[error("matrix provider did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("matrix cache error: {0}")]
    Cache(#[from] anyhow::Error),
}
