pub use binroute_matrix_providers::travel_matrices::MAX_TRAVEL_SECONDS;
use jiff::SignedDuration;

pub fn seconds(value: f64) -> SignedDuration {
    let value = if value.is_finite() {
        value.clamp(0.0, MAX_TRAVEL_SECONDS)
    } else {
        MAX_TRAVEL_SECONDS
    };

    SignedDuration::from_secs_f64(value)
}

pub fn hours(duration: SignedDuration) -> f64 {
    duration.as_secs_f64() / 3600.0
}
