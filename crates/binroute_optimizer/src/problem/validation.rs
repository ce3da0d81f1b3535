use fxhash::FxHashSet;
use jiff::SignedDuration;

use crate::{
    error::ValidationError,
    problem::{bin::Bin, input::ProblemInput, vehicle::Vehicle},
};

/// Longest accepted service duration or time-window flexibility.
pub const MAX_BIN_DURATION: SignedDuration = SignedDuration::from_hours(24 * 7);

/// Rejects malformed input before any matrix is fetched. Bins that are
/// well-formed but cannot be served are not errors, they are marked
/// infeasible when the problem is built.
pub fn validate_input(input: &ProblemInput) -> Result<(), ValidationError> {
    if input.vehicles.is_empty() {
        return Err(ValidationError::NoVehicles);
    }

    if input.bins.is_empty() {
        return Err(ValidationError::NoBins);
    }

    input.weights.validate()?;

    let mut vehicle_ids = FxHashSet::default();
    for vehicle in &input.vehicles {
        if !vehicle_ids.insert(vehicle.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "vehicle",
                id: vehicle.id.clone(),
            });
        }

        validate_vehicle(vehicle)?;
    }

    let mut bin_ids = FxHashSet::default();
    for bin in &input.bins {
        if !bin_ids.insert(bin.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "bin",
                id: bin.id.clone(),
            });
        }

        validate_bin(bin)?;
    }

    let mut depot_ids = FxHashSet::default();
    for depot in &input.depots {
        if !depot_ids.insert(depot.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "depot",
                id: depot.id.clone(),
            });
        }

        if !depot.location.is_valid() {
            return Err(ValidationError::InvalidCoordinate {
                id: depot.id.clone(),
            });
        }

        if depot.service_area.as_ref().is_some_and(|area| !area.is_valid()) {
            return Err(ValidationError::InvalidServiceArea {
                id: depot.id.clone(),
            });
        }
    }

    if let Some(area) = &input.service_area
        && !area.is_valid()
    {
        return Err(ValidationError::InvalidServiceArea {
            id: input
                .organization_id
                .clone()
                .unwrap_or_else(|| "organization".to_owned()),
        });
    }

    Ok(())
}

pub fn validate_vehicle(vehicle: &Vehicle) -> Result<(), ValidationError> {
    let positive = |value: f64| value.is_finite() && value > 0.0;

    if !positive(vehicle.capacity) || vehicle.weight_capacity.is_some_and(|w| !positive(w)) {
        return Err(ValidationError::NonPositiveCapacity {
            vehicle_id: vehicle.id.clone(),
        });
    }

    if vehicle.working_hours.start >= vehicle.working_hours.end
        || vehicle
            .max_working_duration
            .is_some_and(|max| !max.is_positive())
    {
        return Err(ValidationError::InvalidWorkingHours {
            vehicle_id: vehicle.id.clone(),
        });
    }

    for (field, value) in [
        ("fuel efficiency", vehicle.fuel_efficiency),
        ("average speed", vehicle.average_speed_kmh),
    ] {
        if !positive(value) {
            return Err(ValidationError::InvalidVehicleParameter {
                vehicle_id: vehicle.id.clone(),
                field,
            });
        }
    }

    for (field, value) in [
        ("cost per hour", vehicle.cost_per_hour),
        ("cost per km", vehicle.cost_per_km),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidVehicleParameter {
                vehicle_id: vehicle.id.clone(),
                field,
            });
        }
    }

    if !vehicle.home.is_valid() {
        return Err(ValidationError::InvalidCoordinate {
            id: vehicle.id.clone(),
        });
    }

    Ok(())
}

pub fn validate_bin(bin: &Bin) -> Result<(), ValidationError> {
    let non_negative = |value: f64| value.is_finite() && value >= 0.0;

    if !non_negative(bin.demand) || !non_negative(bin.weight) {
        return Err(ValidationError::NegativeDemand {
            bin_id: bin.id.clone(),
        });
    }

    if bin.service_duration.is_negative() || bin.service_duration > MAX_BIN_DURATION {
        return Err(ValidationError::InvalidServiceDuration {
            bin_id: bin.id.clone(),
        });
    }

    if bin.time_window.as_ref().is_some_and(|time_window| {
        !time_window.is_valid() || time_window.flexibility > MAX_BIN_DURATION
    }) {
        return Err(ValidationError::InvalidTimeWindow {
            bin_id: bin.id.clone(),
        });
    }

    if !bin.location.is_valid() {
        return Err(ValidationError::InvalidCoordinate {
            id: bin.id.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{problem::time_window::TimeWindow, test_utils};

    use super::*;

    fn input() -> ProblemInput {
        test_utils::create_test_input(
            vec![
                test_utils::create_bin("b1", 0.01, 10.0),
                test_utils::create_bin("b2", 0.02, 10.0),
            ],
            vec![test_utils::create_vehicle("v1", 100.0)],
        )
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&input()).is_ok());
    }

    #[test]
    fn test_no_vehicles() {
        let mut input = input();
        input.vehicles.clear();

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::NoVehicles)
        ));
    }

    #[test]
    fn test_no_bins() {
        let mut input = input();
        input.bins.clear();

        assert!(matches!(validate_input(&input), Err(ValidationError::NoBins)));
    }

    #[test]
    fn test_weight_sum_out_of_range() {
        let mut input = input();
        input.weights.distance = 0.0;
        input.weights.service_quality = 0.0;
        input.weights.cost = 0.0;

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::WeightSumOutOfRange { .. })
        ));
    }

    #[test]
    fn test_inverted_time_window() {
        let mut input = input();
        let start = test_utils::base_time() + SignedDuration::from_hours(2);
        input.bins[0].time_window = Some(TimeWindow::new(start, test_utils::base_time()));

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::InvalidTimeWindow { bin_id }) if bin_id == "b1"
        ));
    }

    #[test]
    fn test_oversized_service_duration() {
        let mut input = input();
        input.bins[0].service_duration = SignedDuration::from_hours(24 * 365 * 20_000);

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::InvalidServiceDuration { bin_id }) if bin_id == "b1"
        ));

        input.bins[0].service_duration = MAX_BIN_DURATION;
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn test_oversized_flexibility() {
        let mut input = input();
        let start = test_utils::base_time();
        input.bins[1].time_window = Some(
            TimeWindow::new(start, start + SignedDuration::from_hours(1))
                .with_flexibility(MAX_BIN_DURATION + SignedDuration::from_secs(1)),
        );

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::InvalidTimeWindow { bin_id }) if bin_id == "b2"
        ));
    }

    #[test]
    fn test_non_positive_capacity() {
        let mut input = input();
        input.vehicles[0].capacity = 0.0;

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::NonPositiveCapacity { .. })
        ));
    }

    #[test]
    fn test_negative_demand() {
        let mut input = input();
        input.bins[1].demand = -1.0;

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::NegativeDemand { bin_id }) if bin_id == "b2"
        ));
    }

    #[test]
    fn test_duplicate_bin_id() {
        let mut input = input();
        input.bins[1].id = "b1".to_owned();

        assert!(matches!(
            validate_input(&input),
            Err(ValidationError::DuplicateId { kind: "bin", .. })
        ));
    }

    #[test]
    fn test_oversized_bin_is_not_an_error() {
        let mut input = input();
        input.bins[0].demand = 1000.0;

        assert!(validate_input(&input).is_ok());
    }
}
