use std::sync::Arc;

use binroute_matrix_providers::{
    as_the_crow_flies::{as_the_crow_flies_matrices, haversine_distance, travel_seconds},
    travel_matrices::TravelMatrices,
    travel_matrix_client::FetchedMatrices,
};
use fxhash::{FxHashMap, FxHashSet};
use jiff::SignedDuration;
use tracing::debug;

use crate::{
    adaptation::change_set::ChangeSet,
    error::{UnassignedReason, ValidationError, Warning},
    problem::{
        bin::{Bin, BinIdx},
        depot::{BoundingBox, Depot, is_in_service_area},
        input::{ProblemInput, mean_speed_kmh},
        location::{Location, LocationIdx},
        objective_weights::{ComplianceTargets, ObjectiveWeights},
        validation::{validate_bin, validate_input},
        vehicle::{Vehicle, VehicleIdx},
    },
    utils::{enumerate_idx::EnumerateIdx, time::seconds},
};

/// Multiplier bounds accepted for travel-time condition updates.
const MIN_TRAVEL_TIME_FACTOR: f64 = 0.1;
const MAX_TRAVEL_TIME_FACTOR: f64 = 10.0;

/// Normalized, immutable problem graph.
///
/// Locations are laid out as one entry per vehicle home followed by one
/// entry per bin, so `LocationIdx` of bin `b` is `num_vehicles + b`. Bin and
/// vehicle indices never change across derived versions: removed bins are
/// withdrawn rather than deleted and new bins are appended.
#[derive(Debug, Clone)]
pub struct Problem {
    bins: Vec<Bin>,
    vehicles: Vec<Vehicle>,
    depots: Vec<Depot>,
    locations: Vec<Location>,
    matrices: Arc<TravelMatrices>,
    travel_time_factors: Vec<f64>,

    weights: ObjectiveWeights,
    compliance_targets: ComplianceTargets,

    priorities: Vec<f64>,
    compatibility: Vec<Vec<bool>>,
    infeasible: Vec<Option<UnassignedReason>>,

    withdrawn: FxHashSet<BinIdx>,
    unavailable_vehicles: FxHashSet<VehicleIdx>,

    bin_ids: FxHashMap<String, BinIdx>,
    vehicle_ids: FxHashMap<String, VehicleIdx>,

    estimated_distances: bool,
    max_optimization_time: Option<SignedDuration>,
    organization_id: Option<String>,
    service_area: Option<BoundingBox>,
    warnings: Vec<Warning>,
}

struct BinAnalysis {
    priority: f64,
    compatibility: Vec<bool>,
    infeasible: Option<UnassignedReason>,
}

/// Result of applying a change-set to a problem.
pub struct DerivedProblem {
    pub problem: Problem,
    pub removed: Vec<BinIdx>,
    pub added: Vec<BinIdx>,
    pub unavailable: Vec<VehicleIdx>,
    pub conditions_changed: bool,
    pub conflicts: Vec<Warning>,
}

impl Problem {
    pub fn build(input: ProblemInput, fetched: FetchedMatrices) -> Result<Self, ValidationError> {
        validate_input(&input)?;

        let locations = input.locations();
        fetched.matrices.validate_dimensions(locations.len())?;
        fetched.matrices.validate_values()?;

        let ProblemInput {
            bins,
            vehicles,
            depots,
            weights,
            compliance_targets,
            max_optimization_time,
            organization_id,
            service_area,
            ..
        } = input;

        let mut warnings = Vec::new();
        if let Some(message) = fetched.provider_error {
            warnings.push(Warning::ProviderUnavailable { message });
        }

        let bin_ids = bins
            .iter()
            .enumerate_idx()
            .map(|(index, bin): (BinIdx, &Bin)| (bin.id.clone(), index))
            .collect();
        let vehicle_ids = vehicles
            .iter()
            .enumerate_idx()
            .map(|(index, vehicle): (VehicleIdx, &Vehicle)| (vehicle.id.clone(), index))
            .collect();

        let mut problem = Problem {
            travel_time_factors: vec![1.0; locations.len()],
            bins,
            vehicles,
            depots,
            locations,
            matrices: fetched.matrices,
            weights,
            compliance_targets,
            priorities: Vec::new(),
            compatibility: Vec::new(),
            infeasible: Vec::new(),
            withdrawn: FxHashSet::default(),
            unavailable_vehicles: FxHashSet::default(),
            bin_ids,
            vehicle_ids,
            estimated_distances: fetched.estimated,
            max_optimization_time,
            organization_id,
            service_area,
            warnings,
        };

        for index in 0..problem.bins.len() {
            let analysis = problem.analyze_bin(&problem.bins[index]);
            problem.push_analysis(BinIdx::new(index), analysis);
        }

        debug!(
            bins = problem.bins.len(),
            vehicles = problem.vehicles.len(),
            infeasible = problem.infeasible.iter().flatten().count(),
            estimated = problem.estimated_distances,
            "Built problem"
        );

        Ok(problem)
    }

    /// Builds the problem on great-circle estimates, without any provider.
    pub fn build_estimated(input: ProblemInput) -> Result<Self, ValidationError> {
        validate_input(&input)?;

        let matrices = as_the_crow_flies_matrices(&input.locations(), input.mean_fleet_speed_kmh());

        Problem::build(
            input,
            FetchedMatrices {
                matrices: Arc::new(matrices),
                estimated: true,
                provider_error: None,
            },
        )
    }

    fn analyze_bin(&self, bin: &Bin) -> BinAnalysis {
        let compatibility = self
            .vehicles
            .iter()
            .map(|vehicle| {
                bin.is_servicable_by(&vehicle.capabilities)
                    && bin.demand <= vehicle.capacity
                    && bin.weight <= vehicle.weight_capacity()
            })
            .collect::<Vec<_>>();

        let infeasible = if !is_in_service_area(
            &bin.location,
            self.service_area.as_ref(),
            &self.depots,
        ) {
            Some(UnassignedReason::OutOfServiceArea)
        } else if !self
            .vehicles
            .iter()
            .any(|vehicle| bin.is_servicable_by(&vehicle.capabilities))
        {
            Some(UnassignedReason::NoVehicleAvailable)
        } else if !compatibility.iter().any(|&compatible| compatible) {
            Some(UnassignedReason::Capacity)
        } else {
            None
        };

        BinAnalysis {
            priority: bin.priority(),
            compatibility,
            infeasible,
        }
    }

    fn push_analysis(&mut self, bin: BinIdx, analysis: BinAnalysis) {
        self.record_infeasible(bin, analysis.infeasible);
        self.priorities.push(analysis.priority);
        self.compatibility.push(analysis.compatibility);
        self.infeasible.push(analysis.infeasible);
    }

    fn replace_analysis(&mut self, bin: BinIdx, analysis: BinAnalysis) {
        self.record_infeasible(bin, analysis.infeasible);
        self.priorities[bin.get()] = analysis.priority;
        self.compatibility[bin.get()] = analysis.compatibility;
        self.infeasible[bin.get()] = analysis.infeasible;
    }

    fn record_infeasible(&mut self, bin: BinIdx, reason: Option<UnassignedReason>) {
        if let Some(reason) = reason {
            self.warnings.push(Warning::InfeasibleNode {
                bin_id: self.bins[bin].id.clone(),
                reason,
            });
        }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn bin(&self, index: BinIdx) -> &Bin {
        &self.bins[index]
    }

    pub fn bins_iter(&self) -> impl Iterator<Item = BinIdx> + use<> {
        (0..self.bins.len()).map(BinIdx::new)
    }

    /// Bins that take part in the every-bin-once invariant.
    pub fn active_bins(&self) -> impl Iterator<Item = BinIdx> + '_ {
        self.bins_iter().filter(|bin| !self.withdrawn.contains(bin))
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, index: VehicleIdx) -> &Vehicle {
        &self.vehicles[index]
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn depots(&self) -> &[Depot] {
        &self.depots
    }

    pub fn bin_by_id(&self, id: &str) -> Option<BinIdx> {
        self.bin_ids.get(id).copied()
    }

    pub fn vehicle_by_id(&self, id: &str) -> Option<VehicleIdx> {
        self.vehicle_ids.get(id).copied()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn bin_location(&self, bin: BinIdx) -> LocationIdx {
        LocationIdx::new(self.vehicles.len() + bin.get())
    }

    pub fn vehicle_location(&self, vehicle: VehicleIdx) -> LocationIdx {
        LocationIdx::new(vehicle.get())
    }

    pub fn matrices(&self) -> &Arc<TravelMatrices> {
        &self.matrices
    }

    fn matrix_index(&self, from: LocationIdx, to: LocationIdx) -> usize {
        from.get() * self.locations.len() + to.get()
    }

    /// Meters.
    pub fn distance(&self, from: LocationIdx, to: LocationIdx) -> f64 {
        self.matrices.distances[self.matrix_index(from, to)]
    }

    /// Base travel time scaled by the mean of the endpoint condition factors.
    pub fn travel_time(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        let base = self.matrices.times[self.matrix_index(from, to)];
        let factor = (self.travel_time_factors[from.get()] + self.travel_time_factors[to.get()]) / 2.0;

        seconds(base * factor)
    }

    pub fn travel_time_factor(&self, location: LocationIdx) -> f64 {
        self.travel_time_factors[location.get()]
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn compliance_targets(&self) -> &ComplianceTargets {
        &self.compliance_targets
    }

    pub fn priority(&self, bin: BinIdx) -> f64 {
        self.priorities[bin.get()]
    }

    /// Capabilities and capacity allow `vehicle` to collect `bin`.
    pub fn is_compatible(&self, bin: BinIdx, vehicle: VehicleIdx) -> bool {
        self.compatibility[bin.get()][vehicle.get()]
    }

    pub fn infeasible_reason(&self, bin: BinIdx) -> Option<UnassignedReason> {
        self.infeasible[bin.get()]
    }

    pub fn is_withdrawn(&self, bin: BinIdx) -> bool {
        self.withdrawn.contains(&bin)
    }

    pub fn is_vehicle_available(&self, vehicle: VehicleIdx) -> bool {
        !self.unavailable_vehicles.contains(&vehicle)
    }

    pub fn estimated_distances(&self) -> bool {
        self.estimated_distances
    }

    pub fn max_optimization_time(&self) -> Option<SignedDuration> {
        self.max_optimization_time
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Applies a change-set to a copy of this problem. Entries that reference
    /// unknown ids, re-add an active bin, or are malformed are skipped and
    /// reported as conflicts. The current travel matrices are never touched,
    /// new or moved bins get great-circle rows in a fresh matrix.
    pub fn derive(&self, changes: &ChangeSet) -> DerivedProblem {
        let mut next = self.clone();
        next.warnings.clear();

        let mut conflicts = Vec::new();
        let mut removed = Vec::new();
        let mut added = Vec::new();
        let mut unavailable = Vec::new();

        for vehicle_id in &changes.unavailable_vehicle_ids {
            match next.vehicle_by_id(vehicle_id) {
                Some(vehicle) if next.unavailable_vehicles.insert(vehicle) => {
                    unavailable.push(vehicle)
                }
                Some(_) => conflicts.push(Warning::AdaptationConflict {
                    message: format!("vehicle {vehicle_id} is already unavailable"),
                }),
                None => conflicts.push(Warning::AdaptationConflict {
                    message: format!("unknown vehicle {vehicle_id}"),
                }),
            }
        }

        for bin_id in &changes.removed_bin_ids {
            match next.bin_by_id(bin_id) {
                Some(bin) if next.withdrawn.insert(bin) => removed.push(bin),
                Some(_) => conflicts.push(Warning::AdaptationConflict {
                    message: format!("bin {bin_id} was already removed"),
                }),
                None => conflicts.push(Warning::AdaptationConflict {
                    message: format!("unknown bin {bin_id}"),
                }),
            }
        }

        let previous_locations = next.locations.len();
        let mut stale_locations = FxHashSet::default();

        for bin in &changes.added_bins {
            if let Err(error) = validate_bin(bin) {
                conflicts.push(Warning::AdaptationConflict {
                    message: format!("added bin rejected: {error}"),
                });
                continue;
            }

            match next.bin_by_id(&bin.id) {
                Some(index) if next.withdrawn.contains(&index) => {
                    next.withdrawn.remove(&index);
                    removed.retain(|&removed_bin| removed_bin != index);

                    let location = next.bin_location(index);
                    if next.bins[index].location != bin.location {
                        next.locations[location.get()] = bin.location;
                        stale_locations.insert(location.get());
                    }

                    next.bins[index] = bin.clone();
                    let analysis = next.analyze_bin(bin);
                    next.replace_analysis(index, analysis);
                    added.push(index);
                }
                Some(_) => conflicts.push(Warning::AdaptationConflict {
                    message: format!("bin {} is already scheduled", bin.id),
                }),
                None => {
                    let index = BinIdx::new(next.bins.len());
                    next.bins.push(bin.clone());
                    next.bin_ids.insert(bin.id.clone(), index);
                    next.locations.push(bin.location);
                    next.travel_time_factors.push(1.0);

                    let analysis = next.analyze_bin(bin);
                    next.push_analysis(index, analysis);
                    added.push(index);
                }
            }
        }

        if !stale_locations.is_empty() || next.locations.len() != previous_locations {
            next.matrices = Arc::new(extend_matrices(
                &next.matrices,
                &next.locations,
                &stale_locations,
                mean_speed_kmh(&next.vehicles),
            ));
            next.estimated_distances = true;
        }

        let mut conditions_changed = false;
        for update in &changes.condition_updates {
            let factor = update.travel_time_factor;
            if !factor.is_finite() || !(MIN_TRAVEL_TIME_FACTOR..=MAX_TRAVEL_TIME_FACTOR).contains(&factor)
            {
                conflicts.push(Warning::AdaptationConflict {
                    message: format!(
                        "{:?} update with travel time factor {factor} ignored",
                        update.kind
                    ),
                });
                continue;
            }

            for (location, current) in next.locations.iter().zip(next.travel_time_factors.iter_mut())
            {
                if update.area.as_ref().is_none_or(|area| area.contains(location)) {
                    *current *= factor;
                    conditions_changed = true;
                }
            }
        }

        debug!(
            removed = removed.len(),
            added = added.len(),
            unavailable = unavailable.len(),
            conflicts = conflicts.len(),
            "Derived problem"
        );

        DerivedProblem {
            problem: next,
            removed,
            added,
            unavailable,
            conditions_changed,
            conflicts,
        }
    }
}

/// Copies `base` into a matrix covering `locations`, estimating every row and
/// column that is new or listed in `stale`.
fn extend_matrices(
    base: &TravelMatrices,
    locations: &[Location],
    stale: &FxHashSet<usize>,
    speed_kmh: f64,
) -> TravelMatrices {
    let previous = base.num_points();
    let num_points = locations.len();
    let mut distances = vec![0.0; num_points * num_points];
    let mut times = vec![0.0; num_points * num_points];

    let is_known = |index: usize| index < previous && !stale.contains(&index);

    for from in 0..num_points {
        for to in 0..num_points {
            let index = from * num_points + to;
            if is_known(from) && is_known(to) {
                distances[index] = base.distances[from * previous + to];
                times[index] = base.times[from * previous + to];
            } else if from != to {
                let distance = haversine_distance(locations[from].point(), locations[to].point());
                distances[index] = distance;
                times[index] = travel_seconds(distance, speed_kmh);
            }
        }
    }

    TravelMatrices {
        distances,
        times,
        costs: None,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        adaptation::change_set::{ChangeSet, ConditionKind, ConditionUpdate},
        problem::depot::BoundingBox,
        test_utils,
    };

    use super::*;

    fn problem() -> Problem {
        test_utils::create_line_problem(&[10.0, 20.0, 30.0], &[100.0])
    }

    #[test]
    fn test_location_layout() {
        let problem = problem();

        assert_eq!(problem.locations().len(), 4);
        assert_eq!(problem.vehicle_location(VehicleIdx::new(0)), LocationIdx::new(0));
        assert_eq!(problem.bin_location(BinIdx::new(2)), LocationIdx::new(3));
        assert_eq!(
            problem.distance(LocationIdx::new(0), LocationIdx::new(3)),
            3000.0
        );
        assert_eq!(
            problem.travel_time(LocationIdx::new(1), LocationIdx::new(3)),
            SignedDuration::from_mins(2)
        );
    }

    #[test]
    fn test_oversized_bin_is_marked_infeasible() {
        let problem = test_utils::create_line_problem(&[10.0, 500.0], &[100.0]);

        assert_eq!(problem.infeasible_reason(BinIdx::new(0)), None);
        assert_eq!(
            problem.infeasible_reason(BinIdx::new(1)),
            Some(UnassignedReason::Capacity)
        );
        assert!(!problem.is_compatible(BinIdx::new(1), VehicleIdx::new(0)));
        assert!(matches!(
            problem.warnings(),
            [Warning::InfeasibleNode { reason: UnassignedReason::Capacity, .. }]
        ));
    }

    #[test]
    fn test_missing_capability_is_marked_infeasible() {
        let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        input.bins[1].required_capabilities = vec!["commercial".to_owned()];

        let problem = test_utils::build_line_problem(input);

        assert_eq!(
            problem.infeasible_reason(BinIdx::new(1)),
            Some(UnassignedReason::NoVehicleAvailable)
        );
    }

    #[test]
    fn test_out_of_service_area_is_marked_infeasible() {
        let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        input.service_area = Some(BoundingBox {
            min_lat: 50.0,
            min_lon: 4.0,
            max_lat: 51.0,
            max_lon: 5.0,
        });
        input.bins[0].location = Location::from_lat_lon(52.0, 4.5);

        let problem = test_utils::build_line_problem(input);

        assert_eq!(
            problem.infeasible_reason(BinIdx::new(0)),
            Some(UnassignedReason::OutOfServiceArea)
        );
        assert_eq!(problem.infeasible_reason(BinIdx::new(1)), None);
    }

    #[test]
    fn test_matrix_dimension_mismatch() {
        let input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        let matrices = TravelMatrices {
            distances: vec![0.0; 4],
            times: vec![0.0; 4],
            costs: None,
        };

        let result = Problem::build(
            input,
            FetchedMatrices {
                matrices: Arc::new(matrices),
                estimated: false,
                provider_error: None,
            },
        );

        assert!(matches!(
            result,
            Err(ValidationError::MatrixDimensionMismatch { expected: 3, .. })
        ));
    }

    #[test]
    fn test_matrix_with_negative_time_is_rejected() {
        let input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        let mut times = vec![60.0; 9];
        times[4] = -5.0;
        let matrices = TravelMatrices {
            distances: vec![1000.0; 9],
            times,
            costs: None,
        };

        let result = Problem::build(
            input,
            FetchedMatrices {
                matrices: Arc::new(matrices),
                estimated: false,
                provider_error: None,
            },
        );

        assert!(matches!(result, Err(ValidationError::InvalidMatrixValue)));
    }

    #[test]
    fn test_derive_keeps_prior_problem_intact() {
        let problem = problem();
        let matrices = Arc::clone(problem.matrices());

        let changes = ChangeSet {
            removed_bin_ids: vec!["b1".to_owned()],
            added_bins: vec![test_utils::create_bin("b9", 0.05, 5.0)],
            ..ChangeSet::default()
        };

        let derived = problem.derive(&changes);

        assert_eq!(derived.removed, vec![BinIdx::new(1)]);
        assert_eq!(derived.added, vec![BinIdx::new(3)]);
        assert!(derived.conflicts.is_empty());
        assert!(derived.problem.is_withdrawn(BinIdx::new(1)));
        assert!(derived.problem.estimated_distances());
        assert_eq!(derived.problem.locations().len(), 5);
        assert_eq!(derived.problem.matrices().num_points(), 5);

        // prior version untouched
        assert!(!problem.is_withdrawn(BinIdx::new(1)));
        assert!(Arc::ptr_eq(problem.matrices(), &matrices));
        assert_eq!(problem.matrices().num_points(), 4);

        // known rows are copied verbatim
        assert_eq!(
            derived.problem.distance(LocationIdx::new(0), LocationIdx::new(3)),
            3000.0
        );
    }

    #[test]
    fn test_derive_reactivates_withdrawn_bin() {
        let problem = problem();
        let removed = problem.derive(&ChangeSet {
            removed_bin_ids: vec!["b0".to_owned()],
            ..ChangeSet::default()
        });

        let bin = removed.problem.bin(BinIdx::new(0)).clone();
        let readded = removed.problem.derive(&ChangeSet {
            added_bins: vec![bin],
            ..ChangeSet::default()
        });

        assert_eq!(readded.added, vec![BinIdx::new(0)]);
        assert!(!readded.problem.is_withdrawn(BinIdx::new(0)));
        assert_eq!(readded.problem.num_bins(), 3);
        // same location, the matrix is shared
        assert!(Arc::ptr_eq(readded.problem.matrices(), problem.matrices()));
    }

    #[test]
    fn test_derive_reports_conflicts() {
        let problem = problem();

        let derived = problem.derive(&ChangeSet {
            removed_bin_ids: vec!["missing".to_owned()],
            unavailable_vehicle_ids: vec!["ghost".to_owned()],
            added_bins: vec![test_utils::create_bin("b0", 0.0, 5.0)],
            ..ChangeSet::default()
        });

        assert_eq!(derived.conflicts.len(), 3);
        assert!(derived.removed.is_empty());
        assert!(derived.added.is_empty());
        assert!(Arc::ptr_eq(derived.problem.matrices(), problem.matrices()));
    }

    #[test]
    fn test_derive_condition_update_scales_travel_time() {
        let problem = problem();

        let derived = problem.derive(&ChangeSet {
            condition_updates: vec![ConditionUpdate {
                kind: ConditionKind::Traffic,
                area: None,
                travel_time_factor: 1.5,
            }],
            ..ChangeSet::default()
        });

        assert!(derived.conditions_changed);
        assert_eq!(
            derived
                .problem
                .travel_time(LocationIdx::new(0), LocationIdx::new(1)),
            SignedDuration::from_secs(90)
        );
        assert_eq!(
            problem.travel_time(LocationIdx::new(0), LocationIdx::new(1)),
            SignedDuration::from_secs(60)
        );
    }
}
