use std::{
    iter,
    ops::{Add, AddAssign},
};

use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    evaluator::score::Score,
    problem::{
        bin::BinIdx,
        objective_weights::{ComplianceTargets, ObjectiveWeights},
        problem::Problem,
        vehicle::Vehicle,
    },
    utils::time::hours,
};

/// Diesel combustion.
pub const CO2_KG_PER_LITER: f64 = 2.68;

/// Soft cost of leaving a bin out, scaled by `1 + priority`.
pub const UNASSIGNED_PENALTY: f64 = 10_000.0;

/// Raw objective values of a route or a whole solution, lower is better.
/// Values are additive over routes.
#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectiveVector {
    pub distance_km: f64,
    pub time_hours: f64,
    pub fuel_liters: f64,
    pub service_quality_penalty: f64,
    pub cost: f64,
    pub driver_load: f64,
    pub emissions_kg: f64,
}

impl ObjectiveVector {
    pub fn for_route(
        vehicle: &Vehicle,
        distance_meters: f64,
        duration: SignedDuration,
        access_difficulty: f64,
        service_quality_penalty: f64,
    ) -> Self {
        let distance_km = distance_meters / 1000.0;
        let time_hours = hours(duration);
        let fuel_liters = distance_km / vehicle.fuel_efficiency;
        let shift_hours = hours(vehicle.working_hours.duration());

        ObjectiveVector {
            distance_km,
            time_hours,
            fuel_liters,
            service_quality_penalty,
            cost: time_hours * vehicle.cost_per_hour + distance_km * vehicle.cost_per_km,
            driver_load: (time_hours / shift_hours).powi(2) + access_difficulty / 10.0,
            emissions_kg: fuel_liters * CO2_KG_PER_LITER,
        }
    }
}

impl Add for ObjectiveVector {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        ObjectiveVector {
            distance_km: self.distance_km + other.distance_km,
            time_hours: self.time_hours + other.time_hours,
            fuel_liters: self.fuel_liters + other.fuel_liters,
            service_quality_penalty: self.service_quality_penalty + other.service_quality_penalty,
            cost: self.cost + other.cost,
            driver_load: self.driver_load + other.driver_load,
            emissions_kg: self.emissions_kg + other.emissions_kg,
        }
    }
}

impl AddAssign for ObjectiveVector {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl iter::Sum for ObjectiveVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ObjectiveVector::default(), |acc, objectives| acc + objectives)
    }
}

#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintViolations {
    /// Waypoints reached after `end + flexibility`.
    pub time_window: usize,
    /// Routes over volume or weight capacity.
    pub capacity: usize,
    /// Routes over their working-hours window or driver-hours limit.
    pub driver_hours: usize,
}

impl ConstraintViolations {
    pub fn total(&self) -> usize {
        self.time_window + self.capacity + self.driver_hours
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for ConstraintViolations {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        ConstraintViolations {
            time_window: self.time_window + other.time_window,
            capacity: self.capacity + other.capacity,
            driver_hours: self.driver_hours + other.driver_hours,
        }
    }
}

impl AddAssign for ConstraintViolations {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Everything the evaluator needs to know about one route.
#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteMetrics {
    pub objectives: ObjectiveVector,
    pub violations: ConstraintViolations,
    pub served: usize,
    /// Waypoints served inside their nominal window (or without a window).
    pub on_time: usize,
}

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    pub time_window: f64,
    pub capacity: f64,
    pub driver_hours: f64,
    pub targets: ComplianceTargets,
    pub met: bool,
}

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: Score,
    pub scalar: f64,
    pub objectives: ObjectiveVector,
    pub violations: ConstraintViolations,
    pub compliance: ComplianceReport,
    pub weighted_cost: f64,
    pub unassigned_penalty: f64,
    pub routes_used: usize,
    pub served: usize,
    pub unassigned: usize,
}

pub fn unassigned_penalty(problem: &Problem, bin: BinIdx) -> f64 {
    UNASSIGNED_PENALTY * (1.0 + problem.priority(bin))
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        100.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Scores a set of routes plus unassigned bins. Every search component
/// compares candidates through this function.
pub fn evaluate_solution<'a, R, U>(
    problem: &Problem,
    routes: R,
    unassigned: U,
    weights: &ObjectiveWeights,
) -> Evaluation
where
    R: IntoIterator<Item = &'a RouteMetrics>,
    U: IntoIterator<Item = BinIdx>,
{
    let mut objectives = ObjectiveVector::default();
    let mut violations = ConstraintViolations::default();
    let mut weighted_cost = 0.0;
    let mut routes_used = 0;
    let mut served = 0;
    let mut on_time = 0;

    for metrics in routes {
        if metrics.served == 0 {
            continue;
        }

        routes_used += 1;
        served += metrics.served;
        on_time += metrics.on_time;
        objectives += metrics.objectives;
        violations += metrics.violations;
        weighted_cost += weights.weigh(&metrics.objectives);
    }

    let mut unassigned_count = 0;
    let mut penalty = 0.0;
    for bin in unassigned {
        unassigned_count += 1;
        penalty += unassigned_penalty(problem, bin);
    }

    let score = Score::new(violations.total() as f64, weighted_cost + penalty);

    let targets = problem.compliance_targets().clone();
    let time_window = percentage(on_time, served);
    let capacity = percentage(routes_used - violations.capacity.min(routes_used), routes_used);
    let driver_hours = percentage(
        routes_used - violations.driver_hours.min(routes_used),
        routes_used,
    );
    let met = time_window >= targets.time_window
        && capacity >= targets.capacity
        && driver_hours >= targets.driver_hours;

    Evaluation {
        scalar: score.scalar(),
        score,
        objectives,
        violations,
        compliance: ComplianceReport {
            time_window,
            capacity,
            driver_hours,
            targets,
            met,
        },
        weighted_cost,
        unassigned_penalty: penalty,
        routes_used,
        served,
        unassigned: unassigned_count,
    }
}
