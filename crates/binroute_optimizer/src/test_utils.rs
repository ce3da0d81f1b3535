use std::sync::Arc;

use binroute_matrix_providers::{
    travel_matrices::TravelMatrices, travel_matrix_client::FetchedMatrices,
};
use jiff::{SignedDuration, Timestamp};

use crate::{
    error::UnassignedReason,
    problem::{
        bin::{Bin, BinIdx},
        input::ProblemInput,
        location::Location,
        problem::Problem,
        vehicle::{Vehicle, WorkingHours},
    },
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

const BASE_LAT: f64 = 50.85;
const BASE_LON: f64 = 4.35;

pub fn base_time() -> Timestamp {
    "2025-06-10T06:00:00Z".parse().unwrap()
}

pub fn create_bin(id: &str, lon_offset: f64, demand: f64) -> Bin {
    Bin {
        id: id.to_owned(),
        location: Location::from_lat_lon(BASE_LAT, BASE_LON + lon_offset),
        demand,
        ..Bin::default()
    }
}

pub fn create_vehicle(id: &str, capacity: f64) -> Vehicle {
    Vehicle {
        id: id.to_owned(),
        capacity,
        weight_capacity: None,
        fuel_efficiency: 3.0,
        average_speed_kmh: 60.0,
        cost_per_hour: 30.0,
        cost_per_km: 0.5,
        home: Location::from_lat_lon(BASE_LAT, BASE_LON),
        working_hours: WorkingHours {
            start: base_time(),
            end: base_time() + SignedDuration::from_hours(12),
        },
        max_working_duration: None,
        driver_id: None,
        capabilities: Vec::new(),
    }
}

pub fn create_test_input(bins: Vec<Bin>, vehicles: Vec<Vehicle>) -> ProblemInput {
    ProblemInput {
        bins,
        vehicles,
        depots: Vec::new(),
        weights: Default::default(),
        compliance_targets: Default::default(),
        max_optimization_time: None,
        organization_id: None,
        service_area: None,
        matrix_provider: None,
    }
}

/// Bins `b0..` spaced one kilometre apart east of the vehicles' home.
pub fn create_line_input(demands: &[f64], capacities: &[f64]) -> ProblemInput {
    let bins = demands
        .iter()
        .enumerate()
        .map(|(index, &demand)| create_bin(&format!("b{index}"), (index + 1) as f64 * 0.01, demand))
        .collect();
    let vehicles = capacities
        .iter()
        .enumerate()
        .map(|(index, &capacity)| create_vehicle(&format!("v{index}"), capacity))
        .collect();

    create_test_input(bins, vehicles)
}

fn line_km(location: &Location) -> f64 {
    ((location.lon - BASE_LON) * 100.0).round()
}

/// Builds the problem with exact line matrices: 1 km per 0.01 degree of
/// longitude, driven in one minute.
pub fn build_line_problem(input: ProblemInput) -> Problem {
    let positions = input.locations().iter().map(line_km).collect::<Vec<_>>();

    let mut distances = Vec::with_capacity(positions.len() * positions.len());
    let mut times = Vec::with_capacity(positions.len() * positions.len());
    for from in &positions {
        for to in &positions {
            let km = (from - to).abs();
            distances.push(km * 1000.0);
            times.push(km * 60.0);
        }
    }

    let fetched = FetchedMatrices {
        matrices: Arc::new(TravelMatrices {
            distances,
            times,
            costs: None,
        }),
        estimated: false,
        provider_error: None,
    };

    Problem::build(input, fetched).unwrap()
}

pub fn create_line_problem(demands: &[f64], capacities: &[f64]) -> Problem {
    build_line_problem(create_line_input(demands, capacities))
}

pub struct TestRoute {
    pub vehicle_id: usize,
    pub bins: Vec<usize>,
}

/// Solution with the given routes. Bins left out of every route are
/// unassigned for capacity.
pub fn create_test_working_solution(
    demands: &[f64],
    capacities: &[f64],
    routes: Vec<TestRoute>,
) -> WorkingSolution {
    let problem = Arc::new(create_line_problem(demands, capacities));
    let weights = problem.weights().clone();
    let mut solution = WorkingSolution::new(Arc::clone(&problem), weights);

    for route in &routes {
        let bins = route.bins.iter().map(|&bin| BinIdx::new(bin)).collect();
        solution.set_route_bins(RouteIdx::new(route.vehicle_id), bins);
    }

    for bin in problem.bins_iter() {
        if !solution.is_assigned(bin) {
            solution.set_unassigned(bin, UnassignedReason::Capacity);
        }
    }

    solution
}
