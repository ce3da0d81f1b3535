#![allow(dead_code)]

use std::sync::Arc;

use binroute_matrix_providers::{
    travel_matrices::TravelMatrices, travel_matrix_client::FetchedMatrices,
};
use binroute_optimizer::problem::{
    bin::Bin,
    input::ProblemInput,
    location::Location,
    problem::Problem,
    time_window::TimeWindow,
    vehicle::{Vehicle, WorkingHours},
};
use jiff::{SignedDuration, Timestamp};

pub fn base_time() -> Timestamp {
    "2025-06-10T06:00:00Z".parse().unwrap()
}

pub fn bin(index: usize, demand: f64) -> Bin {
    Bin {
        id: format!("b{index}"),
        location: Location::from_lat_lon(50.85, 4.35 + (index + 1) as f64 * 0.01),
        demand,
        ..Bin::default()
    }
}

pub fn vehicle(index: usize, capacity: f64) -> Vehicle {
    Vehicle {
        id: format!("v{index}"),
        capacity,
        weight_capacity: None,
        fuel_efficiency: 3.0,
        average_speed_kmh: 60.0,
        cost_per_hour: 30.0,
        cost_per_km: 0.5,
        home: Location::from_lat_lon(50.85, 4.35),
        working_hours: WorkingHours {
            start: base_time(),
            end: base_time() + SignedDuration::from_hours(10),
        },
        max_working_duration: None,
        driver_id: None,
        capabilities: Vec::new(),
    }
}

pub fn input(bins: Vec<Bin>, vehicles: Vec<Vehicle>) -> ProblemInput {
    serde_json::from_value::<ProblemInput>(serde_json::json!({
        "bins": bins,
        "vehicles": vehicles,
    }))
    .unwrap()
}

/// Straight line east of the depot, one kilometre and one minute per
/// 0.01 degree of longitude.
pub fn line_problem(input: ProblemInput) -> Arc<Problem> {
    let positions = input
        .locations()
        .iter()
        .map(|location| ((location.lon - 4.35) * 100.0).round())
        .collect::<Vec<_>>();

    let mut distances = Vec::new();
    let mut times = Vec::new();
    for from in &positions {
        for to in &positions {
            distances.push((from - to).abs() * 1000.0);
            times.push((from - to).abs() * 60.0);
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

    Arc::new(Problem::build(input, fetched).unwrap())
}

pub fn problem(demands: &[f64], capacities: &[f64]) -> Arc<Problem> {
    line_problem(input(
        demands
            .iter()
            .enumerate()
            .map(|(index, &demand)| bin(index, demand))
            .collect(),
        capacities
            .iter()
            .enumerate()
            .map(|(index, &capacity)| vehicle(index, capacity))
            .collect(),
    ))
}

/// Bins whose windows only allow visiting them in index order.
pub fn tight_window_problem() -> Arc<Problem> {
    let bins = (0..4)
        .map(|index| {
            let start = base_time() + SignedDuration::from_mins(10 * (index as i64 + 1));
            Bin {
                time_window: Some(TimeWindow::new(start, start + SignedDuration::from_mins(5))),
                ..bin(index, 10.0)
            }
        })
        .collect();

    line_problem(input(bins, vec![vehicle(0, 100.0), vehicle(1, 100.0)]))
}
