mod common;

use std::{collections::HashSet, sync::Arc};

use binroute_matrix_providers::{
    cache::NoCache,
    error::MatrixProviderError,
    travel_matrices::TravelMatrices,
    travel_matrix_client::{TravelMatrixClient, TravelMatrixClientParams},
    travel_matrix_provider::{MatrixSource, TravelMatrixProvider},
};
use binroute_optimizer::{
    engine::{Engine, EngineParams},
    error::{UnassignedReason, Warning},
    solver::ls::local_search::LocalSearchParams,
};
use jiff::SignedDuration;

/// Answers with NaN distances and negative durations.
struct MalformedSource;

impl MatrixSource for MalformedSource {
    async fn fetch(
        &self,
        points: &[geo::Point],
        _profile: &str,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        let n = points.len();
        Ok(TravelMatrices {
            distances: vec![f64::NAN; n * n],
            times: vec![-5.0; n * n],
            costs: None,
        })
    }
}

fn engine() -> Engine {
    Engine::new(EngineParams {
        local_search: LocalSearchParams {
            max_iterations: 300,
            seed: 7,
            ..LocalSearchParams::default()
        },
        ..EngineParams::default()
    })
}

#[test]
fn test_single_vehicle_capacity_scenario() {
    let problem = common::problem(&[40.0, 40.0, 40.0], &[100.0]);

    let solution = engine().optimize(problem, SignedDuration::from_secs(10));

    assert_eq!(solution.assigned_count(), 2);
    assert_eq!(solution.unassigned.len(), 1);
    assert_eq!(solution.unassigned[0].reason, UnassignedReason::Capacity);

    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["unassigned"][0]["reason"], "capacity");
}

#[test]
fn test_tight_windows_are_all_served() {
    let solution = engine().optimize(common::tight_window_problem(), SignedDuration::from_secs(10));

    assert!(solution.unassigned.is_empty());
    assert_eq!(solution.metrics.violations.time_window, 0);
    assert_eq!(solution.metrics.violations.total(), 0);
}

#[test]
fn test_every_bin_appears_once() {
    let demands = [35.0, 10.0, 55.0, 20.0, 80.0, 15.0, 45.0, 30.0, 60.0, 25.0, 5.0, 70.0];
    let problem = common::problem(&demands, &[100.0, 100.0, 100.0]);

    let solution = engine().optimize(problem, SignedDuration::from_secs(10));

    let mut seen = HashSet::new();
    for route in &solution.routes {
        for bin_id in route.bin_ids() {
            assert!(seen.insert(bin_id.to_owned()), "{bin_id} served twice");
        }
    }
    for unassigned in &solution.unassigned {
        assert!(seen.insert(unassigned.bin_id.clone()));
    }

    assert_eq!(seen.len(), demands.len());
}

#[test]
fn test_returned_routes_respect_capacity_and_hours() {
    let demands = [35.0, 10.0, 55.0, 20.0, 80.0, 15.0, 45.0, 30.0];
    let problem = common::problem(&demands, &[100.0, 120.0]);

    let solution = engine().optimize(problem.clone(), SignedDuration::from_secs(10));

    assert_eq!(solution.metrics.violations.total(), 0);
    for route in &solution.routes {
        let vehicle = problem.vehicle(route.vehicle);
        let load = route.stops.last().map_or(0.0, |stop| stop.visit.load);

        assert!(load <= vehicle.capacity);
        assert!(route.end <= vehicle.working_hours.end);
    }
}

#[test]
fn test_optimize_is_deterministic() {
    let demands = [35.0, 10.0, 55.0, 20.0, 40.0, 15.0, 45.0, 30.0];
    let first = engine().optimize(
        common::problem(&demands, &[100.0, 100.0]),
        SignedDuration::from_secs(20),
    );
    let second = engine().optimize(
        common::problem(&demands, &[100.0, 100.0]),
        SignedDuration::from_secs(20),
    );

    let sequences = |solution: &binroute_optimizer::solution::solution::Solution| {
        solution
            .routes
            .iter()
            .map(|route| route.bin_ids().map(str::to_owned).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };

    assert_eq!(sequences(&first), sequences(&second));
    assert_eq!(first.metrics.score, second.metrics.score);
    assert_eq!(first.metrics.scalar, second.metrics.scalar);
}

#[tokio::test]
async fn test_malformed_provider_answer_degrades_to_estimates() {
    let client = TravelMatrixClient::new(
        NoCache,
        MalformedSource,
        TravelMatrixClientParams::default(),
    );
    let mut input = common::input(
        (0..3).map(|index| common::bin(index, 10.0)).collect(),
        vec![common::vehicle(0, 100.0)],
    );
    input.matrix_provider = Some(TravelMatrixProvider::External {
        profile: "truck".to_owned(),
    });

    let problem = input.build_problem(&client).await.unwrap();
    assert!(problem.estimated_distances());

    let solution = engine().optimize(Arc::new(problem), SignedDuration::from_secs(5));

    assert!(solution.metadata.estimated_distances);
    assert!(
        solution
            .warnings
            .iter()
            .any(|warning| matches!(warning, Warning::ProviderUnavailable { .. }))
    );
    assert_eq!(solution.assigned_count(), 3);
    assert_eq!(solution.metrics.violations.total(), 0);
}
