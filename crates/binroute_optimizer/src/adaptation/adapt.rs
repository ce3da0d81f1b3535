use std::{collections::BTreeMap, sync::Arc};

use fxhash::FxHashSet;
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, info, instrument};

use crate::{
    adaptation::change_set::ChangeSet,
    error::{UnassignedReason, Warning},
    problem::{bin::BinIdx, problem::Problem, vehicle::VehicleIdx},
    solution::{
        route::Route,
        solution::{Solution, SolutionMetadata},
    },
    solver::{
        construction::construct_solution::{insert_bins, insertion_queue},
        deadline::Deadline,
        insertion::InsertionScope,
        ls::local_search::{LocalSearch, LocalSearchParams},
        solution::{route::WorkingRoute, route_id::RouteIdx, working_solution::WorkingSolution},
    },
    utils::enumerate_idx::EnumerateIdx,
};

pub const ADAPTATION_ALGORITHM_NAME: &str = "incremental-repair";

/// Relative change of a route's travel time that makes it affected.
pub const MATERIAL_CHANGE_THRESHOLD: f64 = 0.1;

fn next_metadata(prior: &Solution, problem: &Problem) -> SolutionMetadata {
    SolutionMetadata {
        algorithm: ADAPTATION_ALGORITHM_NAME.to_owned(),
        iterations: 0,
        converged: false,
        elapsed: SignedDuration::ZERO,
        version: prior.version() + 1,
        parent_version: Some(prior.version()),
        estimated_distances: problem.estimated_distances(),
        seed: prior.metadata.seed,
    }
}

/// Leading stops departed at or before `as_of`.
fn serviced_prefix(route: &Route, as_of: Option<Timestamp>) -> usize {
    as_of.map_or(0, |as_of| {
        route
            .stops
            .iter()
            .take_while(|stop| stop.visit.departure <= as_of)
            .count()
    })
}

fn route_travel_seconds(problem: &Problem, route: &Route) -> f64 {
    let home = problem.vehicle_location(route.vehicle);
    let stops = route.stops.iter().map(|stop| problem.bin_location(stop.visit.bin));

    let mut previous = home;
    let mut total = 0.0;
    for location in stops.chain(std::iter::once(home)) {
        total += problem.travel_time(previous, location).as_secs_f64();
        previous = location;
    }

    total
}

fn travel_time_changed(before: &Problem, after: &Problem, route: &Route) -> bool {
    let old = route_travel_seconds(before, route);
    let new = route_travel_seconds(after, route);

    if old > 0.0 {
        (new - old).abs() / old > MATERIAL_CHANGE_THRESHOLD
    } else {
        new > 0.0
    }
}

/// Repairs `prior` for `changes`, touching only the routes the changes
/// affect. Every other route is shared with the prior solution.
#[instrument(skip_all, level = "debug")]
pub fn adapt(
    prior: &Solution,
    changes: &ChangeSet,
    requested: SignedDuration,
    params: &LocalSearchParams,
) -> Solution {
    let deadline = Deadline::new(changes.budget(requested));

    if deadline.is_expired() {
        info!(version = prior.version(), "Adaptation budget already spent");
        let before = prior.problem();
        return prior.republish(
            Arc::clone(before),
            next_metadata(prior, before),
            vec![Warning::BudgetExceeded {
                phase: "adaptation",
                budget: deadline.budget(),
            }],
        );
    }

    repair(prior, changes, &deadline, params)
}

fn repair(
    prior: &Solution,
    changes: &ChangeSet,
    deadline: &Deadline,
    params: &LocalSearchParams,
) -> Solution {
    let before = prior.problem();
    let serviced = prior
        .routes
        .iter()
        .map(|route| (route.vehicle, serviced_prefix(route, changes.as_of)))
        .collect::<Vec<_>>();
    let serviced_ids = prior
        .routes
        .iter()
        .zip(&serviced)
        .flat_map(|(route, &(_, locked))| route.bin_ids().take(locked))
        .collect::<FxHashSet<_>>();

    let mut warnings = Vec::new();
    let mut changes = changes.clone();
    changes.removed_bin_ids.retain(|bin_id| {
        let keep = !serviced_ids.contains(bin_id.as_str());
        if !keep {
            warnings.push(Warning::AdaptationConflict {
                message: format!("bin {bin_id} is already serviced"),
            });
        }
        keep
    });

    let derived = before.derive(&changes);
    warnings.extend(derived.conflicts);
    let problem = Arc::new(derived.problem);
    let weights = prior.weights.clone();

    let removed = derived.removed.iter().copied().collect::<FxHashSet<_>>();
    let unavailable = derived
        .unavailable
        .iter()
        .copied()
        .collect::<FxHashSet<VehicleIdx>>();

    let mut routes = problem
        .vehicles()
        .iter()
        .enumerate_idx()
        .map(|(vehicle, _): (VehicleIdx, _)| WorkingRoute::empty(&problem, vehicle, vehicle.get()))
        .collect::<Vec<_>>();
    let mut affected = FxHashSet::default();

    for (route, &(vehicle, locked)) in prior.routes.iter().zip(&serviced) {
        let is_affected = unavailable.contains(&vehicle)
            || route.stops.iter().any(|stop| removed.contains(&stop.visit.bin))
            || (derived.conditions_changed && travel_time_changed(before, &problem, route));

        let index = RouteIdx::from(vehicle);
        if is_affected {
            affected.insert(index);
        }

        routes[index] =
            WorkingRoute::from_route(&problem, &weights, route, locked, !is_affected, vehicle.get());
    }

    let unassigned = prior
        .unassigned
        .iter()
        .filter(|unassigned| !problem.is_withdrawn(unassigned.bin))
        .map(|unassigned| (unassigned.bin, unassigned.reason))
        .collect::<BTreeMap<BinIdx, UnassignedReason>>();

    let mut working =
        WorkingSolution::from_routes(Arc::clone(&problem), weights, routes, unassigned);

    let mut displaced = Vec::new();
    let mut affected_routes = affected.iter().copied().collect::<Vec<_>>();
    affected_routes.sort();

    for &route in &affected_routes {
        let vehicle = working.route(route).vehicle();
        if unavailable.contains(&vehicle) {
            while let Some(bin) = working.pop_bin(route) {
                displaced.push(bin);
            }
        } else {
            while !working.route(route).is_feasible()
                && let Some(bin) = working.pop_bin(route)
            {
                displaced.push(bin);
            }
        }
    }

    let queue = insertion_queue(&problem, derived.added.iter().copied().chain(displaced));
    let scope = InsertionScope::Routes(affected.clone());
    let leftover = insert_bins(&mut working, &queue, &scope, Some(deadline));

    if !leftover.is_empty() {
        for &bin in &leftover {
            working.set_unassigned(bin, UnassignedReason::AdaptationTimeout);
        }
        warnings.push(Warning::BudgetExceeded {
            phase: "adaptation insertion",
            budget: deadline.budget(),
        });
    }

    // routes untouched so far stay shared with the prior solution
    let touched = working
        .routes()
        .iter()
        .enumerate_idx()
        .filter(|(index, route): &(RouteIdx, &WorkingRoute)| {
            affected.contains(index) || (route.origin().is_none() && !route.is_empty())
        })
        .map(|(index, _)| index)
        .collect::<FxHashSet<_>>();

    let mut iterations = 0;
    let mut converged = true;
    if !touched.is_empty() && leftover.is_empty() {
        let params = LocalSearchParams {
            annealing: None,
            enable_vehicle_reassignment: false,
            restrict_to: Some(touched),
            ..params.clone()
        };
        let outcome = LocalSearch::new(params).run(&mut working, deadline);
        iterations = outcome.iterations;
        converged = outcome.converged;

        if outcome.deadline_reached {
            warnings.push(Warning::BudgetExceeded {
                phase: "adaptation local search",
                budget: deadline.budget(),
            });
        }
    }

    warnings.extend(problem.warnings().iter().cloned());

    let mut metadata = next_metadata(prior, &problem);
    metadata.iterations = iterations;
    metadata.converged = converged;
    metadata.elapsed = deadline.elapsed();

    debug!(
        affected = affected_routes.len(),
        queued = queue.len(),
        leftover = leftover.len(),
        "Adaptation repaired routes"
    );

    Solution::from_working(&working, metadata, warnings)
}
