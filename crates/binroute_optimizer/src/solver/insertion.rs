use fxhash::FxHashSet;

use crate::{
    error::UnassignedReason,
    evaluator::schedule::InsertionFailure,
    problem::bin::BinIdx,
    solver::solution::{
        route::route_cost, route_id::RouteIdx, working_solution::WorkingSolution,
    },
};

/// Routes a bin may be inserted into.
#[derive(Debug, Clone, Default)]
pub enum InsertionScope {
    #[default]
    All,
    Routes(FxHashSet<RouteIdx>),
}

impl InsertionScope {
    pub fn contains(&self, route: RouteIdx) -> bool {
        match self {
            InsertionScope::All => true,
            InsertionScope::Routes(routes) => routes.contains(&route),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, InsertionScope::Routes(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    pub route: RouteIdx,
    pub position: usize,
    /// Weighted cost increase of the route.
    pub cost: f64,
}

/// Why the candidate positions of a bin were rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsertionAttempts {
    candidates: usize,
    capacity: usize,
    time: usize,
}

impl InsertionAttempts {
    pub fn reason(&self) -> UnassignedReason {
        if self.candidates == 0 {
            UnassignedReason::NoVehicleAvailable
        } else if self.time > 0 {
            UnassignedReason::TimeWindow
        } else {
            UnassignedReason::Capacity
        }
    }

    fn record(&mut self, failure: InsertionFailure) {
        match failure {
            InsertionFailure::Capacity => self.capacity += 1,
            InsertionFailure::Time => self.time += 1,
        }
    }
}

/// Cheapest feasible position for `bin` over `routes`. Ties keep the first
/// candidate, so routes and positions are preferred in ascending order.
pub fn best_insertion(
    solution: &WorkingSolution,
    bin: BinIdx,
    routes: impl IntoIterator<Item = RouteIdx>,
    attempts: &mut InsertionAttempts,
) -> Option<Insertion> {
    let problem = solution.problem();
    let weights = solution.weights();
    let mut best: Option<Insertion> = None;

    for route_id in routes {
        let route = solution.route(route_id);
        let vehicle = route.vehicle();

        if !problem.is_vehicle_available(vehicle) || !problem.is_compatible(bin, vehicle) {
            continue;
        }

        attempts.candidates += 1;

        let mut bins = Vec::with_capacity(route.len() + 1);
        for position in route.locked()..=route.len() {
            if let Err(failure) = route
                .schedule()
                .check_insertion(problem, vehicle, bin, position)
            {
                attempts.record(failure);
                if failure == InsertionFailure::Capacity {
                    // load does not depend on the position
                    break;
                }
                continue;
            }

            bins.clear();
            bins.extend_from_slice(&route.bins()[..position]);
            bins.push(bin);
            bins.extend_from_slice(&route.bins()[position..]);

            let (_, metrics) = route.simulate(problem, &bins);
            if !metrics.violations.is_empty() {
                attempts.record(InsertionFailure::Time);
                continue;
            }

            let cost = route_cost(weights, &metrics) - route.cost();
            if best.as_ref().is_none_or(|best| cost < best.cost) {
                best = Some(Insertion {
                    route: route_id,
                    position,
                    cost,
                });
            }
        }
    }

    best
}
