use smallvec::SmallVec;

use crate::{
    evaluator::{objective::RouteMetrics, schedule::RouteSchedule},
    problem::bin::BinIdx,
    solver::{
        ls::{
            inter_swap::InterSwapOperator, or_opt::OrOptOperator, two_opt::TwoOptOperator,
            vehicle_reassignment::VehicleReassignmentOperator,
        },
        solution::{route::route_cost, route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// New bin sequence for one route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteChange {
    pub route: RouteIdx,
    pub bins: Vec<BinIdx>,
}

pub type RouteChanges = SmallVec<[RouteChange; 2]>;
pub type UpdatedRoutes = SmallVec<[RouteIdx; 2]>;

pub trait LocalSearchOperator: Sized {
    fn generate_moves<C>(solution: &WorkingSolution, pair: (RouteIdx, RouteIdx), consumer: C)
    where
        C: FnMut(Self);

    fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges;

    fn updated_routes(&self) -> UpdatedRoutes;

    /// Cost change of the move, `None` when it breaks a constraint.
    fn delta(&self, solution: &WorkingSolution) -> Option<f64> {
        evaluate_changes(solution, &self.route_changes(solution))
    }
}

fn simulate_change(
    solution: &WorkingSolution,
    change: &RouteChange,
) -> Option<(RouteSchedule, RouteMetrics)> {
    let problem = solution.problem();
    let route = solution.route(change.route);
    let vehicle = route.vehicle();
    let locked = route.locked();

    if change.bins.len() < locked || change.bins[..locked] != route.bins()[..locked] {
        return None;
    }

    if !change.bins.is_empty() && !problem.is_vehicle_available(vehicle) {
        return None;
    }

    if change.bins[locked..]
        .iter()
        .any(|&bin| !problem.is_compatible(bin, vehicle))
    {
        return None;
    }

    let (schedule, metrics) = route.simulate(problem, &change.bins);
    schedule.is_feasible().then_some((schedule, metrics))
}

/// Sum of the route cost changes, or `None` if any changed route would
/// violate a constraint or displace a serviced waypoint.
pub fn evaluate_changes(solution: &WorkingSolution, changes: &[RouteChange]) -> Option<f64> {
    let mut delta = 0.0;

    for change in changes {
        let (_, metrics) = simulate_change(solution, change)?;
        delta += route_cost(solution.weights(), &metrics) - solution.route(change.route).cost();
    }

    Some(delta)
}

#[derive(Debug, Clone)]
pub enum LocalSearchMove {
    /// Reverses a segment inside one route.
    TwoOpt(TwoOptOperator),
    /// Relocates a chain of 1 to 3 waypoints, within a route or to another one.
    OrOpt(OrOptOperator),
    /// Exchanges one waypoint of each route.
    InterSwap(InterSwapOperator),
    /// Moves a small segment to a less utilized vehicle.
    VehicleReassignment(VehicleReassignmentOperator),
}

impl LocalSearchMove {
    pub fn operator_name(&self) -> &'static str {
        match self {
            LocalSearchMove::TwoOpt(_) => "Two-Opt",
            LocalSearchMove::OrOpt(_) => "Or-Opt",
            LocalSearchMove::InterSwap(_) => "Inter-Swap",
            LocalSearchMove::VehicleReassignment(_) => "Vehicle-Reassignment",
        }
    }

    pub fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges {
        match self {
            LocalSearchMove::TwoOpt(op) => op.route_changes(solution),
            LocalSearchMove::OrOpt(op) => op.route_changes(solution),
            LocalSearchMove::InterSwap(op) => op.route_changes(solution),
            LocalSearchMove::VehicleReassignment(op) => op.route_changes(solution),
        }
    }

    pub fn updated_routes(&self) -> UpdatedRoutes {
        match self {
            LocalSearchMove::TwoOpt(op) => op.updated_routes(),
            LocalSearchMove::OrOpt(op) => op.updated_routes(),
            LocalSearchMove::InterSwap(op) => op.updated_routes(),
            LocalSearchMove::VehicleReassignment(op) => op.updated_routes(),
        }
    }

    pub fn delta(&self, solution: &WorkingSolution) -> Option<f64> {
        evaluate_changes(solution, &self.route_changes(solution))
    }

    pub fn apply(&self, solution: &mut WorkingSolution) {
        for change in self.route_changes(solution) {
            solution.set_route_bins(change.route, change.bins);
        }
    }
}

/// Feeds every move of the enabled operators for the route pair.
pub fn generate_moves<C>(
    solution: &WorkingSolution,
    pair: (RouteIdx, RouteIdx),
    enable_vehicle_reassignment: bool,
    mut consumer: C,
) where
    C: FnMut(LocalSearchMove),
{
    TwoOptOperator::generate_moves(solution, pair, |op| consumer(LocalSearchMove::TwoOpt(op)));
    OrOptOperator::generate_moves(solution, pair, |op| consumer(LocalSearchMove::OrOpt(op)));
    InterSwapOperator::generate_moves(solution, pair, |op| {
        consumer(LocalSearchMove::InterSwap(op))
    });

    if enable_vehicle_reassignment {
        VehicleReassignmentOperator::generate_moves(solution, pair, |op| {
            consumer(LocalSearchMove::VehicleReassignment(op))
        });
    }
}
