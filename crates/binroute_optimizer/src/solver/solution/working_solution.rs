use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::UnassignedReason,
    evaluator::objective::{Evaluation, evaluate_solution, unassigned_penalty},
    problem::{
        bin::BinIdx, objective_weights::ObjectiveWeights, problem::Problem, vehicle::VehicleIdx,
    },
    solver::solution::{route::WorkingRoute, route_id::RouteIdx},
    utils::enumerate_idx::EnumerateIdx,
};

#[derive(Debug, Clone)]
pub struct WorkingSolution {
    problem: Arc<Problem>,
    weights: ObjectiveWeights,
    routes: Vec<WorkingRoute>,
    unassigned: BTreeMap<BinIdx, UnassignedReason>,
    next_version: usize,
}

impl WorkingSolution {
    /// One empty route per vehicle, nothing assigned yet.
    pub fn new(problem: Arc<Problem>, weights: ObjectiveWeights) -> Self {
        let routes = problem
            .vehicles()
            .iter()
            .enumerate_idx()
            .map(|(vehicle, _): (VehicleIdx, _)| WorkingRoute::empty(&problem, vehicle, vehicle.get()))
            .collect::<Vec<_>>();
        let next_version = routes.len();

        WorkingSolution {
            problem,
            weights,
            routes,
            unassigned: BTreeMap::new(),
            next_version,
        }
    }

    /// `routes` must hold one route per vehicle, in fleet order.
    pub fn from_routes(
        problem: Arc<Problem>,
        weights: ObjectiveWeights,
        routes: Vec<WorkingRoute>,
        unassigned: BTreeMap<BinIdx, UnassignedReason>,
    ) -> Self {
        let next_version = routes
            .iter()
            .map(|route| route.version() + 1)
            .max()
            .unwrap_or(0);

        WorkingSolution {
            problem,
            weights,
            routes,
            unassigned,
            next_version,
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn problem_arc(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn routes(&self) -> &[WorkingRoute] {
        &self.routes
    }

    pub fn route(&self, index: RouteIdx) -> &WorkingRoute {
        &self.routes[index]
    }

    pub fn route_indices(&self) -> impl Iterator<Item = RouteIdx> + use<> {
        (0..self.routes.len()).map(RouteIdx::new)
    }

    pub fn unassigned(&self) -> &BTreeMap<BinIdx, UnassignedReason> {
        &self.unassigned
    }

    pub fn is_assigned(&self, bin: BinIdx) -> bool {
        self.routes.iter().any(|route| route.contains(bin))
    }

    fn bump_version(&mut self) -> usize {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    pub fn set_route_bins(&mut self, route: RouteIdx, bins: Vec<BinIdx>) {
        let version = self.bump_version();
        let problem = Arc::clone(&self.problem);
        self.routes[route].set_bins(&problem, &self.weights, bins, version);
    }

    pub fn insert(&mut self, route: RouteIdx, position: usize, bin: BinIdx) {
        let mut bins = self.routes[route].bins().to_vec();
        bins.insert(position, bin);
        self.unassigned.remove(&bin);
        self.set_route_bins(route, bins);
    }

    pub fn pop_bin(&mut self, route: RouteIdx) -> Option<BinIdx> {
        let version = self.bump_version();
        let problem = Arc::clone(&self.problem);
        self.routes[route].pop(&problem, &self.weights, version)
    }

    pub fn set_unassigned(&mut self, bin: BinIdx, reason: UnassignedReason) {
        self.unassigned.insert(bin, reason);
    }

    /// Sum of route costs plus the unassigned penalty, the value local search
    /// minimizes.
    pub fn total_cost(&self) -> f64 {
        self.routes.iter().map(WorkingRoute::cost).sum::<f64>()
            + self
                .unassigned
                .keys()
                .map(|&bin| unassigned_penalty(&self.problem, bin))
                .sum::<f64>()
    }

    pub fn evaluation(&self) -> Evaluation {
        evaluate_solution(
            &self.problem,
            self.routes.iter().map(WorkingRoute::metrics),
            self.unassigned.keys().copied(),
            &self.weights,
        )
    }

    pub fn is_feasible(&self) -> bool {
        self.routes.iter().all(WorkingRoute::is_feasible)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils;

    use super::*;

    #[test]
    fn test_insert_and_cost() {
        let problem = Arc::new(test_utils::create_line_problem(&[10.0, 20.0], &[100.0, 100.0]));
        let mut solution = WorkingSolution::new(Arc::clone(&problem), ObjectiveWeights::default());

        solution.set_unassigned(BinIdx::new(0), UnassignedReason::Capacity);
        solution.set_unassigned(BinIdx::new(1), UnassignedReason::Capacity);
        let before = solution.total_cost();

        solution.insert(RouteIdx::new(1), 0, BinIdx::new(0));

        assert!(solution.is_assigned(BinIdx::new(0)));
        assert!(!solution.unassigned().contains_key(&BinIdx::new(0)));
        assert!(solution.total_cost() < before);
        assert_eq!(solution.route(RouteIdx::new(1)).version(), 2);
        assert_eq!(solution.evaluation().routes_used, 1);
        assert!(solution.is_feasible());
    }

    #[test]
    fn test_versions_are_unique() {
        let problem = Arc::new(test_utils::create_line_problem(&[10.0, 20.0], &[100.0, 100.0]));
        let mut solution = WorkingSolution::new(problem, ObjectiveWeights::default());

        solution.insert(RouteIdx::new(0), 0, BinIdx::new(0));
        solution.insert(RouteIdx::new(1), 0, BinIdx::new(1));

        let versions = solution
            .routes()
            .iter()
            .map(WorkingRoute::version)
            .collect::<Vec<_>>();
        assert_eq!(versions, vec![2, 3]);
    }
}
