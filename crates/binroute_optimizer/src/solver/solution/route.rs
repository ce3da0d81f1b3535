use std::sync::Arc;

use crate::{
    evaluator::{
        objective::RouteMetrics,
        schedule::{RouteSchedule, Visit},
        score::VIOLATION_PENALTY,
    },
    problem::{
        bin::BinIdx, objective_weights::ObjectiveWeights, problem::Problem, vehicle::VehicleIdx,
    },
    solution::route::{Route, RouteStop},
};

/// Mutable route owned by a single search run.
#[derive(Debug, Clone)]
pub struct WorkingRoute {
    vehicle: VehicleIdx,
    bins: Vec<BinIdx>,

    /// Waypoints that are already serviced and cannot be moved.
    locked: usize,

    /// Prior visits whose times are kept while the route prefix matches.
    anchor: Arc<[Visit]>,

    schedule: RouteSchedule,
    metrics: RouteMetrics,
    cost: f64,
    version: usize,

    /// Published route this one was rebuilt from, while it is unchanged.
    origin: Option<Arc<Route>>,
}

pub fn route_cost(weights: &ObjectiveWeights, metrics: &RouteMetrics) -> f64 {
    weights.weigh(&metrics.objectives) + metrics.violations.total() as f64 * VIOLATION_PENALTY
}

impl WorkingRoute {
    pub fn empty(problem: &Problem, vehicle: VehicleIdx, version: usize) -> Self {
        WorkingRoute {
            vehicle,
            bins: Vec::new(),
            locked: 0,
            anchor: Arc::from(Vec::<Visit>::new()),
            schedule: RouteSchedule::compute(problem, vehicle, &[]),
            metrics: RouteMetrics::default(),
            cost: 0.0,
            version,
            origin: None,
        }
    }

    /// Rebuilds a route from a published one. The first `locked` waypoints
    /// become immovable. With `keep_times` every prior visit keeps its
    /// recorded times and metrics, otherwise only the locked prefix does.
    pub fn from_route(
        problem: &Problem,
        weights: &ObjectiveWeights,
        route: &Arc<Route>,
        locked: usize,
        keep_times: bool,
        version: usize,
    ) -> Self {
        let visits = route.stops.iter().map(|stop| stop.visit).collect::<Vec<_>>();
        let locked = locked.min(visits.len());

        let bins = visits
            .iter()
            .map(|visit| visit.bin)
            .filter(|&bin| !problem.is_withdrawn(bin))
            .collect::<Vec<_>>();

        let anchor: Arc<[Visit]> = if keep_times {
            Arc::from(visits)
        } else {
            Arc::from(&visits[..locked])
        };

        let schedule = RouteSchedule::compute_anchored(problem, route.vehicle, &anchor, &bins);
        let unchanged = keep_times && bins.len() == route.stops.len();
        let metrics = if unchanged {
            route.metrics
        } else {
            schedule.metrics(problem, route.vehicle)
        };

        WorkingRoute {
            vehicle: route.vehicle,
            bins,
            locked,
            anchor,
            cost: route_cost(weights, &metrics),
            schedule,
            metrics,
            version,
            origin: unchanged.then(|| Arc::clone(route)),
        }
    }

    pub fn vehicle(&self) -> VehicleIdx {
        self.vehicle
    }

    pub fn bins(&self) -> &[BinIdx] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn contains(&self, bin: BinIdx) -> bool {
        self.bins.contains(&bin)
    }

    pub fn locked(&self) -> usize {
        self.locked
    }

    pub fn anchor(&self) -> &[Visit] {
        &self.anchor
    }

    pub fn schedule(&self) -> &RouteSchedule {
        &self.schedule
    }

    pub fn metrics(&self) -> &RouteMetrics {
        &self.metrics
    }

    /// Weighted objective cost, violations folded in.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn origin(&self) -> Option<&Arc<Route>> {
        self.origin.as_ref()
    }

    pub fn is_feasible(&self) -> bool {
        self.metrics.violations.is_empty()
    }

    pub fn capacity_utilization(&self, problem: &Problem) -> f64 {
        self.schedule.load / problem.vehicle(self.vehicle).capacity
    }

    /// Schedule and metrics the route would have with `bins`.
    pub fn simulate(&self, problem: &Problem, bins: &[BinIdx]) -> (RouteSchedule, RouteMetrics) {
        let schedule = RouteSchedule::compute_anchored(problem, self.vehicle, &self.anchor, bins);
        let metrics = schedule.metrics(problem, self.vehicle);
        (schedule, metrics)
    }

    pub fn set_bins(
        &mut self,
        problem: &Problem,
        weights: &ObjectiveWeights,
        bins: Vec<BinIdx>,
        version: usize,
    ) {
        let (schedule, metrics) = self.simulate(problem, &bins);

        self.bins = bins;
        self.cost = route_cost(weights, &metrics);
        self.schedule = schedule;
        self.metrics = metrics;
        self.version = version;
        self.origin = None;
    }

    /// Removes and returns the last movable bin.
    pub fn pop(
        &mut self,
        problem: &Problem,
        weights: &ObjectiveWeights,
        version: usize,
    ) -> Option<BinIdx> {
        if self.bins.len() <= self.locked {
            return None;
        }

        let mut bins = self.bins.clone();
        let bin = bins.pop();
        self.set_bins(problem, weights, bins, version);
        bin
    }

    pub fn to_route(&self, problem: &Problem) -> Arc<Route> {
        if let Some(origin) = &self.origin {
            return Arc::clone(origin);
        }

        let vehicle = problem.vehicle(self.vehicle);
        let objectives = &self.metrics.objectives;

        Arc::new(Route {
            vehicle_id: vehicle.id.clone(),
            vehicle: self.vehicle,
            stops: self
                .schedule
                .visits
                .iter()
                .map(|visit| RouteStop {
                    bin_id: problem.bin(visit.bin).id.clone(),
                    visit: *visit,
                })
                .collect(),
            start: self.schedule.start,
            end: self.schedule.end,
            distance_km: objectives.distance_km,
            duration: self.schedule.duration(),
            fuel_liters: objectives.fuel_liters,
            cost: objectives.cost,
            emissions_kg: objectives.emissions_kg,
            service_quality: if self.metrics.served == 0 {
                1.0
            } else {
                self.metrics.on_time as f64 / self.metrics.served as f64
            },
            capacity_utilization: self.capacity_utilization(problem),
            slack_score: self.schedule.slack_score(problem),
            locked: self.locked,
            metrics: self.metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::test_utils;

    use super::*;

    #[test]
    fn test_set_bins_updates_cost_and_version() {
        let problem = test_utils::create_line_problem(&[10.0, 20.0], &[100.0]);
        let weights = ObjectiveWeights::default();
        let mut route = WorkingRoute::empty(&problem, VehicleIdx::new(0), 0);

        assert!(route.is_empty());
        assert_eq!(route.cost(), 0.0);

        route.set_bins(&problem, &weights, vec![BinIdx::new(0), BinIdx::new(1)], 1);

        assert_eq!(route.len(), 2);
        assert_eq!(route.version(), 1);
        assert!(route.cost() > 0.0);
        assert!(route.is_feasible());
        assert!((route.capacity_utilization(&problem) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_from_route_keeps_published_route() {
        let problem = test_utils::create_line_problem(&[10.0, 20.0, 30.0], &[100.0]);
        let weights = ObjectiveWeights::default();
        let mut route = WorkingRoute::empty(&problem, VehicleIdx::new(0), 0);
        route.set_bins(
            &problem,
            &weights,
            vec![BinIdx::new(0), BinIdx::new(1), BinIdx::new(2)],
            1,
        );
        let published = route.to_route(&problem);

        let rebuilt = WorkingRoute::from_route(&problem, &weights, &published, 1, true, 7);

        assert_eq!(rebuilt.locked(), 1);
        assert_eq!(rebuilt.metrics(), &published.metrics);
        assert!(Arc::ptr_eq(&rebuilt.to_route(&problem), &published));
    }

    #[test]
    fn test_from_route_drops_withdrawn_bins() {
        let problem = test_utils::create_line_problem(&[10.0, 20.0, 30.0], &[100.0]);
        let weights = ObjectiveWeights::default();
        let mut route = WorkingRoute::empty(&problem, VehicleIdx::new(0), 0);
        route.set_bins(
            &problem,
            &weights,
            vec![BinIdx::new(0), BinIdx::new(1), BinIdx::new(2)],
            1,
        );
        let published = route.to_route(&problem);

        let derived = problem.derive(&crate::adaptation::change_set::ChangeSet {
            removed_bin_ids: vec!["b1".to_owned()],
            ..Default::default()
        });
        let rebuilt =
            WorkingRoute::from_route(&derived.problem, &weights, &published, 0, false, 2);

        assert_eq!(rebuilt.bins(), &[BinIdx::new(0), BinIdx::new(2)]);
        assert!(rebuilt.origin().is_none());
        // b2 now follows b0 directly
        assert_eq!(
            rebuilt.schedule().visits[1].arrival,
            published.stops[0].visit.departure + SignedDuration::from_mins(2)
        );
    }

    #[test]
    fn test_pop_respects_locked_prefix() {
        let problem = test_utils::create_line_problem(&[10.0, 20.0], &[100.0]);
        let weights = ObjectiveWeights::default();
        let mut route = WorkingRoute::empty(&problem, VehicleIdx::new(0), 0);
        route.set_bins(&problem, &weights, vec![BinIdx::new(0), BinIdx::new(1)], 1);
        let published = route.to_route(&problem);

        let mut rebuilt = WorkingRoute::from_route(&problem, &weights, &published, 1, false, 2);

        assert_eq!(rebuilt.pop(&problem, &weights, 3), Some(BinIdx::new(1)));
        assert_eq!(rebuilt.pop(&problem, &weights, 4), None);
        assert_eq!(rebuilt.bins(), &[BinIdx::new(0)]);
    }
}
