use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::{
    evaluator::objective::{ConstraintViolations, ObjectiveVector, RouteMetrics},
    problem::{
        bin::{BinIdx, MAX_PRIORITY},
        location::LocationIdx,
        problem::Problem,
        vehicle::VehicleIdx,
    },
    utils::time::hours,
};

/// Service-quality cost per hour of lateness inside the flexibility slack.
pub const LATENESS_PENALTY_PER_HOUR: f64 = 10.0;

const CAPACITY_EPSILON: f64 = 1e-9;

/// Timing and load at one waypoint.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Visit {
    #[serde(skip)]
    pub bin: BinIdx,
    pub arrival: Timestamp,
    pub service_start: Timestamp,
    pub departure: Timestamp,
    /// Volume on board after servicing this bin.
    pub load: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionFailure {
    Capacity,
    Time,
}

/// Forward simulation of a route: the vehicle leaves home at the start of
/// its shift, visits every bin in order and drives back home.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSchedule {
    pub visits: Vec<Visit>,
    /// Service-quality penalty per visit.
    pub penalties: Vec<f64>,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Meters, including the return leg.
    pub distance: f64,
    pub access_difficulty: f64,
    pub load: f64,
    pub weight: f64,
    pub violations: ConstraintViolations,
    pub on_time: usize,
}

impl RouteSchedule {
    pub fn compute(problem: &Problem, vehicle: VehicleIdx, bins: &[BinIdx]) -> Self {
        Self::compute_anchored(problem, vehicle, &[], bins)
    }

    /// Like [`RouteSchedule::compute`], but the leading visits matching
    /// `anchor` keep their recorded times. Serviced waypoints are anchored
    /// so that later changes to the problem never move them.
    pub fn compute_anchored(
        problem: &Problem,
        vehicle_id: VehicleIdx,
        anchor: &[Visit],
        bins: &[BinIdx],
    ) -> Self {
        let vehicle = problem.vehicle(vehicle_id);
        let home = problem.vehicle_location(vehicle_id);
        let start = vehicle.shift_start();

        let anchored = anchor
            .iter()
            .zip(bins)
            .take_while(|(visit, bin)| visit.bin == **bin)
            .count();

        let mut visits = Vec::with_capacity(bins.len());
        let mut penalties = Vec::with_capacity(bins.len());
        let mut violations = ConstraintViolations::default();
        let mut on_time = 0;
        let mut distance = 0.0;
        let mut access_difficulty = 0.0;
        let mut load = 0.0;
        let mut weight = 0.0;
        let mut time = start;
        let mut previous = home;

        for (position, &bin_id) in bins.iter().enumerate() {
            let bin = problem.bin(bin_id);
            let location = problem.bin_location(bin_id);

            distance += problem.distance(previous, location);
            access_difficulty += bin.access_difficulty;
            load += bin.demand;
            weight += bin.weight;

            let visit = if position < anchored {
                Visit {
                    load,
                    weight,
                    ..anchor[position]
                }
            } else {
                let arrival = time + problem.travel_time(previous, location);
                let service_start = bin
                    .time_window
                    .as_ref()
                    .map_or(arrival, |window| window.service_start(arrival));

                Visit {
                    bin: bin_id,
                    arrival,
                    service_start,
                    departure: service_start + bin.service_duration,
                    load,
                    weight,
                }
            };

            let mut penalty =
                problem.priority(bin_id) / MAX_PRIORITY * hours(visit.service_start.duration_since(start));

            match &bin.time_window {
                Some(window) => {
                    if !window.is_satisfied(visit.service_start) {
                        violations.time_window += 1;
                    }
                    if window.is_met(visit.service_start) {
                        on_time += 1;
                    }
                    penalty += hours(window.lateness(visit.service_start))
                        * LATENESS_PENALTY_PER_HOUR
                        * window.priority;
                }
                None => on_time += 1,
            }

            time = visit.departure;
            previous = location;
            visits.push(visit);
            penalties.push(penalty);
        }

        let end = if bins.is_empty() {
            start
        } else {
            distance += problem.distance(previous, home);
            time + problem.travel_time(previous, home)
        };

        if load > vehicle.capacity + CAPACITY_EPSILON
            || weight > vehicle.weight_capacity() + CAPACITY_EPSILON
        {
            violations.capacity = 1;
        }

        if end > vehicle.working_hours.end || end.duration_since(start) > vehicle.max_duration() {
            violations.driver_hours = 1;
        }

        RouteSchedule {
            visits,
            penalties,
            start,
            end,
            distance,
            access_difficulty,
            load,
            weight,
            violations,
            on_time,
        }
    }

    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }

    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn service_quality_penalty(&self) -> f64 {
        self.penalties.iter().sum()
    }

    pub fn metrics(&self, problem: &Problem, vehicle: VehicleIdx) -> RouteMetrics {
        if self.visits.is_empty() {
            return RouteMetrics::default();
        }

        RouteMetrics {
            objectives: ObjectiveVector::for_route(
                problem.vehicle(vehicle),
                self.distance,
                self.duration(),
                self.access_difficulty,
                self.service_quality_penalty(),
            ),
            violations: self.violations,
            served: self.visits.len(),
            on_time: self.on_time,
        }
    }

    /// Mean remaining slack before the latest allowed arrival, normalized by
    /// window length. Waypoints without a window count as fully flexible.
    pub fn slack_score(&self, problem: &Problem) -> f64 {
        if self.visits.is_empty() {
            return 1.0;
        }

        let total = self
            .visits
            .iter()
            .map(|visit| match &problem.bin(visit.bin).time_window {
                Some(window) => {
                    let length = window.latest_arrival().duration_since(window.start);
                    let slack = window.latest_arrival().duration_since(visit.service_start);
                    if length.is_zero() {
                        0.0
                    } else {
                        (slack.as_secs_f64() / length.as_secs_f64()).clamp(0.0, 1.0)
                    }
                }
                None => 1.0,
            })
            .sum::<f64>();

        total / self.visits.len() as f64
    }

    /// Checks whether `bin` fits before `position` of the route this schedule
    /// was computed for, propagating the time shift forward until it is
    /// absorbed by waiting.
    pub fn check_insertion(
        &self,
        problem: &Problem,
        vehicle_id: VehicleIdx,
        bin_id: BinIdx,
        position: usize,
    ) -> Result<(), InsertionFailure> {
        let vehicle = problem.vehicle(vehicle_id);
        let bin = problem.bin(bin_id);

        if self.load + bin.demand > vehicle.capacity + CAPACITY_EPSILON
            || self.weight + bin.weight > vehicle.weight_capacity() + CAPACITY_EPSILON
        {
            return Err(InsertionFailure::Capacity);
        }

        let home = problem.vehicle_location(vehicle_id);
        let location = problem.bin_location(bin_id);

        let (mut time, previous) = match position.checked_sub(1) {
            Some(index) => (
                self.visits[index].departure,
                problem.bin_location(self.visits[index].bin),
            ),
            None => (self.start, home),
        };

        let arrival = time + problem.travel_time(previous, location);
        let service_start = bin
            .time_window
            .as_ref()
            .map_or(arrival, |window| window.service_start(arrival));
        if bin
            .time_window
            .as_ref()
            .is_some_and(|window| !window.is_satisfied(service_start))
        {
            return Err(InsertionFailure::Time);
        }

        time = service_start + bin.service_duration;
        let mut previous: LocationIdx = location;

        for visit in &self.visits[position..] {
            let next = problem.bin(visit.bin);
            let next_location = problem.bin_location(visit.bin);
            let arrival = time + problem.travel_time(previous, next_location);
            let service_start = next
                .time_window
                .as_ref()
                .map_or(arrival, |window| window.service_start(arrival));

            if service_start <= visit.service_start {
                // the remaining schedule is unchanged or earlier
                return Ok(());
            }

            if next
                .time_window
                .as_ref()
                .is_some_and(|window| !window.is_satisfied(service_start))
            {
                return Err(InsertionFailure::Time);
            }

            time = service_start + next.service_duration;
            previous = next_location;
        }

        let end = time + problem.travel_time(previous, home);
        if end > vehicle.working_hours.end || end.duration_since(self.start) > vehicle.max_duration()
        {
            return Err(InsertionFailure::Time);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::{problem::time_window::TimeWindow, test_utils};

    use super::*;

    fn bins(indices: &[usize]) -> Vec<BinIdx> {
        indices.iter().copied().map(BinIdx::new).collect()
    }

    #[test]
    fn test_compute_schedule() {
        let problem = test_utils::create_line_problem(&[10.0, 20.0, 30.0], &[100.0]);
        let schedule = RouteSchedule::compute(&problem, VehicleIdx::new(0), &bins(&[0, 1, 2]));
        let start = test_utils::base_time();

        assert_eq!(schedule.visits.len(), 3);
        assert_eq!(schedule.visits[0].arrival, start + SignedDuration::from_mins(1));
        // 1 min travel + 3 min service + 1 min travel
        assert_eq!(schedule.visits[1].arrival, start + SignedDuration::from_mins(5));
        assert_eq!(schedule.visits[2].load, 60.0);
        assert_eq!(schedule.distance, 6000.0);
        assert_eq!(schedule.end, start + SignedDuration::from_mins(3 + 9 + 3));
        assert!(schedule.is_feasible());
        assert_eq!(schedule.on_time, 3);
    }

    #[test]
    fn test_empty_route_has_no_cost() {
        let problem = test_utils::create_line_problem(&[10.0], &[100.0]);
        let schedule = RouteSchedule::compute(&problem, VehicleIdx::new(0), &[]);

        assert_eq!(schedule.distance, 0.0);
        assert_eq!(schedule.duration(), SignedDuration::ZERO);
        assert_eq!(
            schedule.metrics(&problem, VehicleIdx::new(0)),
            RouteMetrics::default()
        );
    }

    #[test]
    fn test_capacity_violation() {
        let problem = test_utils::create_line_problem(&[60.0, 60.0], &[100.0]);
        let schedule = RouteSchedule::compute(&problem, VehicleIdx::new(0), &bins(&[0, 1]));

        assert_eq!(schedule.violations.capacity, 1);
        assert_eq!(
            schedule.check_insertion(&problem, VehicleIdx::new(0), BinIdx::new(1), 0),
            Err(InsertionFailure::Capacity)
        );
    }

    #[test]
    fn test_waiting_for_window_start() {
        let start = test_utils::base_time();
        let mut input = test_utils::create_line_input(&[10.0], &[100.0]);
        input.bins[0].time_window = Some(TimeWindow::new(
            start + SignedDuration::from_hours(2),
            start + SignedDuration::from_hours(3),
        ));
        let problem = test_utils::build_line_problem(input);

        let schedule = RouteSchedule::compute(&problem, VehicleIdx::new(0), &bins(&[0]));

        assert_eq!(schedule.visits[0].arrival, start + SignedDuration::from_mins(1));
        assert_eq!(schedule.visits[0].service_start, start + SignedDuration::from_hours(2));
        assert!(schedule.is_feasible());
    }

    #[test]
    fn test_late_arrival_inside_flexibility_is_penalized() {
        let start = test_utils::base_time();
        let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        input.bins[1].time_window = Some(
            TimeWindow::new(start, start + SignedDuration::from_mins(2))
                .with_flexibility(SignedDuration::from_mins(10)),
        );
        let problem = test_utils::build_line_problem(input);

        // b0 first: b1 is served at 06:05, 3 minutes late but inside the slack
        let schedule = RouteSchedule::compute(&problem, VehicleIdx::new(0), &bins(&[0, 1]));

        assert!(schedule.is_feasible());
        assert_eq!(schedule.on_time, 1);
        assert!(schedule.penalties[1] >= 0.5);

        let strict = {
            let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
            input.bins[1].time_window =
                Some(TimeWindow::new(start, start + SignedDuration::from_mins(2)));
            test_utils::build_line_problem(input)
        };
        let schedule = RouteSchedule::compute(&strict, VehicleIdx::new(0), &bins(&[0, 1]));
        assert_eq!(schedule.violations.time_window, 1);
    }

    #[test]
    fn test_check_insertion_propagates_delay() {
        let start = test_utils::base_time();
        let mut input = test_utils::create_line_input(&[10.0, 10.0, 10.0], &[100.0]);
        input.bins[2].time_window =
            Some(TimeWindow::new(start, start + SignedDuration::from_mins(6)));
        let problem = test_utils::build_line_problem(input);
        let vehicle = VehicleIdx::new(0);

        let schedule = RouteSchedule::compute(&problem, vehicle, &bins(&[0, 2]));
        assert!(schedule.is_feasible());

        // b1 inside the route pushes b2 past its window
        assert_eq!(
            schedule.check_insertion(&problem, vehicle, BinIdx::new(1), 1),
            Err(InsertionFailure::Time)
        );
        // b1 after b2 is fine
        assert_eq!(
            schedule.check_insertion(&problem, vehicle, BinIdx::new(1), 2),
            Ok(())
        );
    }

    #[test]
    fn test_driver_hours_violation() {
        let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        input.vehicles[0].max_working_duration = Some(SignedDuration::from_mins(5));
        let problem = test_utils::build_line_problem(input);
        let vehicle = VehicleIdx::new(0);

        let schedule = RouteSchedule::compute(&problem, vehicle, &bins(&[0]));
        assert!(schedule.is_feasible());

        let schedule = RouteSchedule::compute(&problem, vehicle, &bins(&[0, 1]));
        assert_eq!(schedule.violations.driver_hours, 1);
    }

    #[test]
    fn test_anchored_visits_keep_their_times() {
        let problem = test_utils::create_line_problem(&[10.0, 10.0, 10.0], &[100.0]);
        let vehicle = VehicleIdx::new(0);
        let original = RouteSchedule::compute(&problem, vehicle, &bins(&[0, 1, 2]));

        let mut anchor = vec![original.visits[0]];
        anchor[0].departure += SignedDuration::from_mins(10);

        let schedule = RouteSchedule::compute_anchored(&problem, vehicle, &anchor, &bins(&[0, 2]));

        assert_eq!(schedule.visits[0].departure, anchor[0].departure);
        assert_eq!(
            schedule.visits[1].arrival,
            anchor[0].departure + SignedDuration::from_mins(2)
        );
    }
}
