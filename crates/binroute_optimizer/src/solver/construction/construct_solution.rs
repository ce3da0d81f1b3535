use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    problem::{bin::BinIdx, objective_weights::ObjectiveWeights, problem::Problem},
    solver::{
        deadline::Deadline,
        insertion::{InsertionAttempts, InsertionScope, best_insertion},
        solution::working_solution::WorkingSolution,
    },
};

/// Highest priority first, ties by ascending bin id.
pub fn insertion_queue(problem: &Problem, bins: impl IntoIterator<Item = BinIdx>) -> Vec<BinIdx> {
    let mut queue = bins.into_iter().collect::<Vec<_>>();
    queue.sort_by(|&a, &b| {
        problem
            .priority(b)
            .total_cmp(&problem.priority(a))
            .then_with(|| problem.bin(a).id.cmp(&problem.bin(b).id))
    });
    queue
}

/// Greedy cheapest insertion of `bins` in the given order.
///
/// Open routes inside `scope` are tried first, then the other open routes,
/// and a route is opened on an idle vehicle only when no open route accepts
/// the bin. Bins that fit nowhere are marked unassigned with the reason of
/// their failed attempts. When `deadline` expires the bins not yet processed
/// are returned untouched.
pub fn insert_bins(
    solution: &mut WorkingSolution,
    bins: &[BinIdx],
    scope: &InsertionScope,
    deadline: Option<&Deadline>,
) -> Vec<BinIdx> {
    for (index, &bin) in bins.iter().enumerate() {
        if deadline.is_some_and(Deadline::is_expired) {
            return bins[index..].to_vec();
        }

        if let Some(reason) = solution.problem().infeasible_reason(bin) {
            solution.set_unassigned(bin, reason);
            continue;
        }

        let mut attempts = InsertionAttempts::default();

        let open = solution
            .route_indices()
            .filter(|&route| !solution.route(route).is_empty())
            .collect::<Vec<_>>();

        let mut best = best_insertion(
            solution,
            bin,
            open.iter().copied().filter(|&route| scope.contains(route)),
            &mut attempts,
        );

        if best.is_none() && scope.is_restricted() {
            best = best_insertion(
                solution,
                bin,
                open.iter().copied().filter(|&route| !scope.contains(route)),
                &mut attempts,
            );
        }

        if best.is_none() {
            let idle = solution
                .route_indices()
                .filter(|&route| solution.route(route).is_empty())
                .collect::<Vec<_>>();
            best = best_insertion(solution, bin, idle, &mut attempts);
        }

        match best {
            Some(insertion) => solution.insert(insertion.route, insertion.position, bin),
            None => solution.set_unassigned(bin, attempts.reason()),
        }
    }

    Vec::new()
}

/// Initial solution over every active bin. Construction always runs to
/// completion, it is cheap compared to the search budget.
#[instrument(skip_all, level = "debug")]
pub fn construct_solution(problem: Arc<Problem>, weights: ObjectiveWeights) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(&problem), weights);
    let queue = insertion_queue(&problem, problem.active_bins());

    insert_bins(&mut solution, &queue, &InsertionScope::All, None);

    debug!(
        routes = solution.routes().iter().filter(|route| !route.is_empty()).count(),
        unassigned = solution.unassigned().len(),
        cost = solution.total_cost(),
        "Constructed initial solution"
    );

    solution
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::{
        error::UnassignedReason,
        problem::time_window::TimeWindow,
        solver::solution::route_id::RouteIdx,
        test_utils,
    };

    use super::*;

    #[test]
    fn test_insertion_queue_order() {
        let mut input = test_utils::create_line_input(&[10.0, 10.0, 10.0], &[100.0]);
        input.bins[0].id = "c".to_owned();
        input.bins[1].id = "a".to_owned();
        input.bins[2].id = "b".to_owned();
        input.bins[2].base_priority = 5.0;
        let problem = test_utils::build_line_problem(input);

        let queue = insertion_queue(&problem, problem.active_bins());

        assert_eq!(queue, vec![BinIdx::new(2), BinIdx::new(1), BinIdx::new(0)]);
    }

    #[test]
    fn test_capacity_bound() {
        let problem = Arc::new(test_utils::create_line_problem(&[40.0, 40.0, 40.0], &[100.0]));
        let solution = construct_solution(problem, ObjectiveWeights::default());

        assert_eq!(solution.route(RouteIdx::new(0)).len(), 2);
        assert_eq!(solution.unassigned().len(), 1);
        assert!(
            solution
                .unassigned()
                .values()
                .all(|&reason| reason == UnassignedReason::Capacity)
        );
        assert!(solution.is_feasible());
    }

    #[test]
    fn test_opens_second_route_when_needed() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[60.0, 60.0],
            &[100.0, 100.0],
        ));
        let solution = construct_solution(problem, ObjectiveWeights::default());

        assert!(solution.unassigned().is_empty());
        assert_eq!(solution.route(RouteIdx::new(0)).len(), 1);
        assert_eq!(solution.route(RouteIdx::new(1)).len(), 1);
    }

    #[test]
    fn test_infeasible_bins_keep_their_reason() {
        let problem = Arc::new(test_utils::create_line_problem(&[500.0, 10.0], &[100.0]));
        let solution = construct_solution(problem, ObjectiveWeights::default());

        assert_eq!(
            solution.unassigned().get(&BinIdx::new(0)),
            Some(&UnassignedReason::Capacity)
        );
        assert_eq!(solution.route(RouteIdx::new(0)).bins(), &[BinIdx::new(1)]);
    }

    #[test]
    fn test_time_window_failure() {
        let start = test_utils::base_time();
        let mut input = test_utils::create_line_input(&[10.0, 10.0], &[100.0]);
        input.bins[1].time_window = Some(TimeWindow::new(
            start - SignedDuration::from_hours(2),
            start - SignedDuration::from_hours(1),
        ));
        let problem = Arc::new(test_utils::build_line_problem(input));

        let solution = construct_solution(problem, ObjectiveWeights::default());

        assert_eq!(
            solution.unassigned().get(&BinIdx::new(1)),
            Some(&UnassignedReason::TimeWindow)
        );
    }

    #[test]
    fn test_expired_deadline_returns_remaining_bins() {
        let problem = Arc::new(test_utils::create_line_problem(&[10.0, 10.0], &[100.0]));
        let mut solution = WorkingSolution::new(Arc::clone(&problem), ObjectiveWeights::default());
        let deadline = Deadline::new(SignedDuration::ZERO);
        let bins = [BinIdx::new(0), BinIdx::new(1)];

        let leftover = insert_bins(&mut solution, &bins, &InsertionScope::All, Some(&deadline));

        assert_eq!(leftover, bins.to_vec());
        assert!(solution.routes().iter().all(|route| route.is_empty()));
    }
}
