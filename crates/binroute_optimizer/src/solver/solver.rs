use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tracing::{info, instrument};

use crate::{
    problem::{objective_weights::ObjectiveWeights, problem::Problem},
    solver::{
        construction::construct_solution::construct_solution,
        deadline::Deadline,
        ls::local_search::{LocalSearch, LocalSearchOutcome, LocalSearchParams},
        solution::working_solution::WorkingSolution,
    },
};

pub const ALGORITHM_NAME: &str = "greedy-insertion+local-search";

#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    pub construction: SignedDuration,
    pub local_search: LocalSearchOutcome,
}

/// Construction followed by local search on the remaining budget.
#[instrument(skip_all, level = "debug")]
pub fn solve(
    problem: Arc<Problem>,
    weights: ObjectiveWeights,
    params: &LocalSearchParams,
    deadline: &Deadline,
) -> (WorkingSolution, SolveReport) {
    let start = Timestamp::now();
    let mut solution = construct_solution(problem, weights);
    let construction = Timestamp::now().duration_since(start);

    let local_search = LocalSearch::new(params.clone()).run(&mut solution, deadline);

    info!(
        construction = %construction,
        iterations = local_search.iterations,
        converged = local_search.converged,
        unassigned = solution.unassigned().len(),
        cost = solution.total_cost(),
        "Solved"
    );

    (
        solution,
        SolveReport {
            construction,
            local_search,
        },
    )
}
