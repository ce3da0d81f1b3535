use std::sync::Arc;

use jiff::SignedDuration;
use tracing::{info, instrument, warn};

use crate::{
    adaptation::{adapt::adapt, change_set::ChangeSet},
    error::Warning,
    pareto::{
        pareto::{ParetoSet, optimize_pareto},
        weight_sweep::WeightSweepConfig,
    },
    problem::problem::Problem,
    sink::SolutionSink,
    solution::solution::{Solution, SolutionMetadata},
    solver::{
        deadline::Deadline,
        ls::local_search::LocalSearchParams,
        solver::{ALGORITHM_NAME, solve},
        solver_params::Threads,
    },
};

pub const OPTIMIZE_BUDGET_CAP: SignedDuration = SignedDuration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EngineParams {
    pub local_search: LocalSearchParams,
    pub threads: Threads,
    pub optimize_budget_cap: SignedDuration,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            local_search: LocalSearchParams::default(),
            threads: Threads::Auto,
            optimize_budget_cap: OPTIMIZE_BUDGET_CAP,
        }
    }
}

/// Entry point for planning, adaptation and trade-off exploration. Holds no
/// state between calls apart from its parameters and the optional sink.
pub struct Engine {
    params: EngineParams,
    sink: Option<Arc<dyn SolutionSink>>,
}

impl Engine {
    pub fn new(params: EngineParams) -> Self {
        Engine { params, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn SolutionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    fn publish(&self, solution: Solution) -> Solution {
        if let Some(sink) = &self.sink {
            let solution = Arc::new(solution);
            sink.submit(&solution);
            return Arc::unwrap_or_clone(solution);
        }

        solution
    }

    fn run_in_pool<T: Send>(&self, run: impl FnOnce() -> T + Send) -> T {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.threads.number_of_threads())
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(error) => {
                warn!(%error, "Could not build the search thread pool, using the global one");
                run()
            }
        }
    }

    /// Full plan for `problem` within `budget`, capped by the engine limit and
    /// by the problem's own `max_optimization_time`.
    #[instrument(skip_all, level = "debug")]
    pub fn optimize(&self, problem: Arc<Problem>, budget: SignedDuration) -> Solution {
        let mut budget = budget.min(self.params.optimize_budget_cap);
        if let Some(max) = problem.max_optimization_time() {
            budget = budget.min(max);
        }

        let deadline = Deadline::new(budget);
        let weights = problem.weights().clone();
        let params = &self.params.local_search;

        let (working, report) =
            self.run_in_pool(|| solve(Arc::clone(&problem), weights, params, &deadline));

        let mut warnings = problem.warnings().to_vec();
        if report.local_search.deadline_reached {
            warnings.push(Warning::BudgetExceeded {
                phase: "optimization",
                budget,
            });
        }

        let solution = Solution::from_working(
            &working,
            SolutionMetadata {
                algorithm: ALGORITHM_NAME.to_owned(),
                iterations: report.local_search.iterations,
                converged: report.local_search.converged,
                elapsed: deadline.elapsed(),
                version: 1,
                parent_version: None,
                estimated_distances: problem.estimated_distances(),
                seed: params.seed,
            },
            warnings,
        );

        info!(
            organization = problem.organization_id().unwrap_or_default(),
            routes = solution.routes.len(),
            unassigned = solution.unassigned.len(),
            "Optimized"
        );

        self.publish(solution)
    }

    /// New version of `prior` with `changes` applied.
    #[instrument(skip_all, level = "debug")]
    pub fn adapt(&self, prior: &Solution, changes: &ChangeSet, budget: SignedDuration) -> Solution {
        let params = &self.params.local_search;
        let solution = self.run_in_pool(|| adapt(prior, changes, budget, params));

        info!(
            version = solution.version(),
            warnings = solution.warnings.len(),
            "Adapted"
        );

        self.publish(solution)
    }

    /// Non-dominated plans over a sweep of objective weights.
    pub fn optimize_pareto(&self, problem: Arc<Problem>, config: &WeightSweepConfig) -> ParetoSet {
        let set = optimize_pareto(problem, config, &self.params.local_search);

        if let Some(recommended) = set.solutions.get(set.recommended) {
            self.publish(recommended.clone());
        }

        set
    }
}
