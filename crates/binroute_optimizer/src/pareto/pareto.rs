use std::sync::Arc;

use jiff::SignedDuration;
use parking_lot::Mutex;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::Warning,
    pareto::weight_sweep::{WeightSweepConfig, weight_sweep},
    problem::{objective_weights::ObjectiveWeights, problem::Problem},
    solution::solution::{Solution, SolutionMetadata},
    solver::{
        deadline::Deadline,
        ls::local_search::LocalSearchParams,
        solver::{SolveReport, solve},
    },
};

pub const PARETO_ALGORITHM_NAME: &str = "weighted-sum-sweep";

/// Objectives the trade-off set is compared on, all minimized.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ParetoObjectives {
    pub distance_km: f64,
    pub cost: f64,
    pub service_quality_penalty: f64,
    pub emissions_kg: f64,
    pub unassigned: usize,
}

impl ParetoObjectives {
    pub fn of(solution: &Solution) -> Self {
        let objectives = &solution.metrics.objectives;
        ParetoObjectives {
            distance_km: objectives.distance_km,
            cost: objectives.cost,
            service_quality_penalty: objectives.service_quality_penalty,
            emissions_kg: objectives.emissions_kg,
            unassigned: solution.unassigned.len(),
        }
    }

    fn values(&self) -> [f64; 5] {
        [
            self.distance_km,
            self.cost,
            self.service_quality_penalty,
            self.emissions_kg,
            self.unassigned as f64,
        ]
    }

    /// At least as good everywhere and strictly better somewhere.
    pub fn dominates(&self, other: &ParetoObjectives) -> bool {
        let ours = self.values();
        let theirs = other.values();

        ours.iter().zip(&theirs).all(|(a, b)| a <= b) && ours.iter().zip(&theirs).any(|(a, b)| a < b)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunReport {
    pub weights: ObjectiveWeights,
    pub iterations: usize,
    pub convergence_time: SignedDuration,
    pub converged: bool,
    /// Whether the run made it into the non-dominated set.
    pub kept: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct ParetoSet {
    pub solutions: Vec<Solution>,
    pub objective_vectors: Vec<ParetoObjectives>,
    /// Index into `solutions` of the most balanced trade-off.
    pub recommended: usize,
    pub runs: Vec<RunReport>,
}

/// Indices of the vectors no other vector dominates. Among identical vectors
/// only the first is kept.
pub fn non_dominated(vectors: &[ParetoObjectives]) -> Vec<usize> {
    (0..vectors.len())
        .filter(|&i| {
            let candidate = &vectors[i];
            !vectors.iter().any(|other| other.dominates(candidate))
                && !vectors[..i].iter().any(|other| other == candidate)
        })
        .collect()
}

/// Position in `vectors` minimizing the mean min-max normalized objective.
pub fn balanced_choice(vectors: &[ParetoObjectives]) -> usize {
    let values = vectors.iter().map(ParetoObjectives::values).collect::<Vec<_>>();

    let mut min = [f64::INFINITY; 5];
    let mut max = [f64::NEG_INFINITY; 5];
    for vector in &values {
        for (dim, value) in vector.iter().enumerate() {
            min[dim] = min[dim].min(*value);
            max[dim] = max[dim].max(*value);
        }
    }

    let balanced_score = |vector: &[f64; 5]| {
        vector
            .iter()
            .enumerate()
            .map(|(dim, value)| {
                let range = max[dim] - min[dim];
                if range > 0.0 {
                    (value - min[dim]) / range
                } else {
                    0.0
                }
            })
            .sum::<f64>()
            / vector.len() as f64
    };

    let mut best = 0;
    let mut best_score = f64::INFINITY;
    for (index, vector) in values.iter().enumerate() {
        let score = balanced_score(vector);
        if score < best_score {
            best = index;
            best_score = score;
        }
    }

    best
}

struct SweepRun {
    index: usize,
    solution: Solution,
    report: SolveReport,
}

fn run_weighted(
    problem: &Arc<Problem>,
    index: usize,
    weights: &ObjectiveWeights,
    config: &WeightSweepConfig,
    params: &LocalSearchParams,
    deadline: &Deadline,
    budget_per_run: SignedDuration,
) -> SweepRun {
    let run_deadline = deadline.child(budget_per_run);
    let seed = config.seed.wrapping_add(index as u64);
    let params = LocalSearchParams {
        seed,
        ..params.clone()
    };

    let (working, report) = solve(Arc::clone(problem), weights.clone(), &params, &run_deadline);

    let mut warnings = problem.warnings().to_vec();
    if report.local_search.deadline_reached {
        warnings.push(Warning::BudgetExceeded {
            phase: "pareto run",
            budget: run_deadline.budget(),
        });
    }

    let solution = Solution::from_working(
        &working,
        SolutionMetadata {
            algorithm: PARETO_ALGORITHM_NAME.to_owned(),
            iterations: report.local_search.iterations,
            converged: report.local_search.converged,
            elapsed: report.construction + report.local_search.elapsed,
            version: 1,
            parent_version: None,
            estimated_distances: problem.estimated_distances(),
            seed,
        },
        warnings,
    );

    SweepRun {
        index,
        solution,
        report,
    }
}

/// Runs one construction and local search per swept weight vector and keeps
/// the non-dominated results.
#[instrument(skip_all, level = "debug")]
pub fn optimize_pareto(
    problem: Arc<Problem>,
    config: &WeightSweepConfig,
    params: &LocalSearchParams,
) -> ParetoSet {
    let sweep = weight_sweep(config);
    let deadline = Deadline::new(config.total_budget);
    let threads = config.threads.number_of_threads();

    // runs beyond the thread count queue behind each other
    let waves = sweep.len().div_ceil(threads).max(1) as i32;
    let budget_per_run = config.budget_per_run.min(config.total_budget / waves);

    let collector = Mutex::new(Vec::with_capacity(sweep.len()));
    let run = |(index, weights): (usize, &ObjectiveWeights)| {
        let result = run_weighted(
            &problem,
            index,
            weights,
            config,
            params,
            &deadline,
            budget_per_run,
        );
        collector.lock().push(result);
    };

    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| sweep.par_iter().enumerate().for_each(run)),
        Err(error) => {
            warn!(%error, "Could not build the sweep thread pool, running sequentially");
            sweep.iter().enumerate().for_each(run);
        }
    }

    let mut runs = collector.into_inner();
    runs.sort_by_key(|run| run.index);

    let vectors = runs
        .iter()
        .map(|run| ParetoObjectives::of(&run.solution))
        .collect::<Vec<_>>();
    let kept = non_dominated(&vectors);

    let reports = runs
        .iter()
        .map(|run| RunReport {
            weights: run.solution.weights.clone(),
            iterations: run.report.local_search.iterations,
            convergence_time: run.report.construction + run.report.local_search.elapsed,
            converged: run.report.local_search.converged,
            kept: kept.contains(&run.index),
        })
        .collect::<Vec<_>>();

    let objective_vectors = kept.iter().map(|&index| vectors[index]).collect::<Vec<_>>();
    let recommended = balanced_choice(&objective_vectors);

    let solutions = runs
        .into_iter()
        .filter(|run| kept.contains(&run.index))
        .map(|run| run.solution)
        .collect::<Vec<_>>();

    info!(
        runs = reports.len(),
        kept = solutions.len(),
        recommended,
        "Pareto sweep finished"
    );

    ParetoSet {
        solutions,
        objective_vectors,
        recommended,
        runs: reports,
    }
}
