use jiff::SignedDuration;

use crate::{problem::objective_weights::ObjectiveWeights, solver::solver_params::Threads};

pub const MIN_SOLUTIONS: usize = 5;
pub const MAX_SOLUTIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct WeightSweepConfig {
    /// Number of weighted runs, clamped to 5..=10.
    pub solutions: usize,
    pub base_weights: ObjectiveWeights,
    pub budget_per_run: SignedDuration,
    pub total_budget: SignedDuration,
    /// Run `i` uses `seed + i`.
    pub seed: u64,
    pub threads: Threads,
}

impl Default for WeightSweepConfig {
    fn default() -> Self {
        WeightSweepConfig {
            solutions: 6,
            base_weights: ObjectiveWeights::default(),
            budget_per_run: SignedDuration::from_secs(5),
            total_budget: SignedDuration::from_secs(30),
            seed: 0,
            threads: Threads::Auto,
        }
    }
}

impl WeightSweepConfig {
    pub fn num_solutions(&self) -> usize {
        self.solutions.clamp(MIN_SOLUTIONS, MAX_SOLUTIONS)
    }
}

/// Shares of (distance, cost, service quality, environmental): the balanced
/// centroid, then the dominant corners, then pairwise mixes.
const SWEEP: [[f64; 4]; 11] = [
    [0.25, 0.25, 0.25, 0.25],
    [0.7, 0.1, 0.1, 0.1],
    [0.1, 0.7, 0.1, 0.1],
    [0.1, 0.1, 0.7, 0.1],
    [0.1, 0.1, 0.1, 0.7],
    [0.4, 0.4, 0.1, 0.1],
    [0.4, 0.1, 0.4, 0.1],
    [0.4, 0.1, 0.1, 0.4],
    [0.1, 0.4, 0.4, 0.1],
    [0.1, 0.4, 0.1, 0.4],
    [0.1, 0.1, 0.4, 0.4],
];

/// Deterministic weight vectors over the trade-off simplex. The mass the
/// base weights put on the four swept objectives is redistributed, the other
/// weights are kept. Shares are capped at 1, below that cap every vector
/// keeps the base weight sum.
pub fn weight_sweep(config: &WeightSweepConfig) -> Vec<ObjectiveWeights> {
    let base = &config.base_weights;
    let mass = base.distance + base.cost + base.service_quality + base.environmental;

    SWEEP
        .iter()
        .take(config.num_solutions())
        .map(|[distance, cost, service_quality, environmental]| ObjectiveWeights {
            distance: (mass * distance).min(1.0),
            cost: (mass * cost).min(1.0),
            service_quality: (mass * service_quality).min(1.0),
            environmental: (mass * environmental).min(1.0),
            ..base.clone()
        })
        .collect()
}
