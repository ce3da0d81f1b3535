use std::sync::Arc;

use jiff::SignedDuration;
use serde::Serialize;

use crate::{
    error::{UnassignedReason, Warning},
    evaluator::objective::Evaluation,
    problem::{bin::BinIdx, objective_weights::ObjectiveWeights, problem::Problem},
    solution::route::Route,
    solver::solution::working_solution::WorkingSolution,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UnassignedBin {
    pub bin_id: String,
    #[serde(skip)]
    pub bin: BinIdx,
    pub reason: UnassignedReason,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SolutionMetadata {
    pub algorithm: String,
    pub iterations: usize,
    pub converged: bool,
    pub elapsed: SignedDuration,
    /// 1 for a fresh plan, incremented by every adaptation.
    pub version: u64,
    pub parent_version: Option<u64>,
    pub estimated_distances: bool,
    pub seed: u64,
}

/// Immutable optimization result. Adaptation derives a new version and
/// leaves this one untouched.
#[derive(Serialize, Debug, Clone)]
pub struct Solution {
    #[serde(skip)]
    problem: Arc<Problem>,
    pub weights: ObjectiveWeights,
    pub routes: Vec<Arc<Route>>,
    pub unassigned: Vec<UnassignedBin>,
    pub metrics: Evaluation,
    pub metadata: SolutionMetadata,
    pub warnings: Vec<Warning>,
}

impl Solution {
    pub fn from_working(
        working: &WorkingSolution,
        metadata: SolutionMetadata,
        warnings: Vec<Warning>,
    ) -> Self {
        let problem = working.problem();

        let routes = working
            .routes()
            .iter()
            .filter(|route| !route.is_empty())
            .map(|route| route.to_route(problem))
            .collect();

        let unassigned = working
            .unassigned()
            .iter()
            .map(|(&bin, &reason)| UnassignedBin {
                bin_id: problem.bin(bin).id.clone(),
                bin,
                reason,
            })
            .collect();

        Solution {
            problem: Arc::clone(working.problem_arc()),
            weights: working.weights().clone(),
            routes,
            unassigned,
            metrics: working.evaluation(),
            metadata,
            warnings,
        }
    }

    /// Same plan published again as a new version over `problem`.
    pub fn republish(
        &self,
        problem: Arc<Problem>,
        metadata: SolutionMetadata,
        warnings: Vec<Warning>,
    ) -> Self {
        Solution {
            problem,
            weights: self.weights.clone(),
            routes: self.routes.clone(),
            unassigned: self.unassigned.clone(),
            metrics: self.metrics.clone(),
            metadata,
            warnings,
        }
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn version(&self) -> u64 {
        self.metadata.version
    }

    pub fn route_for_vehicle(&self, vehicle_id: &str) -> Option<&Arc<Route>> {
        self.routes
            .iter()
            .find(|route| route.vehicle_id == vehicle_id)
    }

    pub fn assigned_count(&self) -> usize {
        self.routes.iter().map(|route| route.len()).sum()
    }

    /// Same routes, unassigned bins and metrics.
    pub fn same_plan(&self, other: &Solution) -> bool {
        self.routes == other.routes
            && self.unassigned == other.unassigned
            && self.metrics == other.metrics
    }
}
