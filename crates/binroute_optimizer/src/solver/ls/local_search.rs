use fxhash::{FxBuildHasher, FxHashMap, FxHashSet};
use jiff::{SignedDuration, Timestamp};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::solver::{
    deadline::Deadline,
    ls::{
        acceptor::{AnnealingParams, SimulatedAnnealingAcceptor},
        r#move::{LocalSearchMove, generate_moves},
    },
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

#[derive(Debug, Clone)]
pub struct LocalSearchParams {
    pub max_iterations: usize,
    /// Minimum cost decrease for a move to count as an improvement.
    pub tolerance: f64,
    pub annealing: Option<AnnealingParams>,
    pub seed: u64,
    pub enable_vehicle_reassignment: bool,
    /// Only pairs of these routes are explored.
    pub restrict_to: Option<FxHashSet<RouteIdx>>,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        LocalSearchParams {
            max_iterations: 2000,
            tolerance: 1e-6,
            annealing: Some(AnnealingParams::default()),
            seed: 0,
            enable_vehicle_reassignment: true,
            restrict_to: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSearchOutcome {
    pub iterations: usize,
    /// A full pass found no improving move.
    pub converged: bool,
    pub deadline_reached: bool,
    pub elapsed: SignedDuration,
}

type RoutePair = (RouteIdx, RouteIdx);

pub struct LocalSearch {
    params: LocalSearchParams,
    pairs: Vec<RoutePair>,
    state: LocalSearchState,
    rng: SmallRng,
}

impl LocalSearch {
    pub fn new(params: LocalSearchParams) -> Self {
        let rng = SmallRng::seed_from_u64(params.seed);

        LocalSearch {
            params,
            pairs: Vec::new(),
            state: LocalSearchState::new(),
            rng,
        }
    }

    /// Improves `solution` in place and leaves it at the best state observed.
    #[instrument(skip_all, level = "debug")]
    pub fn run(&mut self, solution: &mut WorkingSolution, deadline: &Deadline) -> LocalSearchOutcome {
        let start = Timestamp::now();
        let routes = self.eligible_routes(solution);
        let acceptor = self
            .params
            .annealing
            .as_ref()
            .map(|params| SimulatedAnnealingAcceptor::new(params, solution));

        let mut best: Option<WorkingSolution> = None;
        let mut best_cost = solution.total_cost();
        let mut iterations = 0;
        let mut converged = false;
        let mut deadline_reached = false;

        while iterations < self.params.max_iterations {
            if deadline.is_expired() {
                deadline_reached = true;
                break;
            }

            iterations += 1;
            let progress = iterations as f64 / self.params.max_iterations as f64;

            match self.best_improvement(solution, &routes, deadline) {
                Some((delta, op)) if delta < -self.params.tolerance => {
                    debug!("Apply {} (d={}) {:?}", op.operator_name(), delta, op);
                    self.apply(solution, &op);
                }
                _ => {
                    if deadline.is_expired() {
                        deadline_reached = true;
                        break;
                    }

                    let temperature = acceptor
                        .as_ref()
                        .map_or(0.0, |acceptor| acceptor.temperature(progress));

                    let Some(acceptor) = acceptor.as_ref().filter(|_| temperature > 0.0) else {
                        converged = true;
                        break;
                    };

                    if let Some((delta, op)) = self.random_move(solution, &routes)
                        && acceptor.accept(delta, temperature, &mut self.rng)
                    {
                        if best.is_none() {
                            best = Some(solution.clone());
                        }
                        self.apply(solution, &op);
                    }
                }
            }

            let cost = solution.total_cost();
            if cost < best_cost {
                best_cost = cost;
                best = None;
            }
        }

        if let Some(best) = best {
            *solution = best;
        }

        let outcome = LocalSearchOutcome {
            iterations,
            converged,
            deadline_reached,
            elapsed: Timestamp::now().duration_since(start),
        };

        debug!(
            iterations,
            converged,
            deadline_reached,
            cost = solution.total_cost(),
            "Local search finished"
        );

        outcome
    }

    /// Applies `op` and drops the cached moves of the routes it touches.
    fn apply(&mut self, solution: &mut WorkingSolution, op: &LocalSearchMove) {
        let stale = op
            .updated_routes()
            .iter()
            .map(|&route| solution.route(route).version())
            .collect::<SmallVec<[usize; 2]>>();

        op.apply(solution);
        self.state.invalidate(&stale);
    }

    fn eligible_routes(&self, solution: &WorkingSolution) -> Vec<RouteIdx> {
        solution
            .route_indices()
            .filter(|route| {
                self.params
                    .restrict_to
                    .as_ref()
                    .is_none_or(|routes| routes.contains(route))
            })
            .collect()
    }

    fn build_pairs(&mut self, solution: &WorkingSolution, routes: &[RouteIdx]) {
        self.pairs.clear();

        for &r1 in routes {
            for &r2 in routes {
                if !self.state.contains_key(solution, r1, r2) {
                    self.pairs.push((r1, r2));
                }
            }
        }
    }

    /// Explores the pairs whose routes changed since they were last seen and
    /// returns the best cached move over all pairs. Pairs left unexplored
    /// when the deadline hits are retried on the next call.
    fn best_improvement(
        &mut self,
        solution: &WorkingSolution,
        routes: &[RouteIdx],
        deadline: &Deadline,
    ) -> Option<(f64, LocalSearchMove)> {
        self.build_pairs(solution, routes);

        let enable_vehicle_reassignment = self.params.enable_vehicle_reassignment;
        let results = self
            .pairs
            .par_iter()
            .map(|&(r1, r2)| {
                if deadline.is_expired() {
                    return None;
                }

                let mut best_delta = 0.0;
                let mut best_move = None;
                generate_moves(solution, (r1, r2), enable_vehicle_reassignment, |op| {
                    if let Some(delta) = op.delta(solution)
                        && delta < best_delta
                    {
                        best_delta = delta;
                        best_move = Some(op);
                    }
                });

                Some((r1, r2, best_move.map(|op| (best_delta, op))))
            })
            .collect::<Vec<_>>();

        for (r1, r2, best) in results.into_iter().flatten() {
            self.state.update_best(solution, r1, r2, best);
        }

        let mut best: Option<&(f64, LocalSearchMove)> = None;
        for &r1 in routes {
            for &r2 in routes {
                if let Some(candidate) = self.state.best_move(solution, r1, r2)
                    && best.is_none_or(|best| candidate.0 < best.0)
                {
                    best = Some(candidate);
                }
            }
        }

        best.cloned()
    }

    /// Uniformly random feasible move of a random route pair.
    fn random_move(
        &mut self,
        solution: &WorkingSolution,
        routes: &[RouteIdx],
    ) -> Option<(f64, LocalSearchMove)> {
        if routes.is_empty() {
            return None;
        }

        let r1 = routes[self.rng.random_range(0..routes.len())];
        let r2 = routes[self.rng.random_range(0..routes.len())];

        let mut moves = Vec::new();
        generate_moves(
            solution,
            (r1, r2),
            self.params.enable_vehicle_reassignment,
            |op| {
                if let Some(delta) = op.delta(solution) {
                    moves.push((delta, op));
                }
            },
        );

        if moves.is_empty() {
            return None;
        }

        let index = self.rng.random_range(0..moves.len());
        Some(moves.swap_remove(index))
    }
}

type VersionPair = (usize, usize);

/// Best move per pair of route versions. Versions are unique within a run,
/// so an entry stays valid until one of its routes changes.
struct LocalSearchState(FxHashMap<VersionPair, Option<(f64, LocalSearchMove)>>);

impl LocalSearchState {
    fn new() -> Self {
        Self(FxHashMap::with_capacity_and_hasher(
            256,
            FxBuildHasher::default(),
        ))
    }

    fn key(solution: &WorkingSolution, r1: RouteIdx, r2: RouteIdx) -> VersionPair {
        (solution.route(r1).version(), solution.route(r2).version())
    }

    fn contains_key(&self, solution: &WorkingSolution, r1: RouteIdx, r2: RouteIdx) -> bool {
        self.0.contains_key(&Self::key(solution, r1, r2))
    }

    fn best_move(
        &self,
        solution: &WorkingSolution,
        r1: RouteIdx,
        r2: RouteIdx,
    ) -> Option<&(f64, LocalSearchMove)> {
        self.0
            .get(&Self::key(solution, r1, r2))
            .and_then(|entry| entry.as_ref())
    }

    fn update_best(
        &mut self,
        solution: &WorkingSolution,
        r1: RouteIdx,
        r2: RouteIdx,
        best: Option<(f64, LocalSearchMove)>,
    ) {
        self.0.insert(Self::key(solution, r1, r2), best);
    }

    fn invalidate(&mut self, versions: &[usize]) {
        self.0
            .retain(|key, _| !versions.contains(&key.0) && !versions.contains(&key.1));
    }
}
