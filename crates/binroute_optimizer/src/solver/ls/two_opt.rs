use smallvec::smallvec;

use crate::solver::{
    ls::r#move::{LocalSearchOperator, RouteChange, RouteChanges, UpdatedRoutes},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Intra-Route 2-Opt**
///
/// Reverses the waypoints between `from` and `to` (inclusive).
///
/// ```text
/// BEFORE:
///    ... (prev) --x--> [from] -> ... -> [to] --x--> (next) ...
///
/// AFTER:
///    ... (prev) -----> [to] -> ... -> [from] -----> (next) ...
/// ```
///
/// Waiting and time windows make the route asymmetric, so the whole
/// schedule is re-simulated rather than patched on the two edges.
#[derive(Debug, Clone)]
pub struct TwoOptOperator {
    params: TwoOptParams,
}

#[derive(Debug, Clone)]
pub struct TwoOptParams {
    pub route: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl TwoOptOperator {
    pub fn new(params: TwoOptParams) -> Self {
        debug_assert!(params.from < params.to, "TwoOpt: cannot have from >= to");
        TwoOptOperator { params }
    }
}

impl LocalSearchOperator for TwoOptOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 != r2 {
            return;
        }

        let route = solution.route(r1);
        if route.len() < route.locked() + 2 {
            return;
        }

        for from in route.locked()..route.len() - 1 {
            for to in (from + 1)..route.len() {
                consumer(TwoOptOperator::new(TwoOptParams { route: r1, from, to }));
            }
        }
    }

    fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges {
        let mut bins = solution.route(self.params.route).bins().to_vec();
        bins[self.params.from..=self.params.to].reverse();

        smallvec![RouteChange {
            route: self.params.route,
            bins,
        }]
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        smallvec![self.params.route]
    }
}
