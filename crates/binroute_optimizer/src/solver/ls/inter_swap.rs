use smallvec::smallvec;

use crate::solver::{
    ls::r#move::{LocalSearchOperator, RouteChange, RouteChanges, UpdatedRoutes},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Inter-Route Swap**
///
/// Exchanges the waypoint at `first_position` of `first` with the one at
/// `second_position` of `second`.
///
/// ```text
/// BEFORE:
///    R1: ... -> [A] -> [X] -> [B] -> ...
///    R2: ... -> [C] -> [Y] -> [D] -> ...
///
/// AFTER:
///    R1: ... -> [A] -> [Y] -> [B] -> ...
///    R2: ... -> [C] -> [X] -> [D] -> ...
/// ```
#[derive(Debug, Clone)]
pub struct InterSwapOperator {
    params: InterSwapParams,
}

#[derive(Debug, Clone)]
pub struct InterSwapParams {
    pub first: RouteIdx,
    pub first_position: usize,
    pub second: RouteIdx,
    pub second_position: usize,
}

impl InterSwapOperator {
    pub fn new(params: InterSwapParams) -> Self {
        debug_assert!(params.first != params.second);
        InterSwapOperator { params }
    }
}

impl LocalSearchOperator for InterSwapOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        // Symmetric, each unordered pair is visited once
        if r1 >= r2 {
            return;
        }

        let problem = solution.problem();
        let first = solution.route(r1);
        let second = solution.route(r2);

        for first_position in first.locked()..first.len() {
            let x = first.bins()[first_position];
            if !problem.is_compatible(x, second.vehicle()) {
                continue;
            }

            for second_position in second.locked()..second.len() {
                let y = second.bins()[second_position];
                if !problem.is_compatible(y, first.vehicle()) {
                    continue;
                }

                consumer(InterSwapOperator::new(InterSwapParams {
                    first: r1,
                    first_position,
                    second: r2,
                    second_position,
                }));
            }
        }
    }

    fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges {
        let mut first = solution.route(self.params.first).bins().to_vec();
        let mut second = solution.route(self.params.second).bins().to_vec();

        std::mem::swap(
            &mut first[self.params.first_position],
            &mut second[self.params.second_position],
        );

        smallvec![
            RouteChange {
                route: self.params.first,
                bins: first,
            },
            RouteChange {
                route: self.params.second,
                bins: second,
            }
        ]
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        smallvec![self.params.first, self.params.second]
    }
}
