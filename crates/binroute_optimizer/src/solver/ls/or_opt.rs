use smallvec::smallvec;

use crate::solver::{
    ls::r#move::{LocalSearchOperator, RouteChange, RouteChanges, UpdatedRoutes},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

pub const MAX_CHAIN_LENGTH: usize = 3;

/// **Or-Opt**
///
/// Moves a chain of up to three consecutive waypoints starting at `position`
/// of `from_route` to `insert_at` of `to_route`. Within a single route,
/// `insert_at` indexes the route after the chain was taken out.
///
/// ```text
/// BEFORE:
///    [A] -> [B] -> (C -> D) -> [E] -> [F]
///
/// AFTER (chain moved after E):
///    [A] -> [B] -> [E] -> (C -> D) -> [F]
/// ```
#[derive(Debug, Clone)]
pub struct OrOptOperator {
    params: OrOptParams,
}

#[derive(Debug, Clone)]
pub struct OrOptParams {
    pub from_route: RouteIdx,
    pub to_route: RouteIdx,
    pub position: usize,
    pub length: usize,
    pub insert_at: usize,
}

impl OrOptOperator {
    pub fn new(params: OrOptParams) -> Self {
        OrOptOperator { params }
    }
}

impl LocalSearchOperator for OrOptOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        let problem = solution.problem();
        let source = solution.route(r1);
        let target = solution.route(r2);

        if r1 != r2 && (target.is_empty() || !problem.is_vehicle_available(target.vehicle())) {
            return;
        }

        for length in 1..=MAX_CHAIN_LENGTH {
            if source.len() < source.locked() + length {
                break;
            }

            for position in source.locked()..=source.len() - length {
                let chain = &source.bins()[position..position + length];

                if r1 == r2 {
                    for insert_at in source.locked()..=source.len() - length {
                        if insert_at == position {
                            continue;
                        }

                        consumer(OrOptOperator::new(OrOptParams {
                            from_route: r1,
                            to_route: r2,
                            position,
                            length,
                            insert_at,
                        }));
                    }
                } else {
                    if chain
                        .iter()
                        .any(|&bin| !problem.is_compatible(bin, target.vehicle()))
                    {
                        continue;
                    }

                    for insert_at in target.locked()..=target.len() {
                        consumer(OrOptOperator::new(OrOptParams {
                            from_route: r1,
                            to_route: r2,
                            position,
                            length,
                            insert_at,
                        }));
                    }
                }
            }
        }
    }

    fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges {
        let OrOptParams {
            from_route,
            to_route,
            position,
            length,
            insert_at,
        } = self.params;

        let mut source = solution.route(from_route).bins().to_vec();
        let chain = source.drain(position..position + length).collect::<Vec<_>>();

        if from_route == to_route {
            source.splice(insert_at..insert_at, chain);
            return smallvec![RouteChange {
                route: from_route,
                bins: source,
            }];
        }

        let mut target = solution.route(to_route).bins().to_vec();
        target.splice(insert_at..insert_at, chain);

        smallvec![
            RouteChange {
                route: from_route,
                bins: source,
            },
            RouteChange {
                route: to_route,
                bins: target,
            }
        ]
    }

    fn updated_routes(&self) -> UpdatedRoutes {
        if self.params.from_route == self.params.to_route {
            smallvec![self.params.from_route]
        } else {
            smallvec![self.params.from_route, self.params.to_route]
        }
    }
}
