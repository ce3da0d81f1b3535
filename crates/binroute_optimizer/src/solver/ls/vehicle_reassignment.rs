use smallvec::smallvec;

use crate::solver::{
    ls::r#move::{LocalSearchOperator, RouteChange, RouteChanges, UpdatedRoutes},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

pub const MAX_SEGMENT_LENGTH: usize = 5;

/// **Vehicle Reassignment**
///
/// Hands a segment of up to five waypoints (possibly a whole short route) to
/// a vehicle with lower capacity utilization, idle vehicles included.
///
/// ```text
/// BEFORE:
///    R1 (80%): [A] -> (B -> C -> D) -> [E]
///    R2 (10%): [F]
///
/// AFTER:
///    R1: [A] -> [E]
///    R2: [F] -> (B -> C -> D)
/// ```
#[derive(Debug, Clone)]
pub struct VehicleReassignmentOperator {
    params: VehicleReassignmentParams,
}

#[derive(Debug, Clone)]
pub struct VehicleReassignmentParams {
    pub from_route: RouteIdx,
    pub to_route: RouteIdx,
    pub start: usize,
    pub length: usize,
    pub insert_at: usize,
}

impl VehicleReassignmentOperator {
    pub fn new(params: VehicleReassignmentParams) -> Self {
        VehicleReassignmentOperator { params }
    }
}

impl LocalSearchOperator for VehicleReassignmentOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 == r2 {
            return;
        }

        let problem = solution.problem();
        let source = solution.route(r1);
        let target = solution.route(r2);

        if source.len() <= source.locked()
            || !problem.is_vehicle_available(target.vehicle())
            || target.capacity_utilization(problem) >= source.capacity_utilization(problem)
        {
            return;
        }

        let movable = source.len() - source.locked();
        for length in 1..=MAX_SEGMENT_LENGTH.min(movable) {
            for start in source.locked()..=source.len() - length {
                let segment = &source.bins()[start..start + length];
                if segment
                    .iter()
                    .any(|&bin| !problem.is_compatible(bin, target.vehicle()))
                {
                    continue;
                }

                for insert_at in target.locked()..=target.len() {
                    consumer(VehicleReassignmentOperator::new(VehicleReassignmentParams {
                        from_route: r1,
                        to_route: r2,
                        start,
                        length,
                        insert_at,
                    }));
                }
            }
        }
    }

    fn route_changes(&self, solution: &WorkingSolution) -> RouteChanges {
        let VehicleReassignmentParams {
            from_route,
            to_route,
            start,
            length,
            insert_at,
        } = self.params;

        let mut source = solution.route(from_route).bins().to_vec();
        let segment = source.drain(start..start + length).collect::<Vec<_>>();

        let mut target = solution.route(to_route).bins().to_vec();
        target.splice(insert_at..insert_at, segment);

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
        smallvec![self.params.from_route, self.params.to_route]
    }
}

#[cfg(test)]
mod tests {
    use crate::{problem::bin::BinIdx, test_utils};

    use super::*;

    #[test]
    fn test_moves_whole_route_to_idle_vehicle() {
        let solution = test_utils::create_test_working_solution(
            &[10.0; 2],
            &[100.0, 100.0],
            vec![test_utils::TestRoute {
                vehicle_id: 0,
                bins: vec![0, 1],
            }],
        );

        let mut moves = Vec::new();
        VehicleReassignmentOperator::generate_moves(
            &solution,
            (RouteIdx::new(0), RouteIdx::new(1)),
            |op| moves.push(op),
        );

        // segments [0], [1] and [0, 1], each with a single slot in the empty route
        assert_eq!(moves.len(), 3);

        let whole_route = moves
            .iter()
            .find(|op| op.params.length == 2)
            .map(|op| op.route_changes(&solution));
        let changes = whole_route.unwrap_or_default();
        assert!(changes[0].bins.is_empty());
        assert_eq!(changes[1].bins, vec![BinIdx::new(0), BinIdx::new(1)]);
    }

    #[test]
    fn test_no_moves_towards_busier_vehicle() {
        let solution = test_utils::create_test_working_solution(
            &[10.0, 50.0],
            &[100.0, 100.0],
            vec![
                test_utils::TestRoute {
                    vehicle_id: 0,
                    bins: vec![0],
                },
                test_utils::TestRoute {
                    vehicle_id: 1,
                    bins: vec![1],
                },
            ],
        );

        let mut count = 0;
        VehicleReassignmentOperator::generate_moves(
            &solution,
            (RouteIdx::new(0), RouteIdx::new(1)),
            |_| count += 1,
        );
        assert_eq!(count, 0);
    }
}
