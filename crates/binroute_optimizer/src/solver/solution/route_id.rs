use crate::{
    define_index_newtype, problem::vehicle::VehicleIdx, solver::solution::route::WorkingRoute,
};

define_index_newtype!(RouteIdx, WorkingRoute);

// One route per vehicle, in fleet order
impl From<VehicleIdx> for RouteIdx {
    fn from(vehicle: VehicleIdx) -> Self {
        RouteIdx::new(vehicle.get())
    }
}

impl From<RouteIdx> for VehicleIdx {
    fn from(route: RouteIdx) -> Self {
        VehicleIdx::new(route.get())
    }
}
