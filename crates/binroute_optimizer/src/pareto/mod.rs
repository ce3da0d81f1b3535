#[allow(clippy::module_inception)]
pub mod pareto;
pub mod weight_sweep;
