pub mod bin;
pub mod depot;
pub mod input;
pub mod location;
pub mod objective_weights;
#[allow(clippy::module_inception)]
pub mod problem;
pub mod time_window;
pub mod validation;
pub mod vehicle;
