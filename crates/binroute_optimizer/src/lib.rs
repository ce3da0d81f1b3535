pub mod adaptation;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod pareto;
pub mod problem;
pub mod sink;
pub mod solution;
pub mod solver;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
