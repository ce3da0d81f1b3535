pub mod objective;
pub mod schedule;
pub mod score;
