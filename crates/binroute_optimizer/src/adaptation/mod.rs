pub mod adapt;
pub mod change_set;
