pub mod acceptor;
pub mod inter_swap;
pub mod local_search;
pub mod r#move;
pub mod or_opt;
pub mod two_opt;
pub mod vehicle_reassignment;
