pub mod match_manager;

pub use match_manager::*;
