pub mod deterministic;
pub mod fs;
