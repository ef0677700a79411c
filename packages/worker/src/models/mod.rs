pub mod execution;
pub mod judge0;
