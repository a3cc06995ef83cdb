//! Test execution engine
//!
//! Single-case runner with retries, and the parallel scheduler on top of it.

mod parallel;
mod runner;

pub use parallel::ParallelExecutor;
pub use runner::{select_cases, TestRunner};
