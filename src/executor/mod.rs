//! Test execution engine
//!
//! Runs single cases on isolated workers and whole registries in parallel.

mod hook;
mod parallel;
mod runner;

pub use parallel::{ParallelExecutor, RunStats};
pub use runner::{InvocationError, TestRunner};
