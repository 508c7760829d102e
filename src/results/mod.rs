//! Result aggregation and storage
//!
//! Collects per-platform results while a run is in progress and persists
//! completed runs.

#![allow(dead_code)]

mod aggregator;
mod storage;

pub use aggregator::{AggregatorError, CaseSnapshot, CaseState, PlatformAggregator, SummaryCounts};
pub use storage::{EnvironmentInfo, ExportFormat, ResultsStorage, RunInfo, StoredRun};
