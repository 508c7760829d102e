//! Parallel test execution
//!
//! Runs every case on every platform with bounded concurrency and feeds the
//! results into a `PlatformAggregator`.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::TestRunner;
use crate::fixture::TestCase;
use crate::models::{Platform, ResultKind};
use crate::results::{CaseSnapshot, CaseState, PlatformAggregator};

/// Timing and counts of one execution pass
#[derive(Clone, Debug)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cases: usize,
    pub recorded: usize,
    pub rejected: usize,
}

impl RunStats {
    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Parallel test executor
pub struct ParallelExecutor {
    max_concurrent: usize,
    runner: TestRunner,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            runner: TestRunner::new(),
        }
    }

    /// Timeout applied to tests that do not declare one
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = self.runner.with_default_timeout(timeout);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run all cases on every aggregator platform.
    ///
    /// `on_complete` is called once per case, from this task, as soon as the
    /// case has a result for every platform.
    pub async fn run_all<F>(
        &self,
        cases: &[TestCase],
        aggregator: &PlatformAggregator,
        mut on_complete: F,
    ) -> RunStats
    where
        F: FnMut(&CaseSnapshot),
    {
        let platforms: Vec<Platform> = aggregator.platforms().to_vec();
        info!(
            "Running {} tests on {} platforms (max {} concurrent)",
            cases.len(),
            platforms.len(),
            self.max_concurrent
        );

        for case in cases {
            aggregator.expect(Arc::clone(&case.identity));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let mut pending = FuturesUnordered::new();
        for case in cases {
            for platform in &platforms {
                let semaphore = Arc::clone(&semaphore);
                pending.push(async move {
                    // The semaphore is never closed.
                    let _permit = semaphore.acquire().await.ok();
                    self.runner.run_test(case, platform).await
                });
            }
        }

        let mut recorded = 0;
        let mut rejected = 0;
        while let Some(result) = pending.next().await {
            let name = result.test.unique_name.clone();
            match aggregator.record(result) {
                Ok(CaseState::Complete) => {
                    recorded += 1;
                    if let Some(snapshot) = aggregator.case(&name) {
                        debug!("Completed {}", snapshot.identity);
                        on_complete(&snapshot);
                    }
                }
                Ok(_) => recorded += 1,
                Err(e) => {
                    warn!("Discarded result: {}", e);
                    rejected += 1;
                }
            }
        }

        let counts = aggregator.summary_counts();
        info!(
            "Execution completed in {}ms - {} succeeded, {} failed, {} errors, {} ignored",
            start.elapsed().as_millis(),
            counts.total(ResultKind::Success) + counts.total(ResultKind::NoError),
            counts.total(ResultKind::Fail),
            counts.total(ResultKind::Error),
            counts.total(ResultKind::Ignore)
        );

        RunStats {
            started_at,
            ended_at: Utc::now(),
            cases: cases.len(),
            recorded,
            rejected,
        }
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
