//! Test result models
//!
//! Defines the outcome taxonomy and the immutable record of one execution.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::identity::TestIdentity;
use super::platform::Platform;

/// Output recorded when a run exceeds its timeout
pub const TIMEOUT_MESSAGE: &str = "Tests Execution Timed Out";

/// Outcome of one test execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    /// Ran without error but asserted nothing
    NoError,
    Success,
    Ignore,
    Fail,
    Error,
}

impl ResultKind {
    pub fn all() -> [ResultKind; 5] {
        [
            ResultKind::NoError,
            ResultKind::Success,
            ResultKind::Ignore,
            ResultKind::Fail,
            ResultKind::Error,
        ]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ResultKind::NoError => "·",
            ResultKind::Success => "✓",
            ResultKind::Ignore => "○",
            ResultKind::Fail => "✗",
            ResultKind::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultKind::Success)
    }

    /// Fail or Error
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultKind::Fail | ResultKind::Error)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::NoError => write!(f, "NoError"),
            ResultKind::Success => write!(f, "Success"),
            ResultKind::Ignore => write!(f, "Ignore"),
            ResultKind::Fail => write!(f, "Fail"),
            ResultKind::Error => write!(f, "Error"),
        }
    }
}

/// Result of a single test execution on one platform
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub test: Arc<TestIdentity>,
    pub kind: ResultKind,
    pub output: String,
    pub assert_count: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub platform: Platform,
}

impl TestResult {
    pub fn new(
        test: Arc<TestIdentity>,
        platform: Platform,
        kind: ResultKind,
        output: impl Into<String>,
        assert_count: u32,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            test,
            kind,
            output: output.into(),
            assert_count,
            started_at,
            ended_at,
            platform,
        }
    }

    /// Error result carrying only a message
    pub fn error(
        test: Arc<TestIdentity>,
        platform: Platform,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self::new(test, platform, ResultKind::Error, message, 0, started_at, ended_at)
    }

    /// Synthetic result for a run that exceeded its timeout
    pub fn timed_out(
        test: Arc<TestIdentity>,
        platform: Platform,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self::error(test, platform, TIMEOUT_MESSAGE, started_at, ended_at)
    }

    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ResultKind::Error && self.output == TIMEOUT_MESSAGE
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] [{}ms]",
            self.kind.symbol(),
            self.test,
            self.platform,
            self.duration_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixtureInfo, ParameterSet, TestAttr};
    use chrono::Duration as ChronoDuration;

    fn identity() -> Arc<TestIdentity> {
        Arc::new(TestIdentity::build(
            &TestAttr::default(),
            &FixtureInfo::new("samples", "crossunit.samples", "Calculator"),
            &ParameterSet::empty(),
            "adds",
            &ParameterSet::empty(),
        ))
    }

    #[test]
    fn test_kind_order() {
        let mut kinds = vec![ResultKind::Error, ResultKind::NoError, ResultKind::Fail];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![ResultKind::NoError, ResultKind::Fail, ResultKind::Error]
        );
    }

    #[test]
    fn test_duration() {
        let start = Utc::now();
        let end = start + ChronoDuration::milliseconds(120);
        let result = TestResult::new(
            identity(),
            Platform::new("linux"),
            ResultKind::Success,
            "",
            1,
            start,
            end,
        );
        assert_eq!(result.duration_ms(), 120);
        assert!(result.kind.is_success());
    }

    #[test]
    fn test_timed_out() {
        let now = Utc::now();
        let result = TestResult::timed_out(identity(), Platform::new("linux"), now, now);
        assert_eq!(result.kind, ResultKind::Error);
        assert_eq!(result.output, TIMEOUT_MESSAGE);
        assert!(result.is_timeout());
    }

    #[test]
    fn test_serializes_kind_names() {
        let json = serde_json::to_string(&ResultKind::NoError).unwrap();
        assert_eq!(json, "\"NoError\"");
    }
}
