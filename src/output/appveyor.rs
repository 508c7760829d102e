//! AppVeyor build worker API reporting
//!
//! Results are queued as cases complete and posted to `<api>/api/tests`
//! when the run is flushed. Posting is best effort.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

use super::Reporter;
use crate::models::{ResultKind, TestResult};
use crate::results::{CaseSnapshot, PlatformAggregator};

/// Test payload accepted by the AppVeyor API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppVeyorTest {
    #[serde(rename = "testName")]
    pub test_name: String,
    #[serde(rename = "testFramework")]
    pub test_framework: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub outcome: String,
    #[serde(rename = "durationMilliseconds")]
    pub duration_milliseconds: u64,
    #[serde(rename = "ErrorMessage")]
    pub error_message: String,
    #[serde(rename = "ErrorStackTrace")]
    pub error_stack_trace: String,
    #[serde(rename = "StdOut")]
    pub std_out: String,
    #[serde(rename = "StdErr")]
    pub std_err: String,
}

impl AppVeyorTest {
    pub fn outcome(kind: ResultKind) -> &'static str {
        match kind {
            ResultKind::Success => "Passed",
            ResultKind::Fail => "Failed",
            ResultKind::Error => "NotRunnable",
            ResultKind::Ignore => "Ignored",
            ResultKind::NoError => "Inconclusive",
        }
    }

    pub fn from_result(result: &TestResult) -> Self {
        Self {
            test_name: result.test.full_name(),
            test_framework: format!("crossunit[{}]", result.platform),
            file_name: result.test.fixture.module.clone(),
            outcome: Self::outcome(result.kind).to_string(),
            duration_milliseconds: result.duration_ms(),
            error_message: String::new(),
            error_stack_trace: String::new(),
            std_out: result.output.clone(),
            std_err: String::new(),
        }
    }
}

/// HTTP client for the build worker API
#[derive(Clone)]
pub struct AppVeyorClient {
    client: Client,
    base_url: String,
}

impl AppVeyorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tests_url(&self) -> String {
        format!("{}/api/tests", self.base_url.trim_end_matches('/'))
    }

    /// Post one test result
    pub async fn post(&self, test: &AppVeyorTest) -> Result<()> {
        let url = self.tests_url();
        debug!("Posting {} to {}", test.test_name, url);

        self.client
            .post(&url)
            .json(test)
            .send()
            .await
            .context("Failed to send test result")?
            .error_for_status()
            .context("AppVeyor rejected test result")?;
        Ok(())
    }
}

/// Queues every result of completed cases for posting
pub struct AppVeyorReporter {
    client: AppVeyorClient,
    pending: Vec<AppVeyorTest>,
}

impl AppVeyorReporter {
    pub fn new(client: AppVeyorClient) -> Self {
        Self {
            client,
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[AppVeyorTest] {
        &self.pending
    }

    /// Post queued results; returns how many were accepted
    pub async fn flush(&mut self) -> usize {
        let mut posted = 0;
        for test in self.pending.drain(..) {
            match self.client.post(&test).await {
                Ok(()) => posted += 1,
                Err(e) => warn!("AppVeyor post for {} failed: {:#}", test.test_name, e),
            }
        }
        posted
    }
}

impl Reporter for AppVeyorReporter {
    fn run_started(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn case_completed(&mut self, _out: &mut dyn Write, case: &CaseSnapshot) -> io::Result<()> {
        self.pending
            .extend(case.reported().map(AppVeyorTest::from_result));
        Ok(())
    }

    fn run_finished(&mut self, _out: &mut dyn Write, _results: &PlatformAggregator) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixtureInfo, ParameterSet, Platform, TestAttr, TestIdentity};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;

    fn reporter_with_case() -> AppVeyorReporter {
        let aggregator = PlatformAggregator::new(Platform::parse_list("linux,windows"));
        let identity = Arc::new(TestIdentity::build(
            &TestAttr::new(),
            &FixtureInfo::new("samples", "crossunit.samples", "Posted"),
            &ParameterSet::empty(),
            "reports",
            &ParameterSet::empty(),
        ));
        let start = Utc::now();
        let end = start + ChronoDuration::milliseconds(15);
        aggregator
            .record(TestResult::new(Arc::clone(&identity), Platform::new("linux"), ResultKind::Success, "", 1, start, end))
            .unwrap();
        aggregator
            .record(TestResult::new(Arc::clone(&identity), Platform::new("windows"), ResultKind::Error, "boom", 0, start, end))
            .unwrap();

        let client = AppVeyorClient::new("http://127.0.0.1:1/").unwrap();
        let mut reporter = AppVeyorReporter::new(client);
        let case = aggregator.case(&identity.unique_name).unwrap();
        reporter.case_completed(&mut io::sink(), &case).unwrap();
        reporter
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(AppVeyorTest::outcome(ResultKind::Success), "Passed");
        assert_eq!(AppVeyorTest::outcome(ResultKind::Fail), "Failed");
        assert_eq!(AppVeyorTest::outcome(ResultKind::Error), "NotRunnable");
        assert_eq!(AppVeyorTest::outcome(ResultKind::Ignore), "Ignored");
        assert_eq!(AppVeyorTest::outcome(ResultKind::NoError), "Inconclusive");
    }

    #[tokio::test]
    async fn test_case_results_are_queued() {
        let reporter = reporter_with_case();
        let pending = reporter.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].test_name, "samples.Posted.reports");
        assert_eq!(pending[0].test_framework, "crossunit[linux]");
        assert_eq!(pending[0].duration_milliseconds, 15);
        assert_eq!(pending[1].outcome, "NotRunnable");
        assert_eq!(pending[1].std_out, "boom");
    }

    #[test]
    fn test_payload_field_names() {
        let reporter = reporter_with_case();
        let json = serde_json::to_value(&reporter.pending()[0]).unwrap();
        assert_eq!(json["testName"], "samples.Posted.reports");
        assert_eq!(json["durationMilliseconds"], 15);
        assert!(json.get("StdOut").is_some());
    }

    #[test]
    fn test_tests_url() {
        let client = AppVeyorClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.tests_url(), "http://localhost:8080/api/tests");
    }

    #[tokio::test]
    async fn test_failed_posts_are_swallowed() {
        let mut reporter = reporter_with_case();
        assert_eq!(reporter.flush().await, 0);
        assert!(reporter.pending().is_empty());
    }
}
