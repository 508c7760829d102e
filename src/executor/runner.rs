//! Test execution runner
//!
//! Runs one test case on a dedicated worker thread under a timeout and
//! classifies how it ended.

#![allow(dead_code)]

use chrono::Utc;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::hook;
use crate::assert::{AssertionFailure, SkipRequested};
use crate::fixture::{Instance, TestCase, TestContext, TestFactory, TestReturn};
use crate::models::{ParamError, ParameterSet, Platform, ResultKind, TestIdentity, TestResult};

/// Failure message for a test method that returned `false`
pub const RETURNED_FALSE: &str = "Test returned false.";

static WORKER_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Wrapper for failures raised while setting up the invocation
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Failed to construct fixture {fixture}")]
    Construct {
        fixture: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Why a run ended early
enum Fault {
    Assertion(AssertionFailure),
    Skip(SkipRequested),
    Panic(String),
    Error(anyhow::Error),
}

impl Fault {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<AssertionFailure>() {
            Ok(failure) => return Fault::Assertion(*failure),
            Err(other) => other,
        };
        let payload = match payload.downcast::<SkipRequested>() {
            Ok(skip) => return Fault::Skip(*skip),
            Err(other) => other,
        };
        if let Some(s) = payload.downcast_ref::<&str>() {
            Fault::Panic(s.to_string())
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Fault::Panic(s.clone())
        } else {
            Fault::Panic("Box<dyn Any>".to_string())
        }
    }

    /// Write the fault to the log and return the outcome it maps to
    fn record(self, cx: &mut TestContext) -> ResultKind {
        match self {
            Fault::Assertion(failure) => {
                cx.log().write_line(&failure.message);
                if !failure.backtrace.is_empty() {
                    cx.log().write_line(&failure.backtrace);
                }
                ResultKind::Fail
            }
            Fault::Skip(skip) => {
                cx.log().write(&skip.reason);
                ResultKind::Ignore
            }
            Fault::Panic(message) => {
                cx.log().write("panic: ");
                cx.log().write_line(&message);
                if let Some(report) = hook::take_report() {
                    if let Some(location) = report.location {
                        cx.log().write_line(format!("at {location}"));
                    }
                    if let Some(backtrace) = report.backtrace {
                        cx.log().write_line(backtrace);
                    }
                }
                ResultKind::Error
            }
            Fault::Error(err) => {
                // Construction failures are reported as the error they wrap
                let err = match err.downcast::<InvocationError>() {
                    Ok(InvocationError::Construct { source, .. }) => source,
                    Err(err) => err,
                };
                cx.log().write(error_kind(&err));
                cx.log().write(": ");
                cx.log().write_line(format!("{err:?}"));
                ResultKind::Error
            }
        }
    }
}

/// Type name of a returned error when it is one we know, `Error` otherwise
fn error_kind(err: &anyhow::Error) -> &'static str {
    if err.is::<ParamError>() {
        "ParamError"
    } else if err.is::<InvocationError>() {
        "InvocationError"
    } else if err.is::<std::io::Error>() {
        "io::Error"
    } else if err.is::<std::num::ParseIntError>() {
        "ParseIntError"
    } else if err.is::<std::num::ParseFloatError>() {
        "ParseFloatError"
    } else {
        "Error"
    }
}

/// Everything a worker needs to run one case, owned by the worker
struct Job {
    identity: Arc<TestIdentity>,
    factory: Arc<dyn TestFactory>,
    constructor_args: ParameterSet,
    method_args: ParameterSet,
    platform: Platform,
}

impl Job {
    fn execute(self) -> TestResult {
        let started_at = Utc::now();

        let constructed = catch_unwind(AssertUnwindSafe(|| {
            self.factory
                .instantiate(&self.constructor_args, &self.method_args)
        }));
        let mut instance = match constructed {
            Ok(Ok(instance)) => instance,
            Ok(Err(source)) => {
                let err = anyhow::Error::new(InvocationError::Construct {
                    fixture: self.identity.fixture.name.clone(),
                    source,
                });
                return self.finish_without_fixture(Fault::Error(err), started_at);
            }
            Err(payload) => {
                return self.finish_without_fixture(Fault::from_payload(payload), started_at);
            }
        };

        let mut cx = if instance.asserts() {
            TestContext::new(self.platform.clone())
        } else {
            TestContext::detached(self.platform.clone())
        };

        let invoked = catch_unwind(AssertUnwindSafe(|| invoke(instance.as_mut(), &mut cx)));
        let mut kind = match invoked {
            Ok(Ok(())) => completed_kind(&cx),
            Ok(Err(fault)) => fault.record(&mut cx),
            Err(payload) => Fault::from_payload(payload).record(&mut cx),
        };

        kind = tear_down(instance.as_mut(), &mut cx, kind);
        drop(instance);

        let assert_count = cx.assert_count();
        TestResult::new(
            self.identity,
            self.platform,
            kind,
            cx.into_output(),
            assert_count,
            started_at,
            Utc::now(),
        )
    }

    fn finish_without_fixture(self, fault: Fault, started_at: chrono::DateTime<Utc>) -> TestResult {
        let mut cx = TestContext::new(self.platform.clone());
        let kind = fault.record(&mut cx);
        TestResult::new(
            self.identity,
            self.platform,
            kind,
            cx.into_output(),
            0,
            started_at,
            Utc::now(),
        )
    }
}

fn invoke(instance: &mut dyn Instance, cx: &mut TestContext) -> Result<(), Fault> {
    match instance.invoke(cx) {
        TestReturn::Unit => Ok(()),
        TestReturn::Bool(true) => {
            cx.assert().okay();
            Ok(())
        }
        TestReturn::Bool(false) => Err(Fault::Assertion(AssertionFailure::new(RETURNED_FALSE))),
        TestReturn::Failed(err) => Err(Fault::Error(err)),
    }
}

fn completed_kind(cx: &TestContext) -> ResultKind {
    if cx.is_attached() && cx.assert_count() == 0 {
        ResultKind::NoError
    } else {
        ResultKind::Success
    }
}

/// Tear the fixture down; a teardown failure turns a passing outcome into
/// an error and is otherwise only logged.
fn tear_down(instance: &mut dyn Instance, cx: &mut TestContext, kind: ResultKind) -> ResultKind {
    let message = match catch_unwind(AssertUnwindSafe(|| instance.tear_down())) {
        Ok(Ok(())) => return kind,
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => match Fault::from_payload(payload) {
            Fault::Panic(message) => message,
            Fault::Assertion(failure) => failure.message,
            Fault::Skip(skip) => skip.reason,
            Fault::Error(err) => err.to_string(),
        },
    };
    cx.log().write("Teardown failed: ");
    cx.log().write_line(message);

    match kind {
        ResultKind::Success | ResultKind::NoError => ResultKind::Error,
        other => other,
    }
}

/// Executes single test cases
#[derive(Clone, Debug, Default)]
pub struct TestRunner {
    default_timeout: Option<Duration>,
}

impl TestRunner {
    /// Create a runner that waits indefinitely unless a test sets a timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout for tests that do not declare one
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Run a registered case on a platform
    pub async fn run_test(&self, case: &TestCase, platform: &Platform) -> TestResult {
        let timeout = case.identity.timeout.or(self.default_timeout);
        self.run(
            Arc::clone(&case.identity),
            &case.constructor_args,
            Arc::clone(&case.factory),
            &case.method_args,
            timeout,
            platform,
        )
        .await
    }

    /// Run one test on a fresh worker thread.
    ///
    /// Waits for the worker until `timeout` elapses (forever when `None`).
    /// On timeout the worker is abandoned, not cancelled, and a synthetic
    /// error result is returned. Never panics.
    pub async fn run(
        &self,
        identity: Arc<TestIdentity>,
        constructor_args: &ParameterSet,
        factory: Arc<dyn TestFactory>,
        method_args: &ParameterSet,
        timeout: Option<Duration>,
        platform: &Platform,
    ) -> TestResult {
        hook::install();

        let started_at = Utc::now();
        let (sender, receiver) = oneshot::channel();
        let job = Job {
            identity: Arc::clone(&identity),
            factory,
            constructor_args: constructor_args.retain(),
            method_args: method_args.retain(),
            platform: platform.clone(),
        };

        debug!("Running {} on {}", identity, platform);

        let worker = format!("crossunit-worker-{}", WORKER_SEQ.fetch_add(1, Ordering::Relaxed));
        let spawned = thread::Builder::new().name(worker).spawn(move || {
            hook::enter_worker();
            let result = job.execute();
            // The receiver is gone when the run already timed out.
            let _ = sender.send(result);
        });

        if let Err(e) = spawned {
            error!("Failed to start worker for {}: {}", identity, e);
            return TestResult::error(
                identity,
                platform.clone(),
                format!("Failed to start test worker: {e}"),
                started_at,
                Utc::now(),
            );
        }

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    warn!("{} on {} timed out after {}ms", identity, platform, limit.as_millis());
                    return TestResult::timed_out(identity, platform.clone(), started_at, Utc::now());
                }
            },
            None => receiver.await,
        };

        match received {
            Ok(result) => {
                debug!("  {}", result);
                result
            }
            Err(_) => {
                error!("Worker for {} exited without a result", identity);
                TestResult::error(
                    identity,
                    platform.clone(),
                    "Test worker exited without reporting a result",
                    started_at,
                    Utc::now(),
                )
            }
        }
    }
}
