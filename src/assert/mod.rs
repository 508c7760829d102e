//! Assertions
//!
//! Assertion helpers count successful checks and unwind with a typed
//! payload on failure. The engine catches the unwind at a single boundary
//! and classifies the run by payload type.

#![allow(dead_code)]

mod diff;

pub use diff::{divergence, render, shorten_and_encode, EqualFailure, Rendered, NEWLINE};

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Debug;
use std::panic::panic_any;

/// Unwind payload raised when an assertion fails
#[derive(Debug)]
pub struct AssertionFailure {
    pub message: String,
    /// Captured backtrace, empty unless backtraces are enabled
    pub backtrace: String,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            backtrace: capture_backtrace(),
        }
    }
}

/// Unwind payload raised when a test asks to be skipped
#[derive(Debug)]
pub struct SkipRequested {
    pub reason: String,
}

fn capture_backtrace() -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => String::new(),
    }
}

/// Assertion counter and helpers, fresh for every run
#[derive(Debug, Default)]
pub struct Assert {
    count: u32,
}

impl Assert {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passing assertions so far
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record one passing assertion
    pub fn okay(&mut self) {
        self.count += 1;
    }

    /// Fail the test. Never returns; typed as `()` so a test closure ending
    /// in `fail(..);` still has a unit return.
    pub fn fail(&mut self, message: impl Into<String>) {
        panic_any(AssertionFailure::new(message))
    }

    /// Skip the test. Never returns, like `fail`.
    pub fn ignore(&mut self, reason: impl Into<String>) {
        panic_any(SkipRequested {
            reason: reason.into(),
        })
    }

    pub fn is_true(&mut self, condition: bool, message: &str) {
        if !condition {
            self.fail(if message.is_empty() {
                "Assert::is_true() failure"
            } else {
                message
            });
        }
        self.okay();
    }

    pub fn is_false(&mut self, condition: bool, message: &str) {
        if condition {
            self.fail(if message.is_empty() {
                "Assert::is_false() failure"
            } else {
                message
            });
        }
        self.okay();
    }

    pub fn equal<T: PartialEq + Debug>(&mut self, expected: T, actual: T) {
        if expected != actual {
            let failure = EqualFailure::values(
                "Assert::equal() failure",
                Some(format!("{expected:?}")),
                Some(format!("{actual:?}")),
            );
            self.fail(failure.message());
        }
        self.okay();
    }

    /// String equality with a pointer to the first difference
    pub fn equal_str<'a>(
        &mut self,
        expected: impl Into<Option<&'a str>>,
        actual: impl Into<Option<&'a str>>,
    ) {
        let expected = expected.into();
        let actual = actual.into();
        if expected != actual {
            let failure = EqualFailure::strings("Assert::equal() failure", expected, actual);
            self.fail(failure.message());
        }
        self.okay();
    }

    pub fn not_equal<T: PartialEq + Debug>(&mut self, expected: T, actual: T) {
        if expected == actual {
            self.fail(format!("Assert::not_equal() failure{NEWLINE}Value: {actual:?}"));
        }
        self.okay();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn failure_of(f: impl FnOnce(&mut Assert)) -> Box<dyn std::any::Any + Send> {
        let mut assert = Assert::new();
        catch_unwind(AssertUnwindSafe(|| f(&mut assert))).unwrap_err()
    }

    #[test]
    fn test_passing_assertions_count() {
        let mut assert = Assert::new();
        assert.is_true(true, "");
        assert.equal(1, 1);
        assert.equal_str("a", "a");
        assert.not_equal(1, 2);
        assert_eq!(assert.count(), 4);
    }

    #[test]
    fn test_failure_payload() {
        let payload = failure_of(|a| a.equal(1, 2));
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert!(failure.message.contains("Expected: 1"));
        assert!(failure.message.contains("Actual:   2"));
    }

    #[test]
    fn test_string_failure_has_pointer() {
        let payload = failure_of(|a| a.equal_str("abcdefghij", "abcXefghij"));
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert!(failure.message.contains("↓ (pos 3)"));
        assert!(failure.message.contains("↑ (pos 3)"));
    }

    #[test]
    fn test_string_failure_with_null() {
        let payload = failure_of(|a| a.equal_str(None::<&str>, Some("x")));
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert!(failure.message.contains("Expected: (null)"));
    }

    #[test]
    fn test_skip_payload() {
        let payload = failure_of(|a| a.ignore("not on this platform"));
        let skip = payload.downcast_ref::<SkipRequested>().unwrap();
        assert_eq!(skip.reason, "not on this platform");
    }

    #[test]
    fn test_not_equal_uses_platform_newline() {
        let payload = failure_of(|a| a.not_equal("same", "same"));
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert_eq!(
            failure.message,
            format!("Assert::not_equal() failure{NEWLINE}Value: \"same\"")
        );
    }

    #[test]
    fn test_fail_ends_a_unit_closure() {
        let body = |a: &mut Assert| {
            a.okay();
            a.fail("stop here");
        };
        let payload = failure_of(body);
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert_eq!(failure.message, "stop here");
    }
}
