//! Data models for test execution
//!
//! Argument bundles, test identities, platforms and results.

mod identity;
mod params;
mod platform;
mod test_result;

pub use identity::{split_category, FixtureInfo, TestAttr, TestIdentity};
pub use params::{Param, ParamError, ParameterSet};
pub use platform::Platform;
pub use test_result::{ResultKind, TestResult, TIMEOUT_MESSAGE};
