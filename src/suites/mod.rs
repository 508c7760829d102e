//! Built-in sample suites
//!
//! Fixtures registered by the `run` and `list` commands. Together they
//! produce every outcome kind:
//!
//! - `Calculator`, `Strings`: Success and NoError, parameterized
//!   constructors and methods, bool returns, fixtures without assertions
//! - `Outcomes`: Fail, Error (panic, returned error, timeout) and Ignore,
//!   including a skip on one platform only
//! - `Leaky`: a passing test escalated to Error by its teardown

mod basics;
mod outcomes;

pub use basics::{Calculator, Quiet};
pub use outcomes::{Leaky, Outcomes};

use crate::fixture::TestRegistry;

pub const MODULE: &str = "samples";
const NAMESPACE: &str = "crossunit.samples";

/// Registry holding every sample case
pub fn registry() -> TestRegistry {
    let mut registry = TestRegistry::new(MODULE);
    basics::register(&mut registry);
    outcomes::register(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ParallelExecutor;
    use crate::fixture::TestFilter;
    use crate::models::{Platform, ResultKind};
    use crate::results::PlatformAggregator;

    #[test]
    fn test_registry_size() {
        let registry = registry();
        assert_eq!(registry.len(), 19);
        assert_eq!(registry.filter(&TestFilter::new().include("fail")).len(), 2);
        assert_eq!(registry.filter(&TestFilter::new().exclude("outcomes")).len(), 11);
    }

    #[test]
    fn test_parameterized_names() {
        let registry = registry();
        let names: Vec<String> = registry
            .cases()
            .iter()
            .map(|c| c.identity.full_name())
            .collect();
        assert!(names.contains(&"samples.Calculator.(10)adds_commutatively(-5,5)".to_string()));
        assert!(names.contains(&"samples.Outcomes.times_out".to_string()));
    }

    #[tokio::test]
    async fn test_every_outcome_kind() {
        let registry = registry();
        let linux = Platform::new("linux");
        let windows = Platform::new("windows");
        let aggregator = PlatformAggregator::new([linux.clone(), windows.clone()]);

        let mut completed = 0;
        ParallelExecutor::new(8)
            .run_all(registry.cases(), &aggregator, |_| completed += 1)
            .await;
        assert_eq!(completed, 19);

        let counts = aggregator.summary_counts();
        assert_eq!(counts.count(ResultKind::Success, &linux), 10);
        assert_eq!(counts.count(ResultKind::NoError, &linux), 2);
        assert_eq!(counts.count(ResultKind::Fail, &linux), 2);
        assert_eq!(counts.count(ResultKind::Error, &linux), 4);
        assert_eq!(counts.count(ResultKind::Ignore, &linux), 1);
        assert_eq!(counts.count(ResultKind::Success, &windows), 9);
        assert_eq!(counts.count(ResultKind::Ignore, &windows), 2);
        assert_eq!(counts.grand_total(), 38);

        let timed_out = aggregator
            .results()
            .into_iter()
            .filter(|r| r.is_timeout())
            .count();
        assert_eq!(timed_out, 2);
    }
}
