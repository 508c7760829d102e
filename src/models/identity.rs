//! Test identity
//!
//! Every test instance gets a unique name that is stable across runs and
//! disambiguates parameterized invocations of the same method, plus a
//! human readable display name.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::params::ParameterSet;

/// Declared metadata attached to a test method
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestAttr {
    /// Raw comma separated category string
    pub category: String,
    pub description: Option<String>,
    pub timeout: Option<Duration>,
}

impl TestAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }
}

/// Owning fixture of a test
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixtureInfo {
    /// Module (assembly) the fixture lives in
    pub module: String,
    pub namespace: String,
    pub name: String,
}

impl FixtureInfo {
    pub fn new(module: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Identity of one test instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    pub unique_name: String,
    pub display_name: String,
    pub category: Vec<String>,
    pub description: Option<String>,
    #[serde(with = "timeout_millis")]
    pub timeout: Option<Duration>,
    pub fixture: FixtureInfo,
    pub method: String,
}

impl TestIdentity {
    /// Build the identity of a (fixture, ctor args, method, method args) tuple
    pub fn build(
        attr: &TestAttr,
        fixture: &FixtureInfo,
        constructor_args: &ParameterSet,
        method: &str,
        method_args: &ParameterSet,
    ) -> Self {
        let mut unique_name = format!("M:{}.{}", fixture.namespace, fixture.name);
        let mut display_name = String::new();

        if !constructor_args.is_empty() {
            unique_name.push_str(&format!("({})", constructor_args.unique_list()));
            display_name.push_str(&format!("({})", constructor_args.display_list()));
        }

        unique_name.push('.');
        unique_name.push_str(method);
        display_name.push_str(method);

        if !method_args.is_empty() {
            unique_name.push_str(&format!("({})", method_args.unique_list()));
            display_name.push_str(&format!("({})", method_args.display_list()));
        }

        Self {
            unique_name,
            display_name,
            category: split_category(&attr.category),
            description: attr.description.clone(),
            timeout: attr.timeout,
            fixture: fixture.clone(),
            method: method.to_string(),
        }
    }

    /// `<module>.<fixture>.<display name>` as shown by reporters
    pub fn full_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.fixture.module, self.fixture.name, self.display_name
        )
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|c| c == category)
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Split a raw category string on commas.
///
/// An empty raw string has no categories; otherwise every segment is kept
/// as written, empty ones included.
pub fn split_category(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

mod timeout_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Param;

    fn fixture() -> FixtureInfo {
        FixtureInfo::new("samples", "crossunit.samples", "Calculator")
    }

    fn build(ctor: ParameterSet, method: &str, args: ParameterSet) -> TestIdentity {
        TestIdentity::build(&TestAttr::default(), &fixture(), &ctor, method, &args)
    }

    #[test]
    fn test_zero_args_have_no_parenthetical() {
        let id = build(ParameterSet::empty(), "adds", ParameterSet::empty());
        assert_eq!(id.unique_name, "M:crossunit.samples.Calculator.adds");
        assert_eq!(id.display_name, "adds");
        assert_eq!(id.full_name(), "samples.Calculator.adds");
    }

    #[test]
    fn test_unique_name_shape() {
        let id = build(
            ParameterSet::new([2]),
            "adds",
            ParameterSet::new([Param::Int(3), Param::from("x")]),
        );
        let two = Param::Int(2).identity_hash();
        let three = Param::Int(3).identity_hash();
        let x = Param::from("x").identity_hash();
        assert_eq!(
            id.unique_name,
            format!("M:crossunit.samples.Calculator(i64#{two}).adds(i64#{three},String#{x})")
        );
        assert_eq!(id.display_name, "(2)adds(3,x)");
    }

    #[test]
    fn test_deterministic() {
        let a = build(ParameterSet::new([1]), "m", ParameterSet::new(["a"]));
        let b = build(ParameterSet::new([1]), "m", ParameterSet::new(["a"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_component_changes_name() {
        let base = build(ParameterSet::new([1]), "m", ParameterSet::new([2]));
        let other_method = build(ParameterSet::new([1]), "n", ParameterSet::new([2]));
        let other_ctor = build(ParameterSet::new([9]), "m", ParameterSet::new([2]));
        let other_arg = build(ParameterSet::new([1]), "m", ParameterSet::new([3]));
        let other_type = build(ParameterSet::new([1]), "m", ParameterSet::new(["2"]));
        let swapped = build(ParameterSet::new([2]), "m", ParameterSet::new([1]));

        for other in [other_method, other_ctor, other_arg, other_type, swapped] {
            assert_ne!(base.unique_name, other.unique_name);
        }

        let other_fixture = TestIdentity::build(
            &TestAttr::default(),
            &FixtureInfo::new("samples", "crossunit.samples", "Other"),
            &ParameterSet::new([1]),
            "m",
            &ParameterSet::new([2]),
        );
        assert_ne!(base.unique_name, other_fixture.unique_name);
    }

    #[test]
    fn test_display_name_may_collide() {
        let int = build(ParameterSet::empty(), "m", ParameterSet::new([1]));
        let text = build(ParameterSet::empty(), "m", ParameterSet::new(["1"]));
        assert_eq!(int.display_name, text.display_name);
        assert_ne!(int.unique_name, text.unique_name);
    }

    #[test]
    fn test_argument_order_is_kept() {
        let ab = build(ParameterSet::empty(), "m", ParameterSet::new(["a", "b"]));
        let ba = build(ParameterSet::empty(), "m", ParameterSet::new(["b", "a"]));
        assert_eq!(ab.display_name, "m(a,b)");
        assert_eq!(ba.display_name, "m(b,a)");
        assert_ne!(ab.unique_name, ba.unique_name);
    }

    #[test]
    fn test_category_split() {
        assert!(split_category("").is_empty());
        assert_eq!(split_category("fast"), vec!["fast"]);
        assert_eq!(split_category("fast,io"), vec!["fast", "io"]);
        assert_eq!(split_category("fast, io"), vec!["fast", " io"]);
        assert_eq!(split_category(","), vec!["", ""]);
    }

    #[test]
    fn test_attr_carried_over() {
        let attr = TestAttr::new()
            .category("slow,net")
            .description("talks to the network")
            .timeout_ms(250);
        let id = TestIdentity::build(
            &attr,
            &fixture(),
            &ParameterSet::empty(),
            "fetch",
            &ParameterSet::empty(),
        );
        assert!(id.has_category("net"));
        assert_eq!(id.description.as_deref(), Some("talks to the network"));
        assert_eq!(id.timeout, Some(Duration::from_millis(250)));
    }
}
