//! Test registration
//!
//! Registration replaces attribute discovery: each fixture declares its
//! constructor, its constructor parameter sets and its test methods, and the
//! registry expands them into one `TestCase` per argument combination.

use std::fmt;
use std::sync::Arc;

use super::{ConstructorFn, Fixture, IntoTestReturn, MethodFn, TestContext, TestFactory, TypedFactory};
use crate::models::{FixtureInfo, ParameterSet, TestAttr, TestIdentity};

/// One runnable test instance
#[derive(Clone)]
pub struct TestCase {
    pub identity: Arc<TestIdentity>,
    pub constructor_args: ParameterSet,
    pub method_args: ParameterSet,
    pub factory: Arc<dyn TestFactory>,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("identity", &self.identity.unique_name)
            .field("constructor_args", &self.constructor_args)
            .field("method_args", &self.method_args)
            .finish()
    }
}

/// Collection of registered test cases for one module
pub struct TestRegistry {
    module: String,
    cases: Vec<TestCase>,
}

impl TestRegistry {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            cases: Vec::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Start registering a fixture type
    pub fn fixture<F, C>(
        &mut self,
        namespace: &str,
        name: &str,
        constructor: C,
    ) -> FixtureBuilder<'_, F>
    where
        F: Fixture,
        C: Fn(&ParameterSet) -> anyhow::Result<F> + Send + Sync + 'static,
    {
        let info = FixtureInfo::new(self.module.clone(), namespace, name);
        FixtureBuilder {
            registry: self,
            info,
            constructor: Arc::new(constructor),
            constructor_sets: vec![ParameterSet::empty()],
        }
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases accepted by the filter, in registration order
    pub fn filter(&self, filter: &TestFilter) -> Vec<TestCase> {
        self.cases
            .iter()
            .filter(|case| filter.matches(&case.identity))
            .cloned()
            .collect()
    }

    /// Merge another registry's cases into this one
    pub fn extend(&mut self, other: TestRegistry) {
        self.cases.extend(other.cases);
    }
}

/// Builder adding the tests of one fixture to a registry
pub struct FixtureBuilder<'r, F> {
    registry: &'r mut TestRegistry,
    info: FixtureInfo,
    constructor: Arc<ConstructorFn<F>>,
    constructor_sets: Vec<ParameterSet>,
}

impl<'r, F: Fixture> FixtureBuilder<'r, F> {
    /// Constructor parameter sets; applies to tests registered afterwards
    pub fn parameter_sets(mut self, sets: impl IntoIterator<Item = ParameterSet>) -> Self {
        self.constructor_sets = sets.into_iter().collect();
        self
    }

    /// Register a test method taking no arguments
    pub fn test<M, R>(self, name: &str, attr: TestAttr, method: M) -> Self
    where
        M: Fn(&mut F, &mut TestContext) -> R + Send + Sync + 'static,
        R: IntoTestReturn,
    {
        self.test_cases(name, attr, [ParameterSet::empty()], move |fixture, cx, _| {
            method(fixture, cx)
        })
    }

    /// Register a parameterized test method, one case per set
    pub fn test_cases<M, R>(
        self,
        name: &str,
        attr: TestAttr,
        sets: impl IntoIterator<Item = ParameterSet>,
        method: M,
    ) -> Self
    where
        M: Fn(&mut F, &mut TestContext, &ParameterSet) -> R + Send + Sync + 'static,
        R: IntoTestReturn,
    {
        let method: Arc<MethodFn<F>> =
            Arc::new(move |fixture: &mut F, cx: &mut TestContext, args: &ParameterSet| {
                method(fixture, cx, args).into_test_return()
            });
        let factory: Arc<dyn TestFactory> =
            Arc::new(TypedFactory::new(Arc::clone(&self.constructor), method));

        let sets: Vec<ParameterSet> = sets.into_iter().collect();
        for constructor_args in &self.constructor_sets {
            for method_args in &sets {
                let identity =
                    TestIdentity::build(&attr, &self.info, constructor_args, name, method_args);
                self.registry.cases.push(TestCase {
                    identity: Arc::new(identity),
                    constructor_args: constructor_args.retain(),
                    method_args: method_args.retain(),
                    factory: Arc::clone(&factory),
                });
            }
        }
        self
    }
}

/// Selects cases by name and category
#[derive(Clone, Debug, Default)]
pub struct TestFilter {
    /// Substring of the full name
    pub name: Option<String>,
    /// Run only cases carrying one of these categories
    pub include: Vec<String>,
    /// Never run cases carrying one of these categories
    pub exclude: Vec<String>,
}

impl TestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn include(mut self, category: impl Into<String>) -> Self {
        self.include.push(category.into());
        self
    }

    pub fn exclude(mut self, category: impl Into<String>) -> Self {
        self.exclude.push(category.into());
        self
    }

    pub fn matches(&self, identity: &TestIdentity) -> bool {
        if let Some(name) = &self.name {
            if !identity.full_name().contains(name.as_str()) {
                return false;
            }
        }
        if !self.include.is_empty() && !self.include.iter().any(|c| identity.has_category(c)) {
            return false;
        }
        !self.exclude.iter().any(|c| identity.has_category(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Param;

    struct Greeter {
        greeting: String,
    }

    impl Fixture for Greeter {}

    fn registry() -> TestRegistry {
        let mut registry = TestRegistry::new("samples");
        registry
            .fixture("crossunit.samples", "Greeter", |args: &ParameterSet| {
                Ok(Greeter {
                    greeting: args.str(0)?.to_string(),
                })
            })
            .parameter_sets([ParameterSet::new(["hello"]), ParameterSet::new(["hi"])])
            .test("not_empty", TestAttr::new().category("fast"), |g: &mut Greeter, cx: &mut TestContext| {
                cx.assert().is_true(!g.greeting.is_empty(), "empty greeting");
            })
            .test_cases(
                "greets",
                TestAttr::new().category("slow,io"),
                [ParameterSet::new(["bob"]), ParameterSet::new(["amy"])],
                |g: &mut Greeter, _: &mut TestContext, args: &ParameterSet| {
                    !format!("{} {}", g.greeting, args.str(0).unwrap_or_default()).is_empty()
                },
            );
        registry
    }

    #[test]
    fn test_cross_product_of_sets() {
        let registry = registry();
        // 2 ctor sets x (1 + 2 method sets)
        assert_eq!(registry.len(), 6);

        let names: Vec<&str> = registry
            .cases()
            .iter()
            .map(|c| c.identity.display_name.as_str())
            .collect();
        assert!(names.contains(&"(hello)not_empty"));
        assert!(names.contains(&"(hi)greets(amy)"));
    }

    #[test]
    fn test_unique_names_are_distinct() {
        let registry = registry();
        let mut names: Vec<&str> = registry
            .cases()
            .iter()
            .map(|c| c.identity.unique_name.as_str())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn test_argument_sets_are_shared() {
        let registry = registry();
        let first = &registry.cases()[0];
        assert_eq!(first.constructor_args.get(0), Ok(&Param::from("hello")));
        // one handle per case built from the set
        assert_eq!(first.constructor_args.holders(), 3);
    }

    #[test]
    fn test_bodies_ending_in_fail_or_ignore() {
        let mut registry = TestRegistry::new("samples");
        registry
            .fixture("crossunit.samples", "Terminal", |_: &ParameterSet| {
                Ok(Greeter {
                    greeting: String::new(),
                })
            })
            .test("gives_up", TestAttr::new(), |_: &mut Greeter, cx: &mut TestContext| {
                cx.assert().fail("gave up");
            })
            .test("skips", TestAttr::new(), |g: &mut Greeter, cx: &mut TestContext| {
                if g.greeting.is_empty() {
                    cx.log().write_line("nothing to greet");
                }
                cx.assert().ignore("no greeting");
            });
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_filter() {
        let registry = registry();
        assert_eq!(registry.filter(&TestFilter::new().include("fast")).len(), 2);
        assert_eq!(registry.filter(&TestFilter::new().exclude("io")).len(), 2);
        assert_eq!(registry.filter(&TestFilter::new().name("greets(bob)")).len(), 2);
        assert_eq!(registry.filter(&TestFilter::new()).len(), 6);
    }
}
