//! Fixtures and test bodies
//!
//! A fixture is constructed fresh for every run from its constructor
//! arguments. Test methods receive the fixture, a per-run `TestContext`
//! and their own arguments.

#![allow(dead_code)]

mod registry;

pub use registry::{FixtureBuilder, TestCase, TestFilter, TestRegistry};

use std::fmt;
use std::sync::Arc;

use crate::assert::Assert;
use crate::models::{ParameterSet, Platform};

/// A type whose instances host test methods
pub trait Fixture: Send + 'static {
    /// Whether the fixture uses assertion and log capability.
    ///
    /// Fixtures that opt out are never classified as `NoError`.
    fn asserts(&self) -> bool {
        true
    }

    /// Release resources held by the fixture; runs on every exit path
    fn tear_down(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Captured output of one run
#[derive(Clone, Debug, Default)]
pub struct Log {
    buffer: String,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, text: impl AsRef<str>) {
        self.buffer.push_str(text.as_ref());
    }

    pub fn write_line(&mut self, text: impl AsRef<str>) {
        self.buffer.push_str(text.as_ref());
        self.buffer.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl fmt::Write for Log {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

/// Assertion counter and log buffer private to one run
#[derive(Debug)]
pub struct TestContext {
    assert: Assert,
    log: Log,
    platform: Platform,
    attached: bool,
}

impl TestContext {
    /// Context for a fixture with assertion capability
    pub fn new(platform: Platform) -> Self {
        Self {
            assert: Assert::new(),
            log: Log::new(),
            platform,
            attached: true,
        }
    }

    /// Context for a fixture without assertion capability
    pub fn detached(platform: Platform) -> Self {
        Self {
            attached: false,
            ..Self::new(platform)
        }
    }

    pub fn assert(&mut self) -> &mut Assert {
        &mut self.assert
    }

    pub fn log(&mut self) -> &mut Log {
        &mut self.log
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn assert_count(&self) -> u32 {
        self.assert.count()
    }

    /// False for fixtures that opted out of assertions
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn output(&self) -> &str {
        self.log.as_str()
    }

    pub fn into_output(self) -> String {
        self.log.into_string()
    }
}

/// What a test method handed back
#[derive(Debug)]
pub enum TestReturn {
    Unit,
    Bool(bool),
    Failed(anyhow::Error),
}

/// Conversion of test method return values
pub trait IntoTestReturn {
    fn into_test_return(self) -> TestReturn;
}

impl IntoTestReturn for () {
    fn into_test_return(self) -> TestReturn {
        TestReturn::Unit
    }
}

impl IntoTestReturn for bool {
    fn into_test_return(self) -> TestReturn {
        TestReturn::Bool(self)
    }
}

impl IntoTestReturn for anyhow::Result<()> {
    fn into_test_return(self) -> TestReturn {
        match self {
            Ok(()) => TestReturn::Unit,
            Err(e) => TestReturn::Failed(e),
        }
    }
}

impl IntoTestReturn for anyhow::Result<bool> {
    fn into_test_return(self) -> TestReturn {
        match self {
            Ok(v) => TestReturn::Bool(v),
            Err(e) => TestReturn::Failed(e),
        }
    }
}

/// A constructed fixture bound to one method and its arguments
pub trait Instance: Send {
    fn asserts(&self) -> bool;
    fn invoke(&mut self, cx: &mut TestContext) -> TestReturn;
    fn tear_down(&mut self) -> anyhow::Result<()>;
}

/// Creates instances of one registered test
pub trait TestFactory: Send + Sync {
    fn instantiate(
        &self,
        constructor_args: &ParameterSet,
        method_args: &ParameterSet,
    ) -> anyhow::Result<Box<dyn Instance>>;
}

pub(crate) type ConstructorFn<F> = dyn Fn(&ParameterSet) -> anyhow::Result<F> + Send + Sync;
pub(crate) type MethodFn<F> =
    dyn Fn(&mut F, &mut TestContext, &ParameterSet) -> TestReturn + Send + Sync;

/// Factory for a concrete fixture type and method
pub struct TypedFactory<F> {
    constructor: Arc<ConstructorFn<F>>,
    method: Arc<MethodFn<F>>,
}

impl<F: Fixture> TypedFactory<F> {
    pub(crate) fn new(constructor: Arc<ConstructorFn<F>>, method: Arc<MethodFn<F>>) -> Self {
        Self {
            constructor,
            method,
        }
    }
}

impl<F: Fixture> TestFactory for TypedFactory<F> {
    fn instantiate(
        &self,
        constructor_args: &ParameterSet,
        method_args: &ParameterSet,
    ) -> anyhow::Result<Box<dyn Instance>> {
        let fixture = (self.constructor)(constructor_args)?;
        Ok(Box::new(Bound {
            fixture,
            method: Arc::clone(&self.method),
            args: method_args.retain(),
        }))
    }
}

struct Bound<F> {
    fixture: F,
    method: Arc<MethodFn<F>>,
    args: ParameterSet,
}

impl<F: Fixture> Instance for Bound<F> {
    fn asserts(&self) -> bool {
        self.fixture.asserts()
    }

    fn invoke(&mut self, cx: &mut TestContext) -> TestReturn {
        (self.method)(&mut self.fixture, cx, &self.args)
    }

    fn tear_down(&mut self) -> anyhow::Result<()> {
        self.fixture.tear_down()
    }
}
