//! Passing fixtures: parameterized arithmetic, string checks, return values

use crate::fixture::{Fixture, TestContext, TestRegistry};
use crate::models::{ParameterSet, TestAttr};

use super::NAMESPACE;

/// Adds an offset supplied through the constructor
pub struct Calculator {
    offset: i64,
}

impl Fixture for Calculator {}

impl Calculator {
    fn add(&self, a: i64, b: i64) -> i64 {
        self.offset + a + b
    }
}

/// Fixture that never touches the assertion counter
pub struct Quiet;

impl Fixture for Quiet {
    fn asserts(&self) -> bool {
        false
    }
}

pub fn register(registry: &mut TestRegistry) {
    registry
        .fixture(NAMESPACE, "Calculator", |args: &ParameterSet| {
            Ok(Calculator {
                offset: args.int(0)?,
            })
        })
        .parameter_sets([ParameterSet::new([0]), ParameterSet::new([10])])
        .test_cases(
            "adds_commutatively",
            TestAttr::new().category("math"),
            [ParameterSet::new([1, 2]), ParameterSet::new([-5, 5])],
            |calc: &mut Calculator, cx: &mut TestContext, args: &ParameterSet| -> anyhow::Result<()> {
                let (a, b) = (args.int(0)?, args.int(1)?);
                cx.assert().equal(calc.add(a, b), calc.add(b, a));
                cx.assert().not_equal(calc.add(a, b), calc.add(a, b) + 1);
                Ok(())
            },
        )
        .test(
            "offset_is_applied",
            TestAttr::new().category("math"),
            |calc: &mut Calculator, _: &mut TestContext| calc.add(0, 0) == calc.offset,
        )
        .test(
            "asserts_nothing",
            TestAttr::new().description("Completes without checking anything"),
            |_: &mut Calculator, _: &mut TestContext| {},
        );

    registry
        .fixture(NAMESPACE, "Strings", |_: &ParameterSet| Ok(Quiet))
        .test_cases(
            "trims",
            TestAttr::new().category("text"),
            [
                ParameterSet::new(["  padded  ", "padded"]),
                ParameterSet::new(["\tline\n", "line"]),
            ],
            |_: &mut Quiet, cx: &mut TestContext, args: &ParameterSet| -> anyhow::Result<()> {
                cx.log().write_line(format!("trimming {:?}", args.str(0)?));
                cx.assert().equal_str(args.str(1)?, args.str(0)?.trim());
                Ok(())
            },
        )
        .test(
            "runs_quietly",
            TestAttr::new().category("text"),
            |_: &mut Quiet, _: &mut TestContext| {},
        );
}
