//! Fixtures whose tests end in every non-passing outcome

use std::thread;
use std::time::Duration;

use crate::fixture::{Fixture, TestContext, TestRegistry};
use crate::models::{ParameterSet, TestAttr};

use super::NAMESPACE;

pub struct Outcomes;

impl Fixture for Outcomes {}

/// Fixture whose teardown always fails
pub struct Leaky;

impl Fixture for Leaky {
    fn tear_down(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("handle was already released")
    }
}

pub fn register(registry: &mut TestRegistry) {
    registry
        .fixture(NAMESPACE, "Outcomes", |_: &ParameterSet| Ok(Outcomes))
        .test(
            "string_mismatch",
            TestAttr::new().category("outcomes,fail"),
            |_: &mut Outcomes, cx: &mut TestContext| {
                cx.assert()
                    .equal_str("The quick brown fox jumps", "The quick brown cat jumps");
            },
        )
        .test(
            "returns_false",
            TestAttr::new().category("outcomes,fail"),
            |_: &mut Outcomes, _: &mut TestContext| false,
        )
        .test(
            "panics",
            TestAttr::new().category("outcomes,error"),
            |_: &mut Outcomes, _: &mut TestContext| {
                let bytes: Vec<u8> = Vec::new();
                let _fourth = bytes[3];
            },
        )
        .test(
            "returns_error",
            TestAttr::new().category("outcomes,error"),
            |_: &mut Outcomes, _: &mut TestContext| -> anyhow::Result<()> {
                let port: u16 = "http".parse()?;
                anyhow::ensure!(port > 0, "port must be positive");
                Ok(())
            },
        )
        .test(
            "times_out",
            TestAttr::new()
                .category("outcomes,error,slow")
                .timeout_ms(100),
            |_: &mut Outcomes, cx: &mut TestContext| {
                thread::sleep(Duration::from_millis(1000));
                cx.assert().okay();
            },
        )
        .test(
            "skipped",
            TestAttr::new().category("outcomes,ignore"),
            |_: &mut Outcomes, cx: &mut TestContext| {
                cx.assert().ignore("Not implemented yet");
            },
        )
        .test(
            "skipped_on_windows",
            TestAttr::new().category("outcomes,ignore"),
            |_: &mut Outcomes, cx: &mut TestContext| {
                if cx.platform().name().contains("win") {
                    cx.assert().ignore("Requires a POSIX file system");
                }
                cx.assert().equal_str("tmp/run", ["tmp", "run"].join("/").as_str());
            },
        );

    registry
        .fixture(NAMESPACE, "Leaky", |_: &ParameterSet| Ok(Leaky))
        .test(
            "passes_then_leaks",
            TestAttr::new().category("outcomes,error"),
            |_: &mut Leaky, cx: &mut TestContext| {
                cx.assert().okay();
            },
        );
}
