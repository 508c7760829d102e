//! TeamCity service message reporter

use std::io::{self, Write};

use super::formatter::format_duration;
use super::Reporter;
use crate::models::ResultKind;
use crate::results::{CaseSnapshot, PlatformAggregator};

const SUITE_NAME: &str = "all";
const DETAILS: &str = "See log or details";

/// Escape a value for use inside a service message attribute
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => escaped.push_str("||"),
            '\'' => escaped.push_str("|'"),
            '\n' => escaped.push_str("|n"),
            '\r' => escaped.push_str("|r"),
            '[' => escaped.push_str("|["),
            ']' => escaped.push_str("|]"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Emits `##teamcity[...]` markers around the plain case output
#[derive(Clone, Debug, Default)]
pub struct TeamCityReporter;

impl TeamCityReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TeamCityReporter {
    fn run_started(&mut self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "##teamcity[testSuiteStarted name='{SUITE_NAME}']")
    }

    fn case_completed(&mut self, out: &mut dyn Write, case: &CaseSnapshot) -> io::Result<()> {
        let name = escape(&case.identity.full_name());
        writeln!(
            out,
            "##teamcity[testStarted name='{name}' captureStandardOutput='true']"
        )?;
        writeln!(out, "{}", case.identity.display_name)?;

        for (kind, platforms) in case.platforms_by_kind() {
            let platforms: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
            writeln!(out, "{}: {}", kind, platforms.join(" "))?;
        }

        let average = case.average_duration();
        writeln!(out, "avg time:{}", format_duration(average))?;
        for (platforms, output) in case.outputs() {
            let platforms: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
            writeln!(out, "{}:", platforms.join(","))?;
            writeln!(out, "{output}")?;
        }

        if case.any(ResultKind::Fail) || case.any(ResultKind::Error) {
            writeln!(
                out,
                "##teamcity[testFailed name='{name}' message='{DETAILS}']"
            )?;
        } else if case.any(ResultKind::Ignore) {
            writeln!(
                out,
                "##teamcity[testIgnored name='{name}' message='{DETAILS}']"
            )?;
        }

        writeln!(
            out,
            "##teamcity[testFinished name='{name}' duration='{}']",
            average.as_millis()
        )
    }

    fn run_finished(&mut self, out: &mut dyn Write, _results: &PlatformAggregator) -> io::Result<()> {
        writeln!(out, "##teamcity[testSuiteFinished name='{SUITE_NAME}']")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixtureInfo, ParameterSet, Platform, TestAttr, TestIdentity, TestResult};
    use chrono::Utc;
    use std::sync::Arc;

    fn render(kinds: &[ResultKind]) -> String {
        let platforms: Vec<Platform> = (0..kinds.len())
            .map(|i| Platform::new(format!("p{i}")))
            .collect();
        let aggregator = PlatformAggregator::new(platforms.clone());
        let identity = Arc::new(TestIdentity::build(
            &TestAttr::new(),
            &FixtureInfo::new("samples", "crossunit.samples", "Markers"),
            &ParameterSet::empty(),
            "quoted",
            &ParameterSet::new(["it's [x]"]),
        ));
        let now = Utc::now();
        for (platform, kind) in platforms.into_iter().zip(kinds) {
            aggregator
                .record(TestResult::new(Arc::clone(&identity), platform, *kind, "", 1, now, now))
                .unwrap();
        }

        let case = aggregator.case(&identity.unique_name).unwrap();
        let mut out = Vec::new();
        TeamCityReporter::new().case_completed(&mut out, &case).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a|b"), "a||b");
        assert_eq!(escape("it's"), "it|'s");
        assert_eq!(escape("x\r\ny"), "x|r|ny");
        assert_eq!(escape("[1]"), "|[1|]");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_failed_case_markers() {
        let text = render(&[ResultKind::Success, ResultKind::Error]);
        let name = "samples.Markers.quoted(it|'s |[x|])";
        assert!(text.starts_with(&format!(
            "##teamcity[testStarted name='{name}' captureStandardOutput='true']\n"
        )));
        assert!(text.contains(&format!(
            "##teamcity[testFailed name='{name}' message='See log or details']"
        )));
        assert!(text.contains(&format!("##teamcity[testFinished name='{name}' duration='0']")));
        assert!(!text.contains("testIgnored"));
    }

    #[test]
    fn test_ignored_case_markers() {
        let text = render(&[ResultKind::Ignore, ResultKind::Success]);
        assert!(text.contains("##teamcity[testIgnored"));
        assert!(!text.contains("testFailed"));
    }

    #[test]
    fn test_passing_case_has_no_status_marker() {
        let text = render(&[ResultKind::Success, ResultKind::NoError]);
        assert!(!text.contains("testFailed"));
        assert!(!text.contains("testIgnored"));
        assert!(text.contains("testFinished"));
    }
}
