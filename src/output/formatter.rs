//! Plain text console reporter

use std::io::{self, Write};
use std::time::Duration;

use super::Reporter;
use crate::models::{Platform, ResultKind};
use crate::results::{CaseSnapshot, PlatformAggregator};

const BANNER_WIDTH: usize = 25;

/// Human readable per-case blocks and end of run counts
#[derive(Clone, Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// Banner character summarising a case across platforms
    pub fn banner(case: &CaseSnapshot) -> char {
        if case.any(ResultKind::Fail) {
            '!'
        } else if case.any(ResultKind::Error) {
            'E'
        } else if case.any(ResultKind::Ignore) {
            '?'
        } else if case.all(ResultKind::Success) {
            '-'
        } else {
            '.'
        }
    }

    fn write_counts(
        out: &mut dyn Write,
        header: &str,
        results: &PlatformAggregator,
        kind: ResultKind,
    ) -> io::Result<()> {
        let counts = results.summary_counts();
        let Some(platforms) = counts.by_kind.get(&kind) else {
            return Ok(());
        };
        writeln!(out, "{header}")?;
        for (platform, count) in platforms {
            writeln!(out, "  {:<15}{:>6}", platform.name(), count)?;
        }
        writeln!(out)
    }
}

/// `HH:MM:SS.mmm`
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        millis % 1000
    )
}

fn join_platforms(platforms: &[Platform], separator: &str) -> String {
    platforms
        .iter()
        .map(Platform::name)
        .collect::<Vec<_>>()
        .join(separator)
}

impl Reporter for ConsoleReporter {
    fn run_started(&mut self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Starting Tests")
    }

    fn case_completed(&mut self, out: &mut dyn Write, case: &CaseSnapshot) -> io::Result<()> {
        writeln!(out, "{}", case.identity.full_name())?;

        for (kind, platforms) in case.platforms_by_kind() {
            writeln!(out, "{}: {}", kind, join_platforms(&platforms, " "))?;
        }

        writeln!(out, "avg time:{}", format_duration(case.average_duration()))?;

        for (platforms, output) in case.outputs() {
            writeln!(out, "{}:", join_platforms(&platforms, ","))?;
            writeln!(out, "{output}")?;
        }

        let banner = Self::banner(case).to_string().repeat(BANNER_WIDTH);
        writeln!(out, "{banner}")?;
        writeln!(out)
    }

    fn run_finished(&mut self, out: &mut dyn Write, results: &PlatformAggregator) -> io::Result<()> {
        Self::write_counts(out, "Errors:", results, ResultKind::Error)?;
        Self::write_counts(out, "Failures:", results, ResultKind::Fail)?;
        Self::write_counts(out, "Ignores:", results, ResultKind::Ignore)?;
        Self::write_counts(out, "NoErrors:", results, ResultKind::NoError)?;

        let counts = results.summary_counts();
        writeln!(out, "Success:")?;
        for platform in results.platforms() {
            writeln!(
                out,
                "  {:<15}{:>6}/{}",
                platform.name(),
                counts.count(ResultKind::Success, platform),
                results.expected_count(platform)
            )?;
        }
        writeln!(out)?;

        writeln!(out, "Final Total")?;
        writeln!(out)?;
        for (kind, total) in &counts.totals {
            writeln!(out, "  {:<15}{:>4}", kind.to_string(), total)?;
        }
        writeln!(out, "{:<17}{:>4}", "Total", counts.grand_total())
    }
}
