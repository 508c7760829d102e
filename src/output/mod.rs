//! Result reporting
//!
//! Reporters render aggregated results for humans and CI servers. The mode
//! is chosen from configuration at startup and passed in explicitly.

#![allow(dead_code)]

mod appveyor;
mod formatter;
mod teamcity;

pub use appveyor::{AppVeyorClient, AppVeyorReporter, AppVeyorTest};
pub use formatter::ConsoleReporter;
pub use teamcity::{escape as teamcity_escape, TeamCityReporter};

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::results::{CaseSnapshot, PlatformAggregator};

/// Renders run progress to a writer
pub trait Reporter: Send {
    fn run_started(&mut self, out: &mut dyn Write) -> io::Result<()>;

    /// Called once per case when every platform has reported
    fn case_completed(&mut self, out: &mut dyn Write, case: &CaseSnapshot) -> io::Result<()>;

    fn run_finished(&mut self, out: &mut dyn Write, results: &PlatformAggregator)
        -> io::Result<()>;
}

/// Which renderer writes to the console
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterMode {
    #[default]
    Console,
    TeamCity,
}

impl ReporterMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(ReporterMode::Console),
            "teamcity" => Some(ReporterMode::TeamCity),
            _ => None,
        }
    }

    pub fn reporter(self) -> Box<dyn Reporter> {
        match self {
            ReporterMode::Console => Box::new(ConsoleReporter::new()),
            ReporterMode::TeamCity => Box::new(TeamCityReporter::new()),
        }
    }
}

/// Console reporter plus optional AppVeyor posting
///
/// Each call renders into a buffer and hands it to `out` in one write, so a
/// shared stream such as stdout is only locked for that write and never
/// while tests are running.
pub struct Reporters<W: Write> {
    out: W,
    console: Box<dyn Reporter>,
    appveyor: Option<AppVeyorReporter>,
}

impl Reporters<io::Stdout> {
    /// Reporters writing to the process stdout
    pub fn stdout(mode: ReporterMode) -> Self {
        Self::new(mode, io::stdout())
    }
}

impl<W: Write> Reporters<W> {
    pub fn new(mode: ReporterMode, out: W) -> Self {
        Self {
            out,
            console: mode.reporter(),
            appveyor: None,
        }
    }

    pub fn with_appveyor(mut self, reporter: AppVeyorReporter) -> Self {
        self.appveyor = Some(reporter);
        self
    }

    fn emit(
        &mut self,
        render: impl FnOnce(&mut dyn Reporter, &mut dyn Write) -> io::Result<()>,
    ) -> io::Result<()> {
        let mut buf = Vec::new();
        render(self.console.as_mut(), &mut buf)?;
        self.out.write_all(&buf)?;
        self.out.flush()
    }

    pub fn run_started(&mut self) -> io::Result<()> {
        self.emit(|console, out| console.run_started(out))
    }

    pub fn case_completed(&mut self, case: &CaseSnapshot) -> io::Result<()> {
        if let Some(appveyor) = &mut self.appveyor {
            appveyor.case_completed(&mut io::sink(), case)?;
        }
        self.emit(|console, out| console.case_completed(out, case))
    }

    pub fn run_finished(&mut self, results: &PlatformAggregator) -> io::Result<()> {
        self.emit(|console, out| console.run_finished(out, results))
    }

    /// Post queued AppVeyor results, if enabled
    pub async fn flush_remote(&mut self) -> usize {
        match &mut self.appveyor {
            Some(appveyor) => appveyor.flush().await,
            None => 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ParallelExecutor;
    use crate::fixture::{Fixture, TestContext, TestRegistry};
    use crate::models::{ParameterSet, Platform, ResultKind, TestAttr};

    #[test]
    fn test_reporter_mode_from_str() {
        assert_eq!(ReporterMode::from_str("TeamCity"), Some(ReporterMode::TeamCity));
        assert_eq!(ReporterMode::from_str("console"), Some(ReporterMode::Console));
        assert_eq!(ReporterMode::from_str("junit"), None);
        assert_eq!(ReporterMode::default(), ReporterMode::Console);
    }

    #[test]
    fn test_reporters_write_to_buffer() {
        let aggregator = PlatformAggregator::new(Vec::new());
        let mut reporters = Reporters::new(ReporterMode::TeamCity, Vec::new());
        reporters.run_started().unwrap();
        reporters.run_finished(&aggregator).unwrap();

        let text = String::from_utf8(reporters.into_inner()).unwrap();
        assert!(text.contains("##teamcity[testSuiteStarted name='all']"));
        assert!(text.contains("##teamcity[testSuiteFinished name='all']"));
    }

    struct Chatty;

    impl Fixture for Chatty {}

    #[tokio::test]
    async fn test_tests_can_print_while_reporting_to_stdout() {
        let mut registry = TestRegistry::new("output");
        registry
            .fixture("crossunit.output", "Chatty", |_: &ParameterSet| Ok(Chatty))
            .test("prints", TestAttr::new().timeout_ms(2000), |_: &mut Chatty, cx: &mut TestContext| {
                let mut stdout = io::stdout();
                writeln!(stdout, "hello from a test body").unwrap();
                stdout.flush().unwrap();
                cx.assert().okay();
            });

        let platforms = Platform::parse_list("linux,windows");
        let aggregator = PlatformAggregator::new(platforms.clone());
        let mut reporters = Reporters::stdout(ReporterMode::TeamCity);
        reporters.run_started().unwrap();

        let mut reported = 0;
        ParallelExecutor::new(2)
            .run_all(registry.cases(), &aggregator, |case| {
                reporters.case_completed(case).unwrap();
                reported += 1;
            })
            .await;
        reporters.run_finished(&aggregator).unwrap();

        assert_eq!(reported, 1);
        for platform in &platforms {
            assert_eq!(aggregator.summary_counts().count(ResultKind::Success, platform), 1);
        }
        assert!(aggregator.results().iter().all(|r| !r.is_timeout()));
    }
}
