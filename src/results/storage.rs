//! Results storage and retrieval
//!
//! Persists completed runs as JSON files, one file per run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{PlatformAggregator, SummaryCounts};
use crate::models::{Platform, ResultKind, TestResult};

/// A completed run as written to disk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Platforms the run targeted
    pub platforms: Vec<Platform>,

    pub counts: SummaryCounts,

    /// Every recorded result
    pub results: Vec<TestResult>,

    pub environment: EnvironmentInfo,
}

/// Host the run executed on
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub tool_version: String,
    /// CI server detected at startup
    pub ci: Option<String>,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            ci: None,
        }
    }
}

impl StoredRun {
    /// Capture the aggregated state of a finished run
    pub fn from_aggregator(
        aggregator: &PlatformAggregator,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_run_id(),
            started_at,
            completed_at,
            platforms: aggregator.platforms().to_vec(),
            counts: aggregator.summary_counts(),
            results: aggregator.results(),
            environment: EnvironmentInfo::default(),
        }
    }

    pub fn with_ci(mut self, ci: Option<String>) -> Self {
        self.environment.ci = ci;
        self
    }

    /// Results that failed or errored
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.kind.is_failure())
    }

    /// True when no result failed or errored
    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Results storage manager
pub struct ResultsStorage {
    /// Base directory for results
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Storage under the user data directory
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crossunit")
            .join("results");
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{run_id}.json"))
    }

    /// Save a run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).context("Failed to create results directory")?;

        let path = self.run_path(&run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved test results to {}", path.display());
        Ok(path)
    }

    /// Load a run by ID
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        let path = self.run_path(run_id);
        let run = self
            .load_from_path(&path)
            .with_context(|| format!("Failed to load run {run_id}"))?;
        debug!("Loaded test results from {}", path.display());
        Ok(run)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let file = File::open(path).context("Failed to open results file")?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse results")
    }

    /// All readable runs, newest first
    pub fn load_all(&self) -> Result<Vec<StoredRun>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match self.load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => debug!("Failed to load {}: {}", path.display(), e),
                }
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Brief information about stored runs, newest first
    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        Ok(self.load_all()?.iter().map(RunInfo::from).collect())
    }

    pub fn latest(&self) -> Result<Option<StoredRun>> {
        Ok(self.load_all()?.into_iter().next())
    }

    pub fn delete(&self, run_id: &str) -> Result<()> {
        let path = self.run_path(run_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted results: {}", path.display());
        }
        Ok(())
    }

    /// Export a run to a file
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, run)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "unique_name",
                    "full_name",
                    "category",
                    "platform",
                    "kind",
                    "assert_count",
                    "duration_ms",
                    "output",
                ])?;

                for result in &run.results {
                    writer.write_record([
                        result.test.unique_name.clone(),
                        result.test.full_name(),
                        result.test.category.join(","),
                        result.platform.to_string(),
                        result.kind.to_string(),
                        result.assert_count.to_string(),
                        result.duration_ms().to_string(),
                        result.output.clone(),
                    ])?;
                }
                writer.flush()?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub platforms: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<&StoredRun> for RunInfo {
    fn from(run: &StoredRun) -> Self {
        Self {
            id: run.id.clone(),
            started_at: run.started_at,
            platforms: run.platforms.len(),
            total: run.counts.grand_total(),
            succeeded: run.counts.total(ResultKind::Success) + run.counts.total(ResultKind::NoError),
            failed: run.counts.total(ResultKind::Fail) + run.counts.total(ResultKind::Error),
        }
    }
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixtureInfo, ParameterSet, TestAttr, TestIdentity};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_run() -> StoredRun {
        let aggregator = PlatformAggregator::new(Platform::parse_list("linux,windows"));
        let identity = Arc::new(TestIdentity::build(
            &TestAttr::new().category("io").timeout_ms(250),
            &FixtureInfo::new("samples", "crossunit.samples", "Stored"),
            &ParameterSet::new([7]),
            "persists",
            &ParameterSet::new(["a,b"]),
        ));
        let now = Utc::now();
        aggregator
            .record(TestResult::new(Arc::clone(&identity), Platform::new("linux"), ResultKind::Success, "", 2, now, now))
            .unwrap();
        aggregator
            .record(TestResult::new(Arc::clone(&identity), Platform::new("windows"), ResultKind::Fail, "Expected: 1\nActual:   2", 0, now, now))
            .unwrap();
        StoredRun::from_aggregator(&aggregator, now, now)
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), "20240101_120000_0000".len());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let storage = ResultsStorage::new(dir.path().join("results"));
        let run = sample_run();

        let path = storage.save(&run).unwrap();
        assert!(path.exists());

        let loaded = storage.load(&run.id).unwrap();
        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.results.len(), 2);
        assert_eq!(loaded.counts, run.counts);
        assert_eq!(loaded.results[1].kind, ResultKind::Fail);
        assert_eq!(loaded.results[0].test.unique_name, run.results[0].test.unique_name);
        assert_eq!(loaded.results[0].test.timeout, run.results[0].test.timeout);
        assert!(!loaded.passed());
    }

    #[test]
    fn test_list_and_latest() {
        let dir = TempDir::new().unwrap();
        let storage = ResultsStorage::new(dir.path());
        assert!(storage.latest().unwrap().is_none());

        let run = sample_run();
        storage.save(&run).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let runs = storage.list_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].total, 2);
        assert_eq!(runs[0].succeeded, 1);
        assert_eq!(runs[0].failed, 1);
        assert_eq!(storage.latest().unwrap().unwrap().id, run.id);

        storage.delete(&run.id).unwrap();
        assert!(storage.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_export_csv() {
        let dir = TempDir::new().unwrap();
        let storage = ResultsStorage::new(dir.path());
        let run = sample_run();
        let path = dir.path().join("run.csv");

        storage.export(&run, &path, ExportFormat::Csv).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "samples.Stored.(7)persists(a,b)");
        assert_eq!(&rows[1][4], "Fail");
        assert_eq!(&rows[1][7], "Expected: 1\nActual:   2");
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
        assert_eq!(
            ExportFormat::from_extension(Path::new("out.csv")),
            Some(ExportFormat::Csv)
        );
        assert!(ExportFormat::from_str("xml").is_none());
    }
}
