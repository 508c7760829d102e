//! Configuration module
//!
//! Handles loading configuration files and applying environment overrides.

#![allow(dead_code)]

pub mod env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Platform;
use crate::output::ReporterMode;
use env::EnvConfig;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./crossunit.yaml",
    "./crossunit.yml",
    "./crossunit.json",
    "./.crossunit.yaml",
];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Platforms every test runs on
    pub platforms: Vec<Platform>,

    /// Timeout for tests that do not declare one; unset waits indefinitely
    pub default_timeout_ms: Option<u64>,

    /// Maximum concurrent test workers
    pub max_concurrent: usize,

    /// Console renderer
    pub reporter: ReporterMode,

    /// Where completed runs are stored; defaults to the user data directory
    pub results_dir: Option<PathBuf>,

    /// AppVeyor build worker API; posting is enabled when set
    pub appveyor_api_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platforms: vec![Platform::host()],
            default_timeout_ms: None,
            max_concurrent: 4,
            reporter: ReporterMode::Console,
            results_dir: None,
            appveyor_api_url: None,
        }
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// First existing file in the standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Load from an explicit path, the standard locations, or defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(Self::find) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.platforms.is_empty() {
            anyhow::bail!("At least one platform must be configured");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        let mut seen = self.platforms.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.platforms.len() {
            anyhow::bail!("Duplicate platform in configuration");
        }
        Ok(())
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(platforms) = &env.platforms {
            let parsed = Platform::parse_list(platforms);
            if !parsed.is_empty() {
                self.platforms = parsed;
            }
        }
        if let Some(timeout) = env.timeout_ms {
            self.default_timeout_ms = Some(timeout);
        }
        if let Some(max) = env.max_concurrent {
            self.max_concurrent = max;
        }
        if let Some(mode) = env.reporter.as_deref().and_then(ReporterMode::from_str) {
            self.reporter = mode;
        } else if env.teamcity_version.is_some() {
            self.reporter = ReporterMode::TeamCity;
        }
        if let Some(dir) = &env.results_dir {
            self.results_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = &env.appveyor_api_url {
            self.appveyor_api_url = Some(url.clone());
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.platforms, vec![Platform::host()]);
        assert_eq!(config.max_concurrent, 4);
        assert!(config.default_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crossunit.yaml");
        let config = AppConfig {
            platforms: Platform::parse_list("linux,windows"),
            default_timeout_ms: Some(1500),
            reporter: ReporterMode::TeamCity,
            ..Default::default()
        };

        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.default_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_partial_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crossunit.json");
        std::fs::write(&path, r#"{ "platforms": ["net45", "sl5"], "reporter": "teamcity" }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.platforms.len(), 2);
        assert_eq!(config.reporter, ReporterMode::TeamCity);
        assert_eq!(config.max_concurrent, 4);
    }

    #[test]
    fn test_validate() {
        let empty = AppConfig {
            platforms: Vec::new(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let duplicate = AppConfig {
            platforms: Platform::parse_list("linux,linux"),
            ..Default::default()
        };
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        config.apply_env(&EnvConfig {
            platforms: Some("a, b".to_string()),
            timeout_ms: Some(200),
            teamcity_version: Some("2023.1".to_string()),
            appveyor_api_url: Some("http://localhost:1234".to_string()),
            ..Default::default()
        });

        assert_eq!(config.platforms, Platform::parse_list("a,b"));
        assert_eq!(config.default_timeout_ms, Some(200));
        assert_eq!(config.reporter, ReporterMode::TeamCity);
        assert_eq!(config.appveyor_api_url.as_deref(), Some("http://localhost:1234"));
    }

    #[test]
    fn test_explicit_reporter_beats_ci_detection() {
        let mut config = AppConfig::default();
        config.apply_env(&EnvConfig {
            reporter: Some("console".to_string()),
            teamcity_version: Some("2023.1".to_string()),
            ..Default::default()
        });
        assert_eq!(config.reporter, ReporterMode::Console);
    }
}
