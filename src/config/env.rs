//! Environment variable configuration
//!
//! Read once at startup; the result is passed on explicitly.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "CROSSUNIT";

/// Set by TeamCity build agents
const TEAMCITY_VERSION: &str = "TEAMCITY_VERSION";

/// Set by AppVeyor build workers
const APPVEYOR_API_URL: &str = "APPVEYOR_API_URL";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Comma separated platforms from CROSSUNIT_PLATFORMS
    pub platforms: Option<String>,
    /// Default timeout from CROSSUNIT_TIMEOUT_MS
    pub timeout_ms: Option<u64>,
    /// Concurrency from CROSSUNIT_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// Reporter mode from CROSSUNIT_REPORTER
    pub reporter: Option<String>,
    /// Results directory from CROSSUNIT_RESULTS_DIR
    pub results_dir: Option<String>,
    /// Config file from CROSSUNIT_CONFIG
    pub config_file: Option<String>,
    /// Verbose from CROSSUNIT_VERBOSE
    pub verbose: Option<bool>,
    pub teamcity_version: Option<String>,
    pub appveyor_api_url: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            platforms: get_env("PLATFORMS"),
            timeout_ms: get_env_parse("TIMEOUT_MS"),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            reporter: get_env("REPORTER"),
            results_dir: get_env("RESULTS_DIR"),
            config_file: get_env("CONFIG"),
            verbose: get_env_bool("VERBOSE"),
            teamcity_version: non_empty(TEAMCITY_VERSION),
            appveyor_api_url: non_empty(APPVEYOR_API_URL),
        }
    }

    /// Name of the CI server the process runs under, if any
    pub fn ci_server(&self) -> Option<&'static str> {
        if self.teamcity_version.is_some() {
            Some("TeamCity")
        } else if self.appveyor_api_url.is_some() {
            Some("AppVeyor")
        } else {
            None
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_PLATFORMS:      {:?}", ENV_PREFIX, self.platforms);
        println!("  {}_TIMEOUT_MS:     {:?}", ENV_PREFIX, self.timeout_ms);
        println!("  {}_MAX_CONCURRENT: {:?}", ENV_PREFIX, self.max_concurrent);
        println!("  {}_REPORTER:       {:?}", ENV_PREFIX, self.reporter);
        println!("  {}_RESULTS_DIR:    {:?}", ENV_PREFIX, self.results_dir);
        println!("  {}_CONFIG:         {:?}", ENV_PREFIX, self.config_file);
        println!("  {TEAMCITY_VERSION}:          {:?}", self.teamcity_version);
        println!("  {APPVEYOR_API_URL}:          {:?}", self.appveyor_api_url);
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Sets environment variables for tests
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn platforms(mut self, platforms: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_PLATFORMS"), platforms.into()));
        self
    }

    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_TIMEOUT_MS"), timeout.to_string()));
        self
    }

    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_MAX_CONCURRENT"), max.to_string()));
        self
    }

    pub fn reporter(mut self, reporter: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_REPORTER"), reporter.into()));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_VERBOSE"), verbose.to_string()));
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all CROSSUNIT environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_PLATFORMS       Comma separated target platforms");
    println!("  {ENV_PREFIX}_TIMEOUT_MS      Default test timeout in milliseconds");
    println!("  {ENV_PREFIX}_MAX_CONCURRENT  Maximum concurrent test workers");
    println!("  {ENV_PREFIX}_REPORTER        Console reporter (console, teamcity)");
    println!("  {ENV_PREFIX}_RESULTS_DIR     Directory for stored runs");
    println!("  {ENV_PREFIX}_CONFIG          Path to configuration file");
    println!("  {ENV_PREFIX}_VERBOSE         Enable debug logging (true/false)");
    println!("  {TEAMCITY_VERSION}         Selects TeamCity markers when set");
    println!("  {APPVEYOR_API_URL}         Enables AppVeyor result posting when set");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.platforms.is_none());
        assert!(config.ci_server().is_none());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .platforms("net45,sl5")
            .timeout_ms(2500)
            .max_concurrent(2)
            .reporter("teamcity")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.platforms.as_deref(), Some("net45,sl5"));
        assert_eq!(config.timeout_ms, Some(2500));
        assert_eq!(config.max_concurrent, Some(2));
        assert_eq!(config.reporter.as_deref(), Some("teamcity"));
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = EnvBuilder::new().verbose(true).apply_scoped();
        assert_eq!(EnvConfig::load().verbose, Some(true));
    }

    #[test]
    fn test_ci_detection() {
        let teamcity = EnvConfig {
            teamcity_version: Some("2023.1".to_string()),
            ..Default::default()
        };
        assert_eq!(teamcity.ci_server(), Some("TeamCity"));

        let appveyor = EnvConfig {
            appveyor_api_url: Some("http://localhost:1234".to_string()),
            ..Default::default()
        };
        assert_eq!(appveyor.ci_server(), Some("AppVeyor"));
    }

    #[test]
    fn test_scoped_restore() {
        let key = format!("{ENV_PREFIX}_RESULTS_DIR");
        {
            let _guard = EnvBuilder::new().var(&key, "/tmp/crossunit").apply_scoped();
            assert_eq!(EnvConfig::load().results_dir.as_deref(), Some("/tmp/crossunit"));
        }
        assert_ne!(env::var(&key).ok().as_deref(), Some("/tmp/crossunit"));
    }
}
