//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{EnsayoError, EnsayoResult};
use crate::session::{SessionOptions, DEFAULT_ACTION_TIMEOUT_MS};
use crate::suite::RunFilter;
use crate::wait::DEFAULT_POLL_INTERVAL_MS;

/// Default test timeout (30 seconds)
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 30_000;

/// Default assertion timeout (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// Compact single lines
    Compact,
    /// One JSON object per event
    Json,
}

/// Settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base for relative URLs
    pub base_url: Option<String>,
    /// Per-test timeout in milliseconds (0 disables)
    pub test_timeout_ms: u64,
    /// Assertion timeout in milliseconds
    pub expect_timeout_ms: u64,
    /// Action target timeout in milliseconds
    pub action_timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Tests executed concurrently
    pub workers: usize,
    /// Top-level suites to run (all when empty)
    pub suites: Vec<String>,
    /// Regex over `Suite > test` paths
    pub grep: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            test_timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            workers: 1,
            suites: Vec::new(),
            grep: None,
            log_format: LogFormat::default(),
        }
    }
}

impl RunConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or a value is out of range.
    pub fn from_yaml(yaml: &str) -> EnsayoResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> EnsayoResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`EnsayoError::InvalidConfig`] for zero workers, a zero poll
    /// interval or a grep pattern that does not compile.
    pub fn validate(&self) -> EnsayoResult<()> {
        if self.workers == 0 {
            return Err(EnsayoError::InvalidConfig {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(EnsayoError::InvalidConfig {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }
        if let Some(base) = &self.base_url {
            if !base.contains("://") {
                return Err(EnsayoError::InvalidConfig {
                    message: format!("base_url '{base}' has no scheme"),
                });
            }
        }
        self.filter().map(|_| ())
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set test timeout
    #[must_use]
    pub const fn with_test_timeout_ms(mut self, ms: u64) -> Self {
        self.test_timeout_ms = ms;
        self
    }

    /// Set assertion timeout
    #[must_use]
    pub const fn with_expect_timeout_ms(mut self, ms: u64) -> Self {
        self.expect_timeout_ms = ms;
        self
    }

    /// Set action timeout
    #[must_use]
    pub const fn with_action_timeout_ms(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }

    /// Set worker count
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Test timeout
    #[must_use]
    pub const fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    /// Assertion timeout
    #[must_use]
    pub const fn expect_timeout(&self) -> Duration {
        Duration::from_millis(self.expect_timeout_ms)
    }

    /// Session settings derived from this configuration
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        let options = SessionOptions::default()
            .with_action_timeout(Duration::from_millis(self.action_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms));
        match &self.base_url {
            Some(base) => options.with_base_url(base.clone()),
            None => options,
        }
    }

    /// Test selection from `suites` and `grep`
    ///
    /// # Errors
    /// Returns error if `grep` does not compile.
    pub fn filter(&self) -> EnsayoResult<RunFilter> {
        let mut filter = self
            .suites
            .iter()
            .fold(RunFilter::new(), |f, name| f.with_suite(name.clone()));
        if let Some(grep) = &self.grep {
            filter = filter.with_grep(grep).map_err(|e| EnsayoError::InvalidConfig {
                message: format!("grep: {e}"),
            })?;
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = RunConfig::default();
            assert_eq!(config.test_timeout(), Duration::from_secs(30));
            assert_eq!(config.expect_timeout(), Duration::from_secs(5));
            assert_eq!(config.action_timeout_ms, 5000);
            assert_eq!(config.poll_interval_ms, 100);
            assert_eq!(config.workers, 1);
            assert_eq!(config.log_format, LogFormat::Pretty);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_session_options() {
            let options = RunConfig::new()
                .with_base_url("https://demo.playwright.dev")
                .with_action_timeout_ms(250)
                .session_options();
            assert_eq!(options.action_timeout, Duration::from_millis(250));
            assert_eq!(options.base_url.as_deref(), Some("https://demo.playwright.dev"));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = RunConfig::from_yaml(
                "base_url: https://demo.playwright.dev\nworkers: 4\nlog_format: json\n",
            )
            .unwrap();
            assert_eq!(config.workers, 4);
            assert_eq!(config.log_format, LogFormat::Json);
            assert_eq!(config.expect_timeout_ms, DEFAULT_EXPECT_TIMEOUT_MS);
        }

        #[test]
        fn test_invalid_values_rejected() {
            for yaml in [
                "workers: 0",
                "poll_interval_ms: 0",
                "grep: '(oops'",
                "base_url: demo.playwright.dev",
            ] {
                let err = RunConfig::from_yaml(yaml).unwrap_err();
                assert!(matches!(err, EnsayoError::InvalidConfig { .. }), "{yaml}: {err}");
            }
        }

        #[test]
        fn test_malformed_yaml() {
            assert!(matches!(
                RunConfig::from_yaml("workers: [1, 2"),
                Err(EnsayoError::Yaml(_))
            ));
        }

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "test_timeout_ms: 0\nsuites: [\"Passing Tests\"]").unwrap();
            let config = RunConfig::from_file(file.path()).unwrap();
            assert_eq!(config.test_timeout(), Duration::ZERO);
            assert_eq!(config.suites, vec!["Passing Tests".to_string()]);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let err = RunConfig::from_file(Path::new("/nonexistent/ensayo.yaml")).unwrap_err();
            assert!(matches!(err, EnsayoError::Io(_)));
        }
    }
}
