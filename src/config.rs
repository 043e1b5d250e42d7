//! Configuration management for ratemeter.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{MeterError, Result};

/// Environment variable prefix for overrides, e.g. `RATEMETER__REPORTER__PRETTY=true`.
const ENV_PREFIX: &str = "RATEMETER";

/// Main configuration for the ratemeter binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatemeterConfig {
    /// Reporter configuration
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Synthetic workloads to drive
    #[serde(default = "default_workloads")]
    pub workloads: Vec<WorkloadConfig>,
}

impl Default for RatemeterConfig {
    fn default() -> Self {
        Self {
            reporter: ReporterConfig::default(),
            workloads: default_workloads(),
        }
    }
}

fn default_workloads() -> Vec<WorkloadConfig> {
    vec![WorkloadConfig {
        name: "requests".to_string(),
        unit: "requests".to_string(),
        events_per_sec: 100.0,
        threads: 2,
        jitter: 0.2,
    }]
}

/// Reporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Seconds between reports
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Pretty-print the JSON documents
    #[serde(default)]
    pub pretty: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pretty: false,
        }
    }
}

fn default_interval_secs() -> u64 {
    5
}

/// A synthetic event source marking one meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Meter name
    pub name: String,

    /// Meter unit label
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Target events per second across all threads
    pub events_per_sec: f64,

    /// Number of marking threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Relative batch size variation, between 0 and 1
    #[serde(default)]
    pub jitter: f64,
}

fn default_unit() -> String {
    "events".to_string()
}

fn default_threads() -> usize {
    1
}

impl RatemeterConfig {
    /// Load configuration from a YAML file, layered with `RATEMETER__*` environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(MeterError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize::<RatemeterConfig>())
            .map_err(|e| MeterError::Config(format!("Failed to load configuration: {}", e)))
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MeterError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.reporter.interval_secs == 0 {
            return Err(MeterError::Config(
                "reporter.interval_secs must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for workload in &self.workloads {
            if workload.name.is_empty() {
                return Err(MeterError::Config("workload name must not be empty".to_string()));
            }
            if !names.insert(workload.name.as_str()) {
                return Err(MeterError::Config(format!(
                    "duplicate workload name: {}",
                    workload.name
                )));
            }
            if !workload.events_per_sec.is_finite() || workload.events_per_sec < 0.0 {
                return Err(MeterError::Config(format!(
                    "workload {}: events_per_sec must be a non-negative number",
                    workload.name
                )));
            }
            if workload.threads == 0 {
                return Err(MeterError::Config(format!(
                    "workload {}: threads must be greater than zero",
                    workload.name
                )));
            }
            if !(0.0..=1.0).contains(&workload.jitter) {
                return Err(MeterError::Config(format!(
                    "workload {}: jitter must be between 0 and 1",
                    workload.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RatemeterConfig::default();

        assert_eq!(config.reporter.interval_secs, 5);
        assert!(!config.reporter.pretty);
        assert_eq!(config.workloads.len(), 1);
        assert_eq!(config.workloads[0].name, "requests");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
reporter:
  interval_secs: 10
  pretty: true
workloads:
  - name: http.requests
    unit: requests
    events_per_sec: 250
    threads: 4
    jitter: 0.5
  - name: jobs.completed
    events_per_sec: 3.5
"#;
        let config = RatemeterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.reporter.interval_secs, 10);
        assert!(config.reporter.pretty);
        assert_eq!(config.workloads.len(), 2);
        assert_eq!(config.workloads[0].threads, 4);
        assert_eq!(config.workloads[1].unit, "events");
        assert_eq!(config.workloads[1].threads, 1);
        assert_eq!(config.workloads[1].jitter, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let yaml = r#"
reporter:
  pretty: true
"#;
        let config = RatemeterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.reporter.interval_secs, 5);
        assert_eq!(config.workloads.len(), 1);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = RatemeterConfig::from_yaml("workloads: [name: ");
        assert!(matches!(result, Err(MeterError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = RatemeterConfig::default();
        config.reporter.interval_secs = 0;

        assert!(matches!(config.validate(), Err(MeterError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_workloads() {
        let base = RatemeterConfig::default();

        let mut duplicate = base.clone();
        duplicate.workloads.push(base.workloads[0].clone());
        assert!(duplicate.validate().is_err());

        let mut negative = base.clone();
        negative.workloads[0].events_per_sec = -1.0;
        assert!(negative.validate().is_err());

        let mut nan = base.clone();
        nan.workloads[0].events_per_sec = f64::NAN;
        assert!(nan.validate().is_err());

        let mut no_threads = base.clone();
        no_threads.workloads[0].threads = 0;
        assert!(no_threads.validate().is_err());

        let mut jitter = base.clone();
        jitter.workloads[0].jitter = 1.5;
        assert!(jitter.validate().is_err());

        let mut unnamed = base;
        unnamed.workloads[0].name = String::new();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = RatemeterConfig::from_file("/nonexistent/ratemeter.yaml");
        assert!(matches!(result, Err(MeterError::Config(_))));
    }

    #[test]
    fn test_from_file_reads_yaml() {
        let path = std::env::temp_dir().join(format!(
            "ratemeter-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "reporter:\n  interval_secs: 2\nworkloads:\n  - name: logins\n    events_per_sec: 1\n",
        )
        .unwrap();

        let config = RatemeterConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.reporter.interval_secs, 2);
        assert_eq!(config.workloads[0].name, "logins");
    }
}
