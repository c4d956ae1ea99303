//! Report configuration, loaded from TOML.
//!
//! ```toml
//! iterations = "serializable"
//! workload_time_format = "%Y-%d-%m %H:%M:%S"
//! report_time_format = "%Y-%m-%dT%H:%M:%S"
//! legacy_output_chart = "StackedArea"
//! ```

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How `extend_results` exposes iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationsMode {
    /// Materialized, ordered list.
    Serializable,
    /// Single-pass stream, drained once by the renderer.
    #[default]
    Streaming,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub iterations: IterationsMode,
    /// chrono format for workload `created_at` / `updated_at` in extended results.
    pub workload_time_format: String,
    /// chrono format for timestamps in `Task::to_report`.
    pub report_time_format: String,
    /// Chart plugin used when converting deprecated `scenario_output`.
    pub legacy_output_chart: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            iterations: IterationsMode::default(),
            // day before month, as existing reports expect
            workload_time_format: "%Y-%d-%m %H:%M:%S".to_string(),
            report_time_format: "%Y-%m-%dT%H:%M:%S".to_string(),
            legacy_output_chart: "StackedArea".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn format_workload_time(&self, at: DateTime<Utc>) -> String {
        format_time(at, &self.workload_time_format)
    }

    pub fn format_report_time(&self, at: DateTime<Utc>) -> String {
        format_time(at, &self.report_time_format)
    }
}

/// Falls back to RFC 3339 when `layout` is not a valid strftime string.
fn format_time(at: DateTime<Utc>, layout: &str) -> String {
    let mut out = String::new();
    match write!(out, "{}", at.format(layout)) {
        Ok(()) => out,
        Err(_) => at.to_rfc3339(),
    }
}
