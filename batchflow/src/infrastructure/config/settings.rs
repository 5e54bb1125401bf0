// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Typed Settings
//!
//! Configuration for a batchflow deployment, loaded from a single YAML file.
//! The on-disk shape keeps the uppercase section and key names of the
//! deployment format:
//!
//! ```yaml
//! LOGGING:
//!   NAME: ingest-workflow
//!   DIR: ./log
//!   LEVEL: INFO
//! TASK_SCHEDULER:
//!   BATCH_SIZE: 100
//!   BATCH_PREFIX: ingest
//! STATUS_HANDLER:
//!   TYPE: SqliteStatusStore
//!   CONFIG:
//!     DB_FILE: ./data/status.db
//! DATA_PROVIDER:
//!   TYPE: ExampleDataProvider
//!   CONFIG:
//!     NR_SOURCE_BATCHES: 2
//!     SOURCE_BATCH_SIZE: 100
//! PROC_ENV:
//!   TYPE: ExampleEnvironment
//! EXPORTER:
//!   TYPE: ExampleExporter
//! ```
//!
//! Unknown sections and keys are rejected at load time
//! (`deny_unknown_fields`), so a typo fails the run before any work starts
//! instead of silently configuring nothing. Structural parsing is followed
//! by an explicit [`Settings::validate`] pass for the constraints serde
//! cannot express: positive batch size, a known log level, and parent
//! directories that must already exist.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use batchflow_domain::WorkflowError;

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

fn default_unlimited() -> i64 {
    -1
}

/// Root of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    pub logging: LoggingSettings,
    pub task_scheduler: TaskSchedulerSettings,
    pub status_handler: StatusHandlerSettings,
    pub data_provider: DataProviderSettings,
    pub proc_env: ProcEnvSettings,
    pub exporter: ExporterSettings,
    #[serde(default)]
    pub status_monitor: Option<StatusMonitorSettings>,
}

/// `LOGGING` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoggingSettings {
    /// Log file stem and tracing target name
    pub name: String,
    /// Directory the log file is written to (created if missing)
    pub dir: PathBuf,
    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL
    pub level: String,
}

impl LoggingSettings {
    /// Maps the configured level onto a tracing level filter.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.as_str() {
            "DEBUG" => tracing::Level::DEBUG,
            "WARNING" => tracing::Level::WARN,
            "ERROR" | "CRITICAL" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}

/// `TASK_SCHEDULER` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TaskSchedulerSettings {
    /// Number of items per processing batch
    pub batch_size: usize,
    /// Deployment-unique prefix for processing batch names
    pub batch_prefix: String,
    /// Stop before starting this processing batch id; -1 = unlimited
    #[serde(default = "default_unlimited")]
    pub batch_limit: i64,
    /// Emit a monitor snapshot every N batches; -1 = never
    #[serde(default = "default_unlimited")]
    pub monitor_freq: i64,
}

/// `STATUS_HANDLER` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusHandlerSettings {
    #[serde(rename = "TYPE")]
    pub store_type: String,
    #[serde(default)]
    pub config: Option<StatusHandlerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusHandlerConfig {
    pub db_file: PathBuf,
}

/// `DATA_PROVIDER` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DataProviderSettings {
    #[serde(rename = "TYPE")]
    pub provider_type: String,
    #[serde(default)]
    pub config: Option<ExampleProviderConfig>,
}

/// Configuration of the built-in example provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ExampleProviderConfig {
    /// How many source batches the synthetic source yields
    pub nr_source_batches: i64,
    /// Items per synthetic source batch
    pub source_batch_size: usize,
}

/// `PROC_ENV` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProcEnvSettings {
    #[serde(rename = "TYPE")]
    pub env_type: String,
    #[serde(default)]
    pub config: Option<RemoteEnvConfig>,
}

/// Configuration of the remote-service processing driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RemoteEnvConfig {
    /// Host of the processing service, e.g. `proc.example.com:5500`
    pub remote_host: String,
    /// Task key the service runs for every document, e.g. `ANALYZE`
    pub remote_task_id: String,
    /// Directory for the per-batch registration artifacts
    pub status_dir: PathBuf,
    /// Seconds between monitor polls
    pub monitor_interval: u64,
    /// Host of the service's search index
    pub index_host: String,
    /// Port of the service's search index
    pub index_port: u16,
    /// Index to query for tasks and results
    pub index_name: String,
    /// Per-query timeout towards the index, in seconds
    pub query_timeout: u64,
    /// Creator-id prefix registered with the service; unique per deployment
    pub batch_prefix: String,
}

/// `EXPORTER` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ExporterSettings {
    #[serde(rename = "TYPE")]
    pub exporter_type: String,
}

/// Optional `STATUS_MONITOR` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusMonitorSettings {
    #[serde(rename = "TYPE")]
    pub monitor_type: String,
    /// Include the per-extra-info breakdown in detailed reports
    #[serde(default)]
    pub include_extra_info: bool,
}

impl Settings {
    /// Parses settings from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, WorkflowError> {
        let settings: Settings = serde_yaml::from_str(text)
            .map_err(|e| WorkflowError::InvalidConfiguration(format!("Failed to parse configuration: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::InvalidConfiguration(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    /// Constraints serde cannot express.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let levels: HashSet<&str> = LOG_LEVELS.iter().copied().collect();
        if !levels.contains(self.logging.level.as_str()) {
            return Err(WorkflowError::InvalidConfiguration(format!(
                "Invalid LOGGING.LEVEL: {} (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        parent_dir_must_exist("LOGGING.DIR", &self.logging.dir)?;

        if self.task_scheduler.batch_size == 0 {
            return Err(WorkflowError::InvalidConfiguration(
                "TASK_SCHEDULER.BATCH_SIZE must be positive".to_string(),
            ));
        }
        if self.task_scheduler.batch_prefix.is_empty() {
            return Err(WorkflowError::InvalidConfiguration(
                "TASK_SCHEDULER.BATCH_PREFIX must not be empty".to_string(),
            ));
        }

        if let Some(config) = &self.status_handler.config {
            parent_dir_must_exist("STATUS_HANDLER.CONFIG.DB_FILE", &config.db_file)?;
        }

        if let Some(config) = &self.proc_env.config {
            if !config.status_dir.is_dir() {
                return Err(WorkflowError::InvalidConfiguration(format!(
                    "PROC_ENV.CONFIG.STATUS_DIR does not exist: {}",
                    config.status_dir.display()
                )));
            }
            if config.monitor_interval == 0 {
                return Err(WorkflowError::InvalidConfiguration(
                    "PROC_ENV.CONFIG.MONITOR_INTERVAL must be positive".to_string(),
                ));
            }
            if config.query_timeout == 0 {
                return Err(WorkflowError::InvalidConfiguration(
                    "PROC_ENV.CONFIG.QUERY_TIMEOUT must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn parent_dir_must_exist(key: &str, path: &Path) -> Result<(), WorkflowError> {
    // relative single-component paths have an empty parent, which is the
    // current directory and always exists
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.is_dir() {
        Ok(())
    } else {
        Err(WorkflowError::InvalidConfiguration(format!(
            "Parent directory of {} does not exist: {}",
            key,
            parent.display()
        )))
    }
}
