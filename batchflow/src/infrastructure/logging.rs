// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Setup
//!
//! Configures the global tracing subscriber from the `LOGGING` settings:
//! a human-readable console layer plus a plain-text file layer writing to
//! `<DIR>/<NAME>.log`. The log directory is created if missing; failing to
//! open the log file is a startup error, not a silent downgrade.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use batchflow_domain::WorkflowError;

use super::config::LoggingSettings;

/// Installs the global tracing subscriber.
///
/// Must be called once, before any component starts logging.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), WorkflowError> {
    std::fs::create_dir_all(&settings.dir)
        .map_err(|e| WorkflowError::IoError(format!("Cannot create log directory {}: {}", settings.dir.display(), e)))?;

    let log_path = settings.dir.join(format!("{}.log", settings.name));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| WorkflowError::IoError(format!("Cannot open log file {}: {}", log_path.display(), e)))?;

    let level = LevelFilter::from_level(settings.tracing_level());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).with_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(level),
        )
        .try_init()
        .map_err(|e| WorkflowError::InternalError(format!("Tracing subscriber already installed: {}", e)))?;

    tracing::info!(log_file = %log_path.display(), "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lands_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            name: "test-workflow".to_string(),
            dir: dir.path().join("log"),
            level: "INFO".to_string(),
        };

        // first init in the process wins; either way the file must exist
        let _ = init_tracing(&settings);
        assert!(settings.dir.join("test-workflow.log").exists());
    }
}
