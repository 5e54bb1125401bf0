// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Monitor
//!
//! Read-only projection over the status ledger. The monitor never mutates
//! anything; it aggregates the ledger's counting queries into two report
//! shapes:
//!
//! - **Snapshot**: where the pipeline is right now; the last processing and
//!   source batch ids with their status and error distributions
//! - **Detailed report**: the long view; which source batches have fully
//!   completed, overall status and error distributions, and optionally the
//!   per-extra-info breakdown
//!
//! Reports are emitted through a [`MonitorSink`] strategy; the built-in
//! [`LogSink`] writes them to the log, chat-webhook sinks can be plugged in
//! without touching the monitor itself.

use chrono::{DateTime, Utc};

use batchflow_domain::repositories::{ErrorCodeCounts, ExtraInfoStatusCounts, StatusCounts};
use batchflow_domain::{StatusLedger, WorkflowError};

/// Point-in-time view of the last processed batches.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub generated_at: DateTime<Utc>,
    pub last_proc_batch_id: i64,
    pub last_source_batch_id: i64,
    pub status_counts_for_last_proc_batch: StatusCounts,
    pub error_counts_for_last_proc_batch: ErrorCodeCounts,
    pub status_counts_for_last_source_batch: StatusCounts,
    pub error_counts_for_last_source_batch: ErrorCodeCounts,
}

/// Completion roll-up over every batch the ledger has seen.
#[derive(Debug, Clone)]
pub struct DetailedReport {
    pub generated_at: DateTime<Utc>,
    pub completed_source_batch_names: Vec<String>,
    pub uncompleted_source_batch_names: Vec<String>,
    pub current_source_batch_name: Option<String>,
    pub status_counts: StatusCounts,
    pub error_counts: ErrorCodeCounts,
    pub status_counts_per_extra_info: Option<ExtraInfoStatusCounts>,
}

/// Strategy for delivering reports.
pub trait MonitorSink: Send + Sync {
    fn emit_snapshot(&self, snapshot: &StatusSnapshot);
    fn emit_detailed(&self, report: &DetailedReport);
}

/// Sink writing reports to the log.
#[derive(Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }

    fn format_status_counts(counts: &StatusCounts) -> String {
        counts
            .iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn format_error_counts(counts: &ErrorCodeCounts) -> String {
        counts
            .iter()
            .map(|(code, count)| match code {
                Some(code) => format!("{}: {}", code, count),
                None => format!("(no error): {}", count),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl MonitorSink for LogSink {
    fn emit_snapshot(&self, snapshot: &StatusSnapshot) {
        tracing::info!(generated_at = %snapshot.generated_at, "status snapshot");
        tracing::info!("last batch processed: {}", snapshot.last_proc_batch_id);
        tracing::info!("last source batch retrieved: {}", snapshot.last_source_batch_id);
        tracing::info!(
            "status of last batch processed: {}",
            Self::format_status_counts(&snapshot.status_counts_for_last_proc_batch)
        );
        tracing::info!(
            "errors of last batch processed: {}",
            Self::format_error_counts(&snapshot.error_counts_for_last_proc_batch)
        );
        tracing::info!(
            "status of last source batch retrieved: {}",
            Self::format_status_counts(&snapshot.status_counts_for_last_source_batch)
        );
        tracing::info!(
            "errors of last source batch retrieved: {}",
            Self::format_error_counts(&snapshot.error_counts_for_last_source_batch)
        );
    }

    fn emit_detailed(&self, report: &DetailedReport) {
        tracing::info!(generated_at = %report.generated_at, "detailed status report");
        tracing::info!("completed source batches: {:?}", report.completed_source_batch_names);
        tracing::info!("uncompleted source batches: {:?}", report.uncompleted_source_batch_names);
        tracing::info!(
            "current source batch: {}",
            report.current_source_batch_name.as_deref().unwrap_or("(none)")
        );
        tracing::info!("status overview: {}", Self::format_status_counts(&report.status_counts));
        tracing::info!("error overview: {}", Self::format_error_counts(&report.error_counts));
        if let Some(per_extra_info) = &report.status_counts_per_extra_info {
            for (extra_info, counts) in per_extra_info {
                tracing::info!(
                    "status overview for '{}': {}",
                    extra_info.as_deref().unwrap_or("(untagged)"),
                    Self::format_status_counts(counts)
                );
            }
        }
    }
}

/// Read-only reporter over the status ledger.
pub struct StatusMonitor {
    sink: Box<dyn MonitorSink>,
    include_extra_info: bool,
}

impl StatusMonitor {
    pub fn new(sink: Box<dyn MonitorSink>, include_extra_info: bool) -> Self {
        Self {
            sink,
            include_extra_info,
        }
    }

    /// Builds the point-in-time snapshot.
    pub async fn status_snapshot(&self, ledger: &StatusLedger) -> Result<StatusSnapshot, WorkflowError> {
        let store = ledger.store();
        let last_proc_batch_id = store.last_proc_batch_id().await?;
        let last_source_batch_id = store.last_source_batch_id().await?;

        Ok(StatusSnapshot {
            generated_at: Utc::now(),
            last_proc_batch_id,
            last_source_batch_id,
            status_counts_for_last_proc_batch: store.status_counts_for_proc_batch(last_proc_batch_id).await?,
            error_counts_for_last_proc_batch: store.error_code_counts_for_proc_batch(last_proc_batch_id).await?,
            status_counts_for_last_source_batch: store.status_counts_for_source_batch(last_source_batch_id).await?,
            error_counts_for_last_source_batch: store.error_code_counts_for_source_batch(last_source_batch_id).await?,
        })
    }

    /// Builds the completion roll-up.
    pub async fn detailed_report(&self, ledger: &StatusLedger) -> Result<DetailedReport, WorkflowError> {
        let store = ledger.store();
        let (completed, uncompleted) = store.completed_source_batch_names().await?;
        let current_source_batch_name = store.name_of_source_batch(ledger.current_source_batch_id()).await?;

        let status_counts_per_extra_info = if self.include_extra_info {
            Some(store.status_counts_per_extra_info().await?)
        } else {
            None
        };

        Ok(DetailedReport {
            generated_at: Utc::now(),
            completed_source_batch_names: completed,
            uncompleted_source_batch_names: uncompleted,
            current_source_batch_name,
            status_counts: store.status_counts().await?,
            error_counts: store.error_code_counts().await?,
            status_counts_per_extra_info,
        })
    }

    /// Builds and emits a snapshot through the sink.
    pub async fn report_snapshot(&self, ledger: &StatusLedger) -> Result<(), WorkflowError> {
        let snapshot = self.status_snapshot(ledger).await?;
        self.sink.emit_snapshot(&snapshot);
        Ok(())
    }

    /// Builds and emits a detailed report through the sink.
    pub async fn report_detailed(&self, ledger: &StatusLedger) -> Result<(), WorkflowError> {
        let report = self.detailed_report(ledger).await?;
        self.sink.emit_detailed(&report);
        Ok(())
    }
}
