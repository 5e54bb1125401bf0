// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task Scheduler
//!
//! The top-level orchestrator. One scheduler process drives the whole
//! pipeline, strictly sequentially: one processing batch is in flight at a
//! time, and within a batch the five steps run in order.
//!
//! ## Recovery protocol
//!
//! On startup the scheduler asks the ledger for the current source batch and
//! the rows of the last processing batch. The highest non-error status in
//! that batch proves how far the batch came before the interruption, and
//! maps onto the number of pipeline steps that can be skipped on re-entry:
//!
//! | highest status | skip | re-enters at |
//! |----------------|------|--------------|
//! | `BatchRegistered` (3) | 1 | process |
//! | `Processing` (4)      | 2 | monitor |
//! | `Processed` (5)       | 3 | fetch |
//! | `Exported` (6)        | 4 | fetch (fetch re-runs for the export) |
//! | `Finished` (8)        | 6 | batch is complete |
//!
//! Because every step persists its outcome before the scheduler advances,
//! re-entering at `skip + 1` reproduces the ledger state a crash-free run
//! would have produced.
//!
//! ## Per-batch pipeline
//!
//! register → process → monitor → fetch → export. A failing register,
//! process, or monitor step ends the run (the affected rows carry the
//! batch-level error code); fetch and export failures likewise stop the
//! scheduler, while item-level failures inside an otherwise healthy batch
//! do not.
//!
//! ## Suspension points
//!
//! The shutdown token is consulted before every pipeline step and between
//! monitor polls. No rollback is needed on cancellation: ledger writes are
//! atomic and the recovery protocol picks up from whatever was persisted.

use batchflow_bootstrap::CancellationToken;
use batchflow_domain::services::{
    fetch_results_of_batch, monitor_batch, next_batch, process_batch, register_batch,
};
use batchflow_domain::{
    DataProvider, Exporter, ProcessingEnvironment, ProcessingStatus, StatusLedger, StatusRow, WorkflowError,
};

use super::status_monitor::StatusMonitor;

/// Number of steps in the per-batch pipeline.
const PIPELINE_STEPS: i64 = 5;

/// Scheduler tuning, taken from the `TASK_SCHEDULER` configuration section.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Items per processing batch
    pub batch_size: usize,
    /// Prefix processing batches are named with towards external systems
    pub batch_prefix: String,
    /// Stop before starting this batch id; -1 = unlimited
    pub batch_limit: i64,
    /// Emit a monitor snapshot every N batches; -1 = never
    pub monitor_freq: i64,
}

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source adapter has nothing left; every batch completed
    SourceExhausted,
    /// The configured batch limit was reached
    BatchLimitReached,
    /// A batch failed at a batch-level step; the ledger records the details
    CriticalFailure,
}

enum Recovery {
    /// Nothing in the ledger and nothing at the source
    NoWork,
    Resume {
        last_proc_batch: Option<Vec<StatusRow>>,
        last_proc_batch_id: i64,
        skip_steps: i64,
    },
}

/// The top-level orchestrator owning the main loop, the recovery protocol,
/// and the per-batch sequencing across the collaborators.
pub struct TaskScheduler {
    options: SchedulerOptions,
    ledger: StatusLedger,
    provider: Box<dyn DataProvider>,
    environment: Box<dyn ProcessingEnvironment>,
    exporter: Box<dyn Exporter>,
    monitor: Option<StatusMonitor>,
    shutdown: CancellationToken,
}

impl TaskScheduler {
    pub fn new(
        options: SchedulerOptions,
        ledger: StatusLedger,
        provider: Box<dyn DataProvider>,
        environment: Box<dyn ProcessingEnvironment>,
        exporter: Box<dyn Exporter>,
        monitor: Option<StatusMonitor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            options,
            ledger,
            provider,
            environment,
            exporter,
            monitor,
            shutdown,
        }
    }

    /// Read access to the ledger, for reporting after a run.
    pub fn ledger(&self) -> &StatusLedger {
        &self.ledger
    }

    /// Runs the pipeline until the source is exhausted, the batch limit is
    /// reached, or a batch fails.
    pub async fn run(&mut self) -> Result<RunOutcome, WorkflowError> {
        tracing::info!(
            batch_size = self.options.batch_size,
            batch_prefix = %self.options.batch_prefix,
            "starting task scheduler"
        );

        let (mut proc_batch_id, recovered_batch, skip_steps) = match self.recover().await? {
            Recovery::NoWork => {
                tracing::info!("no ledger state and no source data, nothing to do");
                return Ok(RunOutcome::SourceExhausted);
            }
            Recovery::Resume {
                last_proc_batch,
                last_proc_batch_id,
                skip_steps,
            } => (last_proc_batch_id, last_proc_batch, skip_steps),
        };

        // finish the recovered batch from wherever it stopped
        if let Some(batch) = recovered_batch {
            tracing::info!(
                proc_batch_id,
                skip_steps,
                "resuming interrupted processing batch"
            );
            if !self.run_proc_batch(proc_batch_id, batch, skip_steps).await? {
                tracing::error!(proc_batch_id, "critical error while finishing recovered batch");
                return Ok(RunOutcome::CriticalFailure);
            }
            proc_batch_id += 1;
        }

        loop {
            self.check_cancelled()?;

            if self.options.batch_limit >= 0 && proc_batch_id >= self.options.batch_limit {
                tracing::info!(
                    proc_batch_id,
                    batch_limit = self.options.batch_limit,
                    "batch limit reached"
                );
                return Ok(RunOutcome::BatchLimitReached);
            }

            tracing::debug!(
                proc_batch_id,
                batch_size = self.options.batch_size,
                "asking the data provider for the next batch"
            );
            let Some(batch) = next_batch(
                self.provider.as_mut(),
                &mut self.ledger,
                proc_batch_id,
                self.options.batch_size,
            )
            .await?
            else {
                tracing::info!("no source batch remaining, all done");
                return Ok(RunOutcome::SourceExhausted);
            };

            if !self.run_proc_batch(proc_batch_id, batch, 0).await? {
                tracing::error!(proc_batch_id, "critical error while processing, stopping");
                return Ok(RunOutcome::CriticalFailure);
            }

            self.emit_periodic_report(proc_batch_id).await;
            proc_batch_id += 1;
        }
    }

    /// Startup recovery: load the current source batch (materializing
    /// source batch 0 on a fresh ledger) and size up the interrupted
    /// processing batch, if any.
    async fn recover(&mut self) -> Result<Recovery, WorkflowError> {
        let (source_batch_recovered, last_proc_batch) = self.ledger.recover().await?;

        if !source_batch_recovered {
            match self.provider.fetch_source_batch_data(0).await? {
                Some(rows) if !rows.is_empty() => {
                    tracing::info!(rows = rows.len(), "fresh ledger, materialized source batch 0");
                    self.ledger.set_current_source_batch(rows).await?;
                }
                _ => return Ok(Recovery::NoWork),
            }
            return Ok(Recovery::Resume {
                last_proc_batch: None,
                last_proc_batch_id: 0,
                skip_steps: 0,
            });
        }

        let Some(batch) = last_proc_batch else {
            return Ok(Recovery::Resume {
                last_proc_batch: None,
                last_proc_batch_id: 0,
                skip_steps: 0,
            });
        };

        let last_proc_batch_id = batch
            .iter()
            .filter_map(|row| row.proc_batch_id)
            .max()
            .unwrap_or(0);
        let skip_steps = compute_skip_steps(&batch);
        tracing::info!(
            last_proc_batch_id,
            skip_steps,
            "synchronizing last processing batch with the processing environment"
        );

        Ok(Recovery::Resume {
            last_proc_batch: Some(batch),
            last_proc_batch_id,
            skip_steps,
        })
    }

    /// The five-step pipeline, re-entrant via `skip_steps`.
    ///
    /// Returns `false` when a step failed in a way that must stop the
    /// scheduler; the failing step has already recorded the error codes.
    async fn run_proc_batch(
        &mut self,
        proc_batch_id: i64,
        batch: Vec<StatusRow>,
        skip_steps: i64,
    ) -> Result<bool, WorkflowError> {
        if skip_steps >= PIPELINE_STEPS {
            tracing::warn!(proc_batch_id, skip_steps, "batch already ran every step");
            return Ok(true);
        }

        if skip_steps == 0 {
            self.check_cancelled()?;
            tracing::info!(proc_batch_id, "registering batch");
            if register_batch(self.environment.as_mut(), &mut self.ledger, proc_batch_id, batch)
                .await?
                .is_none()
            {
                tracing::error!(proc_batch_id, "could not register batch");
                return Ok(false);
            }
            tracing::info!(proc_batch_id, "successfully registered batch");
        }

        if skip_steps < 2 {
            self.check_cancelled()?;
            tracing::info!(proc_batch_id, "triggering batch to start processing");
            if process_batch(self.environment.as_mut(), &mut self.ledger, proc_batch_id)
                .await?
                .is_none()
            {
                tracing::error!(proc_batch_id, "could not trigger batch to start processing");
                return Ok(false);
            }
            tracing::info!(proc_batch_id, "successfully triggered processing");
        }

        if skip_steps < 3 {
            self.check_cancelled()?;
            tracing::info!(proc_batch_id, "monitoring batch until it finishes");
            if monitor_batch(self.environment.as_mut(), &mut self.ledger, proc_batch_id)
                .await?
                .is_none()
            {
                tracing::error!(proc_batch_id, "error while monitoring batch");
                return Ok(false);
            }
            tracing::info!(proc_batch_id, "batch monitored to completion");
        }

        if skip_steps < PIPELINE_STEPS {
            self.check_cancelled()?;
            // fetch runs even when only the export remains: the export needs
            // the payloads and fetching them again is idempotent
            tracing::info!(proc_batch_id, "fetching batch output");
            let results = fetch_results_of_batch(self.environment.as_mut(), &mut self.ledger, proc_batch_id).await?;
            let Some(results) = results.filter(|r| !r.is_empty()) else {
                tracing::error!(proc_batch_id, "did not receive any processing results");
                return Ok(false);
            };
            tracing::info!(proc_batch_id, results = results.len(), "retrieved batch output");

            self.check_cancelled()?;
            tracing::info!(proc_batch_id, "exporting batch output");
            if !self.exporter.export_results(&mut self.ledger, results).await? {
                tracing::warn!(proc_batch_id, "could not export batch output");
                return Ok(false);
            }
            tracing::info!(proc_batch_id, "successfully exported batch output");
        }

        Ok(true)
    }

    async fn emit_periodic_report(&self, proc_batch_id: i64) {
        let freq = self.options.monitor_freq;
        if freq <= 0 || (proc_batch_id + 1) % freq != 0 {
            return;
        }
        if let Some(monitor) = &self.monitor {
            if let Err(e) = monitor.report_snapshot(&self.ledger).await {
                tracing::warn!("could not emit status snapshot: {}", e);
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), WorkflowError> {
        if self.shutdown.is_cancelled() {
            Err(WorkflowError::Cancelled("shutdown requested".to_string()))
        } else {
            Ok(())
        }
    }
}

/// How many pipeline steps an interrupted batch may skip on re-entry.
///
/// The highest non-error status in the batch proves which steps already
/// persisted their outcome. Error rows are ignored: they say nothing about
/// how far the healthy rows came. A batch whose every row errored has
/// nothing left to re-run.
fn compute_skip_steps(batch: &[StatusRow]) -> i64 {
    let highest = batch
        .iter()
        .filter(|row| row.status != ProcessingStatus::Error)
        .map(|row| row.status.as_i64())
        .max();
    match highest {
        Some(value) => (value - 2).max(0),
        None => PIPELINE_STEPS, // only error rows: the batch is done
    }
}
