// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Environment Contract
//!
//! A processing environment feeds a batch of items to an external
//! data-processing service and reports on its progress. Implementations
//! provide four primitive operations. The shared orchestration around them
//! (mapping outcomes onto the local state machine and persisting every
//! transition through the ledger) lives in the free functions of this
//! module, which is what the task scheduler calls.
//!
//! ## Operations
//!
//! | Step | Primitive | Success | Failure |
//! |------|-----------|---------|---------|
//! | register | [`ProcessingEnvironment::try_register_batch`] | `BatchRegistered`, remote id set | `Error` / `BATCH_REGISTER_FAILED` |
//! | process | [`ProcessingEnvironment::try_start_batch`] | `Processing` | `Error` / `BATCH_PROCESSING_NOT_STARTED` |
//! | monitor | [`ProcessingEnvironment::poll_batch`] | `Processed` per item | `Error` / `PROCESSING_FAILED` per item |
//! | fetch | [`ProcessingEnvironment::collect_results`] | result list emitted | `Error` per unjoinable item |
//!
//! Registration failures and start failures are batch-level: every row of
//! the batch receives the error code and the scheduler stops. Monitor and
//! fetch failures are item-level: affected rows become `Error` and the batch
//! continues with the remainder.

use async_trait::async_trait;

use crate::entities::{ErrorCode, ProcEnvResponse, ProcessingResult, ProcessingStatus, StatusRow};
use crate::error::WorkflowError;

use super::status_ledger::{update_rows, RowUpdate, StatusLedger};

/// Contract for processing environments.
///
/// The primitives report what the external service did; they do not write
/// to the ledger. Persistence and state mapping happen in the free
/// functions of this module so every implementation behaves identically
/// towards the scheduler.
#[async_trait]
pub trait ProcessingEnvironment: Send + Sync {
    /// Registers the batch with the external service.
    ///
    /// On success the returned rows carry their remote ids and the
    /// [`ProcessingStatus::BatchRegistered`] state; rows the service
    /// rejected come back as [`ProcessingStatus::Error`]. `None` means the
    /// registration failed as a whole.
    async fn try_register_batch(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
        batch: Vec<StatusRow>,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError>;

    /// Asks the external service to start working on a registered batch.
    ///
    /// Transport-level failures are reported inside the response, not as an
    /// `Err`, so the caller can record the diagnostic on the rows.
    async fn try_start_batch(&mut self, ledger: &StatusLedger, proc_batch_id: i64)
        -> Result<ProcEnvResponse, WorkflowError>;

    /// Blocks until no task of the batch remains queued in the external
    /// service, then reports the per-item outcome.
    ///
    /// Returns the batch rows with [`ProcessingStatus::Processed`] or
    /// [`ProcessingStatus::Error`] applied; `None` when the batch is unknown
    /// to the service. Transport errors that persist beyond the polling
    /// loop's own retries are returned as `Err` and are fatal.
    async fn poll_batch(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError>;

    /// Retrieves the result payloads of a finished batch, joined to its
    /// rows.
    ///
    /// Every row still in play appears exactly once: joined rows keep their
    /// state and carry a payload, rows without usable output come back as
    /// [`ProcessingStatus::Error`] with a null payload. `None` means nothing
    /// could be retrieved at all.
    async fn collect_results(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<ProcessingResult>>, WorkflowError>;
}

/// Registers a batch and persists the outcome.
///
/// Returns the registered rows, or `None` after recording a batch-wide
/// `BATCH_REGISTER_FAILED` on every row.
pub async fn register_batch(
    env: &mut dyn ProcessingEnvironment,
    ledger: &mut StatusLedger,
    proc_batch_id: i64,
    batch: Vec<StatusRow>,
) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
    let outcome = env.try_register_batch(ledger, proc_batch_id, batch.clone()).await;
    match outcome {
        Ok(Some(rows)) => {
            ledger.persist_or_die(&rows).await?;
            Ok(Some(rows))
        }
        Ok(None) => {
            let failed = mark_register_failed(batch, proc_batch_id);
            ledger.persist_or_die(&failed).await?;
            Ok(None)
        }
        Err(e) => {
            tracing::error!(proc_batch_id, "registration failed: {}", e);
            let failed = mark_register_failed(batch, proc_batch_id);
            ledger.persist_or_die(&failed).await?;
            Ok(None)
        }
    }
}

fn mark_register_failed(batch: Vec<StatusRow>, proc_batch_id: i64) -> Vec<StatusRow> {
    update_rows(
        batch,
        RowUpdate::new()
            .status(ProcessingStatus::Error)
            .message(format!("Could not register batch {}", proc_batch_id))
            .error_code(ErrorCode::BatchRegisterFailed),
    )
}

/// Starts a registered batch and persists the outcome.
///
/// Returns the rows in [`ProcessingStatus::Processing`], or `None` after
/// recording `BATCH_PROCESSING_NOT_STARTED` with the service's diagnostic on
/// every row.
pub async fn process_batch(
    env: &mut dyn ProcessingEnvironment,
    ledger: &mut StatusLedger,
    proc_batch_id: i64,
) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
    let response = env.try_start_batch(ledger, proc_batch_id).await?;
    tracing::info!(proc_batch_id, status_code = response.status_code, "service answered start request");

    let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
        tracing::error!(proc_batch_id, "no rows found for processing batch");
        return Ok(None);
    };

    let update = if response.success {
        RowUpdate::new()
            .status(ProcessingStatus::Processing)
            .message(response.message.clone())
    } else {
        RowUpdate::new()
            .status(ProcessingStatus::Error)
            .message(response.message.clone())
            .error_code(ErrorCode::BatchProcessingNotStarted)
    };
    let updated = update_rows(rows, update);
    ledger.persist_or_die(&updated).await?;

    Ok(if response.success { Some(updated) } else { None })
}

/// Monitors a batch to completion and persists the per-item outcome.
pub async fn monitor_batch(
    env: &mut dyn ProcessingEnvironment,
    ledger: &mut StatusLedger,
    proc_batch_id: i64,
) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
    match env.poll_batch(ledger, proc_batch_id).await? {
        Some(rows) => {
            ledger.persist_or_die(&rows).await?;
            Ok(Some(rows))
        }
        None => {
            tracing::error!(proc_batch_id, "monitoring returned nothing");
            Ok(None)
        }
    }
}

/// Fetches the results of a finished batch, persists every touched row, and
/// returns the exportable results.
///
/// Rows the environment could not join to a payload are persisted in their
/// `Error` state and filtered out of the returned list, so exporters only
/// ever see usable results.
pub async fn fetch_results_of_batch(
    env: &mut dyn ProcessingEnvironment,
    ledger: &mut StatusLedger,
    proc_batch_id: i64,
) -> Result<Option<Vec<ProcessingResult>>, WorkflowError> {
    let Some(results) = env.collect_results(ledger, proc_batch_id).await? else {
        tracing::warn!(proc_batch_id, "could not obtain any processing results");
        return Ok(None);
    };

    let rows: Vec<StatusRow> = results.iter().map(|r| r.status_row.clone()).collect();
    ledger.persist_or_die(&rows).await?;

    let exportable: Vec<ProcessingResult> = results
        .into_iter()
        .filter(|r| r.status_row.status != ProcessingStatus::Error)
        .collect();
    Ok(Some(exportable))
}
