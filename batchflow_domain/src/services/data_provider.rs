// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Adapter Contract
//!
//! A data provider materializes source batches: groups of fresh items pulled
//! from a source catalog in one go. Implementations only know how to produce
//! the rows of a given source batch; everything shared (serving slices of
//! the current batch, assigning processing batch ids, advancing to the next
//! source batch) lives in [`next_batch`].

use async_trait::async_trait;

use crate::entities::{ProcessingStatus, StatusRow};
use crate::error::WorkflowError;

use super::status_ledger::{update_rows, RowUpdate, StatusLedger};

/// Contract for source adapters.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Materializes the rows of the given source batch, all in state
    /// [`ProcessingStatus::New`].
    ///
    /// Returns `None` when the source has no batch with this id (the source
    /// is exhausted).
    async fn fetch_source_batch_data(&mut self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError>;
}

/// Serves the next processing batch from the current source batch.
///
/// Fresh (`New`) rows of the cached source batch are assigned
/// `proc_batch_id`, transitioned to [`ProcessingStatus::BatchAssigned`], and
/// persisted. When the current source batch has no fresh rows left, the
/// provider is asked for the next source batch and the loop continues;
/// `None` means the source is exhausted and the pipeline can finish.
pub async fn next_batch(
    provider: &mut dyn DataProvider,
    ledger: &mut StatusLedger,
    proc_batch_id: i64,
    batch_size: usize,
) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
    loop {
        if let Some(rows) = ledger.rows_of_type_in_current_batch(ProcessingStatus::New, batch_size) {
            tracing::debug!(
                proc_batch_id,
                rows = rows.len(),
                "assigning fresh rows to processing batch"
            );
            let assigned = update_rows(
                rows,
                RowUpdate::new()
                    .status(ProcessingStatus::BatchAssigned)
                    .proc_batch_id(proc_batch_id),
            );
            ledger.persist_or_die(&assigned).await?;
            return Ok(Some(assigned));
        }

        // Current source batch exhausted: ask the provider for the next one.
        let next_source_batch_id = ledger.current_source_batch_id() + 1;
        tracing::debug!(next_source_batch_id, "source batch exhausted, fetching the next one");
        match provider.fetch_source_batch_data(next_source_batch_id).await? {
            Some(rows) if !rows.is_empty() => {
                ledger.set_current_source_batch(rows).await?;
            }
            _ => {
                tracing::debug!("no further source batches available");
                return Ok(None);
            }
        }
    }
}
