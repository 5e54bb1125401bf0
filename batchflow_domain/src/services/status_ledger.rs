// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Ledger Service
//!
//! The ledger is the single mutable shared resource of the pipeline: a
//! durable [`StatusStore`] plus the in-memory cache of the current source
//! batch. The task scheduler owns the ledger exclusively and lends it to
//! collaborators for the duration of a single operation, so every status
//! transition is serialized through one place.
//!
//! ## Persistence semantics
//!
//! Two flavors of persistence are offered:
//!
//! - [`StatusLedger::persist`] is advisory: it reports failure as `false`
//!   and is used during recovery and cache maintenance, where a failed write
//!   means "nothing to resume" rather than corruption.
//! - [`StatusLedger::persist_or_die`] is used inside pipeline steps. A
//!   failed write there means the recorded state no longer matches reality,
//!   so the error propagates and terminates the run.
//!
//! Both flavors re-read the current source batch after a successful write so
//! the cache never lags the store.
//!
//! ## Field updates
//!
//! [`update_rows`] applies a partial update to a set of rows in memory; the
//! caller persists afterwards. Absent fields are left untouched, which is
//! what lets one update call express "advance these rows to `Processing` but
//! keep their messages".

use std::sync::Arc;

use crate::entities::{ErrorCode, ProcessingStatus, StatusRow};
use crate::error::WorkflowError;
use crate::repositories::StatusStore;

/// Partial update applied to status rows in memory.
///
/// Every field defaults to "leave unchanged". To clear the status message,
/// pass an explicit empty string.
#[derive(Debug, Clone, Default)]
pub struct RowUpdate {
    status: Option<ProcessingStatus>,
    proc_batch_id: Option<i64>,
    proc_status_msg: Option<String>,
    proc_error_code: Option<ErrorCode>,
}

impl RowUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ProcessingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn proc_batch_id(mut self, proc_batch_id: i64) -> Self {
        self.proc_batch_id = Some(proc_batch_id);
        self
    }

    pub fn message(mut self, proc_status_msg: impl Into<String>) -> Self {
        self.proc_status_msg = Some(proc_status_msg.into());
        self
    }

    pub fn error_code(mut self, proc_error_code: ErrorCode) -> Self {
        self.proc_error_code = Some(proc_error_code);
        self
    }
}

/// Applies a partial update to each row, in memory.
///
/// The rows are returned for chaining into a persist call; nothing is
/// written to the store here.
pub fn update_rows(mut rows: Vec<StatusRow>, update: RowUpdate) -> Vec<StatusRow> {
    for row in &mut rows {
        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(proc_batch_id) = update.proc_batch_id {
            row.proc_batch_id = Some(proc_batch_id);
        }
        if let Some(msg) = &update.proc_status_msg {
            row.proc_status_msg = Some(msg.clone());
        }
        if let Some(code) = update.proc_error_code {
            row.proc_error_code = Some(code);
        }
    }
    rows
}

/// The status ledger: durable store handle plus the current-source-batch
/// cache.
pub struct StatusLedger {
    store: Arc<dyn StatusStore>,
    cur_source_batch: Option<Vec<StatusRow>>,
}

impl StatusLedger {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            cur_source_batch: None,
        }
    }

    /// Read access to the durable store, for reporting.
    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// The cached current source batch, if one was recovered or set.
    pub fn current_source_batch(&self) -> Option<&[StatusRow]> {
        self.cur_source_batch.as_deref()
    }

    /// Id of the cached source batch; `-1` when no batch is cached.
    pub fn current_source_batch_id(&self) -> i64 {
        self.cur_source_batch
            .as_ref()
            .and_then(|rows| rows.first())
            .map(|row| row.source_batch_id)
            .unwrap_or(-1)
    }

    /// Up to `limit` rows of the cached source batch with the given status.
    ///
    /// Returns `None` when no row matches, so callers can distinguish an
    /// exhausted batch from a short one.
    pub fn rows_of_type_in_current_batch(&self, status: ProcessingStatus, limit: usize) -> Option<Vec<StatusRow>> {
        let rows: Vec<StatusRow> = self
            .cur_source_batch
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter(|row| row.status == status)
            .take(limit)
            .cloned()
            .collect();
        if rows.is_empty() {
            None
        } else {
            Some(rows)
        }
    }

    /// Rows of a processing batch, straight from the store.
    pub async fn rows_of_proc_batch(&self, proc_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        self.store.rows_of_proc_batch(proc_batch_id).await
    }

    /// Persists rows and resyncs the cache; advisory.
    ///
    /// Returns `false` on empty input or when the write (or the cache
    /// resync) fails. Used outside the pipeline path.
    pub async fn persist(&mut self, rows: &[StatusRow]) -> bool {
        if rows.is_empty() {
            tracing::warn!("trying to persist empty status data");
            return false;
        }
        if let Err(e) = self.store.persist(rows).await {
            tracing::error!("could not persist status rows: {}", e);
            return false;
        }
        tracing::debug!("persisted {} status rows, syncing current source batch", rows.len());
        self.recover_source_batch().await.unwrap_or(false)
    }

    /// Persists rows and resyncs the cache; fatal on failure.
    ///
    /// Every pipeline step funnels its outcome through here: a write failure
    /// propagates as [`WorkflowError::DatabaseError`] and ends the run.
    pub async fn persist_or_die(&mut self, rows: &[StatusRow]) -> Result<(), WorkflowError> {
        if rows.is_empty() {
            return Err(WorkflowError::InternalError(
                "refusing to persist an empty set of status rows".to_string(),
            ));
        }
        self.store.persist(rows).await?;
        self.recover_source_batch().await?;
        Ok(())
    }

    /// Persists a fresh source batch and makes it the cached current batch.
    pub async fn set_current_source_batch(&mut self, rows: Vec<StatusRow>) -> Result<(), WorkflowError> {
        tracing::debug!(
            source_batch_id = rows.first().map(|r| r.source_batch_id),
            rows = rows.len(),
            "setting new source batch"
        );
        self.store.persist(&rows).await?;
        self.cur_source_batch = Some(rows);
        Ok(())
    }

    /// Loads the rows of the highest source batch id into the cache.
    ///
    /// Returns `Ok(false)` when the store holds no rows yet.
    pub async fn recover_source_batch(&mut self) -> Result<bool, WorkflowError> {
        let source_batch_id = self.store.last_source_batch_id().await?;
        if source_batch_id == -1 {
            tracing::debug!("no source batch id found in the store, nothing to recover");
            return Ok(false);
        }
        match self.store.rows_of_source_batch(source_batch_id).await? {
            Some(rows) => {
                self.cur_source_batch = Some(rows);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Startup recovery: current source batch plus the rows of the last
    /// processing batch.
    ///
    /// The boolean reports whether a source batch could be recovered; the
    /// row set (when present) is the processing batch the scheduler must
    /// resume.
    pub async fn recover(&mut self) -> Result<(bool, Option<Vec<StatusRow>>), WorkflowError> {
        let source_batch_recovered = self.recover_source_batch().await?;
        if !source_batch_recovered {
            tracing::warn!("could not recover any source batch");
        }

        let last_proc_batch_id = self.store.last_proc_batch_id().await?;
        let last_proc_batch = if last_proc_batch_id == -1 {
            tracing::warn!("could not recover a processing batch");
            None
        } else {
            self.store.rows_of_proc_batch(last_proc_batch_id).await?
        };

        Ok((source_batch_recovered, last_proc_batch))
    }
}
