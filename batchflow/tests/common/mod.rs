// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Row builders and scripted collaborator doubles shared by the integration
//! tests.

// not every test binary uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use batchflow_domain::repositories::{ErrorCodeCounts, ExtraInfoStatusCounts, StatusCounts};
use batchflow_domain::services::{update_rows, RowUpdate};
use batchflow_domain::{
    ErrorCode, ProcEnvResponse, ProcessingEnvironment, ProcessingResult, ProcessingStatus, StatusLedger, StatusRow,
    StatusStore, WorkflowError,
};

/// A batch of `size` fresh rows for the given source batch, with running
/// item ids.
pub fn new_batch(source_batch_id: i64, status: ProcessingStatus, size: usize) -> Vec<StatusRow> {
    let offset = source_batch_id * size as i64;
    (offset..offset + size as i64)
        .map(|n| {
            let mut row = StatusRow::new_item(
                n.to_string(),
                format!("http://example.com/{}", n),
                source_batch_id,
                Some(format!("batch_{}", source_batch_id)),
                Some("integration_test".to_string()),
            );
            row.status = status;
            row
        })
        .collect()
}

/// Processing environment double with scriptable failure points.
///
/// Mirrors the behavior of a well-behaved remote service unless told
/// otherwise: `fail_register` makes registration fail as a whole,
/// `fail_start` refuses the start request, and ids in `failing_targets`
/// come back failed from monitoring.
#[derive(Default)]
pub struct ScriptedEnvironment {
    pub fail_register: bool,
    pub fail_start: bool,
    pub failing_targets: HashSet<String>,
}

impl ScriptedEnvironment {
    pub fn well_behaved() -> Self {
        Self::default()
    }

    pub fn failing_register() -> Self {
        Self {
            fail_register: true,
            ..Self::default()
        }
    }

    pub fn failing_targets(targets: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            failing_targets: targets.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProcessingEnvironment for ScriptedEnvironment {
    async fn try_register_batch(
        &mut self,
        _ledger: &StatusLedger,
        _proc_batch_id: i64,
        batch: Vec<StatusRow>,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        if self.fail_register {
            return Ok(None);
        }
        let mut rows = batch;
        for row in &mut rows {
            row.proc_id = Some(format!("remote-{}", row.target_id));
            row.status = ProcessingStatus::BatchRegistered;
        }
        Ok(Some(rows))
    }

    async fn try_start_batch(
        &mut self,
        _ledger: &StatusLedger,
        _proc_batch_id: i64,
    ) -> Result<ProcEnvResponse, WorkflowError> {
        if self.fail_start {
            Ok(ProcEnvResponse::new(false, 500, "the service refused to start"))
        } else {
            Ok(ProcEnvResponse::new(true, 200, "batch accepted"))
        }
    }

    async fn poll_batch(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
            return Ok(None);
        };
        let mut updated = Vec::new();
        for row in rows {
            if row.status == ProcessingStatus::Error {
                continue;
            }
            let update = if self.failing_targets.contains(&row.target_id) {
                RowUpdate::new()
                    .status(ProcessingStatus::Error)
                    .message("task failed")
                    .error_code(ErrorCode::ProcessingFailed)
            } else {
                RowUpdate::new().status(ProcessingStatus::Processed)
            };
            updated.extend(update_rows(vec![row], update));
        }
        Ok(Some(updated))
    }

    async fn collect_results(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<ProcessingResult>>, WorkflowError> {
        let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
            return Ok(None);
        };
        let results: Vec<ProcessingResult> = rows
            .into_iter()
            .filter(|row| row.status != ProcessingStatus::Error)
            .map(|row| {
                let payload = serde_json::json!({ "target": row.target_id });
                ProcessingResult::new(row, payload, serde_json::json!({ "name": "scripted" }))
            })
            .collect();
        Ok(if results.is_empty() { None } else { Some(results) })
    }
}

/// Store wrapper that refuses writes after a configurable number of
/// successful persist calls.
pub struct FlakyStore<S> {
    inner: S,
    allowed_writes: std::sync::atomic::AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn failing_after(inner: S, allowed_writes: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            allowed_writes: std::sync::atomic::AtomicUsize::new(allowed_writes),
        })
    }
}

#[async_trait]
impl<S: StatusStore> StatusStore for FlakyStore<S> {
    async fn persist(&self, rows: &[StatusRow]) -> Result<(), WorkflowError> {
        use std::sync::atomic::Ordering;
        let remaining = self.allowed_writes.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(WorkflowError::DatabaseError("write refused by test store".to_string()));
        }
        self.allowed_writes.store(remaining - 1, Ordering::SeqCst);
        self.inner.persist(rows).await
    }

    async fn rows_of_proc_batch(&self, proc_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        self.inner.rows_of_proc_batch(proc_batch_id).await
    }

    async fn rows_of_source_batch(&self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        self.inner.rows_of_source_batch(source_batch_id).await
    }

    async fn last_proc_batch_id(&self) -> Result<i64, WorkflowError> {
        self.inner.last_proc_batch_id().await
    }

    async fn last_source_batch_id(&self) -> Result<i64, WorkflowError> {
        self.inner.last_source_batch_id().await
    }

    async fn status_counts(&self) -> Result<StatusCounts, WorkflowError> {
        self.inner.status_counts().await
    }

    async fn error_code_counts(&self) -> Result<ErrorCodeCounts, WorkflowError> {
        self.inner.error_code_counts().await
    }

    async fn status_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        self.inner.status_counts_for_proc_batch(proc_batch_id).await
    }

    async fn error_code_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<ErrorCodeCounts, WorkflowError> {
        self.inner.error_code_counts_for_proc_batch(proc_batch_id).await
    }

    async fn status_counts_for_source_batch(&self, source_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        self.inner.status_counts_for_source_batch(source_batch_id).await
    }

    async fn error_code_counts_for_source_batch(
        &self,
        source_batch_id: i64,
    ) -> Result<ErrorCodeCounts, WorkflowError> {
        self.inner.error_code_counts_for_source_batch(source_batch_id).await
    }

    async fn status_counts_per_extra_info(&self) -> Result<ExtraInfoStatusCounts, WorkflowError> {
        self.inner.status_counts_per_extra_info().await
    }

    async fn completed_source_batch_names(&self) -> Result<(Vec<String>, Vec<String>), WorkflowError> {
        self.inner.completed_source_batch_names().await
    }

    async fn name_of_source_batch(&self, source_batch_id: i64) -> Result<Option<String>, WorkflowError> {
        self.inner.name_of_source_batch(source_batch_id).await
    }
}
