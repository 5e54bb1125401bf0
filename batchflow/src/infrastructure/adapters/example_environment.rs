// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Example Processing Environment
//!
//! In-memory stand-in for a remote processing service: registration hands
//! out synthetic ids, starting always succeeds, and monitoring completes in
//! a single poll with every item processed. Useful for trying out a
//! workflow end to end and as the environment of the example configuration.

use async_trait::async_trait;
use uuid::Uuid;

use batchflow_domain::services::{update_rows, RowUpdate};
use batchflow_domain::{
    ProcEnvResponse, ProcessingEnvironment, ProcessingResult, ProcessingStatus, StatusLedger, StatusRow,
    WorkflowError,
};

/// Processing environment that succeeds instantly, without any remote calls.
#[derive(Default)]
pub struct ExampleEnvironment;

impl ExampleEnvironment {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessingEnvironment for ExampleEnvironment {
    async fn try_register_batch(
        &mut self,
        _ledger: &StatusLedger,
        proc_batch_id: i64,
        batch: Vec<StatusRow>,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        tracing::debug!(proc_batch_id, "registering example batch");
        let mut rows = batch;
        for row in &mut rows {
            row.proc_id = Some(Uuid::new_v4().to_string());
            row.status = ProcessingStatus::BatchRegistered;
        }
        Ok(Some(rows))
    }

    async fn try_start_batch(
        &mut self,
        _ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<ProcEnvResponse, WorkflowError> {
        tracing::debug!(proc_batch_id, "starting example batch");
        Ok(ProcEnvResponse::new(true, 200, "batch accepted"))
    }

    async fn poll_batch(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        tracing::debug!(proc_batch_id, "monitoring example batch");
        let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
            tracing::warn!(proc_batch_id, "no rows found while monitoring");
            return Ok(None);
        };
        Ok(Some(update_rows(
            rows,
            RowUpdate::new().status(ProcessingStatus::Processed),
        )))
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
            .map(|row| ProcessingResult::new(row, serde_json::json!({}), serde_json::json!({})))
            .collect();
        Ok(if results.is_empty() { None } else { Some(results) })
    }
}
