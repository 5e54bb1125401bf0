// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Remote Processing Environment
//!
//! `ProcessingEnvironment` implementation on top of the
//! [`RemoteServiceClient`]: translates between the remote service's
//! task-lifecycle semantics and the local state machine.
//!
//! ## State mapping
//!
//! - remote `SUCCEEDED` (200) → local `Processed`
//! - any other terminal remote state → local `Error` with the remote
//!   diagnostic and `PROCESSING_FAILED`
//! - remote `QUEUED` (102) blocks monitoring completion
//!
//! ## Monitoring
//!
//! The monitor loop polls the search index at the configured interval until
//! no task of the monitored key is queued, logging a state overview each
//! round. Transient index failures are retried on the next poll without
//! touching item state; persistent failures become fatal. Shutdown is
//! honored between polls, which are the suspension points of this step.
//!
//! ## Idempotence
//!
//! Registration tolerates mixed replies: accepted documents keep their
//! remote id, rejected documents are recorded per item. The persisted
//! registration artifact (not in-memory state) feeds the subsequent start
//! request, so a crash between the two steps loses nothing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use batchflow_bootstrap::CancellationToken;
use batchflow_domain::services::{update_rows, RowUpdate};
use batchflow_domain::{
    ErrorCode, ProcEnvResponse, ProcessingEnvironment, ProcessingResult, ProcessingStatus, StatusLedger, StatusRow,
    WorkflowError,
};

use crate::infrastructure::config::RemoteEnvConfig;

use super::remote_client::{
    log_state_overview, parse_register_reply, tasks_overview, RemoteResult, RemoteServiceClient, RemoteTask,
};

/// How many consecutive poll failures are tolerated before monitoring gives
/// up.
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 3;

/// Driver for an HTTP-based remote processing service.
pub struct RemoteEnvironment {
    client: RemoteServiceClient,
    monitor_interval: Duration,
    shutdown: CancellationToken,
}

impl RemoteEnvironment {
    pub fn new(config: &RemoteEnvConfig, shutdown: CancellationToken) -> Result<Self, WorkflowError> {
        Ok(Self {
            client: RemoteServiceClient::new(config)?,
            monitor_interval: Duration::from_secs(config.monitor_interval),
            shutdown,
        })
    }

    /// Applies a registration reply to the batch rows.
    fn apply_register_reply(
        &self,
        rows: Vec<StatusRow>,
        reply: &serde_json::Value,
        proc_batch_id: i64,
    ) -> Vec<StatusRow> {
        let (accepted, rejected) = parse_register_reply(reply);
        let accepted_by_target: HashMap<&str, &str> = accepted
            .iter()
            .map(|doc| (doc.target_id.as_str(), doc.remote_id.as_str()))
            .collect();
        let rejected_by_target: HashMap<&str, &str> = rejected
            .iter()
            .filter_map(|doc| doc.target_id.as_deref().map(|id| (id, doc.error.as_str())))
            .collect();

        rows.into_iter()
            .map(|row| {
                if let Some(remote_id) = accepted_by_target.get(row.target_id.as_str()) {
                    let mut row = row;
                    row.proc_id = Some((*remote_id).to_string());
                    row.status = ProcessingStatus::BatchRegistered;
                    row
                } else {
                    let error = rejected_by_target
                        .get(row.target_id.as_str())
                        .copied()
                        .unwrap_or("item missing from registration reply");
                    tracing::warn!(proc_batch_id, target_id = %row.target_id, "registration rejected: {}", error);
                    update_rows(
                        vec![row],
                        RowUpdate::new()
                            .status(ProcessingStatus::Error)
                            .message(error)
                            .error_code(ErrorCode::BatchRegisterFailed),
                    )
                    .remove(0)
                }
            })
            .collect()
    }

    /// Waits out the monitor interval, stopping early on shutdown.
    async fn wait_interval(&self) -> Result<(), WorkflowError> {
        tokio::select! {
            _ = tokio::time::sleep(self.monitor_interval) => Ok(()),
            _ = self.shutdown.cancelled() => {
                Err(WorkflowError::Cancelled("shutdown requested while monitoring".to_string()))
            }
        }
    }

    /// Polls the index until no monitored task is queued.
    async fn await_batch_completion(&self, proc_batch_id: i64) -> Result<Vec<RemoteTask>, WorkflowError> {
        let mut consecutive_failures: u32 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(WorkflowError::Cancelled(
                    "shutdown requested while monitoring".to_string(),
                ));
            }

            match self.client.tasks_of_batch(proc_batch_id).await {
                Ok(tasks) => {
                    consecutive_failures = 0;
                    let overview = tasks_overview(&tasks);
                    log_state_overview(&overview, self.client.task_key());

                    let queued = tasks
                        .iter()
                        .filter(|t| t.key == self.client.task_key() && t.is_queued())
                        .count();
                    if queued == 0 {
                        tracing::info!(proc_batch_id, tasks = tasks.len(), "no queued tasks remaining");
                        return Ok(tasks);
                    }
                    tracing::info!(proc_batch_id, queued, "tasks still queued, monitoring some more");
                }
                Err(e) if consecutive_failures + 1 < MAX_CONSECUTIVE_POLL_FAILURES => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        proc_batch_id,
                        attempt = consecutive_failures,
                        "poll failed, retrying next interval: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            self.wait_interval().await?;
        }
    }
}

#[async_trait]
impl ProcessingEnvironment for RemoteEnvironment {
    async fn try_register_batch(
        &mut self,
        _ledger: &StatusLedger,
        proc_batch_id: i64,
        batch: Vec<StatusRow>,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let Some(reply) = self.client.register_documents(proc_batch_id, &batch).await? else {
            return Ok(None);
        };

        // the artifact is the source of truth for the later start request;
        // losing it would desynchronize local and remote state
        self.client.persist_batch_artifact(proc_batch_id, &reply).await?;

        Ok(Some(self.apply_register_reply(batch, &reply, proc_batch_id)))
    }

    async fn try_start_batch(
        &mut self,
        _ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<ProcEnvResponse, WorkflowError> {
        let Some(artifact) = self.client.load_batch_artifact(proc_batch_id).await? else {
            return Ok(ProcEnvResponse::new(
                false,
                404,
                format!(
                    "No registration artifact found at {}",
                    self.client.batch_file_path(proc_batch_id).display()
                ),
            ));
        };

        let (accepted, _) = parse_register_reply(&artifact);
        let doc_ids: Vec<String> = accepted.into_iter().map(|doc| doc.remote_id).collect();
        if doc_ids.is_empty() {
            return Ok(ProcEnvResponse::new(
                false,
                404,
                format!("No accepted document ids in batch {} artifact", proc_batch_id),
            ));
        }

        let (success, status_code, message) = self.client.submit_task(&doc_ids).await;
        Ok(ProcEnvResponse::new(success, status_code, message))
    }

    async fn poll_batch(
        &mut self,
        ledger: &StatusLedger,
        proc_batch_id: i64,
    ) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let tasks = self.await_batch_completion(proc_batch_id).await?;
        if tasks.is_empty() {
            tracing::warn!(proc_batch_id, "no tasks found for batch");
            return Ok(None);
        }

        let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
            tracing::warn!(proc_batch_id, "no status rows found for batch");
            return Ok(None);
        };

        let task_by_doc: HashMap<&str, &RemoteTask> = tasks
            .iter()
            .filter(|t| t.key == self.client.task_key())
            .map(|t| (t.doc_id.as_str(), t))
            .collect();

        let mut updated = Vec::new();
        for row in rows {
            if row.status == ProcessingStatus::Error {
                continue; // already failed at an earlier step
            }
            let task = row.proc_id.as_deref().and_then(|id| task_by_doc.get(id));
            let update = match task {
                Some(task) if task.succeeded() => RowUpdate::new()
                    .status(ProcessingStatus::Processed)
                    .message(task.message.clone()),
                Some(task) => RowUpdate::new()
                    .status(ProcessingStatus::Error)
                    .message(task.message.clone())
                    .error_code(ErrorCode::ProcessingFailed),
                None => RowUpdate::new()
                    .status(ProcessingStatus::Error)
                    .message("no task found for item")
                    .error_code(ErrorCode::ProcessingFailed),
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
        let results = self.client.results_of_batch(proc_batch_id).await?;
        let tasks = self.client.tasks_of_batch(proc_batch_id).await?;

        let Some(rows) = ledger.rows_of_proc_batch(proc_batch_id).await? else {
            tracing::warn!(proc_batch_id, "no status rows found for batch");
            return Ok(None);
        };

        // results reference their task; tasks reference their document; the
        // document id is what the rows know as proc_id
        let doc_by_task: HashMap<&str, &str> = tasks.iter().map(|t| (t.id.as_str(), t.doc_id.as_str())).collect();
        let result_by_doc: HashMap<&str, &RemoteResult> = results
            .iter()
            .filter_map(|r| doc_by_task.get(r.task_id.as_str()).map(|doc_id| (*doc_id, r)))
            .collect();

        let mut out = Vec::new();
        for row in rows {
            if row.status == ProcessingStatus::Error {
                continue;
            }
            match row.proc_id.as_deref().and_then(|id| result_by_doc.get(id)) {
                Some(result) => out.push(ProcessingResult::new(
                    row,
                    result.payload.clone(),
                    result.generator.clone(),
                )),
                None => {
                    tracing::warn!(target_id = %row.target_id, "no result payload available for item");
                    let row = update_rows(
                        vec![row],
                        RowUpdate::new()
                            .status(ProcessingStatus::Error)
                            .message("no result payload available")
                            .error_code(ErrorCode::ProcessingFailed),
                    )
                    .remove(0);
                    out.push(ProcessingResult::new(row, serde_json::Value::Null, serde_json::Value::Null));
                }
            }
        }

        Ok(if out.is_empty() { None } else { Some(out) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn environment() -> RemoteEnvironment {
        RemoteEnvironment::new(
            &RemoteEnvConfig {
                remote_host: "proc.example.com:5500".to_string(),
                remote_task_id: "ANALYZE".to_string(),
                status_dir: std::env::temp_dir(),
                monitor_interval: 1,
                index_host: "index.example.com".to_string(),
                index_port: 9200,
                index_name: "proc-tasks".to_string(),
                query_timeout: 5,
                batch_prefix: "ingest".to_string(),
            },
            CancellationToken::default(),
        )
        .unwrap()
    }

    fn batch_row(id: &str) -> StatusRow {
        let mut row = StatusRow::new_item(id, format!("http://{}", id), 0, None, None);
        row.proc_batch_id = Some(0);
        row.status = ProcessingStatus::BatchAssigned;
        row
    }

    #[test]
    fn test_apply_register_reply_mixed_outcome() {
        let env = environment();
        let reply = json!({
            "success": [ { "_id": "remote-a", "target": { "id": "a" } } ],
            "failed": [ { "document_id": "b", "error": "no access" } ]
        });

        let rows = env.apply_register_reply(vec![batch_row("a"), batch_row("b")], &reply, 0);

        let a = rows.iter().find(|r| r.target_id == "a").unwrap();
        assert_eq!(a.status, ProcessingStatus::BatchRegistered);
        assert_eq!(a.proc_id.as_deref(), Some("remote-a"));

        let b = rows.iter().find(|r| r.target_id == "b").unwrap();
        assert_eq!(b.status, ProcessingStatus::Error);
        assert_eq!(b.proc_error_code, Some(ErrorCode::BatchRegisterFailed));
        assert_eq!(b.proc_status_msg.as_deref(), Some("no access"));
    }

    #[test]
    fn test_apply_register_reply_missing_item_is_rejected() {
        let env = environment();
        let reply = json!({ "success": [], "failed": [] });

        let rows = env.apply_register_reply(vec![batch_row("ghost")], &reply, 0);
        assert_eq!(rows[0].status, ProcessingStatus::Error);
        assert_eq!(rows[0].proc_error_code, Some(ErrorCode::BatchRegisterFailed));
        assert!(rows[0].proc_status_msg.as_deref().unwrap().contains("missing"));
    }
}
