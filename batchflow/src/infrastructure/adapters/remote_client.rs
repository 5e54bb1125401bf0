// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Remote Processing Service Client
//!
//! Low-level HTTP client for the remote processing service and its search
//! index. The service exposes three surfaces:
//!
//! - **Document registration** (`POST http://<host>/document/batch`): upload
//!   a batch of documents, each carrying a target (id + url) and a creator
//!   id; the reply partitions the documents into `success` and `failed`
//!   lists
//! - **Task submission** (`POST http://<host>/task`): ask the service to run
//!   a task (by key) over a list of registered document ids
//! - **Search index** (`POST http://<index>/<name>/_search`): the only way
//!   to observe task progress and fetch result payloads, queried by the
//!   creator id the documents were registered under
//!
//! ## Registration artifacts
//!
//! The reply of a successful registration is persisted verbatim as
//! `<STATUS_DIR>/<batch name>.json`. That file is the source of truth for
//! which documents the service accepted: task submission re-reads it instead
//! of trusting in-memory state, which is what makes the register step safe
//! to re-enter after a crash.
//!
//! ## Pagination
//!
//! The index returns at most a page of hits per query; the client iterates
//! `(from, size)` windows and concatenates pages until an empty page is
//! observed.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use batchflow_domain::{ProcBatchName, StatusRow, WorkflowError};

use crate::infrastructure::config::RemoteEnvConfig;

/// Page size for index queries.
const PAGE_SIZE: usize = 200;

/// Task states of the remote service.
///
/// The service reports task progress with HTTP-flavored numeric codes; only
/// `Queued` blocks monitoring completion, and only `Succeeded` maps to a
/// successful local outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTaskState {
    /// Task sent to a queue; may be worked on or held (102)
    Queued,
    /// Task completed successfully (200)
    Succeeded,
    /// Task registered but not acted upon (201)
    Created,
    /// Task reset, typically after manual intervention (205)
    Reset,
    /// Malformed document or task description (400)
    BadRequest,
    /// Access denied to the underlying source material (403)
    AccessDenied,
    /// Underlying source material not found (404)
    NotFound,
    /// Task depends on a task that has not completed (412)
    UnfinishedDependency,
    /// Task could not be routed to a queue (422)
    NoRouteToQueue,
    /// Error during processing (500)
    ServiceError,
    /// Worker received invalid or partial input (502)
    InvalidInput,
    /// Worker received an error from a service it depends on (503)
    ProxyError,
}

impl RemoteTaskState {
    pub fn code(self) -> i64 {
        match self {
            RemoteTaskState::Queued => 102,
            RemoteTaskState::Succeeded => 200,
            RemoteTaskState::Created => 201,
            RemoteTaskState::Reset => 205,
            RemoteTaskState::BadRequest => 400,
            RemoteTaskState::AccessDenied => 403,
            RemoteTaskState::NotFound => 404,
            RemoteTaskState::UnfinishedDependency => 412,
            RemoteTaskState::NoRouteToQueue => 422,
            RemoteTaskState::ServiceError => 500,
            RemoteTaskState::InvalidInput => 502,
            RemoteTaskState::ProxyError => 503,
        }
    }

    pub fn from_code(code: i64) -> Option<RemoteTaskState> {
        match code {
            102 => Some(RemoteTaskState::Queued),
            200 => Some(RemoteTaskState::Succeeded),
            201 => Some(RemoteTaskState::Created),
            205 => Some(RemoteTaskState::Reset),
            400 => Some(RemoteTaskState::BadRequest),
            403 => Some(RemoteTaskState::AccessDenied),
            404 => Some(RemoteTaskState::NotFound),
            412 => Some(RemoteTaskState::UnfinishedDependency),
            422 => Some(RemoteTaskState::NoRouteToQueue),
            500 => Some(RemoteTaskState::ServiceError),
            502 => Some(RemoteTaskState::InvalidInput),
            503 => Some(RemoteTaskState::ProxyError),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RemoteTaskState::Queued => "QUEUED",
            RemoteTaskState::Succeeded => "SUCCEEDED",
            RemoteTaskState::Created => "CREATED",
            RemoteTaskState::Reset => "RESET",
            RemoteTaskState::BadRequest => "BAD_REQUEST",
            RemoteTaskState::AccessDenied => "ACCESS_DENIED",
            RemoteTaskState::NotFound => "NOT_FOUND",
            RemoteTaskState::UnfinishedDependency => "UNFINISHED_DEPENDENCY",
            RemoteTaskState::NoRouteToQueue => "NO_ROUTE_TO_QUEUE",
            RemoteTaskState::ServiceError => "ERROR",
            RemoteTaskState::InvalidInput => "ERROR_INVALID_INPUT",
            RemoteTaskState::ProxyError => "ERROR_PROXY",
        }
    }
}

/// A task record from the search index.
#[derive(Debug, Clone)]
pub struct RemoteTask {
    pub id: String,
    pub message: String,
    pub state: i64,
    pub key: String,
    /// Remote id of the document the task runs on
    pub doc_id: String,
}

impl RemoteTask {
    pub fn is_queued(&self) -> bool {
        self.state == RemoteTaskState::Queued.code()
    }

    pub fn succeeded(&self) -> bool {
        self.state == RemoteTaskState::Succeeded.code()
    }
}

/// A result record from the search index.
#[derive(Debug, Clone)]
pub struct RemoteResult {
    pub id: String,
    pub generator: Value,
    pub payload: Value,
    /// Remote id of the task that produced the result
    pub task_id: String,
}

/// A document the registration reply reported as accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedDocument {
    pub remote_id: String,
    pub target_id: String,
}

/// A document the registration reply reported as rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    pub target_id: Option<String>,
    pub error: String,
}

/// HTTP client for the remote processing service.
pub struct RemoteServiceClient {
    http: reqwest::Client,
    docs_endpoint: String,
    task_endpoint: String,
    search_endpoint: String,
    task_key: String,
    status_dir: PathBuf,
    batch_prefix: String,
}

impl RemoteServiceClient {
    pub fn new(config: &RemoteEnvConfig) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.query_timeout))
            .build()
            .map_err(|e| WorkflowError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            docs_endpoint: format!("http://{}/document/batch", config.remote_host),
            task_endpoint: format!("http://{}/task", config.remote_host),
            search_endpoint: format!(
                "http://{}:{}/{}/_search",
                config.index_host, config.index_port, config.index_name
            ),
            task_key: config.remote_task_id.clone(),
            status_dir: config.status_dir.clone(),
            batch_prefix: config.batch_prefix.clone(),
        })
    }

    /// The task key this deployment submits and monitors.
    pub fn task_key(&self) -> &str {
        &self.task_key
    }

    /// The creator id documents of this batch are registered under.
    pub fn proc_batch_name(&self, proc_batch_id: i64) -> ProcBatchName {
        ProcBatchName::new(&self.batch_prefix, proc_batch_id)
    }

    /// Path of the registration artifact of a batch.
    pub fn batch_file_path(&self, proc_batch_id: i64) -> PathBuf {
        self.status_dir
            .join(format!("{}.json", self.proc_batch_name(proc_batch_id)))
    }

    /// Uploads the batch as documents; returns the reply envelope on HTTP
    /// 200, `None` on any other service answer.
    pub async fn register_documents(
        &self,
        proc_batch_id: i64,
        rows: &[StatusRow],
    ) -> Result<Option<Value>, WorkflowError> {
        let documents = self.to_documents(proc_batch_id, rows)?;
        tracing::info!(proc_batch_id, documents = rows.len(), "uploading documents");

        let response = self
            .http
            .post(&self.docs_endpoint)
            .json(&documents)
            .send()
            .await
            .map_err(|e| WorkflowError::RemoteServiceError(format!("Document upload failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WorkflowError::RemoteServiceError(format!("Failed to read upload reply: {}", e)))?;

        if !status.is_success() {
            tracing::error!(proc_batch_id, status = status.as_u16(), "document upload rejected");
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(reply) => Ok(Some(reply)),
            Err(e) => {
                tracing::error!("invalid JSON in registration reply: {}", e);
                Ok(None)
            }
        }
    }

    fn to_documents(&self, proc_batch_id: i64, rows: &[StatusRow]) -> Result<Value, WorkflowError> {
        if rows.is_empty() {
            return Err(WorkflowError::MissingData("no rows to register".to_string()));
        }
        if rows.iter().any(|r| r.proc_batch_id.is_none()) {
            return Err(WorkflowError::InternalError(
                "rows must carry a proc_batch_id before registration".to_string(),
            ));
        }
        let creator_id = self.proc_batch_name(proc_batch_id);
        Ok(Value::Array(
            rows.iter()
                .map(|row| {
                    json!({
                        "target": {
                            "id": row.target_id,
                            "url": row.target_url,
                            "type": "Document",
                        },
                        "creator": {
                            "id": creator_id.as_str(),
                            "type": "Organization",
                        },
                    })
                })
                .collect(),
        ))
    }

    /// Writes the registration reply verbatim next to the other batch
    /// artifacts.
    pub async fn persist_batch_artifact(&self, proc_batch_id: i64, reply: &Value) -> Result<(), WorkflowError> {
        let path = self.batch_file_path(proc_batch_id);
        let text = serde_json::to_string_pretty(reply)
            .map_err(|e| WorkflowError::SerializationError(format!("Cannot serialize registration reply: {}", e)))?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| WorkflowError::IoError(format!("Could not persist {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Reads back the registration artifact of a batch, if present.
    pub async fn load_batch_artifact(&self, proc_batch_id: i64) -> Result<Option<Value>, WorkflowError> {
        let path = self.batch_file_path(proc_batch_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WorkflowError::IoError(format!(
                    "Could not read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let value = serde_json::from_str(&text)
            .map_err(|e| WorkflowError::SerializationError(format!("Corrupt artifact {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    /// Submits the configured task for the given document ids.
    ///
    /// Transport failures are reported in the returned tuple (success flag,
    /// status code, body) rather than as errors, so callers can record the
    /// diagnostic on the affected rows.
    pub async fn submit_task(&self, doc_ids: &[String]) -> (bool, u16, String) {
        let task = json!({
            "document_id": doc_ids,
            "key": self.task_key,
        });
        tracing::info!(documents = doc_ids.len(), key = %self.task_key, "submitting task");

        let response = match self.http.post(&self.task_endpoint).json(&task).send().await {
            Ok(response) => response,
            Err(e) => return (false, 503, format!("Task submission failed: {}", e)),
        };
        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return (false, status, format!("Failed to read task reply: {}", e)),
        };

        // some per-document rejections are harmless (e.g. the task is
        // already assigned), so they are surfaced as warnings only
        for error in extract_errors_from_reply(&text) {
            tracing::warn!("task submission: {}", error);
        }

        (status == 200, status, text)
    }

    /// All tasks registered under this batch's creator id, across all index
    /// pages.
    pub async fn tasks_of_batch(&self, proc_batch_id: i64) -> Result<Vec<RemoteTask>, WorkflowError> {
        let batch_name = self.proc_batch_name(proc_batch_id);
        let mut tasks = Vec::new();
        let mut offset = 0;
        loop {
            let query = tasks_of_batch_query(batch_name.as_str(), &self.task_key, offset, PAGE_SIZE);
            let hits = self.search(&query).await?;
            if hits.is_empty() {
                break;
            }
            for hit in &hits {
                tasks.push(task_from_hit(hit)?);
            }
            offset += PAGE_SIZE;
        }
        tracing::debug!(batch = %batch_name, tasks = tasks.len(), "fetched tasks from index");
        Ok(tasks)
    }

    /// All results with a payload belonging to this batch, across all index
    /// pages.
    pub async fn results_of_batch(&self, proc_batch_id: i64) -> Result<Vec<RemoteResult>, WorkflowError> {
        let batch_name = self.proc_batch_name(proc_batch_id);
        let mut results = Vec::new();
        let mut offset = 0;
        loop {
            let query = results_of_batch_query(batch_name.as_str(), &self.task_key, offset, PAGE_SIZE);
            let hits = self.search(&query).await?;
            if hits.is_empty() {
                break;
            }
            for hit in &hits {
                results.push(result_from_hit(hit)?);
            }
            offset += PAGE_SIZE;
        }
        tracing::debug!(batch = %batch_name, results = results.len(), "fetched results from index");
        Ok(results)
    }

    async fn search(&self, query: &Value) -> Result<Vec<Value>, WorkflowError> {
        let response = self
            .http
            .post(&self.search_endpoint)
            .json(query)
            .send()
            .await
            .map_err(|e| WorkflowError::RemoteServiceError(format!("Index query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WorkflowError::RemoteServiceError(format!(
                "Index query returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WorkflowError::RemoteServiceError(format!("Invalid index reply: {}", e)))?;

        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(hits)
    }
}

/// Index query for all tasks of a batch, filtered to the configured task
/// key.
pub fn tasks_of_batch_query(batch_name: &str, task_key: &str, offset: usize, size: usize) -> Value {
    json!({
        "_source": ["task", "created_at", "updated_at", "role"],
        "from": offset,
        "size": size,
        "query": tasks_query_body(batch_name, task_key),
    })
}

fn tasks_query_body(batch_name: &str, task_key: &str) -> Value {
    json!({
        "bool": {
            "must": [
                {
                    "has_parent": {
                        "parent_type": "document",
                        "query": {
                            "bool": {
                                "must": [
                                    {
                                        "query_string": {
                                            "default_field": "creator.id",
                                            "query": format!("\"{}\"", batch_name),
                                        }
                                    }
                                ]
                            }
                        }
                    }
                },
                {
                    "query_string": {
                        "default_field": "task.key",
                        "query": task_key,
                    }
                }
            ]
        }
    })
}

/// Index query for all results of a batch that carry a payload.
pub fn results_of_batch_query(batch_name: &str, task_key: &str, offset: usize, size: usize) -> Value {
    json!({
        "_source": ["result", "created_at", "updated_at", "role"],
        "from": offset,
        "size": size,
        "query": {
            "bool": {
                "must": [
                    {
                        "has_parent": {
                            "parent_type": "task",
                            "query": tasks_query_body(batch_name, task_key),
                        }
                    },
                    { "exists": { "field": "result.payload" } }
                ]
            }
        }
    })
}

fn task_from_hit(hit: &Value) -> Result<RemoteTask, WorkflowError> {
    let field = |pointer: &str| {
        hit.pointer(pointer)
            .ok_or_else(|| WorkflowError::SerializationError(format!("Task hit is missing {}", pointer)))
    };
    Ok(RemoteTask {
        id: field("/_id")?.as_str().unwrap_or_default().to_string(),
        message: field("/_source/task/msg")?.as_str().unwrap_or_default().to_string(),
        state: field("/_source/task/state")?.as_i64().unwrap_or_default(),
        key: field("/_source/task/key")?.as_str().unwrap_or_default().to_string(),
        doc_id: field("/_source/role/parent")?.as_str().unwrap_or_default().to_string(),
    })
}

fn result_from_hit(hit: &Value) -> Result<RemoteResult, WorkflowError> {
    let field = |pointer: &str| {
        hit.pointer(pointer)
            .ok_or_else(|| WorkflowError::SerializationError(format!("Result hit is missing {}", pointer)))
    };
    Ok(RemoteResult {
        id: field("/_id")?.as_str().unwrap_or_default().to_string(),
        generator: field("/_source/result/generator")?.clone(),
        payload: field("/_source/result/payload")?.clone(),
        task_id: field("/_source/role/parent")?.as_str().unwrap_or_default().to_string(),
    })
}

/// Splits a registration reply into accepted and rejected documents.
///
/// Accepted documents come from the `success` list (either bare documents or
/// wrapped in a `document` field) and must carry a remote `_id`. Everything
/// in the `failed` list, and any success entry without an id, is rejected.
pub fn parse_register_reply(reply: &Value) -> (Vec<AcceptedDocument>, Vec<RejectedDocument>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for entry in list_of(reply, "success") {
        let doc = entry.get("document").unwrap_or(&entry);
        let remote_id = doc.get("_id").and_then(Value::as_str);
        let target_id = doc.pointer("/target/id").and_then(Value::as_str);
        match (remote_id, target_id) {
            (Some(remote_id), Some(target_id)) => accepted.push(AcceptedDocument {
                remote_id: remote_id.to_string(),
                target_id: target_id.to_string(),
            }),
            _ => rejected.push(RejectedDocument {
                target_id: target_id.map(str::to_string),
                error: "registered without a document id".to_string(),
            }),
        }
    }

    for entry in list_of(reply, "failed") {
        let doc = entry.get("document").unwrap_or(&entry);
        let target_id = entry
            .get("document_id")
            .and_then(Value::as_str)
            .or_else(|| doc.pointer("/target/id").and_then(Value::as_str));
        let error = entry
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("rejected by the processing service");
        rejected.push(RejectedDocument {
            target_id: target_id.map(str::to_string),
            error: error.to_string(),
        });
    }

    (accepted, rejected)
}

fn list_of(reply: &Value, key: &str) -> Vec<Value> {
    reply.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
}

/// Extracts per-document error messages from a task submission reply.
pub fn extract_errors_from_reply(reply_text: &str) -> Vec<String> {
    let Ok(reply) = serde_json::from_str::<Value>(reply_text) else {
        return Vec::new();
    };
    list_of(&reply, "failed")
        .iter()
        .filter_map(|entry| entry.get("error").and_then(Value::as_str).map(str::to_string))
        .collect()
}

/// Groups tasks by key and state: `key -> state -> count`.
pub fn tasks_overview(tasks: &[RemoteTask]) -> BTreeMap<String, BTreeMap<i64, usize>> {
    let mut overview: BTreeMap<String, BTreeMap<i64, usize>> = BTreeMap::new();
    for task in tasks {
        *overview
            .entry(task.key.clone())
            .or_default()
            .entry(task.state)
            .or_insert(0) += 1;
    }
    overview
}

/// Logs the state distribution of the task key of interest.
pub fn log_state_overview(overview: &BTreeMap<String, BTreeMap<i64, usize>>, task_key: &str) {
    let Some(states) = overview.get(task_key) else {
        tracing::info!(task_key, "no tasks of the monitored key yet");
        return;
    };
    let mut unknown = 0;
    for (state, count) in states {
        match RemoteTaskState::from_code(*state) {
            Some(known) => tracing::info!("number of {} tasks: {}", known.name(), count),
            None => {
                tracing::info!("found an unmapped task state code: {}", state);
                unknown += count;
            }
        }
    }
    if unknown > 0 {
        tracing::info!("number of UNKNOWN tasks: {}", unknown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> RemoteServiceClient {
        let dir = std::env::temp_dir();
        RemoteServiceClient::new(&RemoteEnvConfig {
            remote_host: "proc.example.com:5500".to_string(),
            remote_task_id: "ANALYZE".to_string(),
            status_dir: dir,
            monitor_interval: 1,
            index_host: "index.example.com".to_string(),
            index_port: 9200,
            index_name: "proc-tasks".to_string(),
            query_timeout: 5,
            batch_prefix: "ingest".to_string(),
        })
        .unwrap()
    }

    fn row_with_batch(id: &str, proc_batch_id: i64) -> StatusRow {
        let mut row = StatusRow::new_item(id, format!("http://{}", id), 0, None, None);
        row.proc_batch_id = Some(proc_batch_id);
        row
    }

    #[test]
    fn test_batch_file_path_uses_batch_name() {
        let c = client();
        let path = c.batch_file_path(3);
        assert!(path.ends_with("ingest_3.json"));
    }

    #[test]
    fn test_to_documents_carries_creator_id() {
        let c = client();
        let docs = c.to_documents(2, &[row_with_batch("a", 2)]).unwrap();
        let doc = &docs.as_array().unwrap()[0];
        assert_eq!(doc.pointer("/target/id").unwrap(), "a");
        assert_eq!(doc.pointer("/target/url").unwrap(), "http://a");
        assert_eq!(doc.pointer("/creator/id").unwrap(), "ingest_2");
    }

    #[test]
    fn test_to_documents_requires_proc_batch_id() {
        let c = client();
        let row = StatusRow::new_item("a", "http://a", 0, None, None);
        assert!(c.to_documents(2, &[row]).is_err());
        assert!(c.to_documents(2, &[]).is_err());
    }

    #[test]
    fn test_tasks_query_filters_creator_and_key() {
        let query = tasks_of_batch_query("ingest_0", "ANALYZE", 200, 200);
        assert_eq!(query["from"], 200);
        assert_eq!(query["size"], 200);
        let creator = query
            .pointer("/query/bool/must/0/has_parent/query/bool/must/0/query_string/query")
            .unwrap();
        assert_eq!(creator, "\"ingest_0\"");
        let key = query.pointer("/query/bool/must/1/query_string/query").unwrap();
        assert_eq!(key, "ANALYZE");
    }

    #[test]
    fn test_results_query_requires_payload() {
        let query = results_of_batch_query("ingest_0", "ANALYZE", 0, 200);
        let exists = query.pointer("/query/bool/must/1/exists/field").unwrap();
        assert_eq!(exists, "result.payload");
    }

    #[test]
    fn test_task_from_hit() {
        let hit = json!({
            "_id": "task-1",
            "_source": {
                "task": { "msg": "queued", "state": 102, "key": "ANALYZE" },
                "role": { "parent": "doc-1" },
                "created_at": "x",
                "updated_at": "y"
            }
        });
        let task = task_from_hit(&hit).unwrap();
        assert_eq!(task.id, "task-1");
        assert_eq!(task.doc_id, "doc-1");
        assert!(task.is_queued());
        assert!(!task.succeeded());
    }

    #[test]
    fn test_task_from_hit_missing_field_errors() {
        let hit = json!({ "_id": "task-1", "_source": { "task": { "msg": "m" } } });
        assert!(task_from_hit(&hit).is_err());
    }

    #[test]
    fn test_result_from_hit() {
        let hit = json!({
            "_id": "result-1",
            "_source": {
                "result": { "generator": {"name": "analyzer"}, "payload": {"words": 3} },
                "role": { "parent": "task-1" }
            }
        });
        let result = result_from_hit(&hit).unwrap();
        assert_eq!(result.task_id, "task-1");
        assert_eq!(result.payload["words"], 3);
    }

    #[test]
    fn test_parse_register_reply_mixed() {
        let reply = json!({
            "success": [
                { "_id": "remote-a", "target": { "id": "a" } },
                { "document": { "_id": "remote-b", "target": { "id": "b" } } }
            ],
            "failed": [
                { "document_id": "c", "error": "[404] 'No document with id `c` found'" },
                { "document": { "target": { "id": "d" } } }
            ]
        });
        let (accepted, rejected) = parse_register_reply(&reply);
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].remote_id, "remote-a");
        assert_eq!(accepted[1].target_id, "b");
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].target_id.as_deref(), Some("c"));
        assert!(rejected[0].error.contains("404"));
        assert_eq!(rejected[1].target_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_parse_register_reply_empty_lists() {
        let (accepted, rejected) = parse_register_reply(&json!({}));
        assert!(accepted.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_extract_errors_from_reply() {
        let text = r#"{ "success": [], "failed": [
            { "document_id": "x", "error": "Task `ANALYZE` already assigned to document `x`" }
        ]}"#;
        let errors = extract_errors_from_reply(text);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("already assigned"));

        assert!(extract_errors_from_reply("not json").is_empty());
    }

    #[test]
    fn test_tasks_overview_groups_by_key_and_state() {
        let tasks = vec![
            RemoteTask {
                id: "1".into(),
                message: "".into(),
                state: 102,
                key: "ANALYZE".into(),
                doc_id: "d1".into(),
            },
            RemoteTask {
                id: "2".into(),
                message: "".into(),
                state: 102,
                key: "ANALYZE".into(),
                doc_id: "d2".into(),
            },
            RemoteTask {
                id: "3".into(),
                message: "".into(),
                state: 200,
                key: "FETCH".into(),
                doc_id: "d1".into(),
            },
        ];
        let overview = tasks_overview(&tasks);
        assert_eq!(overview["ANALYZE"][&102], 2);
        assert_eq!(overview["FETCH"][&200], 1);
    }

    #[test]
    fn test_state_code_round_trip() {
        for state in [
            RemoteTaskState::Queued,
            RemoteTaskState::Succeeded,
            RemoteTaskState::NotFound,
            RemoteTaskState::ProxyError,
        ] {
            assert_eq!(RemoteTaskState::from_code(state.code()), Some(state));
        }
        assert_eq!(RemoteTaskState::from_code(999), None);
    }
}
