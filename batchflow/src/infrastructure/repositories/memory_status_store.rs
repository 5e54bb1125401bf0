// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Status Store
//!
//! Map-backed implementation of the `StatusStore` port. Nothing survives a
//! restart, so recovery always starts from scratch; apart from durability
//! the behavior matches the SQLite store, which makes this the store of
//! choice for tests and for example configurations that should not touch
//! the filesystem.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use batchflow_domain::repositories::{ErrorCodeCounts, ExtraInfoStatusCounts, StatusCounts};
use batchflow_domain::{StatusRow, StatusStore, TargetRef, WorkflowError};

/// Non-durable `StatusStore` backed by a hash map.
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: Mutex<HashMap<TargetRef, StatusRow>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<StatusRow> {
        self.rows.lock().values().cloned().collect()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn persist(&self, rows: &[StatusRow]) -> Result<(), WorkflowError> {
        let mut map = self.rows.lock();
        for row in rows {
            map.insert(row.target_ref(), row.clone());
        }
        Ok(())
    }

    async fn rows_of_proc_batch(&self, proc_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let mut rows: Vec<StatusRow> = self
            .snapshot()
            .into_iter()
            .filter(|row| row.proc_batch_id == Some(proc_batch_id))
            .collect();
        rows.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    async fn rows_of_source_batch(&self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let mut rows: Vec<StatusRow> = self
            .snapshot()
            .into_iter()
            .filter(|row| row.source_batch_id == source_batch_id)
            .collect();
        rows.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    async fn last_proc_batch_id(&self) -> Result<i64, WorkflowError> {
        Ok(self
            .snapshot()
            .iter()
            .filter_map(|row| row.proc_batch_id)
            .max()
            .unwrap_or(-1))
    }

    async fn last_source_batch_id(&self) -> Result<i64, WorkflowError> {
        Ok(self
            .snapshot()
            .iter()
            .map(|row| row.source_batch_id)
            .max()
            .unwrap_or(-1))
    }

    async fn status_counts(&self) -> Result<StatusCounts, WorkflowError> {
        let mut counts = StatusCounts::new();
        for row in self.snapshot() {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn error_code_counts(&self) -> Result<ErrorCodeCounts, WorkflowError> {
        let mut counts = ErrorCodeCounts::new();
        for row in self.snapshot() {
            *counts.entry(row.proc_error_code).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn status_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        let mut counts = StatusCounts::new();
        for row in self.snapshot() {
            if row.proc_batch_id == Some(proc_batch_id) {
                *counts.entry(row.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn error_code_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<ErrorCodeCounts, WorkflowError> {
        let mut counts = ErrorCodeCounts::new();
        for row in self.snapshot() {
            if row.proc_batch_id == Some(proc_batch_id) {
                *counts.entry(row.proc_error_code).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn status_counts_for_source_batch(&self, source_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        let mut counts = StatusCounts::new();
        for row in self.snapshot() {
            if row.source_batch_id == source_batch_id {
                *counts.entry(row.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn error_code_counts_for_source_batch(
        &self,
        source_batch_id: i64,
    ) -> Result<ErrorCodeCounts, WorkflowError> {
        let mut counts = ErrorCodeCounts::new();
        for row in self.snapshot() {
            if row.source_batch_id == source_batch_id {
                *counts.entry(row.proc_error_code).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn status_counts_per_extra_info(&self) -> Result<ExtraInfoStatusCounts, WorkflowError> {
        let mut counts = ExtraInfoStatusCounts::new();
        for row in self.snapshot() {
            *counts
                .entry(row.source_extra_info.clone())
                .or_default()
                .entry(row.status)
                .or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn completed_source_batch_names(&self) -> Result<(Vec<String>, Vec<String>), WorkflowError> {
        let mut running_by_name: HashMap<String, bool> = HashMap::new();
        for row in self.snapshot() {
            let Some(name) = row.source_batch_name.clone() else {
                continue;
            };
            let has_running = running_by_name.entry(name).or_insert(false);
            if !row.status.is_completed() {
                *has_running = true;
            }
        }

        let mut completed: Vec<String> = Vec::new();
        let mut uncompleted: Vec<String> = Vec::new();
        for (name, has_running) in running_by_name {
            if has_running {
                uncompleted.push(name);
            } else {
                completed.push(name);
            }
        }
        completed.sort();
        uncompleted.sort();
        Ok((completed, uncompleted))
    }

    async fn name_of_source_batch(&self, source_batch_id: i64) -> Result<Option<String>, WorkflowError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|row| row.source_batch_id == source_batch_id)
            .find_map(|row| row.source_batch_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchflow_domain::{ErrorCode, ProcessingStatus};

    fn row(id: &str, source_batch_id: i64) -> StatusRow {
        StatusRow::new_item(
            id,
            format!("http://{}", id),
            source_batch_id,
            Some(format!("batch_{}", source_batch_id)),
            None,
        )
    }

    #[tokio::test]
    async fn test_upsert_on_identity() {
        let store = MemoryStatusStore::new();
        let mut a = row("a", 0);
        store.persist(std::slice::from_ref(&a)).await.unwrap();
        a.status = ProcessingStatus::Finished;
        store.persist(std::slice::from_ref(&a)).await.unwrap();

        assert_eq!(store.len(), 1);
        let rows = store.rows_of_source_batch(0).await.unwrap().unwrap();
        assert_eq!(rows[0].status, ProcessingStatus::Finished);
    }

    #[tokio::test]
    async fn test_empty_store_answers() {
        let store = MemoryStatusStore::new();
        assert!(store.is_empty());
        assert_eq!(store.last_proc_batch_id().await.unwrap(), -1);
        assert_eq!(store.last_source_batch_id().await.unwrap(), -1);
        assert!(store.rows_of_proc_batch(0).await.unwrap().is_none());
        assert!(store.status_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts_match_sqlite_semantics() {
        let store = MemoryStatusStore::new();
        let mut rows: Vec<StatusRow> = (0..4).map(|i| row(&format!("r{}", i), 0)).collect();
        rows[0].status = ProcessingStatus::Error;
        rows[0].proc_error_code = Some(ErrorCode::ProcessingFailed);
        store.persist(&rows).await.unwrap();

        let status_counts = store.status_counts().await.unwrap();
        assert_eq!(status_counts[&ProcessingStatus::New], 3);
        assert_eq!(status_counts[&ProcessingStatus::Error], 1);

        let code_counts = store.error_code_counts().await.unwrap();
        assert_eq!(code_counts[&Some(ErrorCode::ProcessingFailed)], 1);
        assert_eq!(code_counts[&None], 3);
    }

    #[tokio::test]
    async fn test_completed_name_partition() {
        let store = MemoryStatusStore::new();
        let mut done = row("a", 0);
        done.status = ProcessingStatus::Finished;
        let open = row("b", 1);
        store.persist(&[done, open]).await.unwrap();

        let (completed, uncompleted) = store.completed_source_batch_names().await.unwrap();
        assert_eq!(completed, vec!["batch_0".to_string()]);
        assert_eq!(uncompleted, vec!["batch_1".to_string()]);
    }
}
