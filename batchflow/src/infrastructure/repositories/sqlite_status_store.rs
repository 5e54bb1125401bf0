// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Status Store
//!
//! The reference backend of the status ledger: one embedded SQLite file
//! holding the `status_rows` table.
//!
//! ## Overview
//!
//! - **Upsert semantics**: `persist` issues `INSERT OR REPLACE` keyed on the
//!   `(target_id, target_url)` primary key, inside a single transaction per
//!   invocation: all rows of a call commit, or none do
//! - **Aggregates**: the counting queries are `GROUP BY` aggregations
//!   executed by SQLite; `NULL` groups are preserved and surface as `None`
//!   keys
//! - **Recovery queries**: `MAX(source_batch_id)` / `MAX(proc_batch_id)`
//!   with `-1` standing in for an empty ledger
//! - **Testing**: `in_memory()` backs the store with `:memory:` for fast,
//!   isolated tests
//!
//! All queries are parameterized; backend errors are mapped to
//! [`WorkflowError::DatabaseError`] at this boundary so upper layers never
//! see `sqlx` types.

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use batchflow_domain::repositories::{ErrorCodeCounts, ExtraInfoStatusCounts, StatusCounts};
use batchflow_domain::{ErrorCode, ProcessingStatus, StatusRow, StatusStore, WorkflowError};

use super::schema::ensure_schema;

/// SQLite-backed implementation of the `StatusStore` port.
pub struct SqliteStatusStore {
    pool: SqlitePool,
}

impl SqliteStatusStore {
    /// Wraps an existing pool and makes sure the schema exists.
    pub async fn new(pool: SqlitePool) -> Result<Self, WorkflowError> {
        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens (or creates) the database file at the given path.
    ///
    /// The parent directory must exist; creating directory trees is a
    /// bootstrap concern, not a storage concern.
    pub async fn from_file(db_file: &Path) -> Result<Self, WorkflowError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_file.display()))
            .map_err(|e| WorkflowError::InvalidConfiguration(format!("Invalid DB_FILE path: {}", e)))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to connect to database: {}", e)))?;
        Self::new(pool).await
    }

    /// Creates an in-memory database (useful for testing).
    pub async fn in_memory() -> Result<Self, WorkflowError> {
        let pool = SqlitePool::connect(":memory:")
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to create in-memory database: {}", e)))?;
        Self::new(pool).await
    }

    fn row_from_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<StatusRow, WorkflowError> {
        let status_value: i64 = row
            .try_get("status")
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read status column: {}", e)))?;
        let status = ProcessingStatus::try_from_i64(status_value)
            .ok_or_else(|| WorkflowError::SerializationError(format!("Unknown status value: {}", status_value)))?;

        let error_code_value: Option<i64> = row
            .try_get("proc_error_code")
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read proc_error_code column: {}", e)))?;
        let proc_error_code = match error_code_value {
            Some(value) => Some(ErrorCode::try_from_i64(value).ok_or_else(|| {
                WorkflowError::SerializationError(format!("Unknown error code value: {}", value))
            })?),
            None => None,
        };

        Ok(StatusRow {
            target_id: row
                .try_get("target_id")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read target_id column: {}", e)))?,
            target_url: row
                .try_get("target_url")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read target_url column: {}", e)))?,
            status,
            source_batch_id: row
                .try_get("source_batch_id")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read source_batch_id column: {}", e)))?,
            source_batch_name: row
                .try_get("source_batch_name")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read source_batch_name column: {}", e)))?,
            source_extra_info: row
                .try_get("source_extra_info")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read source_extra_info column: {}", e)))?,
            proc_batch_id: row
                .try_get("proc_batch_id")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read proc_batch_id column: {}", e)))?,
            proc_id: row
                .try_get("proc_id")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read proc_id column: {}", e)))?,
            proc_status_msg: row
                .try_get("proc_status_msg")
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read proc_status_msg column: {}", e)))?,
            proc_error_code,
        })
    }

    async fn select_rows(&self, query: &str, batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        let db_rows = sqlx::query(query)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to query status rows: {}", e)))?;

        if db_rows.is_empty() {
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(db_rows.len());
        for db_row in &db_rows {
            rows.push(Self::row_from_sqlite(db_row)?);
        }
        Ok(Some(rows))
    }

    async fn max_id(&self, query: &str) -> Result<i64, WorkflowError> {
        let max: Option<i64> = sqlx::query_scalar(query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to query max batch id: {}", e)))?;
        Ok(max.unwrap_or(-1))
    }

    async fn count_statuses(&self, query: &str, batch_id: Option<i64>) -> Result<StatusCounts, WorkflowError> {
        let mut q = sqlx::query(query);
        if let Some(id) = batch_id {
            q = q.bind(id);
        }
        let db_rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to count statuses: {}", e)))?;

        let mut counts = StatusCounts::new();
        for db_row in &db_rows {
            let status_value: i64 = db_row
                .try_get(0)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read status group: {}", e)))?;
            let count: i64 = db_row
                .try_get(1)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read status count: {}", e)))?;
            let status = ProcessingStatus::try_from_i64(status_value)
                .ok_or_else(|| WorkflowError::SerializationError(format!("Unknown status value: {}", status_value)))?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    async fn count_error_codes(&self, query: &str, batch_id: Option<i64>) -> Result<ErrorCodeCounts, WorkflowError> {
        let mut q = sqlx::query(query);
        if let Some(id) = batch_id {
            q = q.bind(id);
        }
        let db_rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to count error codes: {}", e)))?;

        let mut counts = ErrorCodeCounts::new();
        for db_row in &db_rows {
            let code_value: Option<i64> = db_row
                .try_get(0)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read error code group: {}", e)))?;
            let count: i64 = db_row
                .try_get(1)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read error code count: {}", e)))?;
            let code = match code_value {
                Some(value) => Some(ErrorCode::try_from_i64(value).ok_or_else(|| {
                    WorkflowError::SerializationError(format!("Unknown error code value: {}", value))
                })?),
                None => None,
            };
            counts.insert(code, count as u64);
        }
        Ok(counts)
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn persist(&self, rows: &[StatusRow]) -> Result<(), WorkflowError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        for row in rows {
            sqlx::query(
                "INSERT OR REPLACE INTO status_rows (
                    target_id, target_url, status, source_batch_id, source_batch_name,
                    source_extra_info, proc_batch_id, proc_id, proc_status_msg, proc_error_code
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.target_id)
            .bind(&row.target_url)
            .bind(row.status.as_i64())
            .bind(row.source_batch_id)
            .bind(&row.source_batch_name)
            .bind(&row.source_extra_info)
            .bind(row.proc_batch_id)
            .bind(&row.proc_id)
            .bind(&row.proc_status_msg)
            .bind(row.proc_error_code.map(|c| c.as_i64()))
            .execute(&mut *tx)
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to upsert status row: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| WorkflowError::DatabaseError(format!("Failed to commit status rows: {}", e)))?;
        Ok(())
    }

    async fn rows_of_proc_batch(&self, proc_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        self.select_rows("SELECT * FROM status_rows WHERE proc_batch_id = ?", proc_batch_id)
            .await
    }

    async fn rows_of_source_batch(&self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        self.select_rows("SELECT * FROM status_rows WHERE source_batch_id = ?", source_batch_id)
            .await
    }

    async fn last_proc_batch_id(&self) -> Result<i64, WorkflowError> {
        self.max_id("SELECT MAX(proc_batch_id) FROM status_rows").await
    }

    async fn last_source_batch_id(&self) -> Result<i64, WorkflowError> {
        self.max_id("SELECT MAX(source_batch_id) FROM status_rows").await
    }

    async fn status_counts(&self) -> Result<StatusCounts, WorkflowError> {
        self.count_statuses("SELECT status, COUNT(*) FROM status_rows GROUP BY status", None)
            .await
    }

    async fn error_code_counts(&self) -> Result<ErrorCodeCounts, WorkflowError> {
        self.count_error_codes(
            "SELECT proc_error_code, COUNT(*) FROM status_rows GROUP BY proc_error_code",
            None,
        )
        .await
    }

    async fn status_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        self.count_statuses(
            "SELECT status, COUNT(*) FROM status_rows WHERE proc_batch_id = ? GROUP BY status",
            Some(proc_batch_id),
        )
        .await
    }

    async fn error_code_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<ErrorCodeCounts, WorkflowError> {
        self.count_error_codes(
            "SELECT proc_error_code, COUNT(*) FROM status_rows WHERE proc_batch_id = ? GROUP BY proc_error_code",
            Some(proc_batch_id),
        )
        .await
    }

    async fn status_counts_for_source_batch(&self, source_batch_id: i64) -> Result<StatusCounts, WorkflowError> {
        self.count_statuses(
            "SELECT status, COUNT(*) FROM status_rows WHERE source_batch_id = ? GROUP BY status",
            Some(source_batch_id),
        )
        .await
    }

    async fn error_code_counts_for_source_batch(
        &self,
        source_batch_id: i64,
    ) -> Result<ErrorCodeCounts, WorkflowError> {
        self.count_error_codes(
            "SELECT proc_error_code, COUNT(*) FROM status_rows WHERE source_batch_id = ? GROUP BY proc_error_code",
            Some(source_batch_id),
        )
        .await
    }

    async fn status_counts_per_extra_info(&self) -> Result<ExtraInfoStatusCounts, WorkflowError> {
        let db_rows = sqlx::query(
            "SELECT source_extra_info, status, COUNT(*) FROM status_rows GROUP BY source_extra_info, status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WorkflowError::DatabaseError(format!("Failed to count statuses per extra info: {}", e)))?;

        let mut counts = ExtraInfoStatusCounts::new();
        for db_row in &db_rows {
            let extra_info: Option<String> = db_row
                .try_get(0)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read extra info group: {}", e)))?;
            let status_value: i64 = db_row
                .try_get(1)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read status group: {}", e)))?;
            let count: i64 = db_row
                .try_get(2)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read status count: {}", e)))?;
            let status = ProcessingStatus::try_from_i64(status_value)
                .ok_or_else(|| WorkflowError::SerializationError(format!("Unknown status value: {}", status_value)))?;
            counts.entry(extra_info).or_default().insert(status, count as u64);
        }
        Ok(counts)
    }

    async fn completed_source_batch_names(&self) -> Result<(Vec<String>, Vec<String>), WorkflowError> {
        // a batch name is completed when none of its rows carries a running
        // status (everything is ERROR or FINISHED)
        let db_rows = sqlx::query(
            "SELECT source_batch_name,
                    SUM(CASE WHEN status NOT IN (?, ?) THEN 1 ELSE 0 END) AS running
             FROM status_rows
             WHERE source_batch_name IS NOT NULL
             GROUP BY source_batch_name
             ORDER BY source_batch_name",
        )
        .bind(ProcessingStatus::Error.as_i64())
        .bind(ProcessingStatus::Finished.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WorkflowError::DatabaseError(format!("Failed to partition source batch names: {}", e)))?;

        let mut completed = Vec::new();
        let mut uncompleted = Vec::new();
        for db_row in &db_rows {
            let name: String = db_row
                .try_get(0)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read batch name: {}", e)))?;
            let running: i64 = db_row
                .try_get(1)
                .map_err(|e| WorkflowError::DatabaseError(format!("Failed to read running count: {}", e)))?;
            if running == 0 {
                completed.push(name);
            } else {
                uncompleted.push(name);
            }
        }
        Ok((completed, uncompleted))
    }

    async fn name_of_source_batch(&self, source_batch_id: i64) -> Result<Option<String>, WorkflowError> {
        let name: Option<String> = sqlx::query_scalar(
            "SELECT source_batch_name FROM status_rows
             WHERE source_batch_id = ? AND source_batch_name IS NOT NULL
             LIMIT 1",
        )
        .bind(source_batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WorkflowError::DatabaseError(format!("Failed to query source batch name: {}", e)))?
        .flatten();
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, source_batch_id: i64) -> StatusRow {
        StatusRow::new_item(
            id,
            format!("http://{}", id),
            source_batch_id,
            Some(format!("batch_{}", source_batch_id)),
            Some("unit_test".to_string()),
        )
    }

    #[tokio::test]
    async fn test_persist_then_read_back_is_identity() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut a = row("a", 0);
        a.status = ProcessingStatus::BatchRegistered;
        a.proc_batch_id = Some(0);
        a.proc_id = Some("remote-a".to_string());
        a.proc_status_msg = Some("registered".to_string());

        store.persist(std::slice::from_ref(&a)).await.unwrap();

        let rows = store.rows_of_proc_batch(0).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        let read = &rows[0];
        assert_eq!(read, &a);
        assert_eq!(read.status, ProcessingStatus::BatchRegistered);
        assert_eq!(read.proc_id.as_deref(), Some("remote-a"));
        assert_eq!(read.proc_status_msg.as_deref(), Some("registered"));
        assert_eq!(read.source_batch_name.as_deref(), Some("batch_0"));
    }

    #[tokio::test]
    async fn test_persist_upserts_on_identity() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut a = row("a", 0);
        store.persist(std::slice::from_ref(&a)).await.unwrap();

        a.status = ProcessingStatus::Finished;
        a.proc_batch_id = Some(2);
        store.persist(std::slice::from_ref(&a)).await.unwrap();

        let rows = store.rows_of_source_batch(0).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ProcessingStatus::Finished);
        assert_eq!(rows[0].proc_batch_id, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_batches_return_none() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        assert!(store.rows_of_proc_batch(0).await.unwrap().is_none());
        assert!(store.rows_of_source_batch(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_batch_ids_on_empty_store() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        assert_eq!(store.last_proc_batch_id().await.unwrap(), -1);
        assert_eq!(store.last_source_batch_id().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_last_batch_ids_track_maximum() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut a = row("a", 0);
        a.proc_batch_id = Some(1);
        let mut b = row("b", 3);
        b.proc_batch_id = Some(0);
        store.persist(&[a, b]).await.unwrap();

        assert_eq!(store.last_proc_batch_id().await.unwrap(), 1);
        assert_eq!(store.last_source_batch_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_status_counts_sum_to_total() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut rows: Vec<StatusRow> = (0..5).map(|i| row(&format!("r{}", i), 0)).collect();
        rows[3].status = ProcessingStatus::Finished;
        rows[4].status = ProcessingStatus::Error;
        rows[4].proc_error_code = Some(ErrorCode::ProcessingFailed);
        store.persist(&rows).await.unwrap();

        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts[&ProcessingStatus::New], 3);
        assert_eq!(counts[&ProcessingStatus::Finished], 1);
        assert_eq!(counts[&ProcessingStatus::Error], 1);
        assert_eq!(counts.values().sum::<u64>(), 5);
    }

    #[tokio::test]
    async fn test_error_code_counts_group_null_separately() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut rows: Vec<StatusRow> = (0..3).map(|i| row(&format!("r{}", i), 0)).collect();
        rows[0].status = ProcessingStatus::Error;
        rows[0].proc_error_code = Some(ErrorCode::BatchRegisterFailed);
        store.persist(&rows).await.unwrap();

        let counts = store.error_code_counts().await.unwrap();
        assert_eq!(counts[&Some(ErrorCode::BatchRegisterFailed)], 1);
        assert_eq!(counts[&None], 2);
    }

    #[tokio::test]
    async fn test_counts_restricted_to_batch() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut a = row("a", 0);
        a.proc_batch_id = Some(0);
        a.status = ProcessingStatus::Finished;
        let mut b = row("b", 1);
        b.proc_batch_id = Some(1);
        store.persist(&[a, b]).await.unwrap();

        let proc0 = store.status_counts_for_proc_batch(0).await.unwrap();
        assert_eq!(proc0.len(), 1);
        assert_eq!(proc0[&ProcessingStatus::Finished], 1);

        let source1 = store.status_counts_for_source_batch(1).await.unwrap();
        assert_eq!(source1.len(), 1);
        assert_eq!(source1[&ProcessingStatus::New], 1);
    }

    #[tokio::test]
    async fn test_status_counts_per_extra_info() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut rows: Vec<StatusRow> = (0..4).map(|i| row(&format!("r{}", i), 0)).collect();
        rows[2].source_extra_info = Some("other".to_string());
        rows[3].source_extra_info = None;
        store.persist(&rows).await.unwrap();

        let counts = store.status_counts_per_extra_info().await.unwrap();
        assert_eq!(counts[&Some("unit_test".to_string())][&ProcessingStatus::New], 2);
        assert_eq!(counts[&Some("other".to_string())][&ProcessingStatus::New], 1);
        assert_eq!(counts[&None][&ProcessingStatus::New], 1);
    }

    #[tokio::test]
    async fn test_completed_source_batch_names_partition() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut done_a = row("a", 0);
        done_a.status = ProcessingStatus::Finished;
        let mut done_b = row("b", 0);
        done_b.status = ProcessingStatus::Error;
        done_b.proc_error_code = Some(ErrorCode::Impossible);
        let open_c = row("c", 1); // still NEW
        store.persist(&[done_a, done_b, open_c]).await.unwrap();

        let (completed, uncompleted) = store.completed_source_batch_names().await.unwrap();
        assert_eq!(completed, vec!["batch_0".to_string()]);
        assert_eq!(uncompleted, vec!["batch_1".to_string()]);
    }

    #[tokio::test]
    async fn test_name_of_source_batch() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        store.persist(&[row("a", 2)]).await.unwrap();

        assert_eq!(store.name_of_source_batch(2).await.unwrap().as_deref(), Some("batch_2"));
        assert!(store.name_of_source_batch(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_file = dir.path().join("status.db");

        {
            let store = SqliteStatusStore::from_file(&db_file).await.unwrap();
            store.persist(&[row("a", 0)]).await.unwrap();
        }

        // a fresh store over the same file sees the previous run's rows
        let store = SqliteStatusStore::from_file(&db_file).await.unwrap();
        let rows = store.rows_of_source_batch(0).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target_id, "a");
    }
}
