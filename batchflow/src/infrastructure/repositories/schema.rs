// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Rows Schema
//!
//! DDL for the single table of the status ledger. The primary key is the
//! item identity `(target_id, target_url)`, which is what makes `persist` an
//! upsert. Enum-valued columns store the backing integers of
//! `ProcessingStatus` and `ErrorCode`; renumbering those enums would corrupt
//! existing ledgers.

use sqlx::SqlitePool;

use batchflow_domain::WorkflowError;

/// DDL for the `status_rows` table.
pub const STATUS_ROWS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS status_rows (
    target_id TEXT NOT NULL,
    target_url TEXT NOT NULL,
    status INTEGER NOT NULL,
    source_batch_id INTEGER NOT NULL,
    source_batch_name TEXT,
    source_extra_info TEXT,
    proc_batch_id INTEGER,
    proc_id TEXT,
    proc_status_msg TEXT,
    proc_error_code INTEGER,
    PRIMARY KEY (target_id, target_url)
);
"#;

/// Creates the `status_rows` table if it does not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), WorkflowError> {
    sqlx::query(STATUS_ROWS_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| WorkflowError::DatabaseError(format!("Failed to create status_rows table: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        // the table is usable after repeated creation
        sqlx::query("INSERT INTO status_rows (target_id, target_url, status, source_batch_id) VALUES (?, ?, ?, ?)")
            .bind("id")
            .bind("http://id")
            .bind(1_i64)
            .bind(0_i64)
            .execute(&pool)
            .await
            .unwrap();
    }
}
