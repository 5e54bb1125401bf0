// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Store Contract Tests
//!
//! The same law set executed against both store implementations: whatever
//! backend the ledger runs on, persistence is an identity-preserving upsert,
//! aggregates account for every row, and the completed-name partition is a
//! real partition.

mod common;

use std::sync::Arc;

use batchflow::infrastructure::repositories::{MemoryStatusStore, SqliteStatusStore};
use batchflow_domain::services::{update_rows, RowUpdate};
use batchflow_domain::{ErrorCode, ProcessingStatus, StatusStore};

use common::new_batch;

async fn store_under_test(sqlite: bool) -> Arc<dyn StatusStore> {
    if sqlite {
        Arc::new(SqliteStatusStore::in_memory().await.unwrap())
    } else {
        Arc::new(MemoryStatusStore::new())
    }
}

async fn check_persist_then_get_is_identity(store: Arc<dyn StatusStore>) {
    let mut rows = new_batch(0, ProcessingStatus::BatchRegistered, 4);
    for (n, row) in rows.iter_mut().enumerate() {
        row.proc_batch_id = Some(0);
        row.proc_id = Some(format!("remote-{}", n));
        row.proc_status_msg = Some("registered".to_string());
    }
    store.persist(&rows).await.unwrap();

    let mut read_back = store.rows_of_proc_batch(0).await.unwrap().unwrap();
    read_back.sort_by(|a, b| a.target_id.cmp(&b.target_id));
    rows.sort_by(|a, b| a.target_id.cmp(&b.target_id));

    assert_eq!(read_back.len(), rows.len());
    for (read, written) in read_back.iter().zip(rows.iter()) {
        assert_eq!(read.target_id, written.target_id);
        assert_eq!(read.target_url, written.target_url);
        assert_eq!(read.status, written.status);
        assert_eq!(read.source_batch_id, written.source_batch_id);
        assert_eq!(read.source_batch_name, written.source_batch_name);
        assert_eq!(read.source_extra_info, written.source_extra_info);
        assert_eq!(read.proc_batch_id, written.proc_batch_id);
        assert_eq!(read.proc_id, written.proc_id);
        assert_eq!(read.proc_status_msg, written.proc_status_msg);
        assert_eq!(read.proc_error_code, written.proc_error_code);
    }
}

async fn check_update_persist_changes_only_named_fields(store: Arc<dyn StatusStore>) {
    let mut rows = new_batch(0, ProcessingStatus::BatchRegistered, 2);
    for row in &mut rows {
        row.proc_batch_id = Some(0);
        row.proc_status_msg = Some("before".to_string());
    }
    store.persist(&rows).await.unwrap();

    let updated = update_rows(rows, RowUpdate::new().status(ProcessingStatus::Processing));
    store.persist(&updated).await.unwrap();

    let read_back = store.rows_of_proc_batch(0).await.unwrap().unwrap();
    for row in &read_back {
        assert_eq!(row.status, ProcessingStatus::Processing);
        // everything else is untouched
        assert_eq!(row.proc_status_msg.as_deref(), Some("before"));
        assert_eq!(row.proc_batch_id, Some(0));
        assert!(row.proc_error_code.is_none());
    }
}

async fn check_upsert_never_duplicates(store: Arc<dyn StatusStore>) {
    let rows = new_batch(0, ProcessingStatus::New, 3);
    store.persist(&rows).await.unwrap();
    store.persist(&rows).await.unwrap();

    let counts = store.status_counts().await.unwrap();
    assert_eq!(counts.values().sum::<u64>(), 3);
}

async fn check_counts_account_for_every_row(store: Arc<dyn StatusStore>) {
    let mut rows = new_batch(0, ProcessingStatus::New, 6);
    rows[0].status = ProcessingStatus::Finished;
    rows[1].status = ProcessingStatus::Error;
    rows[1].proc_error_code = Some(ErrorCode::ProcessingFailed);
    rows[2].status = ProcessingStatus::Error;
    rows[2].proc_error_code = Some(ErrorCode::ExportFailedSourceDocNotFound);
    store.persist(&rows).await.unwrap();

    let status_counts = store.status_counts().await.unwrap();
    assert_eq!(status_counts.values().sum::<u64>(), 6);

    let error_counts = store.error_code_counts().await.unwrap();
    assert_eq!(error_counts.values().sum::<u64>(), 6);
    assert_eq!(error_counts[&Some(ErrorCode::ProcessingFailed)], 1);
    assert_eq!(error_counts[&Some(ErrorCode::ExportFailedSourceDocNotFound)], 1);
    assert_eq!(error_counts[&None], 4);
}

async fn check_completed_names_partition(store: Arc<dyn StatusStore>) {
    let mut batch0 = new_batch(0, ProcessingStatus::Finished, 2);
    batch0[1].status = ProcessingStatus::Error;
    batch0[1].proc_error_code = Some(ErrorCode::Impossible);
    let batch1 = new_batch(1, ProcessingStatus::Processing, 2);
    store.persist(&batch0).await.unwrap();
    store.persist(&batch1).await.unwrap();

    let (completed, uncompleted) = store.completed_source_batch_names().await.unwrap();
    assert_eq!(completed, vec!["batch_0".to_string()]);
    assert_eq!(uncompleted, vec!["batch_1".to_string()]);

    // a partition: no name in both lists
    for name in &completed {
        assert!(!uncompleted.contains(name));
    }
}

macro_rules! contract_tests {
    ($($name:ident => $check:ident),+ $(,)?) => {
        mod sqlite {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    $check(store_under_test(true).await).await;
                }
            )+
        }
        mod memory {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    $check(store_under_test(false).await).await;
                }
            )+
        }
    };
}

contract_tests! {
    test_persist_then_get_is_identity => check_persist_then_get_is_identity,
    test_update_persist_changes_only_named_fields => check_update_persist_changes_only_named_fields,
    test_upsert_never_duplicates => check_upsert_never_duplicates,
    test_counts_account_for_every_row => check_counts_account_for_every_row,
    test_completed_names_partition => check_completed_names_partition,
}
