// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Store Interface
//!
//! This module defines the repository port for durable status-row storage,
//! providing an abstraction layer between the domain and infrastructure
//! layers.
//!
//! ## Overview
//!
//! The `StatusStore` trait is the contract every durable backend of the
//! status ledger fulfills. The abstraction enables:
//!
//! - **Separation of Concerns**: recovery and reporting logic independent of
//!   storage technology
//! - **Testability**: in-memory implementations for unit and integration
//!   tests
//! - **Flexibility**: the reference backend is an embedded SQLite file, but
//!   nothing in the domain depends on SQL
//!
//! ## Contract
//!
//! ### Persistence
//! `persist` upserts on the `(target_id, target_url)` identity and must be
//! atomic per invocation: either every row of the call commits or none does.
//! A persistence error means the ledger can no longer be trusted; callers in
//! the pipeline path treat it as fatal.
//!
//! ### Aggregate queries
//! The counting queries group rows by the named field and count the rows of
//! each group. Rows with a `NULL` field form their own group (keyed `None`).
//!
//! ### Batch queries
//! Row lookups by batch id return `None` when no row matches, never an empty
//! vector, so callers can distinguish "unknown batch" without inspecting
//! lengths. The `last_*_batch_id` queries return `-1` on an empty store,
//! which doubles as the "nothing to recover" signal during startup.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::entities::{ErrorCode, ProcessingStatus, StatusRow};
use crate::error::WorkflowError;

/// Row counts per pipeline status.
pub type StatusCounts = BTreeMap<ProcessingStatus, u64>;

/// Row counts per error code; rows without an error code count under `None`.
pub type ErrorCodeCounts = BTreeMap<Option<ErrorCode>, u64>;

/// Status counts per `source_extra_info` value; untagged rows group under
/// `None`.
pub type ExtraInfoStatusCounts = BTreeMap<Option<String>, StatusCounts>;

/// Durable storage contract for status rows.
///
/// Implementations must key rows on `(target_id, target_url)` and keep
/// `persist` atomic per invocation.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Upserts the given rows in a single atomic write.
    async fn persist(&self, rows: &[StatusRow]) -> Result<(), WorkflowError>;

    /// All rows assigned to the given processing batch, or `None` when the
    /// batch is unknown.
    async fn rows_of_proc_batch(&self, proc_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError>;

    /// All rows produced by the given source batch, or `None` when the batch
    /// is unknown.
    async fn rows_of_source_batch(&self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError>;

    /// Highest processing batch id in the store; `-1` when no row has one.
    async fn last_proc_batch_id(&self) -> Result<i64, WorkflowError>;

    /// Highest source batch id in the store; `-1` when the store is empty.
    async fn last_source_batch_id(&self) -> Result<i64, WorkflowError>;

    /// Row counts grouped by status, over the whole store.
    async fn status_counts(&self) -> Result<StatusCounts, WorkflowError>;

    /// Row counts grouped by error code, over the whole store.
    async fn error_code_counts(&self) -> Result<ErrorCodeCounts, WorkflowError>;

    /// Row counts grouped by status, restricted to one processing batch.
    async fn status_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<StatusCounts, WorkflowError>;

    /// Row counts grouped by error code, restricted to one processing batch.
    async fn error_code_counts_for_proc_batch(&self, proc_batch_id: i64) -> Result<ErrorCodeCounts, WorkflowError>;

    /// Row counts grouped by status, restricted to one source batch.
    async fn status_counts_for_source_batch(&self, source_batch_id: i64) -> Result<StatusCounts, WorkflowError>;

    /// Row counts grouped by error code, restricted to one source batch.
    async fn error_code_counts_for_source_batch(&self, source_batch_id: i64)
        -> Result<ErrorCodeCounts, WorkflowError>;

    /// Status counts per `source_extra_info` value.
    async fn status_counts_per_extra_info(&self) -> Result<ExtraInfoStatusCounts, WorkflowError>;

    /// Partitions the distinct `source_batch_name` values into
    /// `(completed, uncompleted)`: a name is completed when every one of its
    /// rows carries a terminal status.
    async fn completed_source_batch_names(&self) -> Result<(Vec<String>, Vec<String>), WorkflowError>;

    /// The semantic name of a source batch, if any of its rows carries one.
    async fn name_of_source_batch(&self, source_batch_id: i64) -> Result<Option<String>, WorkflowError>;
}
