// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Row Entity
//!
//! This module defines the unit of work of the batchflow pipeline and its
//! state machine.
//!
//! ## Overview
//!
//! Every item obtained from a source catalog is represented as a
//! [`StatusRow`]: the target identifier and locator, the current
//! [`ProcessingStatus`], the source/processing batch memberships, and the
//! last diagnostics reported by the processing environment.
//!
//! ## State Machine
//!
//! ```text
//! New ──> BatchAssigned ──> BatchRegistered ──> Processing ──> Processed
//!                                                                  │
//!                            Finished <── Exported <───────────────┘
//!
//! any state ──> Error (with an ErrorCode)
//! ```
//!
//! Forward transitions follow the arrows; the only backwards-looking
//! transition permitted anywhere is `* -> Error`. `Finished` and `Error` are
//! terminal. The integer values backing the enum give the total order the
//! recovery protocol relies on: a resumed processing batch skips the pipeline
//! steps its highest non-error status proves were already completed.
//!
//! ## Identity
//!
//! Rows are keyed by `(target_id, target_url)`. Two rows with the same key
//! are the same item regardless of their state; the durable store upserts on
//! that key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::value_objects::TargetRef;

/// Pipeline state of a single work item.
///
/// The backing integer values are persisted in the status store and define
/// the total order used for recovery step-skipping; they must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum ProcessingStatus {
    /// Nothing has been done to the item yet
    New = 1,
    /// The task scheduler assigned a processing batch id
    BatchAssigned = 2,
    /// The item was registered in the processing environment
    BatchRegistered = 3,
    /// The item is currently processing in the processing environment
    Processing = 4,
    /// The item was successfully processed by the processing environment
    Processed = 5,
    /// Processing output was reconciled with the source catalog
    Exported = 6,
    /// The item failed to process properly (an [`ErrorCode`] is assigned)
    Error = 7,
    /// The item completed the whole pipeline
    Finished = 8,
}

impl ProcessingStatus {
    /// Statuses indicating the item is still travelling through the pipeline.
    pub fn running_statuses() -> &'static [ProcessingStatus] {
        &[
            ProcessingStatus::New,
            ProcessingStatus::BatchAssigned,
            ProcessingStatus::BatchRegistered,
            ProcessingStatus::Processing,
            ProcessingStatus::Processed,
            ProcessingStatus::Exported,
        ]
    }

    /// Statuses indicating the item will not move again.
    pub fn completed_statuses() -> &'static [ProcessingStatus] {
        &[ProcessingStatus::Error, ProcessingStatus::Finished]
    }

    /// Whether this status is terminal.
    pub fn is_completed(self) -> bool {
        matches!(self, ProcessingStatus::Error | ProcessingStatus::Finished)
    }

    /// The persisted integer value.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Reconstructs a status from its persisted integer value.
    pub fn try_from_i64(value: i64) -> Option<ProcessingStatus> {
        match value {
            1 => Some(ProcessingStatus::New),
            2 => Some(ProcessingStatus::BatchAssigned),
            3 => Some(ProcessingStatus::BatchRegistered),
            4 => Some(ProcessingStatus::Processing),
            5 => Some(ProcessingStatus::Processed),
            6 => Some(ProcessingStatus::Exported),
            7 => Some(ProcessingStatus::Error),
            8 => Some(ProcessingStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStatus::New => "NEW",
            ProcessingStatus::BatchAssigned => "BATCH_ASSIGNED",
            ProcessingStatus::BatchRegistered => "BATCH_REGISTERED",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Processed => "PROCESSED",
            ProcessingStatus::Exported => "EXPORTED",
            ProcessingStatus::Error => "ERROR",
            ProcessingStatus::Finished => "FINISHED",
        };
        write!(f, "{}", name)
    }
}

/// Failure taxonomy recorded when a row reaches [`ProcessingStatus::Error`].
///
/// Batch-level codes (`BatchAssignFailed`, `BatchRegisterFailed`,
/// `BatchProcessingNotStarted`) are applied to every row of the affected
/// processing batch; the remaining codes are item-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum ErrorCode {
    /// Could not assign a processing batch id (should hardly ever happen)
    BatchAssignFailed = 1,
    /// The processing environment failed to register the batch
    BatchRegisterFailed = 2,
    /// The processing environment failed to start processing the batch
    BatchProcessingNotStarted = 3,
    /// The processing environment could not process this item
    ProcessingFailed = 4,
    /// The document at the source does not exist (anymore)
    ExportFailedSourceDocNotFound = 5,
    /// Could not connect to the source catalog to export results
    ExportFailedSourceDbConnectionFailure = 6,
    /// The processing output is not suitable for export
    ExportFailedProcEnvOutputUnsuitable = 7,
    /// This item is impossible to process
    Impossible = 8,
}

impl ErrorCode {
    /// The persisted integer value.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Reconstructs an error code from its persisted integer value.
    pub fn try_from_i64(value: i64) -> Option<ErrorCode> {
        match value {
            1 => Some(ErrorCode::BatchAssignFailed),
            2 => Some(ErrorCode::BatchRegisterFailed),
            3 => Some(ErrorCode::BatchProcessingNotStarted),
            4 => Some(ErrorCode::ProcessingFailed),
            5 => Some(ErrorCode::ExportFailedSourceDocNotFound),
            6 => Some(ErrorCode::ExportFailedSourceDbConnectionFailure),
            7 => Some(ErrorCode::ExportFailedProcEnvOutputUnsuitable),
            8 => Some(ErrorCode::Impossible),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::BatchAssignFailed => "BATCH_ASSIGN_FAILED",
            ErrorCode::BatchRegisterFailed => "BATCH_REGISTER_FAILED",
            ErrorCode::BatchProcessingNotStarted => "BATCH_PROCESSING_NOT_STARTED",
            ErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            ErrorCode::ExportFailedSourceDocNotFound => "EXPORT_FAILED_SOURCE_DOC_NOT_FOUND",
            ErrorCode::ExportFailedSourceDbConnectionFailure => "EXPORT_FAILED_SOURCE_DB_CONNECTION_FAILURE",
            ErrorCode::ExportFailedProcEnvOutputUnsuitable => "EXPORT_FAILED_PROC_ENV_OUTPUT_UNSUITABLE",
            ErrorCode::Impossible => "IMPOSSIBLE",
        };
        write!(f, "{}", name)
    }
}

/// The unit of work flowing through the pipeline; one row in the status
/// ledger.
///
/// Identity is `(target_id, target_url)`; equality and hashing ignore all
/// other fields so that rows can be deduplicated and joined by identity
/// across state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRow {
    /// External identifier used to reconcile results with the source catalog
    pub target_id: String,
    /// Locator the processing environment uses to fetch the content
    pub target_url: String,
    /// Current pipeline state
    pub status: ProcessingStatus,
    /// Source batch that produced this item (monotonically incremented)
    pub source_batch_id: i64,
    /// Semantic label of the source batch
    pub source_batch_name: Option<String>,
    /// Free-form tag source adapters may use for grouping and reporting
    pub source_extra_info: Option<String>,
    /// Processing batch this item was assigned to; `None` until assigned
    pub proc_batch_id: Option<i64>,
    /// Identifier assigned by the processing environment on registration
    pub proc_id: Option<String>,
    /// Last human-readable status message from the processing environment
    pub proc_status_msg: Option<String>,
    /// Failure detail, set when `status` is [`ProcessingStatus::Error`]
    pub proc_error_code: Option<ErrorCode>,
}

impl StatusRow {
    /// Creates a fresh row for an item just produced by a source adapter.
    pub fn new_item(
        target_id: impl Into<String>,
        target_url: impl Into<String>,
        source_batch_id: i64,
        source_batch_name: Option<String>,
        source_extra_info: Option<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            target_url: target_url.into(),
            status: ProcessingStatus::New,
            source_batch_id,
            source_batch_name,
            source_extra_info,
            proc_batch_id: None,
            proc_id: None,
            proc_status_msg: None,
            proc_error_code: None,
        }
    }

    /// The identity key of this row.
    pub fn target_ref(&self) -> TargetRef {
        TargetRef::new(self.target_id.clone(), self.target_url.clone())
    }
}

impl PartialEq for StatusRow {
    fn eq(&self, other: &Self) -> bool {
        self.target_id == other.target_id && self.target_url == other.target_url
    }
}

impl Eq for StatusRow {}

impl Hash for StatusRow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target_id.hash(state);
        self.target_url.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_status_values_define_total_order() {
        assert_eq!(ProcessingStatus::New.as_i64(), 1);
        assert_eq!(ProcessingStatus::BatchAssigned.as_i64(), 2);
        assert_eq!(ProcessingStatus::BatchRegistered.as_i64(), 3);
        assert_eq!(ProcessingStatus::Processing.as_i64(), 4);
        assert_eq!(ProcessingStatus::Processed.as_i64(), 5);
        assert_eq!(ProcessingStatus::Exported.as_i64(), 6);
        assert_eq!(ProcessingStatus::Error.as_i64(), 7);
        assert_eq!(ProcessingStatus::Finished.as_i64(), 8);
        assert!(ProcessingStatus::New < ProcessingStatus::Finished);
    }

    #[test]
    fn test_status_roundtrip_from_i64() {
        for value in 1..=8 {
            let status = ProcessingStatus::try_from_i64(value).unwrap();
            assert_eq!(status.as_i64(), value);
        }
        assert!(ProcessingStatus::try_from_i64(0).is_none());
        assert!(ProcessingStatus::try_from_i64(9).is_none());
    }

    #[test]
    fn test_running_and_completed_partition_all_statuses() {
        let running: HashSet<i64> = ProcessingStatus::running_statuses().iter().map(|s| s.as_i64()).collect();
        let completed: HashSet<i64> = ProcessingStatus::completed_statuses()
            .iter()
            .map(|s| s.as_i64())
            .collect();

        assert!(running.is_disjoint(&completed));
        let union: HashSet<i64> = running.union(&completed).copied().collect();
        assert_eq!(union, (1..=8).collect::<HashSet<i64>>());
    }

    #[test]
    fn test_is_completed() {
        assert!(ProcessingStatus::Error.is_completed());
        assert!(ProcessingStatus::Finished.is_completed());
        assert!(!ProcessingStatus::Exported.is_completed());
        assert!(!ProcessingStatus::New.is_completed());
    }

    #[test]
    fn test_error_code_roundtrip_from_i64() {
        for value in 1..=8 {
            let code = ErrorCode::try_from_i64(value).unwrap();
            assert_eq!(code.as_i64(), value);
        }
        assert!(ErrorCode::try_from_i64(99).is_none());
    }

    #[test]
    fn test_row_identity_ignores_state() {
        let mut a = StatusRow::new_item("id-1", "http://example.com/1", 0, None, None);
        let b = StatusRow::new_item("id-1", "http://example.com/1", 3, Some("later".into()), None);
        a.status = ProcessingStatus::Finished;

        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_row_identity_includes_url() {
        let a = StatusRow::new_item("id-1", "http://example.com/1", 0, None, None);
        let b = StatusRow::new_item("id-1", "http://example.com/other", 0, None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_item_defaults() {
        let row = StatusRow::new_item("id-1", "http://example.com/1", 4, Some("b4".into()), Some("tag".into()));
        assert_eq!(row.status, ProcessingStatus::New);
        assert_eq!(row.source_batch_id, 4);
        assert_eq!(row.source_batch_name.as_deref(), Some("b4"));
        assert_eq!(row.source_extra_info.as_deref(), Some("tag"));
        assert!(row.proc_batch_id.is_none());
        assert!(row.proc_id.is_none());
        assert!(row.proc_status_msg.is_none());
        assert!(row.proc_error_code.is_none());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ProcessingStatus::BatchRegistered.to_string(), "BATCH_REGISTERED");
        assert_eq!(ErrorCode::ProcessingFailed.to_string(), "PROCESSING_FAILED");
    }
}
