// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exporter Contract
//!
//! An exporter reconciles processing results with the source catalog. It is
//! the last pipeline step and owns the final state transition: rows it
//! exported successfully become [`Finished`](crate::entities::ProcessingStatus::Finished),
//! rows it could not export carry one of the `EXPORT_FAILED_*` error codes.

use async_trait::async_trait;

use crate::entities::ProcessingResult;
use crate::error::WorkflowError;

use super::status_ledger::StatusLedger;

/// Contract for export sinks.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Exports the given results back to the source catalog.
    ///
    /// Implementations transition the affected rows (to `Finished`, or to
    /// `Error` with an `EXPORT_FAILED_*` code) and persist them through the
    /// ledger before returning. The boolean reports whether the export as a
    /// whole succeeded.
    async fn export_results(
        &mut self,
        ledger: &mut StatusLedger,
        results: Vec<ProcessingResult>,
    ) -> Result<bool, WorkflowError>;
}
