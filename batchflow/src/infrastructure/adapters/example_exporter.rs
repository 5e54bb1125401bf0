// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Example Exporter
//!
//! Export sink that reconciles nothing: it accepts every result, marks the
//! rows finished, and persists them. The last step of the example workflow
//! and the baseline for exporter behavior in tests.

use async_trait::async_trait;

use batchflow_domain::services::{update_rows, RowUpdate};
use batchflow_domain::{Exporter, ProcessingResult, ProcessingStatus, StatusLedger, WorkflowError};

/// Exporter that marks everything finished.
#[derive(Default)]
pub struct ExampleExporter;

impl ExampleExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Exporter for ExampleExporter {
    async fn export_results(
        &mut self,
        ledger: &mut StatusLedger,
        results: Vec<ProcessingResult>,
    ) -> Result<bool, WorkflowError> {
        if results.is_empty() {
            tracing::warn!("nothing to export");
            return Ok(false);
        }
        let rows = update_rows(
            results.into_iter().map(|r| r.status_row).collect(),
            RowUpdate::new().status(ProcessingStatus::Finished),
        );
        ledger.persist_or_die(&rows).await?;
        tracing::debug!(rows = rows.len(), "exported results");
        Ok(true)
    }
}
