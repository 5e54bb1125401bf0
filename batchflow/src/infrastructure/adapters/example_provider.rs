// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Example Data Provider
//!
//! Synthetic source adapter producing a configurable number of source
//! batches with sequentially numbered items. Item ids run on across batches
//! (batch 1 of size 100 starts at item 100), so a multi-batch run never
//! produces colliding identities.

use async_trait::async_trait;

use batchflow_domain::{DataProvider, StatusRow, WorkflowError};

use crate::infrastructure::config::ExampleProviderConfig;

/// Source adapter yielding generated items.
pub struct ExampleDataProvider {
    nr_source_batches: i64,
    source_batch_size: usize,
}

impl ExampleDataProvider {
    pub fn new(config: &ExampleProviderConfig) -> Self {
        Self {
            nr_source_batches: config.nr_source_batches,
            source_batch_size: config.source_batch_size,
        }
    }
}

#[async_trait]
impl DataProvider for ExampleDataProvider {
    async fn fetch_source_batch_data(&mut self, source_batch_id: i64) -> Result<Option<Vec<StatusRow>>, WorkflowError> {
        if source_batch_id < 0 || source_batch_id >= self.nr_source_batches {
            tracing::debug!(source_batch_id, "no such source batch, source exhausted");
            return Ok(None);
        }

        let offset = source_batch_id * self.source_batch_size as i64;
        let rows: Vec<StatusRow> = (offset..offset + self.source_batch_size as i64)
            .map(|n| {
                StatusRow::new_item(
                    n.to_string(),
                    format!("http://example.com/{}", n),
                    source_batch_id,
                    Some(format!("batch_{}", source_batch_id)),
                    Some("example".to_string()),
                )
            })
            .collect();
        tracing::debug!(source_batch_id, rows = rows.len(), "materialized source batch");
        Ok(Some(rows))
    }
}
