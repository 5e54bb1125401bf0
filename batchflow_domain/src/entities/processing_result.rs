// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Result Envelope
//!
//! Transient types exchanged between a processing environment and an
//! exporter. Neither type is persisted; the durable record of an item is its
//! [`StatusRow`](super::StatusRow) in the status ledger.

use serde::{Deserialize, Serialize};

use super::StatusRow;

/// Response of the remote processing service to a batch-wide request,
/// e.g. "start processing batch N".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcEnvResponse {
    /// Whether the service accepted the request
    pub success: bool,
    /// Transport-level status code returned by the service
    pub status_code: u16,
    /// Human-readable diagnostic from the service
    pub message: String,
}

impl ProcEnvResponse {
    pub fn new(success: bool, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success,
            status_code,
            message: message.into(),
        }
    }
}

/// One item's processing output, joined to its status row.
///
/// Handed from the processing driver to the exporter, which reconciles the
/// payload with the source catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// The item the payload belongs to
    pub status_row: StatusRow,
    /// Result data produced by the processing environment
    pub payload: serde_json::Value,
    /// Metadata about the software that generated the payload
    pub generator: serde_json::Value,
}

impl ProcessingResult {
    pub fn new(status_row: StatusRow, payload: serde_json::Value, generator: serde_json::Value) -> Self {
        Self {
            status_row,
            payload,
            generator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proc_env_response() {
        let resp = ProcEnvResponse::new(true, 200, "all fine");
        assert!(resp.success);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.message, "all fine");
    }

    #[test]
    fn test_processing_result_carries_row_and_payload() {
        let row = StatusRow::new_item("id-1", "http://example.com/1", 0, None, None);
        let result = ProcessingResult::new(row.clone(), json!({"words": 42}), json!({"name": "analyzer"}));

        assert_eq!(result.status_row, row);
        assert_eq!(result.payload["words"], 42);
        assert_eq!(result.generator["name"], "analyzer");
    }
}
