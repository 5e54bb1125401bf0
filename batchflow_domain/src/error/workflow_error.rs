// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error type shared by every layer of the
//! batchflow system.
//!
//! ## Error Architecture
//!
//! Failures fall into a small number of categories:
//!
//! - **Configuration**: malformed or missing settings; always fatal at
//!   startup
//! - **Database**: the status ledger could not be read or written; fatal
//!   mid-run because data integrity can no longer be guaranteed
//! - **Remote service**: the processing environment or its search index
//!   misbehaved; transient cases are retried by the monitor loop, terminal
//!   cases surface as per-item or per-batch error codes
//! - **Serialization / I/O**: payload and artifact handling
//! - **Cancellation**: the process received a shutdown signal and stopped at
//!   a suspension-point boundary
//!
//! ## Error Handling Patterns
//!
//! Errors are created with a contextual message and propagated with `?`.
//! Infrastructure code maps backend errors (`sqlx`, `reqwest`, `std::io`)
//! into these variants at the boundary so that the application layer never
//! sees technology-specific error types.

use thiserror::Error;

/// Domain-specific errors for the batchflow orchestration system.
///
/// Variants carry a human-readable message; the variant itself is the
/// machine-readable category. Errors are `Clone` so they can be recorded in
/// reports and logs without giving up the original.
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Remote service error: {0}")]
    RemoteServiceError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WorkflowError {
    /// Whether retrying the failed operation can reasonably succeed.
    ///
    /// Only remote-service and I/O failures are considered transient; a
    /// database failure means the ledger can no longer be trusted and a
    /// configuration failure will not fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, WorkflowError::RemoteServiceError(_) | WorkflowError::IoError(_))
    }

    /// Whether this error must terminate the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidConfiguration(_) | WorkflowError::DatabaseError(_) | WorkflowError::Cancelled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = WorkflowError::DatabaseError("commit failed".to_string());
        assert_eq!(err.to_string(), "Database error: commit failed");
    }

    #[test]
    fn test_transient_classification() {
        assert!(WorkflowError::RemoteServiceError("503".into()).is_transient());
        assert!(WorkflowError::IoError("timeout".into()).is_transient());
        assert!(!WorkflowError::DatabaseError("disk".into()).is_transient());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(WorkflowError::InvalidConfiguration("bad key".into()).is_fatal());
        assert!(WorkflowError::DatabaseError("disk".into()).is_fatal());
        assert!(WorkflowError::Cancelled("signal".into()).is_fatal());
        assert!(!WorkflowError::RemoteServiceError("503".into()).is_fatal());
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = WorkflowError::MissingData("no rows".into());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
