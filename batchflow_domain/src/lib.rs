// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batchflow Domain Layer
//!
//! Pure business logic for the batchflow orchestrator: the work-item state
//! machine, the status-ledger service, and the contracts implemented by the
//! concrete collaborators (source adapters, processing environments, and
//! exporters).
//!
//! ## Overview
//!
//! Batchflow drives items obtained from a source catalog through an external
//! data-processing service and reconciles the results back to the source.
//! This crate holds everything the orchestration core needs to reason about
//! that flow without committing to any storage, transport, or catalog
//! technology:
//!
//! - **Entities**: [`StatusRow`] (the unit of work), its
//!   [`ProcessingStatus`] state machine, the [`ErrorCode`] failure taxonomy,
//!   and the [`ProcessingResult`] envelope handed to exporters
//! - **Value Objects**: [`TargetRef`] (item identity) and [`ProcBatchName`]
//!   (the creator id a processing batch carries in the remote service)
//! - **Repositories**: the [`StatusStore`] port for durable status storage
//! - **Services**: the [`StatusLedger`] (store handle plus the in-memory
//!   current-source-batch cache), and the [`DataProvider`],
//!   [`ProcessingEnvironment`], and [`Exporter`] contracts with their shared
//!   template helpers
//! - **Errors**: [`WorkflowError`], the single error type crossing layer
//!   boundaries
//!
//! ## Architecture
//!
//! The crate follows the dependency rule of a layered architecture: nothing
//! here depends on infrastructure. I/O-facing contracts are `async` traits;
//! concrete implementations live in the application crate and are injected
//! at startup.
//!
//! [`StatusRow`]: entities::StatusRow
//! [`ProcessingStatus`]: entities::ProcessingStatus
//! [`ErrorCode`]: entities::ErrorCode
//! [`ProcessingResult`]: entities::ProcessingResult
//! [`TargetRef`]: value_objects::TargetRef
//! [`ProcBatchName`]: value_objects::ProcBatchName
//! [`StatusStore`]: repositories::StatusStore
//! [`StatusLedger`]: services::StatusLedger
//! [`DataProvider`]: services::DataProvider
//! [`ProcessingEnvironment`]: services::ProcessingEnvironment
//! [`Exporter`]: services::Exporter
//! [`WorkflowError`]: error::WorkflowError

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
// These exports provide a clean API surface for consumers of the domain layer
pub use entities::{ErrorCode, ProcEnvResponse, ProcessingResult, ProcessingStatus, StatusRow};
pub use error::WorkflowError;
pub use repositories::{ErrorCodeCounts, StatusCounts, StatusStore};
pub use services::{DataProvider, Exporter, ProcessingEnvironment, StatusLedger};
pub use value_objects::{ProcBatchName, TargetRef};
