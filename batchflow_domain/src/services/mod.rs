// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Services
//!
//! Stateful domain services and the contracts of the pluggable
//! collaborators.
//!
//! ## Services
//!
//! - [`StatusLedger`]: the status-ledger service owning the durable store
//!   handle and the in-memory current-source-batch cache
//! - [`DataProvider`]: contract for source adapters, with the shared
//!   [`next_batch`] helper implementing batch assignment and source-batch
//!   advancement
//! - [`ProcessingEnvironment`]: contract for processing environments, with
//!   the shared [`register_batch`], [`process_batch`], [`monitor_batch`],
//!   and [`fetch_results_of_batch`] helpers carrying the common status
//!   mapping and fatal persistence
//! - [`Exporter`]: contract for export sinks
//!
//! Shared behavior lives in free functions taking the trait object rather
//! than in default trait methods, so implementations stay minimal and the
//! orchestration logic has a single home.

mod data_provider;
mod exporter;
mod processing_environment;
mod status_ledger;

pub use data_provider::{next_batch, DataProvider};
pub use exporter::Exporter;
pub use processing_environment::{
    fetch_results_of_batch, monitor_batch, process_batch, register_batch, ProcessingEnvironment,
};
pub use status_ledger::{update_rows, RowUpdate, StatusLedger};
