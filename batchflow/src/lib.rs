// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batchflow
//!
//! Batched, recoverable pipeline orchestration: obtain the next batch of
//! items from a source catalog, submit it to a remote processing
//! environment, poll until processing completes, retrieve the outputs, and
//! export them back to the source. A persistent status ledger records every
//! item's position in the pipeline so an interrupted run resumes exactly
//! where it stopped.
//!
//! ## Architecture
//!
//! - **Application layer** ([`application`]): the task scheduler driving the
//!   per-batch pipeline and the status monitor projecting reports from the
//!   ledger
//! - **Infrastructure layer** ([`infrastructure`]): durable status stores
//!   (SQLite, in-memory), the remote-service processing driver, the example
//!   collaborators, typed configuration, the component registry, and
//!   logging setup
//!
//! Domain types and collaborator contracts live in the `batchflow-domain`
//! crate; process-level scaffolding (exit codes, signals, shutdown) in
//! `batchflow-bootstrap`.

pub mod application;
pub mod infrastructure;
