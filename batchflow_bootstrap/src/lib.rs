// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batchflow Bootstrap
//!
//! Process-level concerns for the batchflow binary, kept apart from both the
//! domain and the application layer:
//!
//! - **Exit codes** ([`exit_code`]): Unix `sysexits.h`-style exit codes so
//!   that schedulers and shell scripts can tell a clean source-exhausted run
//!   from a configuration error or a broken ledger
//! - **Shutdown coordination** ([`shutdown`]): a clone-able cancellation
//!   token the run loop checks at every suspension-point boundary
//! - **Signal handling** ([`signals`]): SIGINT/SIGTERM wiring into the
//!   shutdown coordinator
//! - **Bootstrap logging** ([`logger`]): a minimal logging trait usable
//!   before (and after) the tracing subscriber exists
//!
//! Nothing in here knows about items, batches, or ledgers; the crate is
//! reusable scaffolding for any long-running batch binary.

pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use exit_code::ExitCode;
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use signals::install_signal_handlers;
