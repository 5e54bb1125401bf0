// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Repository Interfaces
//!
//! Ports for durable storage. The only repository of this system is the
//! [`StatusStore`], the backend of the status ledger.

mod status_store;

pub use status_store::{ErrorCodeCounts, ExtraInfoStatusCounts, StatusCounts, StatusStore};
