// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Module
//!
//! Single error type crossing layer boundaries; see [`WorkflowError`].

mod workflow_error;

pub use workflow_error::WorkflowError;
