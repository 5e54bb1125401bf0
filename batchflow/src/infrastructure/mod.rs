// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete technology behind the domain ports: durable status stores,
//! the remote processing driver and its example stand-ins, typed
//! configuration, the component registry, and logging setup.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod registry;
pub mod repositories;
