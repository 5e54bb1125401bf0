// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Collaborator Adapters
//!
//! Concrete implementations of the domain's collaborator contracts:
//!
//! - [`RemoteEnvironment`](remote_environment::RemoteEnvironment): drives an
//!   HTTP-based processing service through its document, task, and search
//!   endpoints (see [`remote_client`])
//! - [`ExampleEnvironment`](example_environment::ExampleEnvironment),
//!   [`ExampleDataProvider`](example_provider::ExampleDataProvider),
//!   [`ExampleExporter`](example_exporter::ExampleExporter): in-memory
//!   stand-ins for trying out a workflow end to end without any external
//!   service

pub mod example_environment;
pub mod example_exporter;
pub mod example_provider;
pub mod remote_client;
pub mod remote_environment;

pub use example_environment::ExampleEnvironment;
pub use example_exporter::ExampleExporter;
pub use example_provider::ExampleDataProvider;
pub use remote_client::RemoteServiceClient;
pub use remote_environment::RemoteEnvironment;
