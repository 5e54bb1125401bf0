// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Configuration
//!
//! Typed settings for the whole binary, loaded from one YAML file; see
//! [`settings`].

pub mod settings;

pub use settings::{
    DataProviderSettings, ExampleProviderConfig, ExporterSettings, LoggingSettings, ProcEnvSettings,
    RemoteEnvConfig, Settings, StatusHandlerConfig, StatusHandlerSettings, StatusMonitorSettings,
    TaskSchedulerSettings,
};
