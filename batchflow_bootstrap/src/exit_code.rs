// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions,
//! restricted to the conditions this binary can actually end in.
//!
//! ## Exit Code Conventions
//!
//! - **0**: Clean completion, the source was exhausted
//! - **1**: General error
//! - **65**: Malformed input data (e.g. an unreadable config file)
//! - **69**: The remote processing service is unreachable
//! - **70**: Internal software error
//! - **74**: I/O error, in particular a failed ledger write
//! - **78**: Configuration rejected at startup
//! - **130**: Interrupted by SIGINT
//! - **143**: Terminated by SIGTERM

use std::fmt;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Data format error (65)
    /// - Unparseable configuration file
    /// - Malformed remote service reply
    DataError = 65,

    /// Service unavailable (69)
    /// - Remote processing service unreachable
    Unavailable = 69,

    /// Internal software error (70)
    /// - Broken invariant, unexpected state
    Software = 70,

    /// I/O error (74)
    /// - Ledger write failure
    /// - Batch artifact could not be written
    IoError = 74,

    /// Configuration error (78)
    /// - Missing or invalid configuration
    /// - Unknown collaborator type
    Config = 78,

    /// Interrupted by signal (SIGINT - Ctrl+C) (130)
    Interrupted = 130,

    /// Terminated by signal (SIGTERM) (143)
    Terminated = 143,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get human-readable description of exit code
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::DataError => "Data format error",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::IoError => "I/O error",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    /// Check if this is a success exit code
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Check if this represents a signal interruption
    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}
