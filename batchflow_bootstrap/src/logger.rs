// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! Lightweight logging abstraction for the bootstrap phase, before the
//! tracing subscriber has been configured from the LOGGING settings. The
//! trait keeps startup code testable: configuration validation can run with
//! the no-op logger and assert on outcomes without generating output.

/// Bootstrap logging abstraction
pub trait BootstrapLogger: Send + Sync {
    /// Log a fatal bootstrap error
    fn error(&self, message: &str);

    /// Log a non-fatal issue (missing optional config, etc.)
    fn warn(&self, message: &str);

    /// Log normal bootstrap progress
    fn info(&self, message: &str);
}

/// Console logger routing bootstrap messages through tracing.
///
/// Messages emitted before the subscriber exists fall back to stderr so
/// configuration failures are never silent.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::with_prefix("startup")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        eprintln!("[{}] ERROR {}", self.prefix, message);
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

/// No-op logger for testing
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_does_not_panic() {
        let logger = ConsoleLogger::new();
        logger.info("starting");
        logger.warn("optional section missing");
    }

    #[test]
    fn test_console_logger_with_prefix() {
        let logger = ConsoleLogger::with_prefix("custom");
        logger.info("message");
    }

    #[test]
    fn test_noop_logger_swallows_everything() {
        let logger = NoOpLogger::new();
        logger.error("error");
        logger.warn("warning");
        logger.info("info");
    }
}
