// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Wires SIGINT and SIGTERM into the [`ShutdownCoordinator`]. The handler
//! task lives for the whole process; the second signal is deliberately left
//! to the default disposition so an impatient operator can still kill the
//! process the hard way.

use crate::shutdown::ShutdownCoordinator;

/// Which signal caused the shutdown, for exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Spawns a background task that initiates shutdown on SIGINT/SIGTERM.
///
/// Returns a receiver resolving to the signal that fired, or never resolving
/// if no signal arrives. Must be called from within a tokio runtime.
pub fn install_signal_handlers(coordinator: &ShutdownCoordinator) -> tokio::sync::oneshot::Receiver<ShutdownSignal> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let coordinator = coordinator.clone();

    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        match signal {
            ShutdownSignal::Interrupt => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
            ShutdownSignal::Terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
        }
        coordinator.initiate_shutdown();
        let _ = tx.send(signal);
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to register SIGTERM handler: {}", e);
            // fall back to SIGINT only
            let _ = tokio::signal::ctrl_c().await;
            return ShutdownSignal::Interrupt;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => ShutdownSignal::Terminate,
        _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownSignal {
    let _ = tokio::signal::ctrl_c().await;
    ShutdownSignal::Interrupt
}
