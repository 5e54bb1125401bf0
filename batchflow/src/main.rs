// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batchflow CLI
//!
//! Entry point of the orchestrator binary.
//!
//! ```bash
//! # run the workflow described by config.yml
//! batchflow --cfg config.yml
//!
//! # print a detailed status report and exit
//! batchflow --cfg config.yml --report
//! ```
//!
//! ## Exit codes
//!
//! - `0`: clean completion (source exhausted, or batch limit reached)
//! - `1`: a batch failed at a batch-level step
//! - `65`: malformed data from the remote service
//! - `69`: remote service unreachable
//! - `74`: ledger write failure
//! - `78`: configuration rejected
//! - `130` / `143`: interrupted / terminated by signal

use clap::Parser;
use std::path::PathBuf;

use batchflow::application::services::{LogSink, RunOutcome, SchedulerOptions, StatusMonitor, TaskScheduler};
use batchflow::infrastructure::config::Settings;
use batchflow::infrastructure::logging::init_tracing;
use batchflow::infrastructure::registry::ComponentRegistry;
use batchflow_bootstrap::signals::ShutdownSignal;
use batchflow_bootstrap::{install_signal_handlers, BootstrapLogger, ConsoleLogger, ExitCode, ShutdownCoordinator};
use batchflow_domain::WorkflowError;

/// Batched, recoverable pipeline orchestrator.
#[derive(Parser, Debug)]
#[command(name = "batchflow", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long = "cfg", default_value = "config.yml")]
    cfg: PathBuf,

    /// Print a detailed status report instead of running the pipeline
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    if !exit_code.is_success() {
        eprintln!("batchflow exited: {}", exit_code);
    }
    std::process::exit(exit_code.as_i32());
}

async fn run() -> ExitCode {
    let cli = Cli::parse();
    let logger = ConsoleLogger::new();

    logger.info(&format!("loading configuration from {}", cli.cfg.display()));
    let settings = match Settings::load(&cli.cfg) {
        Ok(settings) => settings,
        Err(e) => {
            logger.error(&format!("{}", e));
            return ExitCode::Config;
        }
    };

    if let Err(e) = init_tracing(&settings.logging) {
        logger.error(&format!("{}", e));
        return ExitCode::Software;
    }

    let coordinator = ShutdownCoordinator::new();
    let mut signal_rx = install_signal_handlers(&coordinator);

    let registry = ComponentRegistry::with_builtins();
    let components = match registry.build(&settings, &coordinator.token()).await {
        Ok(components) => components,
        Err(e) => {
            tracing::error!("could not build workflow components: {}", e);
            return exit_code_for(&e, None);
        }
    };

    if cli.report {
        return report(&settings, components).await;
    }

    let options = SchedulerOptions {
        batch_size: settings.task_scheduler.batch_size,
        batch_prefix: settings.task_scheduler.batch_prefix.clone(),
        batch_limit: settings.task_scheduler.batch_limit,
        monitor_freq: settings.task_scheduler.monitor_freq,
    };
    let mut scheduler = TaskScheduler::new(
        options,
        components.ledger,
        components.provider,
        components.environment,
        components.exporter,
        components.monitor,
        coordinator.token(),
    );

    match scheduler.run().await {
        Ok(RunOutcome::SourceExhausted) => {
            tracing::info!("workflow completed, source exhausted");
            ExitCode::Success
        }
        Ok(RunOutcome::BatchLimitReached) => {
            tracing::info!("workflow stopped at the configured batch limit");
            ExitCode::Success
        }
        Ok(RunOutcome::CriticalFailure) => {
            tracing::error!("workflow stopped after a critical batch failure");
            ExitCode::Error
        }
        Err(e) => {
            tracing::error!("workflow aborted: {}", e);
            exit_code_for(&e, signal_rx.try_recv().ok())
        }
    }
}

/// Prints a detailed report over the configured ledger and exits.
async fn report(settings: &Settings, components: batchflow::infrastructure::registry::BuiltComponents) -> ExitCode {
    let mut ledger = components.ledger;
    if let Err(e) = ledger.recover_source_batch().await {
        tracing::error!("could not load ledger state: {}", e);
        return exit_code_for(&e, None);
    }

    let include_extra_info = settings
        .status_monitor
        .as_ref()
        .map(|m| m.include_extra_info)
        .unwrap_or(false);
    let monitor = components
        .monitor
        .unwrap_or_else(|| StatusMonitor::new(Box::new(LogSink::new()), include_extra_info));

    match monitor.report_detailed(&ledger).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!("could not produce status report: {}", e);
            exit_code_for(&e, None)
        }
    }
}

fn exit_code_for(error: &WorkflowError, signal: Option<ShutdownSignal>) -> ExitCode {
    match error {
        WorkflowError::InvalidConfiguration(_) => ExitCode::Config,
        WorkflowError::DatabaseError(_) => ExitCode::IoError,
        WorkflowError::IoError(_) => ExitCode::IoError,
        WorkflowError::SerializationError(_) => ExitCode::DataError,
        WorkflowError::RemoteServiceError(_) => ExitCode::Unavailable,
        WorkflowError::Cancelled(_) => match signal {
            Some(ShutdownSignal::Terminate) => ExitCode::Terminated,
            _ => ExitCode::Interrupted,
        },
        WorkflowError::MissingData(_) | WorkflowError::InternalError(_) => ExitCode::Software,
    }
}
