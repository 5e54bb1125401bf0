// /////////////////////////////////////////////////////////////////////////////
// Batchflow RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Component Registry
//!
//! Maps the opaque `TYPE` strings of the configuration onto constructors
//! for the concrete collaborators. The registry is populated with the
//! built-in implementations at startup; embedders can register additional
//! factories before building. An unknown `TYPE` is a configuration error
//! surfaced at load time, before any work starts.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

use batchflow_bootstrap::CancellationToken;
use batchflow_domain::{DataProvider, Exporter, ProcessingEnvironment, StatusLedger, StatusStore, WorkflowError};

use crate::application::services::{LogSink, MonitorSink, StatusMonitor};
use crate::infrastructure::adapters::{
    ExampleDataProvider, ExampleEnvironment, ExampleExporter, RemoteEnvironment,
};
use crate::infrastructure::config::{
    DataProviderSettings, ExporterSettings, ProcEnvSettings, Settings, StatusHandlerSettings, StatusMonitorSettings,
};
use crate::infrastructure::repositories::{MemoryStatusStore, SqliteStatusStore};

type StoreFactory =
    Box<dyn Fn(&StatusHandlerSettings) -> BoxFuture<'static, Result<Arc<dyn StatusStore>, WorkflowError>> + Send + Sync>;
type ProviderFactory = Box<dyn Fn(&DataProviderSettings) -> Result<Box<dyn DataProvider>, WorkflowError> + Send + Sync>;
type EnvironmentFactory = Box<
    dyn Fn(&ProcEnvSettings, &CancellationToken) -> Result<Box<dyn ProcessingEnvironment>, WorkflowError>
        + Send
        + Sync,
>;
type ExporterFactory = Box<dyn Fn(&ExporterSettings) -> Result<Box<dyn Exporter>, WorkflowError> + Send + Sync>;
type SinkFactory = Box<dyn Fn(&StatusMonitorSettings) -> Result<Box<dyn MonitorSink>, WorkflowError> + Send + Sync>;

/// Everything a run needs, built from one configuration.
pub struct BuiltComponents {
    pub ledger: StatusLedger,
    pub provider: Box<dyn DataProvider>,
    pub environment: Box<dyn ProcessingEnvironment>,
    pub exporter: Box<dyn Exporter>,
    pub monitor: Option<StatusMonitor>,
}

impl std::fmt::Debug for BuiltComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltComponents").finish_non_exhaustive()
    }
}

/// Registry of collaborator factories, keyed by the configuration `TYPE`
/// strings.
pub struct ComponentRegistry {
    stores: HashMap<String, StoreFactory>,
    providers: HashMap<String, ProviderFactory>,
    environments: HashMap<String, EnvironmentFactory>,
    exporters: HashMap<String, ExporterFactory>,
    sinks: HashMap<String, SinkFactory>,
}

impl ComponentRegistry {
    /// An empty registry; usually you want [`ComponentRegistry::with_builtins`].
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
            providers: HashMap::new(),
            environments: HashMap::new(),
            exporters: HashMap::new(),
            sinks: HashMap::new(),
        }
    }

    /// A registry knowing every implementation shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_store("SqliteStatusStore", |settings| {
            let db_file = settings.config.as_ref().map(|c| c.db_file.clone());
            Box::pin(async move {
                let db_file = db_file.ok_or_else(|| {
                    WorkflowError::InvalidConfiguration(
                        "STATUS_HANDLER.CONFIG.DB_FILE is required for SqliteStatusStore".to_string(),
                    )
                })?;
                let store = SqliteStatusStore::from_file(&db_file).await?;
                Ok(Arc::new(store) as Arc<dyn StatusStore>)
            })
        });
        registry.register_store("MemoryStatusStore", |_settings| {
            Box::pin(async { Ok(Arc::new(MemoryStatusStore::new()) as Arc<dyn StatusStore>) })
        });

        registry.register_provider("ExampleDataProvider", |settings| {
            let config = settings.config.as_ref().ok_or_else(|| {
                WorkflowError::InvalidConfiguration(
                    "DATA_PROVIDER.CONFIG is required for ExampleDataProvider".to_string(),
                )
            })?;
            Ok(Box::new(ExampleDataProvider::new(config)) as Box<dyn DataProvider>)
        });

        registry.register_environment("RemoteEnvironment", |settings, shutdown| {
            let config = settings.config.as_ref().ok_or_else(|| {
                WorkflowError::InvalidConfiguration("PROC_ENV.CONFIG is required for RemoteEnvironment".to_string())
            })?;
            Ok(Box::new(RemoteEnvironment::new(config, shutdown.clone())?) as Box<dyn ProcessingEnvironment>)
        });
        registry.register_environment("ExampleEnvironment", |_settings, _shutdown| {
            Ok(Box::new(ExampleEnvironment::new()) as Box<dyn ProcessingEnvironment>)
        });

        registry.register_exporter("ExampleExporter", |_settings| {
            Ok(Box::new(ExampleExporter::new()) as Box<dyn Exporter>)
        });

        registry.register_sink("LogSink", |_settings| Ok(Box::new(LogSink::new()) as Box<dyn MonitorSink>));

        registry
    }

    pub fn register_store(
        &mut self,
        name: &str,
        factory: impl Fn(&StatusHandlerSettings) -> BoxFuture<'static, Result<Arc<dyn StatusStore>, WorkflowError>>
            + Send
            + Sync
            + 'static,
    ) {
        self.stores.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_provider(
        &mut self,
        name: &str,
        factory: impl Fn(&DataProviderSettings) -> Result<Box<dyn DataProvider>, WorkflowError> + Send + Sync + 'static,
    ) {
        self.providers.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_environment(
        &mut self,
        name: &str,
        factory: impl Fn(&ProcEnvSettings, &CancellationToken) -> Result<Box<dyn ProcessingEnvironment>, WorkflowError>
            + Send
            + Sync
            + 'static,
    ) {
        self.environments.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_exporter(
        &mut self,
        name: &str,
        factory: impl Fn(&ExporterSettings) -> Result<Box<dyn Exporter>, WorkflowError> + Send + Sync + 'static,
    ) {
        self.exporters.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_sink(
        &mut self,
        name: &str,
        factory: impl Fn(&StatusMonitorSettings) -> Result<Box<dyn MonitorSink>, WorkflowError> + Send + Sync + 'static,
    ) {
        self.sinks.insert(name.to_string(), Box::new(factory));
    }

    /// Builds every collaborator named in the settings.
    pub async fn build(
        &self,
        settings: &Settings,
        shutdown: &CancellationToken,
    ) -> Result<BuiltComponents, WorkflowError> {
        let store_factory = self.stores.get(&settings.status_handler.store_type).ok_or_else(|| {
            unknown_type("STATUS_HANDLER", &settings.status_handler.store_type, self.stores.keys())
        })?;
        let store = store_factory(&settings.status_handler).await?;
        let ledger = StatusLedger::new(store);

        let provider_factory = self.providers.get(&settings.data_provider.provider_type).ok_or_else(|| {
            unknown_type("DATA_PROVIDER", &settings.data_provider.provider_type, self.providers.keys())
        })?;
        let provider = provider_factory(&settings.data_provider)?;

        let environment_factory = self
            .environments
            .get(&settings.proc_env.env_type)
            .ok_or_else(|| unknown_type("PROC_ENV", &settings.proc_env.env_type, self.environments.keys()))?;
        let environment = environment_factory(&settings.proc_env, shutdown)?;

        let exporter_factory = self
            .exporters
            .get(&settings.exporter.exporter_type)
            .ok_or_else(|| unknown_type("EXPORTER", &settings.exporter.exporter_type, self.exporters.keys()))?;
        let exporter = exporter_factory(&settings.exporter)?;

        let monitor = match &settings.status_monitor {
            Some(monitor_settings) => {
                let sink_factory = self
                    .sinks
                    .get(&monitor_settings.monitor_type)
                    .ok_or_else(|| unknown_type("STATUS_MONITOR", &monitor_settings.monitor_type, self.sinks.keys()))?;
                Some(StatusMonitor::new(
                    sink_factory(monitor_settings)?,
                    monitor_settings.include_extra_info,
                ))
            }
            None => None,
        };

        Ok(BuiltComponents {
            ledger,
            provider,
            environment,
            exporter,
            monitor,
        })
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn unknown_type<'a>(section: &str, requested: &str, known: impl Iterator<Item = &'a String>) -> WorkflowError {
    let mut known: Vec<&str> = known.map(String::as_str).collect();
    known.sort_unstable();
    WorkflowError::InvalidConfiguration(format!(
        "Unknown {}.TYPE '{}' (known: {})",
        section,
        requested,
        known.join(", ")
    ))
}
