//! CLI bootstrap: configuration and wiring of the supervisor and hub.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use frpcd_core::{ConfigError, NetworkConfig, ServicePort, SupervisorConfig, app_log_file};
use frpcd_runtime::{BroadcastHub, HubSettings, ProcessSupervisor};
use tracing::debug;

use crate::parser::Cli;

/// Everything the CLI reads from the environment and flags.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub supervisor: SupervisorConfig,
    pub network: NetworkConfig,
    /// Application log file; `None` disables the file log
    pub app_log_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load from the environment, then apply command-line overrides.
    pub fn from_env(cli: &Cli) -> Result<Self, ConfigError> {
        let supervisor = apply_overrides(SupervisorConfig::from_env()?, cli);
        Ok(Self {
            supervisor,
            network: NetworkConfig::from_env()?,
            app_log_file: app_log_file(&|key: &str| std::env::var(key).ok()),
        })
    }
}

/// Flags win over environment values.
pub fn apply_overrides(mut config: SupervisorConfig, cli: &Cli) -> SupervisorConfig {
    if let Some(path) = &cli.frpc_path {
        config.executable_path.clone_from(path);
    }
    if let Some(path) = &cli.config {
        config.config_path.clone_from(path);
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir.clone_from(dir);
    }
    config
}

/// Wired components shared by every handler.
pub struct CliContext {
    pub supervisor: Arc<ProcessSupervisor>,
    pub hub: BroadcastHub,
    pub network: NetworkConfig,
}

impl CliContext {
    /// Stop background tasks. The managed process is left running.
    pub async fn shutdown(&self) {
        self.hub.shutdown().await;
        self.supervisor.shutdown().await;
    }
}

/// Build the supervisor and hub. Must run inside the Tokio runtime.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    debug!(
        executable = %config.supervisor.executable_path.display(),
        config = %config.supervisor.config_path.display(),
        log = %config.supervisor.log_path().display(),
        "Bootstrapping supervisor"
    );

    let settings = HubSettings::from_config(&config.supervisor);
    let supervisor = Arc::new(
        ProcessSupervisor::new(config.supervisor).context("failed to initialise supervisor")?,
    );
    let hub = BroadcastHub::new(Arc::clone(&supervisor) as Arc<dyn ServicePort>, settings);

    Ok(CliContext {
        supervisor,
        hub,
        network: config.network,
    })
}
