//! Wiring shared by the binaries

use std::path::Path;
use std::sync::Arc;

use hostshift_core::abstractions::{Clock, CommandExecutor, SystemClock, TokioCommandExecutor};
use hostshift_core::config::HostshiftConfig;
use hostshift_core::control_plane::ControlPlane;
use hostshift_core::error::HostshiftResult;
use hostshift_core::hooks::HookRunner;
use hostshift_core::{MigrationExecutor, RunOrchestrator};
use hostshift_openstack::OpenStackCli;

/// Command-line values that override the configuration file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub log_dir: Option<std::path::PathBuf>,
}

/// Defaults, then the file, then the environment, then the command line
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> HostshiftResult<HostshiftConfig> {
    let mut config = HostshiftConfig::load(path)?;

    if let Some(max_retries) = overrides.max_retries {
        config.migration.max_retries = max_retries;
    }
    if let Some(secs) = overrides.timeout_secs {
        config.migration.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(dir) = &overrides.log_dir {
        config.logging.directory = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Control plane backed by the configured CLI
pub fn control_plane(config: &HostshiftConfig) -> Arc<dyn ControlPlane> {
    let executor: Arc<dyn CommandExecutor> = Arc::new(TokioCommandExecutor::with_default_timeout(
        config.control_plane.command_timeout,
    ));
    Arc::new(OpenStackCli::new(executor, config.control_plane.clone()))
}

/// Orchestrator for a run with the production clock and executors
pub fn orchestrator(config: &HostshiftConfig, dry_run: bool) -> HostshiftResult<RunOrchestrator> {
    let control_plane = control_plane(config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let mut executor = MigrationExecutor::new(control_plane.clone(), clock.clone(), config.migration.clone())
        .with_strategy(config.balancing.strategy()?)
        .with_dry_run(dry_run);

    if !config.hooks.is_empty() {
        let runner: Arc<dyn CommandExecutor> = Arc::new(TokioCommandExecutor::new());
        executor = executor.with_hooks(HookRunner::new(runner, config.hooks.clone()));
    }

    Ok(RunOrchestrator::new(control_plane, clock, executor))
}
