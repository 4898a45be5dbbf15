use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::sync::Arc;
use tracing::{debug, info};

use hostshift_core::abstractions::{CommandExecutor, CommandOptions, CommandOutput};
use hostshift_core::config::ControlPlaneConfig;
use hostshift_core::control_plane::ControlPlane;
use hostshift_core::error::{HostshiftError, HostshiftResult};
use hostshift_core::types::{HostService, VmSnapshot, VmStatus};

use crate::output::{ComputeService, ServerShow, NO_SERVER_MARKER};

/// Nova microversion for live migration with an explicit host
const LIVE_MIGRATION_API_VERSION: &str = "2.30";
/// Nova microversion for cold migration with an explicit host
const COLD_MIGRATION_API_VERSION: &str = "2.56";

/// Control plane backed by the `openstack` command-line client
pub struct OpenStackCli {
    executor: Arc<dyn CommandExecutor>,
    config: ControlPlaneConfig,
}

impl OpenStackCli {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: ControlPlaneConfig) -> Self {
        Self { executor, config }
    }

    /// Run a CLI invocation with the configured global options prepended
    async fn run(&self, args: &[&str]) -> HostshiftResult<CommandOutput> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if let Some(cloud) = self.config.cloud.as_deref() {
            full.push("--os-cloud");
            full.push(cloud);
        }
        full.extend_from_slice(args);

        debug!("Running {} {}", self.config.command, full.join(" "));
        let options = CommandOptions::new()
            .with_timeout(self.config.command_timeout)
            .with_output_capture();
        self.executor
            .execute(&self.config.command, &full, options)
            .await
    }

    /// Run a command that must succeed
    async fn run_checked(&self, operation: &str, args: &[&str]) -> HostshiftResult<CommandOutput> {
        let output = self.run(args).await?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(HostshiftError::control_plane(operation, output.stderr_lossy()))
        }
    }

    async fn run_json<T: DeserializeOwned>(&self, operation: &str, args: &[&str]) -> HostshiftResult<T> {
        let output = self.run_checked(operation, args).await?;
        serde_json::from_slice(&output.stdout)
            .map_err(|e| HostshiftError::control_plane_output(operation, e))
    }
}

#[async_trait]
impl ControlPlane for OpenStackCli {
    async fn find_vm(&self, vm: &str) -> HostshiftResult<VmSnapshot> {
        let output = self.run(&["server", "show", vm, "-f", "json"]).await?;

        if !output.is_success() {
            let stderr = output.stderr_lossy();
            if stderr.contains(NO_SERVER_MARKER) {
                return Ok(VmSnapshot::not_found(vm));
            }
            return Err(HostshiftError::control_plane("server show", stderr));
        }

        let show: ServerShow = serde_json::from_slice(&output.stdout)
            .map_err(|e| HostshiftError::control_plane_output("server show", e))?;
        Ok(VmSnapshot {
            id: vm.to_string(),
            status: VmStatus::parse(&show.status),
            host: show.host(),
        })
    }

    async fn host_vm_count(&self, host: &str) -> HostshiftResult<u32> {
        let servers: Vec<IgnoredAny> = self
            .run_json(
                "server list",
                &["server", "list", "--all-projects", "--host", host, "-f", "json"],
            )
            .await?;
        Ok(servers.len() as u32)
    }

    async fn host_services(&self) -> HostshiftResult<Vec<HostService>> {
        let services: Vec<ComputeService> = self
            .run_json(
                "compute service list",
                &["compute", "service", "list", "--service", "nova-compute", "-f", "json"],
            )
            .await?;

        Ok(services
            .into_iter()
            .map(|service| HostService {
                host: service.host,
                admin_state: service.status,
                operational_state: service.state,
            })
            .collect())
    }

    async fn verify_credentials(&self) -> HostshiftResult<bool> {
        let output = self.run(&["token", "issue", "-f", "json"]).await?;
        if !output.is_success() {
            debug!("Token issue rejected: {}", output.stderr_lossy());
        }
        Ok(output.is_success())
    }

    async fn check_dependencies(&self) -> HostshiftResult<()> {
        let output = self
            .executor
            .execute(
                &self.config.command,
                &["--version"],
                CommandOptions::new()
                    .with_timeout(self.config.command_timeout)
                    .with_output_capture(),
            )
            .await?;

        if output.is_success() {
            let version = String::from_utf8_lossy(&output.stdout);
            let version = if version.trim().is_empty() {
                output.stderr_lossy()
            } else {
                version.trim().to_string()
            };
            info!("Using {}", version);
            Ok(())
        } else {
            Err(HostshiftError::dependency_missing(
                self.config.command.clone(),
                output.stderr_lossy(),
            ))
        }
    }

    async fn live_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()> {
        self.run_checked(
            "server migrate --live-migration",
            &[
                "--os-compute-api-version",
                LIVE_MIGRATION_API_VERSION,
                "server",
                "migrate",
                "--live-migration",
                "--host",
                target,
                vm,
            ],
        )
        .await
        .map(|_| ())
    }

    async fn cold_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()> {
        self.run_checked(
            "server migrate",
            &[
                "--os-compute-api-version",
                COLD_MIGRATION_API_VERSION,
                "server",
                "migrate",
                "--host",
                target,
                vm,
            ],
        )
        .await
        .map(|_| ())
    }

    async fn confirm_resize(&self, vm: &str) -> HostshiftResult<()> {
        self.run_checked("server resize confirm", &["server", "resize", "confirm", vm])
            .await
            .map(|_| ())
    }
}
