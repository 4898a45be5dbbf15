//! Sequential run over a VM list
//!
//! VMs are handled strictly in list order, one at a time. A per-VM failure
//! never stops the run; only precondition failures do.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::abstractions::Clock;
use crate::control_plane::ControlPlane;
use crate::error::{HostshiftError, HostshiftResult};
use crate::executor::{MigrationExecutor, VmOutcome};

/// Aggregate result of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    /// Includes VMs that were already on a target host
    pub succeeded: usize,
    pub failed: usize,
    pub already_on_target: usize,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: &VmOutcome) {
        self.total += 1;
        match outcome {
            VmOutcome::Failed { .. } => self.failed += 1,
            VmOutcome::AlreadyOnTarget { .. } => {
                self.succeeded += 1;
                self.already_on_target += 1;
            }
            VmOutcome::Migrated { .. } | VmOutcome::DryRun => self.succeeded += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration Summary{}", if self.dry_run { " (dry run)" } else { "" })?;
        writeln!(f, "  Total VMs:         {}", self.total)?;
        writeln!(f, "  Succeeded:         {}", self.succeeded)?;
        writeln!(f, "  Already on target: {}", self.already_on_target)?;
        writeln!(f, "  Failed:            {}", self.failed)?;
        write!(f, "  Elapsed:           {}s", self.elapsed.as_secs())
    }
}

/// Runs the executor over every VM and keeps the tally
pub struct RunOrchestrator {
    control_plane: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    executor: MigrationExecutor,
}

impl RunOrchestrator {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        clock: Arc<dyn Clock>,
        executor: MigrationExecutor,
    ) -> Self {
        Self {
            control_plane,
            clock,
            executor,
        }
    }

    /// Verify tooling and credentials; skipped in dry-run mode
    pub async fn check_preconditions(&self) -> HostshiftResult<()> {
        if self.executor.is_dry_run() {
            info!("DRY RUN: skipping dependency and credential checks");
            return Ok(());
        }

        self.control_plane.check_dependencies().await?;

        if !self.control_plane.verify_credentials().await? {
            return Err(HostshiftError::authentication(
                "control plane rejected the configured credentials",
            ));
        }
        info!("Control-plane credentials verified");
        Ok(())
    }

    /// Check preconditions, then migrate every VM in order
    pub async fn run(&self, vms: &[String], hosts: &[String]) -> HostshiftResult<RunSummary> {
        if let Err(e) = self.check_preconditions().await {
            error!("Precondition check failed: {}", e);
            return Err(e);
        }

        let started = self.clock.now();
        let mut summary = RunSummary {
            dry_run: self.executor.is_dry_run(),
            ..Default::default()
        };

        info!(
            "Starting migration of {} VMs across {} target hosts",
            vms.len(),
            hosts.len()
        );

        for (index, vm) in vms.iter().enumerate() {
            if index > 0 && !self.executor.is_dry_run() {
                self.clock.sleep(self.executor.config().inter_vm_delay).await;
            }

            info!(vm = %vm, "[{}/{}] Processing VM {}", index + 1, vms.len(), vm);
            let outcome = self.executor.migrate(vm, hosts).await;
            summary.record(&outcome);
        }

        summary.elapsed = self.clock.now().duration_since(started);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            already_on_target = summary.already_on_target,
            elapsed_secs = summary.elapsed.as_secs(),
            "Run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::SimulatedClock;
    use crate::config::MigrationConfig;
    use crate::control_plane::{MigrationBehavior, MockControlPlane};
    use crate::types::VmStatus;
    use pretty_assertions::assert_eq;

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn orchestrator(cp: &MockControlPlane, clock: &SimulatedClock, dry_run: bool) -> RunOrchestrator {
        let cp: Arc<dyn ControlPlane> = Arc::new(cp.clone());
        let clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let executor = MigrationExecutor::new(cp.clone(), clock.clone(), MigrationConfig::default())
            .with_dry_run(dry_run);
        RunOrchestrator::new(cp, clock, executor)
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("src"))
            .with_vm("vm-3", VmStatus::Active, Some("src"))
            .with_behavior("vm-3", MigrationBehavior::RejectInitiation)
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let summary = orchestrator(&cp, &clock, false)
            .run(&list(&["vm-1", "missing", "vm-3"]), &list(&["h1"]))
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_inter_vm_delay_only_between_vms() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("h1"))
            .with_vm("vm-2", VmStatus::Active, Some("h1"))
            .with_host("h1", 2);
        let clock = SimulatedClock::new();

        let summary = orchestrator(&cp, &clock, false)
            .run(&list(&["vm-1", "vm-2"]), &list(&["h1"]))
            .await
            .unwrap();

        assert_eq!(summary.already_on_target, 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(summary.elapsed, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dry_run_skips_preconditions_and_delays() {
        let cp = MockControlPlane::new()
            .with_missing_dependencies()
            .with_invalid_credentials();
        let clock = SimulatedClock::new();

        let summary = orchestrator(&cp, &clock, true)
            .run(&list(&["vm-1", "vm-2", "vm-2"]), &list(&["h1"]))
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 3);
        assert!(summary.dry_run);
        assert!(clock.sleeps().is_empty());
        assert!(cp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_is_fatal() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("src"))
            .with_missing_dependencies();
        let clock = SimulatedClock::new();

        let err = orchestrator(&cp, &clock, false)
            .run(&list(&["vm-1"]), &list(&["h1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HostshiftError::DependencyMissing { .. }));
        assert_eq!(cp.status_queries(), 0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_fatal() {
        let cp = MockControlPlane::new().with_invalid_credentials();
        let clock = SimulatedClock::new();

        let err = orchestrator(&cp, &clock, false)
            .run(&list(&["vm-1"]), &list(&["h1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HostshiftError::Authentication { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            total: 2,
            succeeded: 2,
            failed: 0,
            already_on_target: 1,
            elapsed: Duration::from_secs(75),
            dry_run: false,
        };
        let text = summary.to_string();
        assert!(text.contains("Total VMs:         2"));
        assert!(text.contains("Already on target: 1"));
        assert!(text.contains("Elapsed:           75s"));
        assert_eq!(summary.exit_code(), 0);
    }
}
