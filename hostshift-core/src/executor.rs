//! Per-VM migration state machine
//!
//! ```text
//! Inspecting ─▶ Selecting ─┬─▶ Skipped (already on a target host)
//!                          └─▶ Migrating ─▶ Polling ─┬─▶ Succeeded
//!                                  ▲                 ├─▶ TimedOut ─┐
//!                                  │                 └─▶ Errored ──┤
//!                                  └───── retry after backoff ◀────┘
//! ```
//!
//! A VM that is not found, not migratable, or has no reachable target ends
//! immediately. Initiation failures, timeouts and platform errors are
//! retried with the same target until the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::abstractions::Clock;
use crate::config::MigrationConfig;
use crate::control_plane::ControlPlane;
use crate::error::{HostshiftError, HostshiftResult};
use crate::hooks::HookRunner;
use crate::patterns::{retry, RetryConfig};
use crate::placement::{select_target, PlacementDecision, PlacementStrategy};
use crate::types::{AttemptOutcome, MigrationAttempt, MigrationKind, VmSnapshot, VmStatus};

/// Terminal result for one VM
#[derive(Debug)]
pub enum VmOutcome {
    /// The VM now runs on `target`
    Migrated {
        target: String,
        kind: MigrationKind,
        attempts: u32,
    },
    /// The VM was already on one of the target hosts
    AlreadyOnTarget { host: String },
    /// Dry run; nothing was contacted
    DryRun,
    /// The VM could not be moved
    Failed {
        error: HostshiftError,
        attempts: u32,
    },
}

impl VmOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, VmOutcome::Failed { .. })
    }
}

/// A VM with a chosen target, ready to migrate
#[derive(Debug, Clone)]
struct MigrationPlan {
    vm: String,
    source_host: Option<String>,
    target: String,
    kind: MigrationKind,
}

enum Prepared {
    Skip(String),
    Migrate(MigrationPlan),
}

/// How an attempt proceeds
enum Resume {
    /// Request the migration, then poll
    Initiate(MigrationKind),
    /// A migration is already running; only poll
    Poll(MigrationKind),
    /// The VM finished moving before the attempt started
    Settled(MigrationKind),
}

/// Drives a single VM from inspection to a terminal outcome
pub struct MigrationExecutor {
    control_plane: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    config: MigrationConfig,
    strategy: PlacementStrategy,
    hooks: Option<HookRunner>,
    dry_run: bool,
}

impl MigrationExecutor {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        clock: Arc<dyn Clock>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            control_plane,
            clock,
            config,
            strategy: PlacementStrategy::default(),
            hooks: None,
            dry_run: false,
        }
    }

    pub fn with_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_hooks(mut self, hooks: HookRunner) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Move `vm` to the least-loaded of `hosts`
    pub async fn migrate(&self, vm: &str, hosts: &[String]) -> VmOutcome {
        if self.dry_run {
            info!(vm, "DRY RUN: would migrate VM {}", vm);
            return VmOutcome::DryRun;
        }

        let outcome = match self.prepare(vm, hosts).await {
            Ok(Prepared::Skip(host)) => {
                info!(vm, host = %host, "VM {} already on target host {}, skipping", vm, host);
                VmOutcome::AlreadyOnTarget { host }
            }
            Ok(Prepared::Migrate(plan)) => self.execute(&plan).await,
            Err(error) => VmOutcome::Failed { error, attempts: 0 },
        };

        if let VmOutcome::Failed { error, attempts } = &outcome {
            error!(vm, attempts, "Migration of VM {} failed: {}", vm, error);
            if let Some(hooks) = &self.hooks {
                hooks.on_failure(vm, &error.to_string()).await;
            }
        }
        outcome
    }

    async fn prepare(&self, vm: &str, hosts: &[String]) -> HostshiftResult<Prepared> {
        let snapshot = self.control_plane.find_vm(vm).await?;
        info!(
            vm,
            status = %snapshot.status,
            host = snapshot.host_or_unknown(),
            "Inspected VM {}",
            vm
        );

        if snapshot.status == VmStatus::NotFound {
            return Err(HostshiftError::VmNotFound { vm: vm.to_string() });
        }

        let target = match select_target(
            self.control_plane.as_ref(),
            self.strategy,
            snapshot.host.as_deref(),
            hosts,
        )
        .await
        {
            PlacementDecision::AlreadyOnTarget { host } => return Ok(Prepared::Skip(host)),
            PlacementDecision::Selected { host, .. } => host,
            PlacementDecision::NoHostAvailable => {
                return Err(HostshiftError::NoTargetHost { vm: vm.to_string() });
            }
        };

        let kind = self.kind_for(&snapshot)?;
        Ok(Prepared::Migrate(MigrationPlan {
            vm: vm.to_string(),
            source_host: snapshot.host,
            target,
            kind,
        }))
    }

    fn kind_for(&self, snapshot: &VmSnapshot) -> HostshiftResult<MigrationKind> {
        match snapshot.status.migration_kind() {
            Some(kind) if self.config.allows(kind) => Ok(kind),
            Some(kind) => {
                warn!(vm = %snapshot.id, "{} migration is disabled by configuration", kind);
                Err(HostshiftError::UnsupportedState {
                    vm: snapshot.id.clone(),
                    status: snapshot.status.clone(),
                })
            }
            None => Err(HostshiftError::UnsupportedState {
                vm: snapshot.id.clone(),
                status: snapshot.status.clone(),
            }),
        }
    }

    async fn execute(&self, plan: &MigrationPlan) -> VmOutcome {
        if let Some(hooks) = &self.hooks {
            hooks.pre_migration(&plan.vm, &plan.target).await;
        }

        let retry_config = RetryConfig {
            max_attempts: self.config.max_retries,
            backoff: self.config.retry_backoff,
            is_retryable: HostshiftError::is_retryable,
            operation_name: format!("migration of {}", plan.vm),
        };

        let retried = retry(self.clock.as_ref(), &retry_config, |attempt| {
            self.attempt(plan, attempt)
        })
        .await;

        match retried.result {
            Ok(kind) => {
                info!(
                    vm = %plan.vm,
                    target = %plan.target,
                    kind = %kind,
                    attempts = retried.attempts,
                    "VM {} migrated to {}",
                    plan.vm,
                    plan.target
                );
                if let Some(hooks) = &self.hooks {
                    hooks.post_migration(&plan.vm, &plan.target).await;
                }
                VmOutcome::Migrated {
                    target: plan.target.clone(),
                    kind,
                    attempts: retried.attempts,
                }
            }
            Err(error) => VmOutcome::Failed {
                error,
                attempts: retried.attempts,
            },
        }
    }

    /// One initiate-and-poll cycle; returns the kind that succeeded
    async fn attempt(&self, plan: &MigrationPlan, attempt: u32) -> HostshiftResult<MigrationKind> {
        let resume = if attempt > 1 && self.config.reinspect_before_retry {
            self.reinspect(plan).await?
        } else {
            Resume::Initiate(plan.kind)
        };

        let (kind, result) = match resume {
            Resume::Settled(kind) => (kind, Ok(())),
            Resume::Poll(kind) => {
                info!(
                    vm = %plan.vm,
                    target = %plan.target,
                    kind = %kind,
                    attempt,
                    "VM {} is still migrating, resuming polling (attempt {}/{})",
                    plan.vm,
                    attempt,
                    self.config.max_retries
                );
                (kind, self.wait_for_completion(plan, kind).await)
            }
            Resume::Initiate(kind) => (kind, self.initiate_and_wait(plan, kind, attempt).await),
        };

        let record = MigrationAttempt {
            vm: plan.vm.clone(),
            source_host: plan.source_host.clone(),
            target_host: plan.target.clone(),
            kind,
            attempt,
            outcome: match &result {
                Ok(()) => AttemptOutcome::Succeeded,
                Err(HostshiftError::MigrationInitiation { .. }) => AttemptOutcome::InitiationFailed,
                Err(HostshiftError::MigrationTimeout { .. }) => AttemptOutcome::TimedOut,
                Err(_) => AttemptOutcome::Errored,
            },
        };
        log_attempt(&record, result.as_ref().err());

        result.map(|()| kind)
    }

    /// Decide how a retry continues from the VM's current state
    ///
    /// A previous attempt may still be running or may have finished during
    /// the backoff. Those are picked up where they are instead of being
    /// initiated again.
    async fn reinspect(&self, plan: &MigrationPlan) -> HostshiftResult<Resume> {
        let snapshot = self.control_plane.find_vm(&plan.vm).await?;
        debug!(
            vm = %plan.vm,
            status = %snapshot.status,
            host = snapshot.host_or_unknown(),
            "Re-inspected VM {} before retry",
            plan.vm
        );

        match snapshot.status {
            VmStatus::NotFound => Err(HostshiftError::VmNotFound {
                vm: plan.vm.clone(),
            }),
            VmStatus::Migrating => Ok(Resume::Poll(plan.kind)),
            VmStatus::VerifyResize => {
                self.check_progress(plan, MigrationKind::Cold, &snapshot).await?;
                Ok(Resume::Settled(MigrationKind::Cold))
            }
            _ if snapshot.is_on(&plan.target) && snapshot.status.is_migratable() => {
                info!(vm = %plan.vm, "VM {} reached {} before retry", plan.vm, plan.target);
                Ok(Resume::Settled(plan.kind))
            }
            _ => self.kind_for(&snapshot).map(Resume::Initiate),
        }
    }

    async fn initiate_and_wait(
        &self,
        plan: &MigrationPlan,
        kind: MigrationKind,
        attempt: u32,
    ) -> HostshiftResult<()> {
        info!(
            vm = %plan.vm,
            target = %plan.target,
            kind = %kind,
            attempt,
            "Starting {} migration of {} to {} (attempt {}/{})",
            kind,
            plan.vm,
            plan.target,
            attempt,
            self.config.max_retries
        );

        let initiated = match kind {
            MigrationKind::Live => self.control_plane.live_migrate(&plan.vm, &plan.target).await,
            MigrationKind::Cold => self.control_plane.cold_migrate(&plan.vm, &plan.target).await,
        };

        match initiated {
            Ok(()) => self.wait_for_completion(plan, kind).await,
            Err(e) => Err(HostshiftError::MigrationInitiation {
                vm: plan.vm.clone(),
                target: plan.target.clone(),
                kind,
                details: e.to_string(),
            }),
        }
    }

    async fn wait_for_completion(&self, plan: &MigrationPlan, kind: MigrationKind) -> HostshiftResult<()> {
        let started = self.clock.now();

        loop {
            match self.control_plane.find_vm(&plan.vm).await {
                Ok(snapshot) => {
                    debug!(
                        vm = %plan.vm,
                        status = %snapshot.status,
                        host = snapshot.host_or_unknown(),
                        "Polled VM {}",
                        plan.vm
                    );
                    if self.check_progress(plan, kind, &snapshot).await? {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!(vm = %plan.vm, "Status poll for {} failed: {}", plan.vm, e);
                }
            }

            let elapsed = self.clock.now().duration_since(started);
            if elapsed >= self.config.timeout {
                return Err(HostshiftError::MigrationTimeout {
                    vm: plan.vm.clone(),
                    target: plan.target.clone(),
                    kind,
                    timeout: self.config.timeout,
                });
            }

            let remaining = self.config.timeout - elapsed;
            self.clock
                .sleep(Duration::min(self.config.poll_interval, remaining))
                .await;
        }
    }

    /// `Ok(true)` once the migration has completed, `Ok(false)` to keep polling
    async fn check_progress(
        &self,
        plan: &MigrationPlan,
        kind: MigrationKind,
        snapshot: &VmSnapshot,
    ) -> HostshiftResult<bool> {
        let platform_error = |details: String| HostshiftError::MigrationPlatform {
            vm: plan.vm.clone(),
            kind,
            details,
        };

        match (&snapshot.status, kind) {
            (VmStatus::Error, _) => Err(platform_error(format!(
                "VM entered ERROR on {}",
                snapshot.host_or_unknown()
            ))),
            (VmStatus::NotFound, _) => Err(platform_error("VM disappeared during migration".to_string())),
            (VmStatus::Active, MigrationKind::Live) => Ok(snapshot.is_on(&plan.target)),
            (VmStatus::VerifyResize, MigrationKind::Cold) => {
                info!(vm = %plan.vm, "Confirming resize of {}", plan.vm);
                self.control_plane
                    .confirm_resize(&plan.vm)
                    .await
                    .map_err(|e| platform_error(format!("resize confirmation failed: {}", e)))?;
                Ok(true)
            }
            (VmStatus::Shutoff, MigrationKind::Cold) => Ok(snapshot.is_on(&plan.target)),
            _ => Ok(false),
        }
    }
}

fn log_attempt(record: &MigrationAttempt, error: Option<&HostshiftError>) {
    let source = record.source_host.as_deref().unwrap_or("UNKNOWN");
    match error {
        None => info!(
            vm = %record.vm,
            source = source,
            target = %record.target_host,
            kind = %record.kind,
            attempt = record.attempt,
            outcome = %record.outcome,
            "Migration attempt {} {}",
            record.attempt,
            record.outcome
        ),
        Some(e) => error!(
            vm = %record.vm,
            source = source,
            target = %record.target_host,
            kind = %record.kind,
            attempt = record.attempt,
            outcome = %record.outcome,
            "Migration attempt {} {}: {}",
            record.attempt,
            record.outcome,
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::SimulatedClock;
    use crate::control_plane::{ControlPlaneCall, MigrationBehavior, MockControlPlane};

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn executor(cp: &MockControlPlane, clock: &SimulatedClock) -> MigrationExecutor {
        MigrationExecutor::new(
            Arc::new(cp.clone()),
            Arc::new(clock.clone()),
            MigrationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_live_migration_to_least_loaded_host() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_host("h1", 0)
            .with_host("h2", 2);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1", "h2"])).await;

        assert!(matches!(
            outcome,
            VmOutcome::Migrated { ref target, kind: MigrationKind::Live, attempts: 1 } if target == "h1"
        ));
        assert_eq!(
            cp.calls(),
            vec![ControlPlaneCall::LiveMigrate {
                vm: "vm-a".to_string(),
                target: "h1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_cold_migration_confirms_resize() {
        let cp = MockControlPlane::new()
            .with_vm("vm-c", VmStatus::Shutoff, Some("h3"))
            .with_host("h1", 1);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-c", &hosts(&["h1"])).await;

        assert!(matches!(outcome, VmOutcome::Migrated { kind: MigrationKind::Cold, .. }));
        assert_eq!(
            cp.calls(),
            vec![
                ControlPlaneCall::ColdMigrate {
                    vm: "vm-c".to_string(),
                    target: "h1".to_string()
                },
                ControlPlaneCall::ConfirmResize {
                    vm: "vm-c".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_cold_migration_auto_confirmed() {
        let cp = MockControlPlane::new()
            .with_vm("vm-c", VmStatus::Shutoff, Some("h3"))
            .with_behavior("vm-c", MigrationBehavior::AutoConfirm)
            .with_host("h1", 1);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-c", &hosts(&["h1"])).await;

        assert!(outcome.is_success());
        assert_eq!(cp.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_never_retried() {
        let cp = MockControlPlane::new().with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("ghost", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(error, HostshiftError::VmNotFound { .. }));
                assert_eq!(attempts, 0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(cp.calls().is_empty());
        assert!(cp.count_queries().is_empty());
    }

    #[tokio::test]
    async fn test_paused_vm_is_unsupported_without_retry() {
        let cp = MockControlPlane::new()
            .with_vm("vm-p", VmStatus::parse("PAUSED"), Some("h3"))
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-p", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(error, HostshiftError::UnsupportedState { .. }));
                assert_eq!(attempts, 0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(cp.calls().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_kind_is_unsupported() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_host("h1", 0);
        let clock = SimulatedClock::new();
        let config = MigrationConfig {
            live_migration: false,
            ..Default::default()
        };

        let outcome = MigrationExecutor::new(Arc::new(cp.clone()), Arc::new(clock), config)
            .migrate("vm-a", &hosts(&["h1"]))
            .await;

        assert!(matches!(
            outcome,
            VmOutcome::Failed {
                error: HostshiftError::UnsupportedState { .. },
                ..
            }
        ));
        assert!(cp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_perpetual_timeout_uses_exactly_max_attempts() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::Hang)
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(error, HostshiftError::MigrationTimeout { .. }));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(cp.calls().len(), 3);
        // 3 attempts x 600s polling + 2 x 30s backoff
        assert_eq!(clock.elapsed(), Duration::from_secs(3 * 600 + 2 * 30));
    }

    #[tokio::test]
    async fn test_platform_error_is_retried() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::EnterError)
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(error, HostshiftError::MigrationPlatform { .. }));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initiation_failure_is_retried_with_same_target() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::RejectInitiation)
            .with_host("h1", 0)
            .with_host("h2", 5);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1", "h2"])).await;

        assert!(matches!(
            outcome,
            VmOutcome::Failed {
                error: HostshiftError::MigrationInitiation { .. },
                attempts: 3
            }
        ));
        let expected = ControlPlaneCall::LiveMigrate {
            vm: "vm-a".to_string(),
            target: "h1".to_string(),
        };
        assert_eq!(cp.calls(), vec![expected.clone(), expected.clone(), expected]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30); 2]);
    }

    #[tokio::test]
    async fn test_no_reachable_host() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_unreachable_host("h1");
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1"])).await;

        assert!(matches!(
            outcome,
            VmOutcome::Failed {
                error: HostshiftError::NoTargetHost { .. },
                attempts: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_already_on_target_has_no_side_effects() {
        let cp = MockControlPlane::new()
            .with_vm("vm-b", VmStatus::Shutoff, Some("h1"))
            .with_host("h1", 3);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-b", &hosts(&["h1"])).await;

        assert!(matches!(outcome, VmOutcome::AlreadyOnTarget { ref host } if host == "h1"));
        assert!(cp.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_contacts_nothing() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock)
            .with_dry_run(true)
            .migrate("vm-a", &hosts(&["h1"]))
            .await;

        assert!(matches!(outcome, VmOutcome::DryRun));
        assert!(cp.calls().is_empty());
        assert_eq!(cp.status_queries(), 0);
    }

    #[tokio::test]
    async fn test_reinspection_stops_retry_of_errored_vm() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::EnterError)
            .with_host("h1", 0);
        let clock = SimulatedClock::new();
        let config = MigrationConfig {
            reinspect_before_retry: true,
            ..Default::default()
        };

        let outcome = MigrationExecutor::new(Arc::new(cp.clone()), Arc::new(clock), config)
            .migrate("vm-a", &hosts(&["h1"]))
            .await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(
                    error,
                    HostshiftError::UnsupportedState {
                        status: VmStatus::Error,
                        ..
                    }
                ));
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(cp.calls().len(), 1);
    }

    fn reinspecting() -> MigrationConfig {
        MigrationConfig {
            reinspect_before_retry: true,
            timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reinspection_confirms_resize_reached_during_backoff() {
        let cp = MockControlPlane::new()
            .with_vm("vm-c", VmStatus::Shutoff, Some("h3"))
            .with_behavior("vm-c", MigrationBehavior::Slow { polls: 3 })
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = MigrationExecutor::new(Arc::new(cp.clone()), Arc::new(clock.clone()), reinspecting())
            .migrate("vm-c", &hosts(&["h1"]))
            .await;

        assert!(matches!(
            outcome,
            VmOutcome::Migrated { ref target, kind: MigrationKind::Cold, attempts: 2 } if target == "h1"
        ));
        assert_eq!(
            cp.calls(),
            vec![
                ControlPlaneCall::ColdMigrate {
                    vm: "vm-c".to_string(),
                    target: "h1".to_string()
                },
                ControlPlaneCall::ConfirmResize {
                    vm: "vm-c".to_string()
                },
            ]
        );
        // 20s polling until the first timeout, then 30s backoff
        assert_eq!(clock.elapsed(), Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_reinspection_resumes_polling_of_running_migration() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::Slow { polls: 4 })
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = MigrationExecutor::new(Arc::new(cp.clone()), Arc::new(clock), reinspecting())
            .migrate("vm-a", &hosts(&["h1"]))
            .await;

        assert!(matches!(
            outcome,
            VmOutcome::Migrated { kind: MigrationKind::Live, attempts: 2, .. }
        ));
        assert_eq!(
            cp.calls(),
            vec![ControlPlaneCall::LiveMigrate {
                vm: "vm-a".to_string(),
                target: "h1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_vm_vanishing_while_polling_is_retried_platform_error() {
        let cp = MockControlPlane::new()
            .with_vm("vm-a", VmStatus::Active, Some("h3"))
            .with_behavior("vm-a", MigrationBehavior::Vanish)
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-a", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(error, HostshiftError::MigrationPlatform { .. }));
                assert!(error.is_retryable());
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(cp.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_resize_confirmation_is_retried_platform_error() {
        let cp = MockControlPlane::new()
            .with_vm("vm-c", VmStatus::Shutoff, Some("h3"))
            .with_failing_confirm("vm-c")
            .with_host("h1", 0);
        let clock = SimulatedClock::new();

        let outcome = executor(&cp, &clock).migrate("vm-c", &hosts(&["h1"])).await;

        match outcome {
            VmOutcome::Failed { error, attempts } => {
                assert!(matches!(
                    error,
                    HostshiftError::MigrationPlatform {
                        kind: MigrationKind::Cold,
                        ref details,
                        ..
                    } if details.starts_with("resize confirmation failed")
                ));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let confirms = cp
            .calls()
            .into_iter()
            .filter(|call| matches!(call, ControlPlaneCall::ConfirmResize { .. }))
            .count();
        assert_eq!(confirms, 3);
        assert_eq!(cp.calls().len(), 6);
    }
}
