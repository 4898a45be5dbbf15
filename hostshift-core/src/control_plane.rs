//! Compute control-plane abstraction
//!
//! Hostshift never manipulates hypervisors itself. Everything it knows about
//! VMs and hosts comes from, and every change it makes goes through, an
//! implementation of [`ControlPlane`]. Each call is a fresh snapshot of
//! state that other actors may be changing concurrently.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HostshiftError, HostshiftResult};
use crate::types::{HostService, HostSummary, MigrationKind, VmSnapshot, VmStatus};

/// Queries and mutations consumed from the compute control plane
///
/// ## Queries
///
/// - [`find_vm`](Self::find_vm) reports a missing VM as a snapshot with
///   [`VmStatus::NotFound`], not as an error. Errors mean the question could
///   not be answered.
/// - [`host_vm_count`](Self::host_vm_count) fails when the count is
///   unavailable; callers must not treat that as an empty host.
///
/// ## Mutations
///
/// Migration calls only initiate the operation. Completion is observed by
/// polling [`find_vm`](Self::find_vm).
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Look up a VM's status and current host
    async fn find_vm(&self, vm: &str) -> HostshiftResult<VmSnapshot>;

    /// Number of VMs currently placed on a host
    async fn host_vm_count(&self, host: &str) -> HostshiftResult<u32>;

    /// Compute services known to the control plane
    async fn host_services(&self) -> HostshiftResult<Vec<HostService>>;

    /// All compute hosts with their load and service state
    ///
    /// A host whose count cannot be queried is still listed, with no count.
    async fn list_hosts(&self) -> HostshiftResult<Vec<HostSummary>> {
        let services = self.host_services().await?;
        let mut hosts = Vec::with_capacity(services.len());
        for service in services {
            let vm_count = match self.host_vm_count(&service.host).await {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!("Could not count VMs on {}: {}", service.host, e);
                    None
                }
            };
            hosts.push(HostSummary {
                host: service.host,
                vm_count,
                admin_state: service.admin_state,
                operational_state: service.operational_state,
            });
        }
        Ok(hosts)
    }

    /// Check that the configured credentials are accepted
    async fn verify_credentials(&self) -> HostshiftResult<bool>;

    /// Check that the tooling needed to reach the control plane is present
    async fn check_dependencies(&self) -> HostshiftResult<()>;

    /// Start a live migration of a running VM
    async fn live_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()>;

    /// Start a cold migration of a powered-off VM
    async fn cold_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()>;

    /// Finalize a cold migration that reached VERIFY_RESIZE
    async fn confirm_resize(&self, vm: &str) -> HostshiftResult<()>;
}

/// Mutating call recorded by [`MockControlPlane`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneCall {
    LiveMigrate { vm: String, target: String },
    ColdMigrate { vm: String, target: String },
    ConfirmResize { vm: String },
}

/// How the mock platform reacts to a migration request for a VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationBehavior {
    /// Migration proceeds through MIGRATING and completes on the target
    Complete,
    /// Cold migration completes and the platform confirms the resize itself
    AutoConfirm,
    /// The VM stays in MIGRATING forever
    Hang,
    /// The initiation call is rejected
    RejectInitiation,
    /// The VM drops into ERROR after the request
    EnterError,
    /// The VM is deleted while migrating
    Vanish,
    /// The VM stays in MIGRATING for `polls` lookups, then completes
    Slow { polls: usize },
}

#[derive(Debug)]
struct MockVm {
    /// Upcoming snapshots; the last one sticks once the queue drains
    script: VecDeque<VmSnapshot>,
    behavior: MigrationBehavior,
    reject_confirm: bool,
}

impl MockVm {
    fn current(&mut self) -> VmSnapshot {
        if self.script.len() > 1 {
            self.script.pop_front().unwrap_or_else(|| VmSnapshot::not_found(""))
        } else {
            self.script
                .front()
                .cloned()
                .unwrap_or_else(|| VmSnapshot::not_found(""))
        }
    }

    fn last(&self) -> Option<&VmSnapshot> {
        self.script.back()
    }
}

#[derive(Debug, Default)]
struct MockState {
    vms: HashMap<String, MockVm>,
    /// `None` marks a host whose count query fails
    host_counts: HashMap<String, Option<u32>>,
    host_states: HashMap<String, (String, String)>,
    credentials_valid: bool,
    dependencies_present: bool,
    services_unavailable: bool,
    calls: Vec<ControlPlaneCall>,
    count_queries: Vec<String>,
    status_queries: usize,
}

/// In-memory control plane for tests and demos
///
/// VMs are described by a script of snapshots returned one per
/// [`find_vm`](ControlPlane::find_vm) call. Migration requests rewrite the
/// script according to the VM's [`MigrationBehavior`] and move the VM
/// between host counts on completion.
#[derive(Debug, Clone)]
pub struct MockControlPlane {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                credentials_valid: true,
                dependencies_present: true,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a VM with a fixed status and host
    pub fn with_vm(self, vm: &str, status: VmStatus, host: Option<&str>) -> Self {
        self.with_vm_script(
            vm,
            vec![VmSnapshot {
                id: vm.to_string(),
                status,
                host: host.map(str::to_string),
            }],
        )
    }

    /// Register a VM whose successive lookups return the given snapshots
    pub fn with_vm_script(self, vm: &str, script: Vec<VmSnapshot>) -> Self {
        self.lock().vms.insert(
            vm.to_string(),
            MockVm {
                script: script.into(),
                behavior: MigrationBehavior::Complete,
                reject_confirm: false,
            },
        );
        self
    }

    /// Set how the platform reacts to migration requests for a VM
    pub fn with_behavior(self, vm: &str, behavior: MigrationBehavior) -> Self {
        if let Some(entry) = self.lock().vms.get_mut(vm) {
            entry.behavior = behavior;
        }
        self
    }

    /// Make every resize confirmation for a VM fail
    pub fn with_failing_confirm(self, vm: &str) -> Self {
        if let Some(entry) = self.lock().vms.get_mut(vm) {
            entry.reject_confirm = true;
        }
        self
    }

    /// Register a host with a VM count
    pub fn with_host(self, host: &str, vm_count: u32) -> Self {
        self.lock().host_counts.insert(host.to_string(), Some(vm_count));
        self
    }

    /// Register a host whose count query fails
    pub fn with_unreachable_host(self, host: &str) -> Self {
        self.lock().host_counts.insert(host.to_string(), None);
        self
    }

    /// Set the admin and operational state reported for a host
    pub fn with_host_state(self, host: &str, admin: &str, operational: &str) -> Self {
        self.lock()
            .host_states
            .insert(host.to_string(), (admin.to_string(), operational.to_string()));
        self
    }

    pub fn with_invalid_credentials(self) -> Self {
        self.lock().credentials_valid = false;
        self
    }

    /// Make the compute service listing fail
    pub fn with_service_listing_failure(self) -> Self {
        self.lock().services_unavailable = true;
        self
    }

    pub fn with_missing_dependencies(self) -> Self {
        self.lock().dependencies_present = false;
        self
    }

    /// Mutating calls issued so far
    pub fn calls(&self) -> Vec<ControlPlaneCall> {
        self.lock().calls.clone()
    }

    /// Hosts whose count was queried, in query order
    pub fn count_queries(&self) -> Vec<String> {
        self.lock().count_queries.clone()
    }

    /// Number of VM status lookups served
    pub fn status_queries(&self) -> usize {
        self.lock().status_queries
    }

    /// Current count for a host, if registered and reachable
    pub fn host_count(&self, host: &str) -> Option<u32> {
        self.lock().host_counts.get(host).copied().flatten()
    }

    fn start_migration(&self, vm: &str, target: &str, kind: MigrationKind) -> HostshiftResult<()> {
        let mut state = self.lock();
        state.calls.push(match kind {
            MigrationKind::Live => ControlPlaneCall::LiveMigrate {
                vm: vm.to_string(),
                target: target.to_string(),
            },
            MigrationKind::Cold => ControlPlaneCall::ColdMigrate {
                vm: vm.to_string(),
                target: target.to_string(),
            },
        });

        let entry = state.vms.get_mut(vm).ok_or_else(|| {
            HostshiftError::control_plane("migrate", format!("No server with a name or ID of '{}'", vm))
        })?;

        let source = entry.last().and_then(|s| s.host.clone());
        let snapshot = |status: VmStatus, host: Option<String>| VmSnapshot {
            id: vm.to_string(),
            status,
            host,
        };
        let target_host = Some(target.to_string());

        let (script, moved) = match entry.behavior {
            MigrationBehavior::RejectInitiation => {
                return Err(HostshiftError::control_plane(
                    "migrate",
                    format!("Cannot migrate '{}': request rejected", vm),
                ));
            }
            MigrationBehavior::Hang => (vec![snapshot(VmStatus::Migrating, source.clone())], false),
            MigrationBehavior::EnterError => (
                vec![
                    snapshot(VmStatus::Migrating, source.clone()),
                    snapshot(VmStatus::Error, source.clone()),
                ],
                false,
            ),
            MigrationBehavior::Vanish => (
                vec![
                    snapshot(VmStatus::Migrating, source.clone()),
                    VmSnapshot::not_found(vm),
                ],
                false,
            ),
            MigrationBehavior::Complete | MigrationBehavior::Slow { .. } => {
                let polls = match entry.behavior {
                    MigrationBehavior::Slow { polls } => polls,
                    _ => 1,
                };
                let settled = match kind {
                    MigrationKind::Live => VmStatus::Active,
                    MigrationKind::Cold => VmStatus::VerifyResize,
                };
                let mut script = vec![snapshot(VmStatus::Migrating, source.clone()); polls];
                script.push(snapshot(settled, target_host));
                (script, true)
            }
            MigrationBehavior::AutoConfirm => {
                let settled = match kind {
                    MigrationKind::Live => VmStatus::Active,
                    MigrationKind::Cold => VmStatus::Shutoff,
                };
                (
                    vec![
                        snapshot(VmStatus::Migrating, source.clone()),
                        snapshot(settled, target_host),
                    ],
                    true,
                )
            }
        };
        entry.script = script.into();

        if moved {
            if let Some(Some(count)) = source.as_ref().and_then(|s| state.host_counts.get_mut(s)) {
                *count = count.saturating_sub(1);
            }
            if let Some(Some(count)) = state.host_counts.get_mut(target) {
                *count += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn find_vm(&self, vm: &str) -> HostshiftResult<VmSnapshot> {
        let mut state = self.lock();
        state.status_queries += 1;
        match state.vms.get_mut(vm) {
            Some(entry) => Ok(entry.current()),
            None => Ok(VmSnapshot::not_found(vm)),
        }
    }

    async fn host_vm_count(&self, host: &str) -> HostshiftResult<u32> {
        let mut state = self.lock();
        state.count_queries.push(host.to_string());
        match state.host_counts.get(host) {
            Some(Some(count)) => Ok(*count),
            Some(None) => Err(HostshiftError::control_plane(
                "server list",
                format!("host '{}' did not answer", host),
            )),
            None => Err(HostshiftError::control_plane(
                "server list",
                format!("unknown host '{}'", host),
            )),
        }
    }

    async fn host_services(&self) -> HostshiftResult<Vec<HostService>> {
        let state = self.lock();
        if state.services_unavailable {
            return Err(HostshiftError::control_plane(
                "compute service list",
                "service catalog unavailable",
            ));
        }
        let mut services: Vec<HostService> = state
            .host_counts
            .keys()
            .map(|host| {
                let (admin, operational) = state
                    .host_states
                    .get(host)
                    .cloned()
                    .unwrap_or_else(|| ("enabled".to_string(), "up".to_string()));
                HostService {
                    host: host.clone(),
                    admin_state: admin,
                    operational_state: operational,
                }
            })
            .collect();
        services.sort_by(|a, b| a.host.cmp(&b.host));
        Ok(services)
    }

    async fn verify_credentials(&self) -> HostshiftResult<bool> {
        Ok(self.lock().credentials_valid)
    }

    async fn check_dependencies(&self) -> HostshiftResult<()> {
        if self.lock().dependencies_present {
            Ok(())
        } else {
            Err(HostshiftError::dependency_missing(
                "openstack",
                "executable not found on PATH",
            ))
        }
    }

    async fn live_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()> {
        tracing::info!("Mock: live migrating VM '{}' to {}", vm, target);
        self.start_migration(vm, target, MigrationKind::Live)
    }

    async fn cold_migrate(&self, vm: &str, target: &str) -> HostshiftResult<()> {
        tracing::info!("Mock: cold migrating VM '{}' to {}", vm, target);
        self.start_migration(vm, target, MigrationKind::Cold)
    }

    async fn confirm_resize(&self, vm: &str) -> HostshiftResult<()> {
        let mut state = self.lock();
        state.calls.push(ControlPlaneCall::ConfirmResize { vm: vm.to_string() });

        let entry = state.vms.get_mut(vm).ok_or_else(|| {
            HostshiftError::control_plane("resize confirm", format!("unknown VM '{}'", vm))
        })?;
        if entry.reject_confirm {
            return Err(HostshiftError::control_plane(
                "resize confirm",
                format!("Cannot confirm resize of '{}': request rejected", vm),
            ));
        }
        match entry.last().cloned() {
            Some(last) if last.status == VmStatus::VerifyResize => {
                entry.script = vec![VmSnapshot {
                    status: VmStatus::Shutoff,
                    ..last
                }]
                .into();
                Ok(())
            }
            Some(last) => Err(HostshiftError::control_plane(
                "resize confirm",
                format!("VM '{}' is {}, not VERIFY_RESIZE", vm, last.status),
            )),
            None => Err(HostshiftError::control_plane(
                "resize confirm",
                format!("VM '{}' has no state", vm),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_unknown_vm_is_not_found() {
        let cp = MockControlPlane::new();
        let snapshot = cp.find_vm("ghost").await.unwrap();
        assert_eq!(snapshot.status, VmStatus::NotFound);
        assert_eq!(snapshot.id, "ghost");
    }

    #[tokio::test]
    async fn test_mock_script_sticks_on_last_snapshot() {
        let cp = MockControlPlane::new().with_vm_script(
            "vm-1",
            vec![
                VmSnapshot {
                    id: "vm-1".to_string(),
                    status: VmStatus::Migrating,
                    host: Some("h1".to_string()),
                },
                VmSnapshot {
                    id: "vm-1".to_string(),
                    status: VmStatus::Active,
                    host: Some("h2".to_string()),
                },
            ],
        );

        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::Migrating);
        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::Active);
        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::Active);
        assert_eq!(cp.status_queries(), 3);
    }

    #[tokio::test]
    async fn test_mock_live_migration_moves_counts() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("h1"))
            .with_host("h1", 4)
            .with_host("h2", 1);

        cp.live_migrate("vm-1", "h2").await.unwrap();

        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::Migrating);
        let settled = cp.find_vm("vm-1").await.unwrap();
        assert_eq!(settled.status, VmStatus::Active);
        assert!(settled.is_on("h2"));
        assert_eq!(cp.host_count("h1"), Some(3));
        assert_eq!(cp.host_count("h2"), Some(2));
    }

    #[tokio::test]
    async fn test_mock_cold_migration_requires_confirm() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Shutoff, Some("h1"))
            .with_host("h2", 0);

        assert!(cp.confirm_resize("vm-1").await.is_err());

        cp.cold_migrate("vm-1", "h2").await.unwrap();
        cp.find_vm("vm-1").await.unwrap();
        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::VerifyResize);

        cp.confirm_resize("vm-1").await.unwrap();
        let settled = cp.find_vm("vm-1").await.unwrap();
        assert_eq!(settled.status, VmStatus::Shutoff);
        assert!(settled.is_on("h2"));
    }

    #[tokio::test]
    async fn test_mock_unreachable_host() {
        let cp = MockControlPlane::new().with_unreachable_host("h9");
        assert!(cp.host_vm_count("h9").await.is_err());
        assert!(cp.host_vm_count("never-registered").await.is_err());
        assert_eq!(cp.count_queries(), vec!["h9", "never-registered"]);
    }

    #[tokio::test]
    async fn test_mock_rejected_initiation_is_recorded() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("h1"))
            .with_behavior("vm-1", MigrationBehavior::RejectInitiation);

        assert!(cp.live_migrate("vm-1", "h2").await.is_err());
        assert_eq!(
            cp.calls(),
            vec![ControlPlaneCall::LiveMigrate {
                vm: "vm-1".to_string(),
                target: "h2".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_slow_migration_stays_migrating() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Active, Some("h1"))
            .with_behavior("vm-1", MigrationBehavior::Slow { polls: 3 })
            .with_host("h2", 0);

        cp.live_migrate("vm-1", "h2").await.unwrap();

        for _ in 0..3 {
            assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::Migrating);
        }
        let settled = cp.find_vm("vm-1").await.unwrap();
        assert_eq!(settled.status, VmStatus::Active);
        assert!(settled.is_on("h2"));
    }

    #[tokio::test]
    async fn test_mock_vanish_and_failing_confirm() {
        let cp = MockControlPlane::new()
            .with_vm("vm-1", VmStatus::Shutoff, Some("h1"))
            .with_behavior("vm-1", MigrationBehavior::Vanish)
            .with_vm("vm-2", VmStatus::Shutoff, Some("h1"))
            .with_failing_confirm("vm-2");

        cp.cold_migrate("vm-1", "h2").await.unwrap();
        cp.find_vm("vm-1").await.unwrap();
        assert_eq!(cp.find_vm("vm-1").await.unwrap().status, VmStatus::NotFound);

        cp.cold_migrate("vm-2", "h2").await.unwrap();
        cp.find_vm("vm-2").await.unwrap();
        assert_eq!(cp.find_vm("vm-2").await.unwrap().status, VmStatus::VerifyResize);
        assert!(cp.confirm_resize("vm-2").await.is_err());
        assert_eq!(cp.find_vm("vm-2").await.unwrap().status, VmStatus::VerifyResize);
    }
}
