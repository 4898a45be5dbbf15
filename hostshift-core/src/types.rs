use serde::{Deserialize, Serialize};
use std::fmt;

/// VM status as reported by the compute control plane
///
/// Statuses the migration logic acts on have their own variant; anything
/// else the platform reports is preserved verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VmStatus {
    Active,
    Shutoff,
    Error,
    Migrating,
    VerifyResize,
    NotFound,
    Unknown(String),
}

impl VmStatus {
    /// Parse a platform status string (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => VmStatus::Active,
            "SHUTOFF" => VmStatus::Shutoff,
            "ERROR" => VmStatus::Error,
            "MIGRATING" => VmStatus::Migrating,
            "VERIFY_RESIZE" => VmStatus::VerifyResize,
            "NOT_FOUND" => VmStatus::NotFound,
            _ => VmStatus::Unknown(raw.trim().to_string()),
        }
    }

    /// Platform spelling of the status
    pub fn as_str(&self) -> &str {
        match self {
            VmStatus::Active => "ACTIVE",
            VmStatus::Shutoff => "SHUTOFF",
            VmStatus::Error => "ERROR",
            VmStatus::Migrating => "MIGRATING",
            VmStatus::VerifyResize => "VERIFY_RESIZE",
            VmStatus::NotFound => "NOT_FOUND",
            VmStatus::Unknown(raw) => raw,
        }
    }

    /// The migration kind this status calls for, if the VM can be moved at all
    pub fn migration_kind(&self) -> Option<MigrationKind> {
        match self {
            VmStatus::Active => Some(MigrationKind::Live),
            VmStatus::Shutoff => Some(MigrationKind::Cold),
            _ => None,
        }
    }

    pub fn is_migratable(&self) -> bool {
        self.migration_kind().is_some()
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for VmStatus {
    fn from(raw: &str) -> Self {
        VmStatus::parse(raw)
    }
}

/// How a VM is moved between hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationKind {
    /// Running VM moved with minimal downtime
    Live,
    /// Powered-off VM moved, finalized by confirm-resize
    Cold,
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationKind::Live => f.write_str("live"),
            MigrationKind::Cold => f.write_str("cold"),
        }
    }
}

/// Point-in-time view of a VM, fetched fresh on every query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub id: String,
    pub status: VmStatus,
    /// Current compute host, `None` when the platform does not report one
    pub host: Option<String>,
}

impl VmSnapshot {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: VmStatus::NotFound,
            host: None,
        }
    }

    pub fn host_or_unknown(&self) -> &str {
        self.host.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn is_on(&self, host: &str) -> bool {
        self.host.as_deref() == Some(host)
    }
}

/// Compute host as listed by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    pub host: String,
    /// VM count, `None` when it could not be queried
    pub vm_count: Option<u32>,
    /// Administrative state (`enabled` / `disabled`)
    pub admin_state: String,
    /// Operational state (`up` / `down`)
    pub operational_state: String,
}

/// Compute service entry for a host, without load information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostService {
    pub host: String,
    pub admin_state: String,
    pub operational_state: String,
}

/// Result of a single migration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Succeeded,
    InitiationFailed,
    TimedOut,
    Errored,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::InitiationFailed => "initiation failed",
            AttemptOutcome::TimedOut => "timed out",
            AttemptOutcome::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// Record of one migration attempt; logged and then discarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationAttempt {
    pub vm: String,
    pub source_host: Option<String>,
    pub target_host: String,
    pub kind: MigrationKind,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}
