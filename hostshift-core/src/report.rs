//! Read-only status and planning reports
//!
//! Nothing in this module issues mutating control-plane calls.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::warn;

use crate::control_plane::ControlPlane;
use crate::error::HostshiftResult;
use crate::types::{HostSummary, VmSnapshot, VmStatus};

const UNKNOWN: &str = "unknown";

/// One VM as seen right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmRow {
    pub vm: String,
    pub status: VmStatus,
    pub host: Option<String>,
    pub migratable: bool,
}

impl From<VmSnapshot> for VmRow {
    fn from(snapshot: VmSnapshot) -> Self {
        Self {
            migratable: snapshot.status.is_migratable(),
            vm: snapshot.id,
            status: snapshot.status,
            host: snapshot.host,
        }
    }
}

/// Query every VM in order; failed lookups become `QUERY_FAILED` rows
pub async fn collect_vm_rows(control_plane: &dyn ControlPlane, vms: &[String]) -> Vec<VmRow> {
    let mut rows = Vec::with_capacity(vms.len());
    for vm in vms {
        let row = match control_plane.find_vm(vm).await {
            Ok(snapshot) => VmRow::from(VmSnapshot {
                id: vm.clone(),
                ..snapshot
            }),
            Err(e) => {
                warn!("Could not query VM {}: {}", vm, e);
                VmRow {
                    vm: vm.clone(),
                    status: VmStatus::Unknown("QUERY_FAILED".to_string()),
                    host: None,
                    migratable: false,
                }
            }
        };
        rows.push(row);
    }
    rows
}

/// Host rows, either for every compute host or for the given names in order
///
/// Named hosts are counted individually. Their service states are joined
/// from the service listing when it is available and reported as unknown
/// otherwise.
pub async fn collect_host_rows(
    control_plane: &dyn ControlPlane,
    only: Option<&[String]>,
) -> HostshiftResult<Vec<HostSummary>> {
    let Some(names) = only else {
        return control_plane.list_hosts().await;
    };

    let services = match control_plane.host_services().await {
        Ok(services) => services,
        Err(e) => {
            warn!("Could not list compute services: {}", e);
            Vec::new()
        }
    };

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let vm_count = match control_plane.host_vm_count(name).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Could not count VMs on {}: {}", name, e);
                None
            }
        };
        let service = services.iter().find(|s| &s.host == name);
        rows.push(HostSummary {
            host: name.clone(),
            vm_count,
            admin_state: service.map_or_else(|| UNKNOWN.to_string(), |s| s.admin_state.clone()),
            operational_state: service
                .map_or_else(|| UNKNOWN.to_string(), |s| s.operational_state.clone()),
        });
    }
    Ok(rows)
}

/// VMs bucketed by migratability and grouped by current host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanningSummary {
    pub migratable: BTreeMap<String, Vec<String>>,
    pub non_migratable: BTreeMap<String, Vec<(String, VmStatus)>>,
}

impl PlanningSummary {
    pub fn from_rows(rows: &[VmRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            let host = row.host.clone().unwrap_or_else(|| "UNKNOWN".to_string());
            if row.migratable {
                summary.migratable.entry(host).or_default().push(row.vm.clone());
            } else {
                summary
                    .non_migratable
                    .entry(host)
                    .or_default()
                    .push((row.vm.clone(), row.status.clone()));
            }
        }
        summary
    }

    pub fn migratable_count(&self) -> usize {
        self.migratable.values().map(Vec::len).sum()
    }

    pub fn non_migratable_count(&self) -> usize {
        self.non_migratable.values().map(Vec::len).sum()
    }
}

pub fn render_vm_rows(rows: &[VmRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<38} {:<16} {:<24} MIGRATABLE", "VM", "STATUS", "HOST");
    for row in rows {
        let _ = writeln!(
            out,
            "{:<38} {:<16} {:<24} {}",
            row.vm,
            row.status.as_str(),
            row.host.as_deref().unwrap_or("UNKNOWN"),
            if row.migratable { "yes" } else { "no" }
        );
    }
    out
}

pub fn render_host_rows(rows: &[HostSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:>8} {:<10} STATE", "HOST", "VMS", "STATUS");
    for row in rows {
        let count = row
            .vm_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = writeln!(
            out,
            "{:<24} {:>8} {:<10} {}",
            row.host, count, row.admin_state, row.operational_state
        );
    }
    out
}

pub fn render_planning_summary(summary: &PlanningSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Migration planning summary");
    let _ = writeln!(out, "  Migratable VMs:     {}", summary.migratable_count());
    for (host, vms) in &summary.migratable {
        let _ = writeln!(out, "    {} ({}): {}", host, vms.len(), vms.join(", "));
    }
    let _ = writeln!(out, "  Non-migratable VMs: {}", summary.non_migratable_count());
    for (host, vms) in &summary.non_migratable {
        let entries: Vec<String> = vms
            .iter()
            .map(|(vm, status)| format!("{} [{}]", vm, status))
            .collect();
        let _ = writeln!(out, "    {} ({}): {}", host, vms.len(), entries.join(", "));
    }
    out
}
