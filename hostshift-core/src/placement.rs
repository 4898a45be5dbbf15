//! Target host selection
//!
//! Counts are fetched fresh for every VM. The hosts file is the candidate
//! set; a host that cannot report its load is skipped rather than assumed
//! empty.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::control_plane::ControlPlane;
use crate::error::{HostshiftError, HostshiftResult};

/// Strategy used to rank candidate hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    /// Fewest VMs wins; ties go to the host listed first
    #[default]
    VmCount,
}

impl PlacementStrategy {
    /// Resolve a configuration tag such as `"vm_count"`
    pub fn from_tag(tag: &str) -> HostshiftResult<Self> {
        match tag.trim() {
            "vm_count" => Ok(PlacementStrategy::VmCount),
            other => Err(HostshiftError::invalid_config(
                "balancing.strategy",
                other,
                "supported strategies: vm_count",
            )),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            PlacementStrategy::VmCount => "vm_count",
        }
    }
}

/// Where a VM should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementDecision {
    /// The VM's current host is one of the targets; nothing to do
    AlreadyOnTarget { host: String },
    /// Least-loaded reachable target
    Selected { host: String, vm_count: u32 },
    /// No target could report its load
    NoHostAvailable,
}

/// Pick a target host for a VM currently on `current_host`
///
/// Membership is an exact, case-sensitive match. When the VM already sits
/// on a target no counts are queried.
pub async fn select_target(
    control_plane: &dyn ControlPlane,
    strategy: PlacementStrategy,
    current_host: Option<&str>,
    candidates: &[String],
) -> PlacementDecision {
    if let Some(current) = current_host {
        if candidates.iter().any(|h| h == current) {
            return PlacementDecision::AlreadyOnTarget {
                host: current.to_string(),
            };
        }
    }

    match strategy {
        PlacementStrategy::VmCount => least_loaded(control_plane, candidates).await,
    }
}

async fn least_loaded(control_plane: &dyn ControlPlane, candidates: &[String]) -> PlacementDecision {
    let mut best: Option<(&String, u32)> = None;

    for host in candidates {
        match control_plane.host_vm_count(host).await {
            Ok(count) => {
                debug!("Host {} has {} VMs", host, count);
                // Strict comparison keeps the first host on ties
                if best.map_or(true, |(_, min)| count < min) {
                    best = Some((host, count));
                }
            }
            Err(e) => {
                warn!("Excluding host {} from selection: {}", host, e);
            }
        }
    }

    match best {
        Some((host, vm_count)) => {
            info!("Selected target host {} ({} VMs)", host, vm_count);
            PlacementDecision::Selected {
                host: host.clone(),
                vm_count,
            }
        }
        None => PlacementDecision::NoHostAvailable,
    }
}
