//! Load-balancing configuration

use super::defaults::*;
use super::EnvLookup;
use crate::error::HostshiftResult;
use crate::placement::PlacementStrategy;
use serde::{Deserialize, Serialize};

/// Load-balancing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancingConfig {
    /// Strategy tag used to pick a target host
    pub strategy: String,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_BALANCE_STRATEGY.to_string(),
        }
    }
}

impl BalancingConfig {
    /// Resolve the configured tag to a placement strategy
    pub fn strategy(&self) -> HostshiftResult<PlacementStrategy> {
        PlacementStrategy::from_tag(&self.strategy)
    }

    pub(crate) fn apply_env(&mut self, lookup: EnvLookup<'_>) {
        if let Some(val) = lookup("HOSTSHIFT_BALANCE_STRATEGY") {
            self.strategy = val;
        }
    }

    pub fn validate(&self) -> HostshiftResult<()> {
        self.strategy().map(|_| ())
    }
}
