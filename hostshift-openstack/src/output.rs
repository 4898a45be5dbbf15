//! JSON shapes produced by `openstack ... -f json`

use serde::Deserialize;

/// Subset of `server show`
#[derive(Debug, Deserialize)]
pub struct ServerShow {
    pub status: String,

    /// Requires an admin role; absent or null otherwise
    #[serde(rename = "OS-EXT-SRV-ATTR:host", default)]
    pub host: Option<String>,
}

impl ServerShow {
    pub fn host(&self) -> Option<String> {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
    }
}

/// One row of `compute service list`
#[derive(Debug, Deserialize)]
pub struct ComputeService {
    #[serde(rename = "Host")]
    pub host: String,

    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "State", default)]
    pub state: String,
}

/// Error text the CLI prints when a server lookup matches nothing
pub const NO_SERVER_MARKER: &str = "No server with a name or ID";
