//! Query-side configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for query execution. Environment variables override defaults;
/// values are deliberately few since the tool is a thin facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Bound on each executor call. Expiry surfaces as a query timeout.
    pub timeout_secs: u64,
    /// WMI namespace queried by the platform executor.
    pub namespace: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            namespace: "root/cimv2".to_string(),
        }
    }
}

impl QueryConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("WMICTL_QUERY_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse::<u64>() {
                if secs > 0 {
                    config.timeout_secs = secs;
                }
            }
        }
        if let Ok(ns) = std::env::var("WMICTL_NAMESPACE") {
            if !ns.is_empty() {
                config.namespace = ns;
            }
        }
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
