//! `[network_idle]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [network_idle]
//! timeout_ms = 200    # Quiet window after navigation
//! max_inflight = 0    # Requests tolerated as "idle"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network idle detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkIdleConfig {
    pub timeout_ms: u64,
    pub max_inflight: usize,
}

impl Default for NetworkIdleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 200,
            max_inflight: 0,
        }
    }
}

impl NetworkIdleConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
