//! Prober configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP settings for probing nodes.
///
/// Every field has a default so a partial `[probe]` table is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Overall per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of nodes probed at the same time (at least 1).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_max_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    format!("nodereg/{}", env!("CARGO_PKG_VERSION"))
}

impl ProbeConfig {
    /// Overall request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Probe concurrency, clamped to at least one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Sets the probe concurrency.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}
