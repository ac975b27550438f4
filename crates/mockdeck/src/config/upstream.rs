//! Outbound HTTP settings for proxying and callbacks.

use mockdeck_lint::limits::MAX_CALLBACK_DELAY_MS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Total time allowed for one upstream exchange.
    #[serde(default = "default_proxy_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Idle keep-alive connections kept per upstream host (0 disables pooling).
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

fn default_proxy_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_max_idle_per_host() -> usize {
    32
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_proxy_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackConfig {
    #[serde(default = "default_callback_timeout_ms")]
    pub timeout_ms: u64,
    /// Callback delays are clamped to this value.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_callback_timeout_ms() -> u64 {
    10_000
}

fn default_max_delay_ms() -> u64 {
    MAX_CALLBACK_DELAY_MS
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_callback_timeout_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl CallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay_for(&self, requested_ms: u64) -> Duration {
        Duration::from_millis(requested_ms.min(self.max_delay_ms))
    }
}
