//! Live stream and log retention settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamsConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Per-subscriber queue length. A subscriber whose queue fills is dropped.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_buffer() -> usize {
    256
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            buffer: default_buffer(),
        }
    }
}

impl StreamsConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogsConfig {
    /// Rows kept per log kind by the in-memory repository.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Captured request/response bodies are truncated to this many bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_capacity() -> usize {
    1_000
}

fn default_body_limit() -> usize {
    4_096
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            body_limit: default_body_limit(),
        }
    }
}
