//! Server configuration.

mod listen;
mod streams;
mod upstream;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use listen::{AdminConfig, ListenConfig};
pub use streams::{LogsConfig, StreamsConfig};
pub use upstream::{CallbackConfig, ProxyConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub callbacks: CallbackConfig,
    #[serde(default)]
    pub streams: StreamsConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    /// Workspace file (JSON or YAML) loaded at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

impl ServerConfig {
    /// Load from a YAML or JSON file (chosen by extension) and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let config: ServerConfig = if is_json {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.listen.socket_addr()?;
        if self.admin.enabled {
            self.admin.socket_addr()?;
            if self.admin.port == self.listen.port
                && self.admin.port != 0
                && self.admin.host == self.listen.host
            {
                anyhow::bail!(
                    "Admin listener and mock listener cannot share {}:{}",
                    self.listen.host,
                    self.listen.port
                );
            }
        }

        if self.proxy.timeout_ms == 0 {
            anyhow::bail!("proxy.timeout_ms must be greater than 0");
        }
        if self.proxy.connect_timeout_ms > self.proxy.timeout_ms {
            anyhow::bail!(
                "proxy.connect_timeout_ms ({}) cannot exceed proxy.timeout_ms ({})",
                self.proxy.connect_timeout_ms,
                self.proxy.timeout_ms
            );
        }
        if self.callbacks.timeout_ms == 0 {
            anyhow::bail!("callbacks.timeout_ms must be greater than 0");
        }
        if self.streams.heartbeat_secs == 0 {
            anyhow::bail!("streams.heartbeat_secs must be greater than 0");
        }
        if self.streams.buffer == 0 {
            anyhow::bail!("streams.buffer must be greater than 0");
        }
        if self.logs.capacity == 0 {
            anyhow::bail!("logs.capacity must be greater than 0");
        }

        Ok(())
    }
}
