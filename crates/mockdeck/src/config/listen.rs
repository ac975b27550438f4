//! Listener configuration for the mock and admin endpoints.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Mock traffic listener (`/{projectShortId}/{mockPath}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_mock_host")]
    pub host: String,
    #[serde(default = "default_mock_port")]
    pub port: u16,
}

fn default_mock_host() -> String {
    "0.0.0.0".to_string()
}

fn default_mock_port() -> u16 {
    8080
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_mock_host(),
            port: default_mock_port(),
        }
    }
}

impl ListenConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        parse_addr(&self.host, self.port)
    }
}

/// Admin listener: health, metrics, live streams and workspace management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_admin_host")]
    pub host: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_admin_host() -> String {
    "127.0.0.1".to_string()
}

fn default_admin_port() -> u16 {
    2525
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_admin_host(),
            port: default_admin_port(),
        }
    }
}

impl AdminConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        parse_addr(&self.host, self.port)
    }
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr, anyhow::Error> {
    format!("{host}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address '{host}:{port}': {e}"))
}
