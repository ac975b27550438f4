//! Webhook callbacks fired after a mock API responds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockCallback {
    pub id: String,
    pub api_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub order: i64,
    /// Target URL; may itself contain `{{request.*}}` / `{{response.*}}` variables.
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
    /// Milliseconds to wait after the response before firing.
    #[serde(default)]
    pub delay: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_method() -> String {
    "POST".to_string()
}
