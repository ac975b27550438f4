//! Projects and mock API definitions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Owner of a set of mock APIs. `short_id` is the first path segment of
/// every mock URL in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub short_id: String,
    #[serde(default)]
    pub name: String,
    /// User that receives this project's notifications.
    pub owner_id: String,
}

/// How a mock API answers: synthesize, forward, or decide per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyMode {
    #[default]
    Mock,
    Proxy,
    Auto,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Mock => "MOCK",
            ProxyMode::Proxy => "PROXY",
            ProxyMode::Auto => "AUTO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockApi {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    /// Path pattern; segments starting with `:` capture path parameters.
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub proxy_mode: ProxyMode,
    #[serde(default)]
    pub use_faker_js: bool,
    #[serde(default)]
    pub response_delay: u64,
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub response_status: u16,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_enabled() -> bool {
    true
}

pub(crate) fn default_status_code() -> u16 {
    200
}

/// Accept `200` or `"200"`.
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        Value::String(s) => s
            .trim()
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("status code must be a number or string")),
    }
}

impl MockApi {
    /// `ANY` (or `*`) accepts every method; otherwise case-insensitive match.
    pub fn accepts_method(&self, method: &str) -> bool {
        let configured = self.method.trim();
        configured.eq_ignore_ascii_case("ANY")
            || configured == "*"
            || configured.eq_ignore_ascii_case(method)
    }

    pub fn has_default_body(&self) -> bool {
        !is_empty_body(&self.response_body)
    }
}

/// Null, blank strings and empty containers count as "no body".
pub fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_api_defaults() {
        let api: MockApi = serde_json::from_value(json!({
            "id": "a1",
            "projectId": "p1",
            "path": "/users/:id"
        }))
        .unwrap();

        assert_eq!(api.method, "GET");
        assert_eq!(api.proxy_mode, ProxyMode::Mock);
        assert_eq!(api.response_status, 200);
        assert!(!api.use_faker_js);
        assert!(api.enabled);
        assert!(!api.has_default_body());
    }

    #[test]
    fn test_camel_case_fields() {
        let api: MockApi = serde_json::from_value(json!({
            "id": "a1",
            "projectId": "p1",
            "path": "/orders",
            "method": "ANY",
            "proxyMode": "AUTO",
            "useFakerJs": true,
            "responseStatus": "201",
            "responseBody": {"ok": true},
            "baseUrl": "https://upstream.test"
        }))
        .unwrap();

        assert_eq!(api.proxy_mode, ProxyMode::Auto);
        assert!(api.use_faker_js);
        assert_eq!(api.response_status, 201);
        assert!(api.accepts_method("DELETE"));
        assert_eq!(api.base_url.as_deref(), Some("https://upstream.test"));
    }

    #[test]
    fn test_accepts_method_case_insensitive() {
        let mut api: MockApi = serde_json::from_value(json!({
            "id": "a1", "projectId": "p1", "path": "/", "method": "post"
        }))
        .unwrap();
        assert!(api.accepts_method("POST"));
        assert!(!api.accepts_method("GET"));

        api.method = "*".to_string();
        assert!(api.accepts_method("GET"));
    }

    #[test]
    fn test_is_empty_body() {
        assert!(is_empty_body(&Value::Null));
        assert!(is_empty_body(&json!("  ")));
        assert!(is_empty_body(&json!({})));
        assert!(is_empty_body(&json!([])));
        assert!(!is_empty_body(&json!(0)));
        assert!(!is_empty_body(&json!({"a": 1})));
    }
}
