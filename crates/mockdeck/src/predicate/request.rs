//! Request context shared by rule conditions and templates.

use hyper::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The parts of an inbound request that rules and templates can read.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    /// Path below the project prefix, e.g. `/users/42`.
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub path_params: HashMap<String, String>,
    /// JSON body, form fields as an object, raw text, or `Null` when empty.
    pub body: Value,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Build from raw request parts.
    pub fn from_parts(
        method: &str,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Self {
        let headers: HashMap<String, String> = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let content_type = headers.get("content-type").map(String::as_str);
        let body = parse_body(content_type, body);

        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            query: parse_query_string(query),
            headers,
            path_params: HashMap::new(),
            body,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Resolve a condition field such as `query.tier`, `header.X-Api-Key`,
    /// `param.id` or `body.items.0.sku`.
    pub fn lookup(&self, field: &str) -> Option<Value> {
        let mut segments = field.split('.');
        let bucket = segments.next()?;
        let rest: Vec<&str> = segments.collect();

        match bucket {
            "query" => flat(&self.query, &rest, false),
            "header" | "headers" => flat(&self.headers, &rest, true),
            "param" | "params" | "pathParams" => flat(&self.path_params, &rest, false),
            "body" => walk(&self.body, &rest).cloned(),
            "method" if rest.is_empty() => Some(Value::String(self.method.clone())),
            "path" if rest.is_empty() => Some(Value::String(self.path.clone())),
            _ => None,
        }
    }
}

fn flat(map: &HashMap<String, String>, rest: &[&str], lowercase: bool) -> Option<Value> {
    if rest.is_empty() {
        return None;
    }
    let key = rest.join(".");
    let key = if lowercase { key.to_lowercase() } else { key };
    map.get(&key).map(|v| Value::String(v.clone()))
}

/// Follow object keys and numeric array indexes into a JSON value.
pub fn walk<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }

    let content_type = content_type.unwrap_or_default().to_lowercase();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let text = String::from_utf8_lossy(body);
        let fields: Map<String, Value> = parse_query_string(Some(&text))
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Value::Object(fields);
    }

    // Anything else is tried as JSON, then kept as text.
    match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(body).into_owned()),
    }
}

/// Parse query string into a HashMap
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let key = urlencoding::decode(key).unwrap_or_default().to_string();
                let value = urlencoding::decode(&value.replace('+', " "))
                    .unwrap_or_default()
                    .to_string();
                params.insert(key, value);
            } else if !pair.is_empty() {
                params.insert(pair.to_string(), String::new());
            }
        }
    }
    params
}

/// Match a path against a pattern with `:name` segments.
///
/// Returns the captured parameters, or `None` when the path does not match.
pub fn extract_path_params(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.trim_end_matches('/').split('/').collect();
    let path_parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            if path_part.is_empty() {
                return None;
            }
            let decoded = urlencoding::decode(path_part).unwrap_or_default().to_string();
            params.insert(param_name.to_string(), decoded);
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string(Some("tier=vip&name=John%20Doe&q=a+b&flag"));
        assert_eq!(params.get("tier"), Some(&"vip".to_string()));
        assert_eq!(params.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(params.get("q"), Some(&"a b".to_string()));
        assert_eq!(params.get("flag"), Some(&String::new()));
        assert!(parse_query_string(None).is_empty());
    }

    #[test]
    fn test_extract_path_params() {
        let params = extract_path_params("/users/:id/orders/:orderId", "/users/42/orders/7").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
        assert_eq!(params.get("orderId"), Some(&"7".to_string()));

        assert!(extract_path_params("/users/:id", "/users/42/orders").is_none());
        assert!(extract_path_params("/users/:id", "/accounts/42").is_none());
        assert!(extract_path_params("/users/", "/users").is_some());
    }

    #[test]
    fn test_from_parts_parses_json_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json".parse().unwrap());
        headers.insert("X-Api-Key", "secret".parse().unwrap());

        let ctx = RequestContext::from_parts(
            "post",
            "/orders",
            Some("tier=vip"),
            &headers,
            br#"{"amount": 15, "items": [{"sku": "A1"}]}"#,
        );

        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.lookup("header.x-api-key"), Some(json!("secret")));
        assert_eq!(ctx.lookup("headers.X-API-KEY"), Some(json!("secret")));
        assert_eq!(ctx.lookup("query.tier"), Some(json!("vip")));
        assert_eq!(ctx.lookup("body.amount"), Some(json!(15)));
        assert_eq!(ctx.lookup("body.items.0.sku"), Some(json!("A1")));
        assert_eq!(ctx.lookup("body.items.5.sku"), None);
        assert_eq!(ctx.lookup("cookie.session"), None);
    }

    #[test]
    fn test_form_and_text_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        let ctx = RequestContext::from_parts("POST", "/", None, &headers, b"a=1&b=two");
        assert_eq!(ctx.lookup("body.b"), Some(json!("two")));

        let ctx = RequestContext::from_parts("POST", "/", None, &HeaderMap::new(), b"plain text");
        assert_eq!(ctx.body, json!("plain text"));

        let ctx = RequestContext::from_parts("GET", "/", None, &HeaderMap::new(), b"");
        assert!(ctx.body.is_null());
    }
}
