//! Rendering a callback definition into a concrete outbound request.

use crate::model::MockCallback;
use crate::predicate::RequestContext;
use crate::template::{render, render_text, ResponseContext, VariableResolver};
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeMap;

/// A callback with every variable substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCallback {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
}

impl PreparedCallback {
    /// Substitute request and response variables into url, headers and
    /// body. Faker placeholders are not evaluated here.
    pub fn render(
        callback: &MockCallback,
        request: &RequestContext,
        response: &ResponseContext,
    ) -> Self {
        let mut resolver = VariableResolver::with_response(request, response);

        let url = render_text(callback.url.trim(), &mut resolver);
        let mut headers: BTreeMap<String, String> = callback
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), render_text(v, &mut resolver)))
            .collect();

        let body = match render(&callback.body, &mut resolver) {
            Value::Null => None,
            Value::String(text) => Some(Bytes::from(text)),
            other => {
                if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                    headers.insert("Content-Type".to_string(), "application/json".to_string());
                }
                Some(Bytes::from(serde_json::to_vec(&other).unwrap_or_default()))
            }
        };

        Self {
            method: callback.method.trim().to_uppercase(),
            url,
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn callback(body: Value) -> MockCallback {
        serde_json::from_value(json!({
            "id": "c1",
            "apiId": "a1",
            "url": "https://hooks.test/orders/{{request.body.orderId}}?status={{response.statusCode}}",
            "method": "put",
            "headers": {"X-Trace": "{{request.headers.x-trace}}"},
            "body": body
        }))
        .unwrap()
    }

    fn request() -> RequestContext {
        RequestContext::new("POST", "/orders")
            .with_header("X-Trace", "t-7")
            .with_body(json!({"orderId": 123, "customer": {"email": "a@b.test"}}))
    }

    fn response() -> ResponseContext {
        ResponseContext {
            status_code: 201,
            headers: HashMap::new(),
            body: json!({"status": "created"}),
        }
    }

    #[test]
    fn test_renders_url_headers_and_json_body() {
        let prepared = PreparedCallback::render(
            &callback(json!({
                "order": "{{request.body.orderId}}",
                "email": "{{request.body.customer.email}}",
                "status": "{{response.body.status}}",
                "id": "{{string.uuid}}"
            })),
            &request(),
            &response(),
        );

        assert_eq!(prepared.method, "PUT");
        assert_eq!(prepared.url, "https://hooks.test/orders/123?status=201");
        assert_eq!(prepared.headers.get("X-Trace").map(String::as_str), Some("t-7"));
        assert_eq!(
            prepared.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );

        let body: Value = serde_json::from_slice(prepared.body.as_ref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "order": 123,
                "email": "a@b.test",
                "status": "created",
                "id": "{{string.uuid}}"
            })
        );
    }

    #[test]
    fn test_text_and_empty_bodies() {
        let prepared = PreparedCallback::render(
            &callback(json!("order {{request.body.orderId}} done")),
            &request(),
            &response(),
        );
        assert_eq!(prepared.body.as_deref(), Some(&b"order 123 done"[..]));
        assert!(!prepared.headers.contains_key("Content-Type"));

        let prepared = PreparedCallback::render(&callback(Value::Null), &request(), &response());
        assert!(prepared.body.is_none());
    }
}
