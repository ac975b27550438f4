//! System handlers: service info, health, metrics.

use crate::metrics::collect_metrics;
use crate::response::{full_body, json_response, ResponseBody};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// GET / - Service info and links
pub fn handle_root(base_url: &str) -> Response<ResponseBody> {
    let body = serde_json::json!({
        "name": "mockdeck",
        "version": env!("CARGO_PKG_VERSION"),
        "_links": {
            "health": {"href": format!("{base_url}/health")},
            "metrics": {"href": format!("{base_url}/metrics")},
            "workspace": {"href": format!("{base_url}/workspace")}
        }
    });
    json_response(StatusCode::OK, &body)
}

/// GET /health - Health check
pub fn handle_health() -> Response<ResponseBody> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics() -> Response<ResponseBody> {
    let mut response = Response::new(full_body(collect_metrics()));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}
