//! Header handling for forwarded exchanges.

use hyper::header::HeaderName;
use hyper::HeaderMap;

pub static X_MOCKDECK_RULE_ID: HeaderName = HeaderName::from_static("x-mockdeck-rule-id");

/// Connection-scoped headers that never cross the proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Inbound headers suitable for sending upstream.
pub fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == "host" || name == "content-length" {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Upstream headers suitable for relaying to the caller. The body is relayed
/// fully buffered, so framing headers are recomputed by the server.
pub fn relayable_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == "content-length" {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Flatten to string pairs for logging; non-UTF-8 values are skipped.
pub fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}
