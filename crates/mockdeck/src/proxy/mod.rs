//! Mock/proxy mode selection and upstream forwarding.

pub mod forwarding;
pub mod headers;

use crate::error::{EngineError, Result};
use crate::model::{MockApi, ProxyMode};

pub use forwarding::{Forwarder, UpstreamResponse};

/// How one request to a mock API is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'a> {
    Mock,
    Proxy { base_url: &'a str },
}

/// Pick MOCK or PROXY for a request.
///
/// AUTO mocks when a rule matched or the API has a non-empty default body,
/// and forwards otherwise. AUTO without a base URL always mocks. PROXY
/// without a base URL is an upstream failure.
pub fn decide(api: &MockApi, rule_matched: bool) -> Result<Dispatch<'_>> {
    let base_url = api
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());

    match (api.proxy_mode, base_url) {
        (ProxyMode::Mock, _) => Ok(Dispatch::Mock),
        (ProxyMode::Proxy, Some(base_url)) => Ok(Dispatch::Proxy { base_url }),
        (ProxyMode::Proxy, None) => Err(EngineError::Upstream(format!(
            "mock API {} has no baseUrl",
            api.id
        ))),
        (ProxyMode::Auto, None) => Ok(Dispatch::Mock),
        (ProxyMode::Auto, Some(base_url)) => {
            if rule_matched || api.has_default_body() {
                Ok(Dispatch::Mock)
            } else {
                Ok(Dispatch::Proxy { base_url })
            }
        }
    }
}

/// `base_url` joined with the part of the path beyond the API's pattern,
/// plus the original query string.
pub fn upstream_url(base_url: &str, remainder: &str, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut url = if remainder.is_empty() || remainder == "/" {
        base.to_string()
    } else if remainder.starts_with('/') {
        format!("{base}{remainder}")
    } else {
        format!("{base}/{remainder}")
    };
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}
