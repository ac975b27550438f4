//! Building the mock response from an API's defaults and the matched rule.

use super::body::{MockResponseBuilder, ResponseBody};
use crate::model::{MockApi, MockRule};
use crate::predicate::RequestContext;
use crate::template::{render_mock_body, render_text, ResponseContext, VariableResolver};
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::Response;
use rand::Rng;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Status, headers, body template and delay after applying rule overrides.
#[derive(Debug, Clone)]
pub struct ResponseSpec<'a> {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: &'a Value,
    pub delay_ms: u64,
}

impl<'a> ResponseSpec<'a> {
    /// Rule values win where set; API defaults fill the rest.
    pub fn resolve(api: &'a MockApi, rule: Option<&'a MockRule>) -> Self {
        match rule {
            Some(rule) => Self {
                status_code: rule.status_code.unwrap_or(api.response_status),
                headers: merge_headers(&api.response_headers, &rule.headers),
                body: rule.body.as_ref().unwrap_or(&api.response_body),
                delay_ms: rule.delay.unwrap_or(api.response_delay),
            },
            None => Self {
                status_code: api.response_status,
                headers: merge_headers(&api.response_headers, &BTreeMap::new()),
                body: &api.response_body,
                delay_ms: api.response_delay,
            },
        }
    }
}

/// Defaults first, then overrides; a name present in both (compared
/// case-insensitively) takes the override's value.
pub fn merge_headers(
    defaults: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .iter()
        .filter(|(name, _)| {
            !overrides
                .keys()
                .any(|o| o.eq_ignore_ascii_case(name.as_str()))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// A fully rendered mock response.
#[derive(Debug, Clone)]
pub struct SynthesizedResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub body_bytes: Bytes,
    pub delay: Duration,
}

impl SynthesizedResponse {
    pub fn into_response(self) -> Response<ResponseBody> {
        MockResponseBuilder::from_u16(self.status_code)
            .merge_headers(
                self.headers
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )
            .body(self.body_bytes)
            .build()
    }

    /// What callbacks see as `{{response.*}}`.
    pub fn response_context(&self) -> ResponseContext {
        ResponseContext {
            status_code: self.status_code,
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect::<HashMap<_, _>>(),
            body: self.body.clone(),
        }
    }
}

/// Render a response spec. Pure apart from the supplied RNG; the delay is
/// returned, not applied.
pub fn synthesize<R: Rng + ?Sized>(
    spec: &ResponseSpec<'_>,
    use_faker: bool,
    request: &RequestContext,
    rng: &mut R,
) -> SynthesizedResponse {
    let body = render_mock_body(spec.body, use_faker, request, rng);

    let mut headers: Vec<(String, String)> = if use_faker {
        let mut resolver = VariableResolver::request_only(request);
        spec.headers
            .iter()
            .map(|(k, v)| (k.clone(), render_text(v, &mut resolver)))
            .collect()
    } else {
        spec.headers.clone()
    };

    let body_bytes = match &body {
        Value::Null => Bytes::new(),
        Value::String(text) => Bytes::from(text.clone()),
        other => {
            let has_content_type = headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            if !has_content_type {
                headers.push((CONTENT_TYPE.to_string(), "application/json".to_string()));
            }
            Bytes::from(serde_json::to_vec(other).unwrap_or_default())
        }
    };

    SynthesizedResponse {
        status_code: spec.status_code,
        headers,
        body,
        body_bytes,
        delay: Duration::from_millis(spec.delay_ms),
    }
}
