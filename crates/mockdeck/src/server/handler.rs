//! Mock traffic handling: route, select a rule, answer from the mock or
//! the upstream, then log and fire callbacks once the body is out.

use crate::callback::CallbackJob;
use crate::engine::MockEngine;
use crate::error::EngineError;
use crate::metrics;
use crate::model::{
    new_id, snippet, ApiLog, CapturedRequest, CapturedResponse, MockApi, MockRule, Notification,
    NotificationKind,
};
use crate::predicate::{parse_body, select_rule, RequestContext};
use crate::proxy::headers::{header_pairs, X_MOCKDECK_RULE_ID};
use crate::proxy::{self, upstream_url, Dispatch, Forwarder};
use crate::response::{error_response, synthesize, tracked, ResponseBody, ResponseSpec};
use crate::template::ResponseContext;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, warn};

/// How a request was answered, plus what the log and callbacks need.
struct Outcome {
    response: Response<ResponseBody>,
    body: Bytes,
    mode: &'static str,
    rule_id: Option<String>,
    proxy_url: Option<String>,
    /// Absent when the request failed and no callbacks should fire.
    callback_response: Option<ResponseContext>,
    error: Option<String>,
}

impl Outcome {
    fn failed(error: &EngineError, proxy_url: Option<String>) -> Self {
        let message = error.to_string();
        let response = error_response(error.status_code(), &message);
        Self {
            response,
            body: Bytes::from(json!({ "error": message }).to_string()),
            mode: "proxy",
            rule_id: None,
            proxy_url,
            callback_response: None,
            error: Some(message),
        }
    }
}

/// Handle one request on the mock listener.
pub async fn handle_request(
    engine: &MockEngine,
    req: Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let start_time = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.as_str().to_uppercase();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(str::to_string);

    debug!("Received request: {} {}", method, parts.uri);

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body from {}: {}", remote_addr, e);
            metrics::record_request(&method, 400, "unmatched", elapsed_ms(start_time));
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ));
        }
    };

    let snapshot = engine.snapshot();
    let Some(route) = snapshot.lookup(&method, &path) else {
        debug!("No mock API matches {} {}", method, path);
        metrics::record_request(&method, 404, "unmatched", elapsed_ms(start_time));
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            &format!("No mock API matches {method} {path}"),
        ));
    };
    let api = route.api;

    let mut request = RequestContext::from_parts(
        &method,
        &route.mock_path,
        query.as_deref(),
        &parts.headers,
        &body,
    );
    request.path_params = route.path_params.clone();

    let rule = select_rule(snapshot.rules(&api.id), &request);
    if let Some(rule) = rule {
        debug!("Request matched rule {} of mock API {}", rule.id, api.id);
    }

    let outcome = match proxy::decide(api, rule.is_some()) {
        Ok(Dispatch::Mock) => serve_mock(api, rule, &request).await,
        Ok(Dispatch::Proxy { base_url }) => {
            let url = upstream_url(base_url, &route.remainder, query.as_deref());
            serve_proxy(
                engine.forwarder(),
                parts.method.clone(),
                url,
                &parts.headers,
                body.clone(),
            )
            .await
        }
        Err(e) => Outcome::failed(&e, None),
    };

    let response_time = start_time.elapsed().as_millis() as u64;
    let status = outcome.response.status().as_u16();
    metrics::record_request(&method, status, outcome.mode, elapsed_ms(start_time));

    if let Some(error) = &outcome.error {
        warn!("Mock API {} failed to answer {} {}: {}", api.id, method, path, error);
        engine.notify(proxy_failure_notification(
            &route.project.owner_id,
            &route.project.id,
            api,
            outcome.proxy_url.as_deref(),
            error,
        ));
    }

    let limit = engine.config().logs.body_limit;
    let log = ApiLog {
        id: new_id(),
        project_id: route.project.id.clone(),
        api_id: api.id.clone(),
        rule_id: outcome.rule_id.clone(),
        method: method.clone(),
        path: route.mock_path.clone(),
        status_code: status,
        response_time,
        ip: Some(client_ip(&parts.headers, remote_addr)),
        is_proxied: outcome.proxy_url.is_some(),
        proxy_url: outcome.proxy_url.clone(),
        request: CapturedRequest {
            query: request
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            headers: header_pairs(&parts.headers).into_iter().collect(),
            body: snippet(&body, limit),
        },
        response: CapturedResponse {
            headers: header_pairs(outcome.response.headers())
                .into_iter()
                .collect(),
            body: snippet(&outcome.body, limit),
        },
        error: outcome.error.clone(),
        timestamp: Utc::now(),
    };

    let callbacks = snapshot.callbacks(&api.id);
    let job = match outcome.callback_response {
        Some(response) if !callbacks.is_empty() => Some(CallbackJob {
            project_id: route.project.id.clone(),
            owner_id: route.project.owner_id.clone(),
            api_id: api.id.clone(),
            callbacks: callbacks.to_vec(),
            request,
            response,
        }),
        _ => None,
    };

    let (response, sent) = tracked(outcome.response);
    let events = engine.events().clone();
    let dispatcher = engine.callbacks().clone();
    tokio::spawn(async move {
        // Resolves on completion or when the connection drops the body.
        let _ = sent.await;
        events.api_log(log);
        if let Some(job) = job {
            dispatcher.dispatch(job);
        }
    });

    Ok(response)
}

async fn serve_mock(api: &MockApi, rule: Option<&MockRule>, request: &RequestContext) -> Outcome {
    let spec = ResponseSpec::resolve(api, rule);
    let synthesized = {
        let mut rng = StdRng::from_entropy();
        synthesize(&spec, api.use_faker_js, request, &mut rng)
    };

    if !synthesized.delay.is_zero() {
        debug!("Delaying mock response by {:?}", synthesized.delay);
        tokio::time::sleep(synthesized.delay).await;
    }

    let callback_response = synthesized.response_context();
    let body = synthesized.body_bytes.clone();
    let mut response = synthesized.into_response();
    if let Some(rule) = rule {
        if let Ok(value) = HeaderValue::from_str(&rule.id) {
            response
                .headers_mut()
                .insert(X_MOCKDECK_RULE_ID.clone(), value);
        }
    }

    Outcome {
        response,
        body,
        mode: "mock",
        rule_id: rule.map(|r| r.id.clone()),
        proxy_url: None,
        callback_response: Some(callback_response),
        error: None,
    }
}

async fn serve_proxy(
    forwarder: &Forwarder,
    method: Method,
    url: String,
    headers: &HeaderMap,
    body: Bytes,
) -> Outcome {
    let start_time = Instant::now();
    match forwarder.forward(method, &url, headers, body).await {
        Ok(upstream) => {
            metrics::record_proxy("success", upstream.latency_ms);
            debug!("Proxied to {} -> {}", url, upstream.status);

            let content_type = upstream
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let callback_response = ResponseContext {
                status_code: upstream.status.as_u16(),
                headers: header_pairs(&upstream.headers)
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v))
                    .collect::<HashMap<_, _>>(),
                body: parse_body(content_type, &upstream.body),
            };
            let body = upstream.body.clone();

            Outcome {
                response: upstream.into_response(),
                body,
                mode: "proxy",
                rule_id: None,
                proxy_url: Some(url),
                callback_response: Some(callback_response),
                error: None,
            }
        }
        Err(e) => {
            let outcome = match e {
                EngineError::Timeout(_) => "timeout",
                _ => "error",
            };
            metrics::record_proxy(outcome, start_time.elapsed().as_millis() as u64);
            Outcome::failed(&e, Some(url))
        }
    }
}

fn proxy_failure_notification(
    owner_id: &str,
    project_id: &str,
    api: &MockApi,
    proxy_url: Option<&str>,
    error: &str,
) -> Notification {
    let name = if api.name.is_empty() {
        api.path.as_str()
    } else {
        api.name.as_str()
    };
    Notification::new(
        owner_id,
        NotificationKind::ProxyError,
        format!("Proxy request for \"{name}\" failed"),
        error,
    )
    .with_project(project_id)
    .with_metadata(json!({
        "apiId": api.id,
        "proxyUrl": proxy_url,
    }))
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_ip(headers: &HeaderMap, remote_addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| remote_addr.ip().to_string())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
