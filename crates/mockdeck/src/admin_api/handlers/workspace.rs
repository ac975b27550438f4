//! Configuration handlers: workspace, rules and callbacks.

use crate::admin_api::types::{
    bad_request, collect_body, engine_error, read_json, ReorderRequest,
};
use crate::engine::MockEngine;
use crate::model::{MockCallback, MockRule, Workspace};
use crate::response::{json_response, ResponseBody};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Read a JSON object body and deserialize it with `apiId` taken from
/// the path.
async fn read_json_for_api<T: DeserializeOwned>(
    req: Request<Incoming>,
    api_id: &str,
) -> Result<T, Response<ResponseBody>> {
    let mut value: Value = read_json(req).await?;
    match value.as_object_mut() {
        Some(object) => {
            object.insert("apiId".to_string(), Value::String(api_id.to_string()));
        }
        None => return Err(bad_request("Expected a JSON object")),
    }
    serde_json::from_value(value).map_err(|e| bad_request(&format!("Invalid JSON: {e}")))
}

/// GET /workspace
pub fn handle_get(engine: &Arc<MockEngine>) -> Response<ResponseBody> {
    match engine.repository().workspace() {
        Ok(workspace) => json_response(StatusCode::OK, &workspace),
        Err(e) => engine_error(&e),
    }
}

/// PUT /workspace - Lint, then replace everything
pub async fn handle_replace(
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return bad_request(&e),
    };
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("Invalid JSON: {e}")),
    };

    let workspace = match Workspace::from_value(value, "PUT /workspace") {
        Ok(ws) => ws,
        Err(e) => return engine_error(&e),
    };
    let summary = json!({
        "projects": workspace.projects.len(),
        "apis": workspace.apis.len(),
        "rules": workspace.rules.len(),
        "callbacks": workspace.callbacks.len(),
    });

    match engine.replace_workspace(workspace) {
        Ok(()) => {
            info!("Workspace replaced: {}", summary);
            json_response(StatusCode::OK, &summary)
        }
        Err(e) => engine_error(&e),
    }
}

/// POST /apis/:apiId/rules - Insert or replace a rule
pub async fn handle_upsert_rule(
    api_id: &str,
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let rule: MockRule = match read_json_for_api(req, api_id).await {
        Ok(r) => r,
        Err(response) => return response,
    };

    match engine.upsert_rule(rule) {
        Ok(rule) => json_response(StatusCode::OK, &rule),
        Err(e) => engine_error(&e),
    }
}

/// POST /apis/:apiId/callbacks - Insert or replace a callback
pub async fn handle_upsert_callback(
    api_id: &str,
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let callback: MockCallback = match read_json_for_api(req, api_id).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    match engine.upsert_callback(callback) {
        Ok(callback) => json_response(StatusCode::OK, &callback),
        Err(e) => engine_error(&e),
    }
}

/// POST /apis/:apiId/rules/reorder
pub async fn handle_reorder_rules(
    api_id: &str,
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let reorder: ReorderRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return response,
    };
    match engine.reorder_rules(api_id, &reorder.ids) {
        Ok(rules) => json_response(StatusCode::OK, &rules),
        Err(e) => engine_error(&e),
    }
}

/// POST /apis/:apiId/callbacks/reorder
pub async fn handle_reorder_callbacks(
    api_id: &str,
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let reorder: ReorderRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return response,
    };
    match engine.reorder_callbacks(api_id, &reorder.ids) {
        Ok(callbacks) => json_response(StatusCode::OK, &callbacks),
        Err(e) => engine_error(&e),
    }
}
