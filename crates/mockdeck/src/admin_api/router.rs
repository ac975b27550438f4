//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{records, streams, system, workspace};
use crate::engine::MockEngine;
use crate::response::{not_found, ResponseBody};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Parsed admin path; ids borrow from the request path.
#[derive(Debug, PartialEq, Eq)]
enum AdminRoute<'a> {
    /// /
    Root,
    /// /health
    Health,
    /// /metrics
    Metrics,
    /// /workspace
    Workspace,
    /// /streams/projects/:projectId/logs
    ProjectStream(&'a str),
    /// /streams/users/:userId/notifications
    UserStream(&'a str),
    /// /apis/:apiId/rules
    Rules(&'a str),
    /// /apis/:apiId/rules/reorder
    ReorderRules(&'a str),
    /// /apis/:apiId/callbacks
    Callbacks(&'a str),
    /// /apis/:apiId/callbacks/reorder
    ReorderCallbacks(&'a str),
    /// /apis/:apiId/callback-logs
    CallbackLogs(&'a str),
    /// /projects/:projectId/logs
    ApiLogs(&'a str),
    /// /users/:userId/notifications
    UserNotifications(&'a str),
    /// /notifications
    Notifications,
}

impl<'a> AdminRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(AdminRoute::Root),
            ["health"] => Some(AdminRoute::Health),
            ["metrics"] => Some(AdminRoute::Metrics),
            ["workspace"] => Some(AdminRoute::Workspace),
            ["notifications"] => Some(AdminRoute::Notifications),
            ["streams", "projects", id, "logs"] => Some(AdminRoute::ProjectStream(id)),
            ["streams", "users", id, "notifications"] => Some(AdminRoute::UserStream(id)),
            ["apis", id, "rules"] => Some(AdminRoute::Rules(id)),
            ["apis", id, "rules", "reorder"] => Some(AdminRoute::ReorderRules(id)),
            ["apis", id, "callbacks"] => Some(AdminRoute::Callbacks(id)),
            ["apis", id, "callbacks", "reorder"] => Some(AdminRoute::ReorderCallbacks(id)),
            ["apis", id, "callback-logs"] => Some(AdminRoute::CallbackLogs(id)),
            ["projects", id, "logs"] => Some(AdminRoute::ApiLogs(id)),
            ["users", id, "notifications"] => Some(AdminRoute::UserNotifications(id)),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Result<Response<ResponseBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());
    let base_url = get_base_url(&req);

    debug!("Admin API: {} {}", method, path);

    let Some(route) = AdminRoute::parse(&path) else {
        return Ok(not_found());
    };
    let query = query.as_deref();

    let response = match (&method, route) {
        (&Method::GET, AdminRoute::Root) => system::handle_root(&base_url),
        (&Method::GET, AdminRoute::Health) => system::handle_health(),
        (&Method::GET, AdminRoute::Metrics) => system::handle_metrics(),

        (&Method::GET, AdminRoute::ProjectStream(id)) => {
            streams::handle_project_logs(&engine, id)
        }
        (&Method::GET, AdminRoute::UserStream(id)) => {
            streams::handle_user_notifications(&engine, id)
        }

        (&Method::GET, AdminRoute::Workspace) => workspace::handle_get(&engine),
        (&Method::PUT, AdminRoute::Workspace) => workspace::handle_replace(req, engine).await,
        (&Method::POST, AdminRoute::Rules(id)) => {
            workspace::handle_upsert_rule(id, req, engine).await
        }
        (&Method::POST, AdminRoute::ReorderRules(id)) => {
            workspace::handle_reorder_rules(id, req, engine).await
        }
        (&Method::POST, AdminRoute::Callbacks(id)) => {
            workspace::handle_upsert_callback(id, req, engine).await
        }
        (&Method::POST, AdminRoute::ReorderCallbacks(id)) => {
            workspace::handle_reorder_callbacks(id, req, engine).await
        }

        (&Method::GET, AdminRoute::ApiLogs(id)) => records::handle_api_logs(&engine, id, query),
        (&Method::GET, AdminRoute::CallbackLogs(id)) => {
            records::handle_callback_logs(&engine, id, query)
        }
        (&Method::GET, AdminRoute::UserNotifications(id)) => {
            records::handle_notifications(&engine, id, query)
        }
        (&Method::POST, AdminRoute::Notifications) => records::handle_publish(req, engine).await,

        _ => not_found(),
    };
    Ok(response)
}

/// Base URL for links, from the Host header.
fn get_base_url(req: &Request<Incoming>) -> String {
    if let Some(host) = req.headers().get("host") {
        if let Ok(host_str) = host.to_str() {
            return format!("http://{}", host_str);
        }
    }
    "http://localhost:2525".to_string()
}
