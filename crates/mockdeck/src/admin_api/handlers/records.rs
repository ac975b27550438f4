//! Recent logs and notifications.

use crate::admin_api::types::{engine_error, parse_limit, read_json, NewNotification};
use crate::engine::MockEngine;
use crate::model::Notification;
use crate::response::{json_response, ResponseBody};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

/// GET /projects/:projectId/logs
pub fn handle_api_logs(
    engine: &Arc<MockEngine>,
    project_id: &str,
    query: Option<&str>,
) -> Response<ResponseBody> {
    match engine
        .repository()
        .recent_api_logs(project_id, parse_limit(query))
    {
        Ok(logs) => json_response(StatusCode::OK, &logs),
        Err(e) => engine_error(&e),
    }
}

/// GET /apis/:apiId/callback-logs
pub fn handle_callback_logs(
    engine: &Arc<MockEngine>,
    api_id: &str,
    query: Option<&str>,
) -> Response<ResponseBody> {
    match engine
        .repository()
        .recent_callback_logs(api_id, parse_limit(query))
    {
        Ok(logs) => json_response(StatusCode::OK, &logs),
        Err(e) => engine_error(&e),
    }
}

/// GET /users/:userId/notifications
pub fn handle_notifications(
    engine: &Arc<MockEngine>,
    user_id: &str,
    query: Option<&str>,
) -> Response<ResponseBody> {
    match engine
        .repository()
        .recent_notifications(user_id, parse_limit(query))
    {
        Ok(notifications) => json_response(StatusCode::OK, &notifications),
        Err(e) => engine_error(&e),
    }
}

/// POST /notifications - Persist and push a notification
pub async fn handle_publish(
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Response<ResponseBody> {
    let new: NewNotification = match read_json(req).await {
        Ok(n) => n,
        Err(response) => return response,
    };
    let notification = Notification::from(new);
    engine.notify(notification.clone());
    json_response(StatusCode::CREATED, &notification)
}
