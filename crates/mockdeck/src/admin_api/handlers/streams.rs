//! Live SSE streams for dashboards.

use crate::admin_api::types::event_stream_response;
use crate::broadcast::Topic;
use crate::engine::MockEngine;
use crate::response::{error_response, ResponseBody};
use http_body_util::BodyExt;
use hyper::{Response, StatusCode};
use std::sync::Arc;

/// GET /streams/projects/:projectId/logs
pub fn handle_project_logs(engine: &Arc<MockEngine>, project_id: &str) -> Response<ResponseBody> {
    if engine.snapshot().project(project_id).is_none() {
        return error_response(
            StatusCode::NOT_FOUND,
            &format!("project not found: {project_id}"),
        );
    }
    let body = engine
        .broadcaster()
        .stream(Topic::Project(project_id.to_string()));
    event_stream_response(body.boxed_unsync())
}

/// GET /streams/users/:userId/notifications
pub fn handle_user_notifications(engine: &Arc<MockEngine>, user_id: &str) -> Response<ResponseBody> {
    let body = engine.broadcaster().stream(Topic::User(user_id.to_string()));
    event_stream_response(body.boxed_unsync())
}
