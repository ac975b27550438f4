//! Request bodies and response helpers for the Admin API.

use crate::error::EngineError;
use crate::model::{Notification, NotificationKind};
use crate::predicate::parse_query_string;
use crate::response::{error_response, ResponseBody};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 1000;

/// `{"ids": [...]}`: the full new order.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

/// Notification published by a collaborator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

impl From<NewNotification> for Notification {
    fn from(new: NewNotification) -> Self {
        let mut notification = Notification::new(new.user_id, new.kind, new.title, new.content)
            .with_metadata(new.metadata);
        notification.project_id = new.project_id;
        notification
    }
}

/// `?limit=N`, defaulting to [`DEFAULT_LIMIT`] and capped at [`MAX_LIMIT`].
pub fn parse_limit(query: Option<&str>) -> usize {
    parse_query_string(query)
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT)
}

pub fn engine_error(error: &EngineError) -> Response<ResponseBody> {
    error_response(error.status_code(), &error.to_string())
}

pub fn bad_request(message: &str) -> Response<ResponseBody> {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Headers for a `text/event-stream` response.
pub fn event_stream_response(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Deserialize a JSON request body.
pub async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<ResponseBody>> {
    let body = collect_body(req).await.map_err(|e| bad_request(&e))?;
    serde_json::from_slice(&body).map_err(|e| bad_request(&format!("Invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("limit=5")), 5);
        assert_eq!(parse_limit(Some("limit=abc")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("limit=100000")), MAX_LIMIT);
    }

    #[test]
    fn test_new_notification_defaults() {
        let new: NewNotification = serde_json::from_value(json!({
            "userId": "u1",
            "projectId": "p1",
            "title": "Deploy finished"
        }))
        .unwrap();
        let notification = Notification::from(new);
        assert_eq!(notification.kind, NotificationKind::Info);
        assert_eq!(notification.project_id.as_deref(), Some("p1"));
        assert!(!notification.is_read);
    }
}
