//! Webhook callbacks fired after a mock response has been delivered.

mod request;

use crate::config::CallbackConfig;
use crate::error::{EngineError, Result};
use crate::events::EventSink;
use crate::metrics;
use crate::model::{new_id, snippet, CallbackLog, MockCallback, Notification, NotificationKind};
use crate::predicate::RequestContext;
use crate::proxy::headers::header_pairs;
use crate::template::ResponseContext;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use request::PreparedCallback;

/// Everything a batch of callbacks for one served request needs.
#[derive(Debug, Clone)]
pub struct CallbackJob {
    pub project_id: String,
    /// Receives failure notifications.
    pub owner_id: String,
    pub api_id: String,
    /// Enabled callbacks, in firing order.
    pub callbacks: Vec<MockCallback>,
    pub request: RequestContext,
    pub response: ResponseContext,
}

/// Fires callbacks. Each callback runs on its own task with its own delay;
/// there are no retries and exactly one [`CallbackLog`] per attempt.
#[derive(Clone)]
pub struct CallbackDispatcher {
    client: reqwest::Client,
    config: CallbackConfig,
    body_limit: usize,
    events: EventSink,
}

impl CallbackDispatcher {
    pub fn new(config: &CallbackConfig, body_limit: usize, events: EventSink) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("callback client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            body_limit,
            events,
        })
    }

    /// Fire every callback in `job`, each on its own task after its own
    /// delay. The returned handle completes once all have been attempted.
    ///
    /// Call only after the response body has been written.
    pub fn dispatch(&self, job: CallbackJob) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let job = Arc::new(job);
            let handles: Vec<JoinHandle<CallbackLog>> = job
                .callbacks
                .iter()
                .cloned()
                .map(|callback| {
                    let dispatcher = dispatcher.clone();
                    let job = Arc::clone(&job);
                    tokio::spawn(async move {
                        tokio::time::sleep(dispatcher.config.delay_for(callback.delay)).await;
                        dispatcher.fire(&job, &callback).await
                    })
                })
                .collect();

            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Callback task failed: {}", e);
                }
            }
        })
    }

    /// Send one callback now and record the outcome.
    pub async fn fire(&self, job: &CallbackJob, callback: &MockCallback) -> CallbackLog {
        let prepared = PreparedCallback::render(callback, &job.request, &job.response);
        debug!(
            "Firing callback {} {} {}",
            callback.id, prepared.method, prepared.url
        );

        let start = Instant::now();
        let mut log = CallbackLog {
            id: new_id(),
            callback_id: callback.id.clone(),
            api_id: job.api_id.clone(),
            project_id: job.project_id.clone(),
            url: prepared.url.clone(),
            method: prepared.method.clone(),
            request_headers: prepared.headers.clone(),
            request_body: prepared
                .body
                .as_ref()
                .and_then(|b| snippet(b, self.body_limit)),
            response_status: None,
            response_headers: BTreeMap::new(),
            response_body: None,
            response_time: 0,
            success: false,
            error: None,
            timestamp: Utc::now(),
        };

        match self.send(&prepared).await {
            Ok((status, headers, body)) => {
                log.response_status = Some(status.as_u16());
                log.response_headers = headers;
                log.response_body = snippet(&body, self.body_limit);
                log.success = status.is_success();
                if !log.success {
                    log.error = Some(format!("Callback returned HTTP {}", status.as_u16()));
                }
            }
            Err(error) => log.error = Some(error),
        }
        log.response_time = start.elapsed().as_millis() as u64;

        metrics::record_callback(log.success, log.response_time);
        if !log.success {
            warn!(
                "Callback {} to {} failed: {}",
                callback.id,
                log.url,
                log.error.as_deref().unwrap_or("unknown error")
            );
            self.events.notify(failure_notification(job, callback, &log));
        }
        self.events.callback_log(log.clone());
        log
    }

    async fn send(
        &self,
        prepared: &PreparedCallback,
    ) -> std::result::Result<(reqwest::StatusCode, BTreeMap<String, String>, bytes::Bytes), String>
    {
        let method = Method::from_bytes(prepared.method.as_bytes())
            .map_err(|_| format!("Invalid callback method: {}", prepared.method))?;

        let mut request = self.client.request(method, &prepared.url);
        for (name, value) in &prepared.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &prepared.body {
            request = request.body(body.clone());
        }

        let response = request.send().await.map_err(|e| describe(&e))?;
        let status = response.status();
        let headers = header_pairs(response.headers()).into_iter().collect();
        let body = response.bytes().await.map_err(|e| describe(&e))?;
        Ok((status, headers, body))
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Callback timed out".to_string()
    } else if error.is_builder() {
        format!("Invalid callback request: {error}")
    } else {
        format!("Callback request failed: {error}")
    }
}

fn failure_notification(
    job: &CallbackJob,
    callback: &MockCallback,
    log: &CallbackLog,
) -> Notification {
    let name = if callback.name.is_empty() {
        callback.id.as_str()
    } else {
        callback.name.as_str()
    };
    Notification::new(
        job.owner_id.as_str(),
        NotificationKind::CallbackFailure,
        format!("Callback \"{name}\" failed"),
        log.error.clone().unwrap_or_default(),
    )
    .with_project(job.project_id.as_str())
    .with_metadata(json!({
        "apiId": job.api_id,
        "callbackId": callback.id,
        "callbackLogId": log.id,
        "url": log.url,
        "statusCode": log.response_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::store::{InMemoryRepository, MockRepository};
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Captures each received body and answers with `status`.
    async fn spawn_hook(status: u16) -> (SocketAddr, mpsc::UnboundedReceiver<(String, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let line = format!("{} {}", req.method(), req.uri());
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            let _ = tx.send((line, body.to_vec()));
                            Ok::<_, Infallible>(
                                Response::builder()
                                    .status(status)
                                    .body(Full::new(bytes::Bytes::from_static(b"ack")))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        (addr, rx)
    }

    fn setup() -> (Arc<InMemoryRepository>, CallbackDispatcher) {
        let repo = Arc::new(InMemoryRepository::new(50));
        let events = EventSink::new(repo.clone(), Arc::new(Broadcaster::new(8)));
        let config = CallbackConfig {
            timeout_ms: 2_000,
            max_delay_ms: 60_000,
        };
        (repo, CallbackDispatcher::new(&config, 1024, events).unwrap())
    }

    fn job(callbacks: Vec<MockCallback>) -> CallbackJob {
        CallbackJob {
            project_id: "p1".into(),
            owner_id: "u1".into(),
            api_id: "a1".into(),
            callbacks,
            request: RequestContext::new("POST", "/orders")
                .with_body(json!({"orderId": 123, "customer": {"email": "a@b.test"}})),
            response: ResponseContext {
                status_code: 201,
                headers: HashMap::new(),
                body: json!({"status": "created"}),
            },
        }
    }

    fn callback(id: &str, url: String, delay: u64) -> MockCallback {
        serde_json::from_value(json!({
            "id": id,
            "apiId": "a1",
            "url": url,
            "delay": delay,
            "body": {
                "order": "{{request.body.orderId}}",
                "email": "{{request.body.customer.email}}",
                "status": "{{response.body.status}}"
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_callback_body_substitution() {
        let (addr, mut received) = spawn_hook(200).await;
        let (repo, dispatcher) = setup();

        dispatcher
            .dispatch(job(vec![callback("c1", format!("http://{addr}/hook"), 0)]))
            .await
            .unwrap();

        let (line, body) = received.recv().await.unwrap();
        assert_eq!(line, "POST /hook");
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"order": 123, "email": "a@b.test", "status": "created"})
        );

        let logs = repo.recent_callback_logs("a1", 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].success);
        assert_eq!(logs[0].response_status, Some(200));
        assert_eq!(logs[0].response_body.as_deref(), Some("ack"));
        assert!(repo.recent_notifications("u1", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_records_failure_and_notifies_owner() {
        let (addr, _received) = spawn_hook(500).await;
        let (repo, dispatcher) = setup();

        let log = dispatcher
            .fire(&job(vec![]), &callback("c1", format!("http://{addr}/hook"), 0))
            .await;

        assert!(!log.success);
        assert_eq!(log.response_status, Some(500));
        assert_eq!(log.error.as_deref(), Some("Callback returned HTTP 500"));

        let notifications = repo.recent_notifications("u1", 10).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::CallbackFailure);
        assert_eq!(notifications[0].project_id.as_deref(), Some("p1"));
        assert_eq!(repo.recent_callback_logs("a1", 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_hook_is_not_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let (repo, dispatcher) = setup();

        dispatcher
            .dispatch(job(vec![callback("c1", format!("http://{addr}/hook"), 0)]))
            .await
            .unwrap();

        let logs = repo.recent_callback_logs("a1", 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
        assert!(logs[0].response_status.is_none());
        assert!(logs[0].error.is_some());
    }

    #[tokio::test]
    async fn test_callbacks_are_independent() {
        let (addr, mut received) = spawn_hook(200).await;
        let (repo, dispatcher) = setup();

        dispatcher
            .dispatch(job(vec![
                callback("slow", format!("http://{addr}/slow"), 300),
                callback("fast", format!("http://{addr}/fast"), 0),
            ]))
            .await
            .unwrap();

        let (first, _) = received.recv().await.unwrap();
        assert_eq!(first, "POST /fast");
        assert_eq!(repo.recent_callback_logs("a1", 10).unwrap().len(), 2);
    }
}
