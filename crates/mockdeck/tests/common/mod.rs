//! Shared harness: an in-process mockdeck plus tiny upstream/webhook servers.

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use mockdeck::store::InMemoryRepository;
use mockdeck::{MockEngine, MockServer, ServerConfig};
use serde_json::Value;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub struct TestServer {
    pub mock_url: String,
    pub admin_url: String,
    pub engine: Arc<MockEngine>,
    pub client: reqwest::Client,
}

pub async fn start(workspace: Value) -> TestServer {
    start_with(workspace, ServerConfig::default()).await
}

pub async fn start_with(workspace: Value, config: ServerConfig) -> TestServer {
    let workspace = mockdeck::model::Workspace::from_value(workspace, "test").unwrap();
    let repository = Arc::new(InMemoryRepository::with_workspace(
        workspace,
        config.logs.capacity,
    ));
    let engine = Arc::new(MockEngine::new(config, repository).unwrap());

    let mock = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock_url = format!("http://{}", mock.local_addr().unwrap());
    let admin_url = format!("http://{}", admin.local_addr().unwrap());

    let server = MockServer::new(Arc::clone(&engine));
    tokio::spawn(async move {
        let _ = server.serve(mock, Some(admin)).await;
    });

    TestServer {
        mock_url,
        admin_url,
        engine,
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap(),
    }
}

/// A request seen by [`spawn_recorder`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub headers: hyper::HeaderMap,
    pub body: Bytes,
}

/// Records every request and answers `status` with `body` after `delay`.
pub async fn spawn_recorder(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>) {
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
                        let (parts, incoming) = req.into_parts();
                        let bytes = incoming.collect().await.unwrap().to_bytes();
                        let _ = tx.send(Recorded {
                            method: parts.method.to_string(),
                            uri: parts.uri.to_string(),
                            headers: parts.headers,
                            body: bytes,
                        });
                        tokio::time::sleep(delay).await;
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header("content-type", "application/json")
                                .header("x-upstream", "yes")
                                .body(Full::new(Bytes::from_static(body.as_bytes())))
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

/// Poll `check` until it returns `Some` or two seconds pass.
pub async fn eventually<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..100 {
        if let Some(value) = check().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within 2s");
}
