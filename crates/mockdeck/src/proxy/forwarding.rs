//! Forwarding requests to a mock API's upstream.

use super::headers::{forwardable_request_headers, relayable_response_headers};
use crate::config::ProxyConfig;
use crate::error::{EngineError, Result};
use crate::response::{full_body, ResponseBody};
use bytes::Bytes;
use hyper::{HeaderMap, Method, Response, StatusCode};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Upstream reply, fully buffered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub latency_ms: u64,
}

impl UpstreamResponse {
    /// Relay status, headers and body unchanged.
    pub fn into_response(self) -> Response<ResponseBody> {
        let mut response = Response::new(full_body(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Shared outbound client for proxied requests.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("proxy client: {e}")))?;

        info!(
            "Proxy client configured: timeout={}ms, connect_timeout={}ms, max_idle_per_host={}",
            config.timeout_ms, config.connect_timeout_ms, config.max_idle_per_host
        );

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    /// Send one request upstream. Redirects are relayed, not followed.
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse> {
        debug!("Forwarding {} to {}", method, url);
        let start = Instant::now();

        let mut request = self
            .client
            .request(method, url)
            .headers(forwardable_request_headers(headers));
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let headers = relayable_response_headers(response.headers());
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!("Upstream {} answered {} in {}ms", url, status, latency_ms);

        Ok(UpstreamResponse {
            status,
            headers,
            body,
            latency_ms,
        })
    }

    fn map_error(&self, error: reqwest::Error) -> EngineError {
        if error.is_timeout() {
            EngineError::Timeout(self.timeout.as_millis() as u64)
        } else {
            EngineError::Upstream(describe(&error))
        }
    }
}

/// The error and its causes, innermost last.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Request;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Echoes method, URI and body after `delay`.
    async fn spawn_upstream(delay: Duration) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| async move {
                        tokio::time::sleep(delay).await;
                        let echo = format!("{} {}", req.method(), req.uri());
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(201)
                                .header("x-echo", echo)
                                .header("set-cookie", "a=1")
                                .header("set-cookie", "b=2")
                                .body(Full::new(body))
                                .unwrap(),
                        )
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        addr
    }

    fn config(timeout_ms: u64) -> ProxyConfig {
        ProxyConfig {
            timeout_ms,
            connect_timeout_ms: timeout_ms.min(1_000),
            max_idle_per_host: 0,
        }
    }

    #[tokio::test]
    async fn test_forward_relays_upstream_verbatim() {
        let addr = spawn_upstream(Duration::ZERO).await;
        let forwarder = Forwarder::new(&config(5_000)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("host", "mock.local".parse().unwrap());
        headers.insert("connection", "close".parse().unwrap());
        let url = format!("http://{addr}/v1/users?page=2");
        let upstream = forwarder
            .forward(Method::POST, &url, &headers, Bytes::from_static(b"{\"a\":1}"))
            .await
            .unwrap();

        assert_eq!(upstream.status, StatusCode::CREATED);
        assert_eq!(upstream.headers.get("x-echo").unwrap(), "POST /v1/users?page=2");
        assert_eq!(upstream.headers.get_all("set-cookie").iter().count(), 2);
        assert_eq!(&upstream.body[..], b"{\"a\":1}");

        let response = upstream.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_forward_times_out() {
        let addr = spawn_upstream(Duration::from_millis(500)).await;
        let forwarder = Forwarder::new(&config(100)).unwrap();

        let err = forwarder
            .forward(Method::GET, &format!("http://{addr}/slow"), &HeaderMap::new(), Bytes::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout(100)));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_forward_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = Forwarder::new(&config(2_000)).unwrap();
        let err = forwarder
            .forward(Method::GET, &format!("http://{addr}/"), &HeaderMap::new(), Bytes::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Upstream(_)));
        assert!(err.to_string().starts_with("Proxy error: "));
    }
}
