use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Frame, SizeHint};
use hyper::header::CONTENT_TYPE;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Body type for every response the servers produce.
pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

pub fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into()).boxed_unsync()
}

pub fn empty_body() -> ResponseBody {
    full_body(Bytes::new())
}

pub struct MockResponseBuilder {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl MockResponseBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        MockResponseBuilder {
            status: status_code,
            body: Bytes::new(),
            headers: Default::default(),
        }
    }

    /// Unknown or out-of-range codes become 500.
    pub fn from_u16(status_code: u16) -> Self {
        Self::new(StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the body; sets `content-type: application/json`
    /// unless one is already present.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_vec(value)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(b"{}"));
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self
    }

    /// Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Append rather than replace, so repeated upstream headers survive.
    pub fn append_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn merge_headers<H, K, V>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = (K, V)>,
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        for (key, value) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(key), HeaderValue::try_from(value))
            {
                self.headers.insert(name, value);
            }
        }
        self
    }

    pub fn build(self) -> Response<ResponseBody> {
        let mut response = Response::new(full_body(self.body));
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    MockResponseBuilder::new(status).json(body).build()
}

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    json_response(status, &serde_json::json!({ "error": message }))
}

pub fn not_found() -> Response<ResponseBody> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Wraps a body and fires a signal once it has been fully written, or
/// dropped by the connection.
pub struct SentSignalBody {
    inner: ResponseBody,
    signal: Option<oneshot::Sender<()>>,
}

impl SentSignalBody {
    fn fire(&mut self) {
        if let Some(signal) = self.signal.take() {
            let _ = signal.send(());
        }
    }
}

impl Body for SentSignalBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(None) = polled {
            this.fire();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for SentSignalBody {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Attach a completion signal to a response body.
pub fn tracked(response: Response<ResponseBody>) -> (Response<ResponseBody>, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let response = response.map(|inner| {
        SentSignalBody {
            inner,
            signal: Some(tx),
        }
        .boxed_unsync()
    });
    (response, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_builder_with_headers() {
        let response = MockResponseBuilder::new(StatusCode::CREATED)
            .header("X-Custom-Header", "test-value")
            .header("bad header", "ignored")
            .body("ok")
            .build();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("x-custom-header"),
            Some(&HeaderValue::from_static("test-value"))
        );
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_json_keeps_explicit_content_type() {
        let response = MockResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", "application/vnd.api+json")
            .json(&serde_json::json!({"a": 1}))
            .build();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/vnd.api+json"
        );
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let response = MockResponseBuilder::from_u16(42).build();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = error_response(StatusCode::BAD_GATEWAY, "Proxy error: refused");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "Proxy error: refused");
    }

    #[tokio::test]
    async fn test_tracked_signals_after_body_is_consumed() {
        let (response, mut sent) = tracked(MockResponseBuilder::new(StatusCode::OK).body("hi").build());
        assert!(sent.try_recv().is_err());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hi");
        assert!(sent.await.is_ok());
    }

    #[tokio::test]
    async fn test_tracked_signals_on_drop() {
        let (response, sent) = tracked(MockResponseBuilder::new(StatusCode::OK).build());
        drop(response);
        assert!(sent.await.is_ok());
    }
}
