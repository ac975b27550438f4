//! Admin API server.

use crate::admin_api::router::route_request;
use crate::engine::MockEngine;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub struct AdminApiServer {
    engine: Arc<MockEngine>,
}

impl AdminApiServer {
    pub fn new(engine: Arc<MockEngine>) -> Self {
        Self { engine }
    }

    /// Serve on a bound listener until an accept fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        info!("Admin API listening on http://{}", listener.local_addr()?);

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move { route_request(req, engine).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error: {}", e);
                }
            });
        }
    }
}
