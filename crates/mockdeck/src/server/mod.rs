//! Listener setup for mock traffic and the admin API.

mod handler;

pub use handler::handle_request;

use crate::admin_api::AdminApiServer;
use crate::engine::MockEngine;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub struct MockServer {
    engine: Arc<MockEngine>,
}

impl MockServer {
    pub fn new(engine: Arc<MockEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<MockEngine> {
        &self.engine
    }

    /// Bind the configured addresses and serve until an accept fails.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let config = self.engine.config();
        let mock_listener = TcpListener::bind(config.listen.socket_addr()?).await?;
        let admin_listener = if config.admin.enabled {
            Some(TcpListener::bind(config.admin.socket_addr()?).await?)
        } else {
            None
        };
        self.serve(mock_listener, admin_listener).await
    }

    /// Serve on already-bound listeners.
    pub async fn serve(
        self,
        mock_listener: TcpListener,
        admin_listener: Option<TcpListener>,
    ) -> Result<(), anyhow::Error> {
        let heartbeat = self.engine.config().streams.heartbeat_interval();
        self.engine.broadcaster().spawn_supervisor(heartbeat);

        if let Some(listener) = admin_listener {
            let admin = AdminApiServer::new(Arc::clone(&self.engine));
            tokio::spawn(async move {
                if let Err(e) = admin.serve(listener).await {
                    error!("Admin API stopped: {}", e);
                }
            });
        }

        info!("Mock endpoint listening on http://{}", mock_listener.local_addr()?);
        let engine = self.engine;

        loop {
            let (stream, remote_addr) = mock_listener.accept().await?;
            let engine = Arc::clone(&engine);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move { handle_request(&engine, req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
