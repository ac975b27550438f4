//! Admin REST API for mockdeck.
//!
//! Served on its own listener (default `127.0.0.1:2525`):
//! - Health, service info and Prometheus metrics
//! - Live SSE streams of API logs and notifications
//! - Workspace replacement, rule/callback upserts and reordering
//! - Recent logs and notifications

mod handlers;
mod router;
mod server;
mod types;

pub use server::AdminApiServer;
