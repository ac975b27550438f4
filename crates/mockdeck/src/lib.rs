//! Mockdeck: configuration-driven mock and forwarding HTTP endpoints.
//!
//! Each inbound call to a configured mock API is matched against stored
//! rules, answered with a synthesized (optionally faker-templated) response
//! or forwarded upstream, logged, and followed by webhook callbacks. Logs
//! and notifications are pushed to dashboard subscribers over SSE.

pub mod admin_api;
pub mod broadcast;
pub mod callback;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod model;
pub mod predicate;
pub mod proxy;
pub mod response;
pub mod server;
pub mod store;
pub mod template;

pub use config::ServerConfig;
pub use engine::MockEngine;
pub use error::{EngineError, Result};
pub use server::MockServer;
