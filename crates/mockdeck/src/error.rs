//! Error type for the dispatch engine.

use hyper::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    LimitExceeded(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid reorder request: {0}")]
    Reorder(String),

    #[error("Proxy error: {0}")]
    Upstream(String),

    #[error("Upstream did not respond within {0} ms")]
    Timeout(u64),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// HTTP status used when this error is returned to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::LimitExceeded(_)
            | EngineError::InvalidConfig(_)
            | EngineError::Reorder(_) => StatusCode::BAD_REQUEST,
            EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
