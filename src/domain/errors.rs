//! Domain error types
//!
//! These errors are framework-agnostic and represent the failures a pipeline
//! can run into while talking to external services or to the peer store.
//! None of them is fatal: pipelines log them and move on.

use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum DomainError {
    /// Network failure or timeout while reaching an external service
    Transport(String),
    /// External service answered with a non-success HTTP status
    Status { status: u16, context: String },
    /// Response body could not be decoded
    Decode(String),
    /// External quota exhausted; callers must wait `reset_after` before retrying
    RateLimited { reset_after: Duration },
    /// Lookup succeeded but carried no usable data
    NoData(String),
    /// Database/persistence error
    Database(String),
    /// No peer row matches the requested key
    NotFound,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::Transport(msg) => write!(f, "Transport error: {}", msg),
            DomainError::Status { status, context } => {
                write!(f, "Unexpected HTTP status {} from {}", status, context)
            }
            DomainError::Decode(msg) => write!(f, "Decode error: {}", msg),
            DomainError::RateLimited { reset_after } => write!(
                f,
                "Rate limit exceeded, quota resets in {}s",
                reset_after.as_secs()
            ),
            DomainError::NoData(msg) => write!(f, "No data: {}", msg),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
            DomainError::NotFound => write!(f, "Peer not found"),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return DomainError::Decode(e.to_string());
        }
        if let Some(status) = e.status() {
            return DomainError::Status {
                status: status.as_u16(),
                context: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        DomainError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Decode(e.to_string())
    }
}
