//! Error types for routing and assignment.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal errors surfaced to callers of the core engines.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinate (lat {latitude}, lon {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("no route from {origin} to {destination}: {reason}")]
    RouteUnreachable {
        origin: String,
        destination: String,
        reason: String,
    },

    #[error("window of {id} starts at {start} after it ends at {end}")]
    InvalidWindow {
        id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Stable machine-readable kind, used at the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidCoordinate { .. } => "InvalidCoordinate",
            CoreError::RouteUnreachable { .. } => "RouteUnreachable",
            CoreError::InvalidWindow { .. } => "InvalidWindow",
            CoreError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Failure of an optional upstream collaborator (routing provider, weather source).
///
/// Never returned from the engines; it is logged and turned into a degraded-mode tag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("upstream timed out")]
    Timeout,
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("upstream HTTP {0}")]
    Http(u16),
}

pub type Result<T> = std::result::Result<T, CoreError>;
