//! Relay failure taxonomy.

use thiserror::Error;

use crate::http::response::StatusCode;

/// Everything that can stop a request from being relayed.
///
/// Only `InvalidMethod` has its own status; every other variant is a proxy
/// failure and surfaces as a 500 carrying the display message as `details`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Method is neither GET nor OPTIONS.
    #[error("Method Not Allowed")]
    InvalidMethod,

    /// Target URL could not be built or parsed.
    #[error("Invalid URL: {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// Direct-mode host rejected by the configured allow-list.
    #[error("Upstream host not allowed: {0}")]
    HostNotAllowed(String),

    /// Upstream answered with a non-2xx status.
    #[error("API responded with status: {0}")]
    UpstreamStatus(u16),

    /// DNS, connect, TLS, timeout or reset while talking to the upstream.
    #[error("{0}")]
    Transport(String),

    /// Upstream body could not be read.
    #[error("{0}")]
    BodyRead(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidMethod => StatusCode::MethodNotAllowed,
            _ => StatusCode::InternalServerError,
        }
    }
}
