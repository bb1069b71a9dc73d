//! Relay handler
//!
//! One call per inbound request:
//!
//! ```text
//!   OPTIONS ──────────────────────────────────────────► 204 preflight
//!   GET ──► resolve target ──► fetch ──► transcode ───► upstream status
//!                 │              │           │
//!                 └──────────────┴───────────┴────────► 500 proxy failure
//!   other ────────────────────────────────────────────► 405
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::relay::cors;
use crate::relay::error::RelayError;
use crate::relay::target::{self, TargetSpec};
use crate::relay::upstream::{Fetcher, JSON_CONTENT_TYPE, UpstreamResponse};

pub const PROXY_FAILURE: &str = "Proxy fetch failed";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Relays browser requests to the configured upstream.
///
/// Holds only immutable configuration and the fetcher, so one instance is
/// shared by every connection.
pub struct RelayHandler<F> {
    config: RelayConfig,
    fetcher: F,
}

impl<F: Fetcher> RelayHandler<F> {
    pub fn new(config: RelayConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Produces the client-facing response for one inbound request.
    ///
    /// Never fails: every error is folded into a JSON error response.
    pub async fn handle(&self, request: &Request) -> Response {
        match request.method {
            Method::OPTIONS => preflight(),
            Method::GET => match self.relay(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, path = %request.path, "Proxy error");
                    error_response(&e)
                }
            },
            _ => {
                debug!(method = request.method.as_str(), "Rejecting method");
                error_response(&RelayError::InvalidMethod)
            }
        }
    }

    async fn relay(&self, request: &Request) -> Result<Response, RelayError> {
        let target = TargetSpec::resolve(&request.query_params(), &self.config.upstream_base);
        let url = target.to_url()?;

        if let TargetSpec::Direct(_) = target {
            target::check_host(&url, &self.config.allowed_hosts)?;
        }

        debug!(mode = target.mode(), url = %url, "Resolved upstream target");

        let raw = self.fetcher.fetch(url).await?;
        let upstream = UpstreamResponse::from_raw(raw)?;

        info!(
            mode = target.mode(),
            status = upstream.status.as_u16(),
            content_type = %upstream.content_type,
            "Request relayed"
        );

        Ok(upstream.into_response())
    }
}

/// 204 answer to a CORS preflight.
pub fn preflight() -> Response {
    ResponseBuilder::new(StatusCode::NoContent)
        .headers(cors::preflight_headers())
        .build()
}

/// JSON error response for a relay failure.
pub fn error_response(error: &RelayError) -> Response {
    let body = match error {
        RelayError::InvalidMethod => ErrorBody {
            error: "Method Not Allowed",
            details: None,
        },
        other => ErrorBody {
            error: PROXY_FAILURE,
            details: Some(other.to_string()),
        },
    };

    ResponseBuilder::new(error.status())
        .headers(cors::standard_headers())
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(serde_json::to_vec(&body).unwrap_or_default())
        .build()
}
