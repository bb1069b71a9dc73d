//! Upstream fetch and response transcoding
//!
//! The `Fetcher` trait is the seam between the relay decision logic and the
//! network. `HttpFetcher` is the production implementation on top of reqwest;
//! tests substitute canned responses.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::RelayConfig;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::relay::cors;
use crate::relay::error::RelayError;
use crate::relay::target;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Same hop limit as reqwest's default policy.
const MAX_REDIRECTS: usize = 10;

/// What came back from the upstream before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUpstream {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Issues the single upstream GET for a relayed request.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: Url) -> impl Future<Output = Result<RawUpstream, RelayError>> + Send;
}

/// reqwest-backed fetcher with the relay's identifying `User-Agent`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = Self::client_builder(config)
            .build()
            .context("build http client")?;

        Ok(Self::from_client(client))
    }

    /// Client settings derived from the relay config, open for further tuning.
    ///
    /// With an allow-list configured, every redirect hop must also land on a
    /// listed host or on the host of the mapped-mode base.
    pub fn client_builder(config: &RelayConfig) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if config.allowed_hosts.is_empty() {
            return builder;
        }

        let mut allowed = config.allowed_hosts.clone();
        if let Some(base_host) = Url::parse(&config.upstream_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        {
            allowed.push(base_host);
        }

        builder.redirect(Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match target::check_host(attempt.url(), &allowed) {
                Ok(()) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        }))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: Url) -> Result<RawUpstream, RelayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // the body of a failed response is never forwarded
        if !response.status().is_success() {
            return Ok(RawUpstream {
                status,
                content_type,
                body: Bytes::new(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::BodyRead(e.to_string()))?;

        Ok(RawUpstream {
            status,
            content_type,
            body,
        })
    }
}

/// Upstream body after content-type classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamBody {
    Text(String),
    Binary(Bytes),
}

/// A successful upstream response, classified and ready to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    /// Accepts only 2xx responses and classifies the body.
    ///
    /// A content type mentioning `application/json` yields text, decoded
    /// lossily as UTF-8; anything else, including no content type at all,
    /// stays opaque bytes.
    pub fn from_raw(raw: RawUpstream) -> Result<Self, RelayError> {
        let status = StatusCode::from_u16(raw.status);
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus(raw.status));
        }

        let content_type = raw.content_type.unwrap_or_default();

        if content_type.contains(JSON_CONTENT_TYPE) {
            Ok(Self {
                status,
                content_type: JSON_CONTENT_TYPE.to_string(),
                body: UpstreamBody::Text(String::from_utf8_lossy(&raw.body).into_owned()),
            })
        } else {
            Ok(Self {
                status,
                content_type,
                body: UpstreamBody::Binary(raw.body),
            })
        }
    }

    pub fn into_response(self) -> Response {
        let body = match self.body {
            UpstreamBody::Text(text) => text.into_bytes(),
            UpstreamBody::Binary(bytes) => bytes.to_vec(),
        };

        ResponseBuilder::new(self.status)
            .headers(cors::standard_headers())
            .header("Content-Type", self.content_type)
            .body(body)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, content_type: Option<&str>, body: &'static [u8]) -> RawUpstream {
        RawUpstream {
            status,
            content_type: content_type.map(str::to_string),
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn json_with_charset_is_text() {
        let upstream =
            UpstreamResponse::from_raw(raw(200, Some("application/json; charset=utf-8"), b"[]"))
                .unwrap();

        assert_eq!(upstream.content_type, "application/json");
        assert_eq!(upstream.body, UpstreamBody::Text("[]".to_string()));
    }

    #[test]
    fn missing_content_type_is_empty_binary() {
        let upstream = UpstreamResponse::from_raw(raw(200, None, b"\x00\x01")).unwrap();

        assert_eq!(upstream.content_type, "");
        assert_eq!(upstream.body, UpstreamBody::Binary(Bytes::from_static(b"\x00\x01")));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let err = UpstreamResponse::from_raw(raw(503, Some("text/html"), b"")).unwrap_err();

        assert_eq!(err, RelayError::UpstreamStatus(503));
        assert_eq!(err.to_string(), "API responded with status: 503");
    }

    #[test]
    fn redirect_status_is_not_success() {
        assert!(UpstreamResponse::from_raw(raw(304, None, b"")).is_err());
    }
}
