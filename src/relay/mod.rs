//! Relay core
//!
//! This module implements the relay decision table: method classification,
//! target resolution, the upstream fetch, content-type transcoding, and the
//! CORS-annotated response the browser finally reads.

pub mod cors;
pub mod error;
pub mod handler;
pub mod target;
pub mod upstream;

pub use error::RelayError;
pub use handler::RelayHandler;
pub use target::TargetSpec;
pub use upstream::{Fetcher, HttpFetcher, RawUpstream, UpstreamBody, UpstreamResponse};
