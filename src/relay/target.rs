//! Target resolution
//!
//! Turns the query parameters of an inbound GET into the upstream URL, using
//! one of two mutually exclusive addressing modes.

use std::collections::HashMap;

use url::Url;

use crate::relay::error::RelayError;

/// Parameter carrying a complete upstream URL.
pub const DIRECT_URL_PARAM: &str = "url";

/// Parameters copied onto the upstream base URL in mapped mode, in the order
/// they are attached.
pub const FORWARDED_PARAMS: [&str; 8] =
    ["types", "source", "id", "name", "pages", "count", "br", "size"];

/// Where an inbound request is relayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Caller-supplied upstream URL, used verbatim
    Direct(String),

    /// Fixed base URL with whitelisted parameters re-attached
    Mapped {
        base: String,
        params: Vec<(String, String)>,
    },
}

impl TargetSpec {
    /// Picks the addressing mode for a set of decoded query parameters.
    ///
    /// A non-empty `url` selects direct mode. Otherwise every whitelisted
    /// parameter that is present and non-empty is carried over unchanged.
    pub fn resolve(query: &HashMap<String, String>, upstream_base: &str) -> Self {
        if let Some(url) = query.get(DIRECT_URL_PARAM).filter(|u| !u.is_empty()) {
            return TargetSpec::Direct(url.clone());
        }

        let params = FORWARDED_PARAMS
            .iter()
            .filter_map(|&name| {
                query
                    .get(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_string(), v.clone()))
            })
            .collect();

        TargetSpec::Mapped {
            base: upstream_base.to_string(),
            params,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            TargetSpec::Direct(_) => "direct",
            TargetSpec::Mapped { .. } => "mapped",
        }
    }

    /// Builds the absolute URL the upstream request goes to.
    ///
    /// In mapped mode a forwarded parameter replaces any pair of the same
    /// name already present on the base URL.
    pub fn to_url(&self) -> Result<Url, RelayError> {
        match self {
            TargetSpec::Direct(raw) => parse_url(raw),
            TargetSpec::Mapped { base, params } => {
                let mut url = parse_url(base)?;
                if params.is_empty() {
                    return Ok(url);
                }

                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(k, _)| !params.iter().any(|(name, _)| name == k))
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();

                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .extend_pairs(params.iter());

                Ok(url)
            }
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, RelayError> {
    Url::parse(raw).map_err(|e| RelayError::InvalidTarget {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Rejects hosts outside `allowed_hosts`. An empty list allows every host.
pub fn check_host(url: &Url, allowed_hosts: &[String]) -> Result<(), RelayError> {
    if allowed_hosts.is_empty() {
        return Ok(());
    }

    let host = url.host_str().unwrap_or_default();
    if allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        Ok(())
    } else {
        Err(RelayError::HostNotAllowed(host.to_string()))
    }
}
