//! Process configuration.
//!
//! Loaded once at startup and never mutated afterwards. Values come from an
//! optional YAML file named by `RELAY_CONFIG`, with `LISTEN` overriding the
//! listen address.

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_UPSTREAM_BASE: &str = "https://music-api.gdstudio.xyz/api.php";
pub const DEFAULT_USER_AGENT: &str = "Harmonia-Music-Player/1.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

/// Settings consumed by the relay core and its upstream client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Base URL used in mapped mode
    pub upstream_base: String,

    /// `User-Agent` attached to every upstream request
    pub user_agent: String,

    /// Wall-clock limit on a single upstream request
    pub request_timeout_secs: u64,

    /// Hosts permitted in direct mode; empty allows any host
    pub allowed_hosts: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_base: DEFAULT_UPSTREAM_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            allowed_hosts: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("RELAY_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_yaml(&raw)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).context("invalid YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base = url::Url::parse(&self.relay.upstream_base)
            .with_context(|| format!("invalid upstream_base {}", self.relay.upstream_base))?;

        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("upstream_base must be http or https, got {}", base.scheme());
        }

        if self.relay.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        if self.relay.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }

        Ok(())
    }
}
