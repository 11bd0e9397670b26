//! Gateway and polling configuration.
//!
//! Defaults match the dashboard: a local gateway on port 8787 polled every
//! 1.2 seconds. Everything can be overridden from the environment or with the
//! builder setters.

use crate::error::ConfigError;
use crate::topology::StalenessPolicy;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8787";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1200;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

pub const ENV_GATEWAY_URL: &str = "SWARMLAMBDA_GATEWAY_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "SWARMLAMBDA_POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SWARMLAMBDA_REQUEST_TIMEOUT_MS";
pub const ENV_OFFLINE_AFTER: &str = "SWARMLAMBDA_OFFLINE_AFTER_MISSED_POLLS";

/// Configuration for talking to one gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Validated base URL without a trailing slash; `/graph`, `/functions`
    /// etc. are appended to it.
    pub base_url: String,

    /// Fixed tick between polls. Ticks fire whether or not the previous
    /// fetch has finished.
    pub poll_interval: Duration,

    /// Per-request timeout for every gateway call.
    pub request_timeout: Duration,

    /// Handling of nodes that drop out of snapshots.
    pub staleness: StalenessPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            staleness: StalenessPolicy::retain(),
        }
    }
}

impl GatewayConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_GATEWAY_URL) {
            match parse_base_url(&raw) {
                Ok(url) => config.base_url = url,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_GATEWAY_URL),
            }
        }

        if let Some(ms) = parse_millis(&lookup, ENV_POLL_INTERVAL_MS) {
            if ms > 0 {
                config.poll_interval = Duration::from_millis(ms);
            } else {
                warn!("Ignoring {}: must be greater than zero", ENV_POLL_INTERVAL_MS);
            }
        }

        if let Some(ms) = parse_millis(&lookup, ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout = Duration::from_millis(ms);
        }

        if let Some(n) = parse_millis(&lookup, ENV_OFFLINE_AFTER) {
            match u32::try_from(n) {
                Ok(0) => config.staleness = StalenessPolicy::retain(),
                Ok(n) => config.staleness = StalenessPolicy::offline_after(n),
                Err(_) => warn!(value = n, "Ignoring {}: out of range", ENV_OFFLINE_AFTER),
            }
        }

        config
    }

    /// Set the gateway base URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        self.poll_interval = interval;
        Ok(self)
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the staleness policy.
    pub fn staleness(mut self, policy: StalenessPolicy) -> Self {
        self.staleness = policy;
        self
    }
}

/// Absolute URL for `path` under a validated base URL.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parse and validate a gateway base URL, returning it without a trailing slash.
pub fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        value: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(value = %raw, "Ignoring {}: not an integer", key);
            None
        }
    }
}
