//! Error types for the topology monitor
//!
//! Three families, kept apart because they are handled differently:
//! - [`FetchError`] - a poll produced no usable snapshot. Absorbed by the
//!   poller; the monitor keeps its graph and flags the gateway unreachable.
//! - [`UserActionError`] - a deploy/invoke request failed. Surfaced to the
//!   user verbatim; never touches topology state.
//! - [`ConfigError`] - bad configuration input.

use thiserror::Error;

/// A poll that yielded no snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, timeout or non-2xx status.
    #[error("Gateway unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Body did not match the snapshot shape.
    #[error("Malformed snapshot: {reason}")]
    Malformed { reason: String },
}

impl FetchError {
    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Unreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reason: impl ToString) -> Self {
        FetchError::Malformed {
            reason: reason.to_string(),
        }
    }
}

/// A deploy or invoke request that did not succeed.
#[derive(Error, Debug)]
pub enum UserActionError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("{action} failed ({status}):\n{body}")]
    Rejected {
        action: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl UserActionError {
    /// HTTP status for rejected requests.
    pub fn status(&self) -> Option<u16> {
        match self {
            UserActionError::Rejected { status, .. } => Some(*status),
            UserActionError::Transport(e) => e.status().map(|s| s.as_u16()),
            UserActionError::InvalidPayload(_) | UserActionError::InvalidUrl(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid gateway URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Gateway URL must be http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_carries_status_and_body() {
        let err = UserActionError::Rejected {
            action: "Deploy",
            status: 409,
            body: "function exists".into(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Deploy failed (409):\nfunction exists");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::unreachable("http://localhost:8787/graph", "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(err.to_string().contains("/graph"));

        let err = FetchError::malformed("missing field `nodes`");
        assert_eq!(err.to_string(), "Malformed snapshot: missing field `nodes`");
    }
}
