//! HTTP client for the SwarmLambda gateway
//!
//! Uses shared types from swarm-types for every request and response body.
//! Snapshot reads map every failure onto [`FetchError`]; deploy/invoke keep
//! the gateway's status and raw body for the user.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use swarm_types::{ClusterSnapshot, DeployRequest, InvokeResponse};
use tracing::{debug, info};
use url::Url;

use crate::config::{join_url, GatewayConfig};
use crate::error::{FetchError, UserActionError};

/// Lambda-compatible invoke route prefix.
const INVOKE_PREFIX: &str = "/2015-03-31/functions";

/// Anything that can produce a cluster snapshot on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<ClusterSnapshot, FetchError>;
}

#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Build a client for `base_url` (already validated, no trailing slash).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        Self::new(&config.base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// `GET /graph`, decoded and shape-checked.
    pub async fn fetch_snapshot(&self) -> Result<ClusterSnapshot, FetchError> {
        let url = self.endpoint("/graph");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::unreachable(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::unreachable(&url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::unreachable(&url, e))?;

        let snapshot = decode_snapshot(&body)?;
        debug!(
            cluster_id = %snapshot.cluster_id,
            nodes = snapshot.nodes.len(),
            "Fetched snapshot"
        );
        Ok(snapshot)
    }

    /// `POST /functions`.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<(), UserActionError> {
        let response = self
            .http
            .post(self.endpoint("/functions"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejected("Deploy", status, body));
        }

        info!(function = %request.name, runtime = %request.runtime, "Deployed function");
        Ok(())
    }

    /// `POST /2015-03-31/functions/{name}/invocations` with a JSON payload.
    pub async fn invoke(
        &self,
        name: &str,
        payload: &serde_json::Value,
    ) -> Result<InvokeResponse, UserActionError> {
        let url = self.invoke_url(name)?;

        let response = self.http.post(url).json(payload).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejected("Invoke", status, body));
        }

        info!(function = %name, status = status.as_u16(), "Invoked function");
        Ok(InvokeResponse::from_body(status.as_u16(), body))
    }

    /// Like [`invoke`](Self::invoke) but takes the payload as JSON text.
    pub async fn invoke_text(
        &self,
        name: &str,
        payload: &str,
    ) -> Result<InvokeResponse, UserActionError> {
        let payload: serde_json::Value = serde_json::from_str(payload)?;
        self.invoke(name, &payload).await
    }

    fn invoke_url(&self, name: &str) -> Result<Url, UserActionError> {
        let mut url = Url::parse(&self.endpoint(INVOKE_PREFIX))?;
        url.path_segments_mut()
            .map_err(|_| UserActionError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(name)
            .push("invocations");
        Ok(url)
    }
}

#[async_trait]
impl SnapshotSource for GatewayClient {
    async fn fetch_snapshot(&self) -> Result<ClusterSnapshot, FetchError> {
        GatewayClient::fetch_snapshot(self).await
    }
}

/// Parse a `/graph` body. Shape mismatches and duplicate ids are malformed.
pub fn decode_snapshot(body: &[u8]) -> Result<ClusterSnapshot, FetchError> {
    let snapshot: ClusterSnapshot = serde_json::from_slice(body).map_err(FetchError::malformed)?;

    if let Some(dup) = snapshot.duplicate_node_id() {
        return Err(FetchError::malformed(format!("duplicate node id '{}'", dup)));
    }

    Ok(snapshot)
}

fn rejected(action: &'static str, status: StatusCode, body: String) -> UserActionError {
    UserActionError::Rejected {
        action,
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid() {
        let body = br#"{"clusterId":"c","gateway":{"id":"g","name":"gw","region":"us"},
            "nodes":[{"id":"g","name":"gw","region":"us","lastSeenAtMs":1}],"capturedAtMs":2}"#;
        let snap = decode_snapshot(body).unwrap();
        assert_eq!(snap.nodes.len(), 1);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(matches!(
            decode_snapshot(br#"{"clusterId":"c","nodes":{},"capturedAtMs":2}"#),
            Err(FetchError::Malformed { .. })
        ));
        assert!(matches!(
            decode_snapshot(b"<html>502</html>"),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let body = br#"{"clusterId":"c","nodes":[
            {"id":"a","name":"a","region":"us","lastSeenAtMs":1},
            {"id":"a","name":"a2","region":"eu","lastSeenAtMs":1}],"capturedAtMs":2}"#;
        match decode_snapshot(body) {
            Err(FetchError::Malformed { reason }) => assert!(reason.contains("'a'")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoints_share_one_join() {
        let client = GatewayClient::new("http://gw.local:8787/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("/graph"), "http://gw.local:8787/graph");
        assert_eq!(client.endpoint("functions"), "http://gw.local:8787/functions");
    }

    #[test]
    fn test_invoke_url_encodes_name() {
        let client = GatewayClient::new("http://localhost:8787", Duration::from_secs(1)).unwrap();
        let url = client.invoke_url("hello world").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8787/2015-03-31/functions/hello%20world/invocations"
        );
    }
}
