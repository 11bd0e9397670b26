//! Gateway session
//!
//! Bundles one [`GatewayClient`], one [`ClusterMonitor`] and the poller that
//! feeds it. User actions go through the session: a successful deploy or
//! invoke is followed by an immediate re-poll, and the call returns only once
//! that re-poll has been applied. Failed actions never trigger a re-poll.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use swarm_types::{DeployRequest, InvokeResponse};
use tracing::info;

use crate::config::{parse_base_url, GatewayConfig};
use crate::error::{ConfigError, UserActionError};
use crate::gateway::{GatewayClient, Poller, PollerHandle};
use crate::monitor::{ClusterMonitor, MonitorView};

pub struct ClusterSession {
    client: GatewayClient,
    monitor: ClusterMonitor,
    poller: PollerHandle,
    request_timeout: Duration,
}

impl ClusterSession {
    /// Build the client and start polling. The first poll fires immediately.
    pub fn start(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let client = GatewayClient::from_config(config)?;
        let monitor = ClusterMonitor::new(config.staleness);
        let poller = Poller::new(
            Arc::new(client.clone()),
            monitor.clone(),
            config.poll_interval,
        )
        .spawn();

        info!(gateway = %client.base_url(), "Cluster session started");
        Ok(Self {
            client,
            monitor,
            poller,
            request_timeout: config.request_timeout,
        })
    }

    pub fn monitor(&self) -> &ClusterMonitor {
        &self.monitor
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Deploy, then re-poll. Returns the view as of that re-poll.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<MonitorView, UserActionError> {
        self.client.deploy(request).await?;
        Ok(self.poller.refresh_and_wait().await)
    }

    /// Invoke, then re-poll. The response is returned untouched.
    pub async fn invoke(
        &self,
        name: &str,
        payload: &Value,
    ) -> Result<InvokeResponse, UserActionError> {
        let response = self.client.invoke(name, payload).await?;
        self.poller.refresh_and_wait().await;
        Ok(response)
    }

    /// Like [`invoke`](Self::invoke) but takes the payload as JSON text.
    pub async fn invoke_text(
        &self,
        name: &str,
        payload: &str,
    ) -> Result<InvokeResponse, UserActionError> {
        let payload: Value = serde_json::from_str(payload)?;
        self.invoke(name, &payload).await
    }

    /// Switch to another gateway. The graph restarts empty.
    pub fn retarget(&mut self, base_url: &str) -> Result<(), ConfigError> {
        let base_url = parse_base_url(base_url)?;
        let client = GatewayClient::new(&base_url, self.request_timeout)?;
        self.poller.retarget(Arc::new(client.clone()));
        self.client = client;
        info!(gateway = %base_url, "Cluster session retargeted");
        Ok(())
    }

    /// Stop polling; nothing is applied to the monitor afterwards.
    pub async fn stop(self) {
        self.poller.stop().await;
    }
}
