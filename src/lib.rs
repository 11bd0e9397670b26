//! SwarmLambda cluster topology
//!
//! Polls a gateway's `/graph` snapshot and keeps a stable, render-ready
//! star graph of the cluster: the gateway at the center, workers on a ring.
//!
//! - [`topology`] - reconciliation, ring layout, edges, selection
//! - [`monitor`] - the single owner of the live graph
//! - [`gateway`] - HTTP client and the background poller
//! - [`session`] - client, monitor and poller together; deploy/invoke re-poll
//!
//! # Usage
//!
//! ```ignore
//! let config = GatewayConfig::from_env();
//! let session = ClusterSession::start(&config)?;
//!
//! let view = session.deploy(&DeployRequest::new("hello", "index.handler")).await?;
//! println!("{} functions", view.functions.len());
//! session.stop().await;
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod monitor;
pub mod session;
pub mod topology;

pub use config::GatewayConfig;
pub use error::{ConfigError, FetchError, UserActionError};
pub use gateway::{GatewayClient, Poller, PollerHandle, SnapshotSource};
pub use monitor::{ApplyResult, ClusterMonitor, ClusterStats, MonitorView, PollOutcome};
pub use session::ClusterSession;
pub use topology::{
    reconcile, Position, Selection, StalenessPolicy, TopologyGraph, VisualEdge, VisualNode,
};

pub use swarm_types as types;
