//! SwarmLambda Gateway Types
//!
//! Shared types for the gateway's HTTP surface. These are DATA CONTRACTS
//! only - no behavior beyond light shape checks, no I/O.
//!
//! ## Conventions
//!
//! 1. **camelCase on the wire** - every struct is `rename_all = "camelCase"`
//! 2. **String IDs** - node ids are opaque strings (hex RPC keys in practice)
//! 3. **Epoch milliseconds** - all timestamps are `i64` ms since the epoch
//! 4. **Legacy aliases** - older gateways emit `rpcKeyHex`, `seenAt` and `ts`

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Runtime used by the dashboard when none is given.
pub const DEFAULT_RUNTIME: &str = "nodejs20.x";

// ============================================================================
// SNAPSHOT (GET /graph)
// ============================================================================

/// One polled view of cluster membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    pub cluster_id: String,
    /// Declared coordinator. Optional on the wire; an empty id counts as absent.
    #[serde(default)]
    pub gateway: Option<GatewayInfo>,
    pub nodes: Vec<ClusterNode>,
    /// Deployed functions. Not part of the topology, carried through as-is.
    #[serde(default)]
    pub functions: Vec<FunctionSummary>,
    #[serde(alias = "ts")]
    pub captured_at_ms: i64,
}

impl ClusterSnapshot {
    /// The declared gateway id, if the snapshot carries a non-empty one.
    pub fn gateway_id(&self) -> Option<&str> {
        self.gateway
            .as_ref()
            .map(|g| g.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// First node id that occurs more than once, if any.
    ///
    /// Ids are the join key between polls, so a snapshot with duplicates
    /// cannot be reconciled.
    pub fn duplicate_node_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes
            .iter()
            .map(|n| n.id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// The coordinator node the snapshot was served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
}

/// A single cluster member as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    #[serde(alias = "rpcKeyHex")]
    pub id: String,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub http: Option<HttpEndpoint>,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    #[serde(alias = "seenAt")]
    pub last_seen_at_ms: i64,
}

/// HTTP listener advertised by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEndpoint {
    pub host: String,
    pub port: u16,
}

/// Approximate location of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Deployed function listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSummary {
    pub name: String,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
}

// ============================================================================
// DEPLOY (POST /functions)
// ============================================================================

/// Body of a deploy request: a function name plus its source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub name: String,
    pub handler: String,
    pub runtime: String,
    /// Relative path -> file contents.
    pub files: BTreeMap<String, String>,
}

impl DeployRequest {
    pub fn new(name: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: handler.into(),
            runtime: DEFAULT_RUNTIME.to_string(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

// ============================================================================
// INVOKE (POST /2015-03-31/functions/{name}/invocations)
// ============================================================================

/// Verbatim invocation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub status: u16,
    /// Raw body text as returned by the gateway.
    pub body: String,
    /// The body parsed as JSON, when it parses.
    pub json: Option<serde_json::Value>,
}

impl InvokeResponse {
    pub fn from_body(status: u16, body: String) -> Self {
        let json = serde_json::from_str(&body).ok();
        Self { status, body, json }
    }
}
