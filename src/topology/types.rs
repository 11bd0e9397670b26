//! Render-ready node and edge model owned by the engine.

use serde::{Deserialize, Serialize};
use swarm_types::{ClusterNode, GeoPoint, HttpEndpoint};

/// 2D coordinate in layout space. The center node sits at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are within `eps` of `other`.
    pub fn approx_eq(&self, other: &Position, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

/// Per-poll attributes. Replaced wholesale whenever the node is in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub name: String,
    pub region: String,
    pub online: bool,
    pub last_seen_at_ms: i64,
    pub http: Option<HttpEndpoint>,
    pub geo: Option<GeoPoint>,
}

impl NodeAttributes {
    /// Attributes for a node that is reporting in the current snapshot.
    pub fn from_reported(node: &ClusterNode) -> Self {
        Self {
            name: node.name.clone(),
            region: node.region.clone(),
            online: true,
            last_seen_at_ms: node.last_seen_at_ms,
            http: node.http.clone(),
            geo: node.geo,
        }
    }
}

/// A cluster member as the engine tracks it across polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    /// Join key between snapshots; equals the cluster node id.
    pub id: String,
    /// Assigned once at creation, or by an explicit drag.
    pub position: Position,
    pub attributes: NodeAttributes,
    pub is_center: bool,
    /// Set once the user has dragged the node.
    pub pinned: bool,
    /// Consecutive non-empty snapshots without this node.
    pub missed_polls: u32,
}

/// A star link from the center to one peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl VisualEdge {
    pub fn star(center_id: &str, peer_id: &str) -> Self {
        Self {
            id: format!("e-{}-{}", center_id, peer_id),
            source: center_id.to_string(),
            target: peer_id.to_string(),
        }
    }
}

/// The engine's output: what the drawing layer renders.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyGraph {
    /// Discovery order across polls.
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
    /// Center chosen by the most recent reconciliation.
    pub center_id: Option<String>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut VisualNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn center(&self) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.is_center)
    }

    /// Number of nodes currently flagged online.
    pub fn online_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.attributes.online).count()
    }

    /// Drag a node to `position`. The position is pinned and survives later polls.
    ///
    /// Returns false if no node has that id.
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = position;
                node.pinned = true;
                true
            }
            None => false,
        }
    }
}
