//! Topology reconciliation
//!
//! Merges a fresh [`ClusterSnapshot`] into the previous [`TopologyGraph`].
//!
//! - Identity is the node id. A node keeps its position for the whole session
//!   once placed; only its attributes follow the snapshot.
//! - New ids are placed with the ring layout, using their index in the
//!   snapshot being merged.
//! - Nodes missing from a snapshot are kept. Whether they are ever shown as
//!   offline is decided by [`StalenessPolicy`].
//! - Output order is discovery order, never snapshot order.

use super::edges;
use super::layout;
use super::types::{NodeAttributes, TopologyGraph, VisualNode};
use std::collections::{HashMap, HashSet};
use swarm_types::{ClusterNode, ClusterSnapshot};
use tracing::debug;

/// Center id used when the snapshot names no gateway and lists no nodes.
pub const FALLBACK_CENTER_ID: &str = "me";

/// What happens to nodes that stop appearing in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StalenessPolicy {
    /// Mark a node offline after this many consecutive snapshots without it.
    /// `None` keeps absent nodes exactly as they were last reported.
    pub offline_after_missed_polls: Option<u32>,
}

impl StalenessPolicy {
    /// Absent nodes are retained and never touched.
    pub fn retain() -> Self {
        Self::default()
    }

    pub fn offline_after(missed_polls: u32) -> Self {
        Self {
            offline_after_missed_polls: Some(missed_polls.max(1)),
        }
    }

    fn is_stale(&self, missed_polls: u32) -> bool {
        self.offline_after_missed_polls
            .is_some_and(|limit| missed_polls >= limit)
    }
}

/// Topology root for a snapshot: declared gateway, then first node, then
/// [`FALLBACK_CENTER_ID`].
pub fn resolve_center_id(snapshot: &ClusterSnapshot) -> &str {
    snapshot
        .gateway_id()
        .or_else(|| snapshot.nodes.first().map(|n| n.id.as_str()))
        .unwrap_or(FALLBACK_CENTER_ID)
}

/// Produce the next graph from the previous one and a new snapshot.
pub fn reconcile(
    previous: TopologyGraph,
    snapshot: &ClusterSnapshot,
    policy: StalenessPolicy,
) -> TopologyGraph {
    let center_id = resolve_center_id(snapshot).to_string();
    let total = snapshot.nodes.len();

    let reported: HashMap<&str, &ClusterNode> = snapshot
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();

    let mut nodes = previous.nodes;
    let known: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();

    // An empty snapshot carries no membership information; nodes stay as they are.
    let counts_as_missed = !snapshot.nodes.is_empty();

    for node in nodes.iter_mut() {
        match reported.get(node.id.as_str()) {
            Some(update) => {
                node.attributes = NodeAttributes::from_reported(update);
                node.missed_polls = 0;
            }
            None if counts_as_missed => {
                node.missed_polls = node.missed_polls.saturating_add(1);
                if policy.is_stale(node.missed_polls) {
                    node.attributes.online = false;
                }
            }
            None => {}
        }
    }

    let mut created = 0usize;
    for (index, update) in snapshot.nodes.iter().enumerate() {
        if known.contains(&update.id) {
            continue;
        }
        nodes.push(VisualNode {
            id: update.id.clone(),
            position: layout::place_node(&update.id, index, total, &center_id),
            attributes: NodeAttributes::from_reported(update),
            is_center: false,
            pinned: false,
            missed_polls: 0,
        });
        created += 1;
    }

    for node in nodes.iter_mut() {
        node.is_center = node.id == center_id;
    }

    let present: HashSet<&str> = reported.keys().copied().collect();
    let edges = edges::synthesize(&nodes, &center_id, &present);

    debug!(
        center = %center_id,
        reported = total,
        created,
        retained = nodes.len(),
        edges = edges.len(),
        "Reconciled snapshot"
    );

    TopologyGraph {
        nodes,
        edges,
        center_id: Some(center_id),
    }
}
