//! Star edge synthesis.

use super::types::{VisualEdge, VisualNode};
use std::collections::HashSet;

/// One edge from `center_id` to every other node in `present`, the ids
/// reported by the latest poll.
///
/// Emits nothing when the center itself is not a known node. Retained nodes
/// that missed the latest poll get no edge.
pub fn synthesize(
    nodes: &[VisualNode],
    center_id: &str,
    present: &HashSet<&str>,
) -> Vec<VisualEdge> {
    if !nodes.iter().any(|n| n.id == center_id) {
        return Vec::new();
    }

    nodes
        .iter()
        .filter(|n| n.id != center_id && present.contains(n.id.as_str()))
        .map(|n| VisualEdge::star(center_id, &n.id))
        .collect()
}
