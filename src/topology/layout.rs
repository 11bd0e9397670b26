//! Ring layout - initial placement for newly discovered nodes
//!
//! Peers sit on a single ring around the center node. The ring radius grows
//! with cluster size so labels stay legible, within fixed bounds. Placement
//! is deterministic and only ever consulted once per node identity.

use super::types::Position;
use std::f64::consts::TAU;

// =============================================================================
// LAYOUT CONSTANTS
// =============================================================================

/// Radius before any per-node growth is applied.
pub const BASE_RADIUS: f64 = 190.0;

/// Extra radius per node in the snapshot.
pub const RADIUS_PER_NODE: f64 = 16.0;

pub const MIN_RADIUS: f64 = 230.0;
pub const MAX_RADIUS: f64 = 520.0;

// =============================================================================
// PLACEMENT
// =============================================================================

/// Ring radius for a snapshot of `total` nodes.
pub fn ring_radius(total: usize) -> f64 {
    (BASE_RADIUS + RADIUS_PER_NODE * total as f64).clamp(MIN_RADIUS, MAX_RADIUS)
}

/// Polar placement of slot `index` out of `total`, starting at angle 0 (+x).
pub fn place(index: usize, total: usize) -> Position {
    let radius = ring_radius(total);
    let angle = TAU * index as f64 / total.max(1) as f64;
    Position::new(radius * angle.cos(), radius * angle.sin())
}

/// Placement for a node seen for the first time.
///
/// The center node goes to the origin no matter which slot it occupies.
pub fn place_node(id: &str, index: usize, total: usize, center_id: &str) -> Position {
    if id == center_id {
        Position::ORIGIN
    } else {
        place(index, total)
    }
}
