//! Cluster Topology Engine
//!
//! Turns the gateway's unordered membership snapshots into a stable graph
//! that can be redrawn every poll without nodes jumping around.
//!
//! # Architecture
//!
//! ```text
//! ClusterSnapshot (from gateway)
//!        │
//!        ▼
//! reconcile (identity join on node id)
//!        │
//!        ├──► layout::place_node (only for ids never seen before)
//!        │
//!        └──► edges::synthesize (star from the center node)
//!        │
//!        ▼
//! TopologyGraph (positioned nodes/edges)
//!        │
//!        ├──► renderer (external)
//!        └──► Selection (opened node, UI only)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut graph = TopologyGraph::new();
//! graph = reconcile(graph, &snapshot, StalenessPolicy::retain());
//! ```

pub mod edges;
pub mod layout;
pub mod reconcile;
pub mod selection;
pub mod types;

pub use reconcile::{reconcile, resolve_center_id, StalenessPolicy, FALLBACK_CENTER_ID};
pub use selection::Selection;
pub use types::*;
