//! Which node the user has opened for inspection.
//!
//! Pure UI projection. Holding an id here never keeps a node alive or
//! changes how it is reconciled.

use super::types::{TopologyGraph, VisualNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    opened: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the detail view for `id`, replacing any previous selection.
    pub fn open(&mut self, id: impl Into<String>) {
        self.opened = Some(id.into());
    }

    pub fn close(&mut self) {
        self.opened = None;
    }

    pub fn opened(&self) -> Option<&str> {
        self.opened.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.opened.is_some()
    }

    /// Current state of the opened node, looked up fresh in `graph`.
    pub fn resolve<'g>(&self, graph: &'g TopologyGraph) -> Option<&'g VisualNode> {
        self.opened.as_deref().and_then(|id| graph.node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::{NodeAttributes, Position};

    #[test]
    fn test_open_close() {
        let mut sel = Selection::new();
        assert!(!sel.is_open());

        sel.open("w1");
        assert_eq!(sel.opened(), Some("w1"));

        sel.open("w2");
        assert_eq!(sel.opened(), Some("w2"));

        sel.close();
        assert_eq!(sel.opened(), None);
    }

    #[test]
    fn test_resolve_reads_current_graph() {
        let mut graph = TopologyGraph::new();
        graph.nodes.push(VisualNode {
            id: "w1".into(),
            position: Position::ORIGIN,
            attributes: NodeAttributes {
                name: "w1".into(),
                region: "us".into(),
                online: true,
                last_seen_at_ms: 0,
                http: None,
                geo: None,
            },
            is_center: false,
            pinned: false,
            missed_polls: 0,
        });

        let mut sel = Selection::new();
        sel.open("w1");
        assert_eq!(sel.resolve(&graph).map(|n| n.id.as_str()), Some("w1"));

        graph.nodes[0].attributes.region = "eu".into();
        assert_eq!(sel.resolve(&graph).unwrap().attributes.region, "eu");

        sel.open("unknown");
        assert!(sel.resolve(&graph).is_none());
    }
}
