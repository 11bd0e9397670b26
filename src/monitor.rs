//! Cluster monitor - the single owner of the live topology
//!
//! Every poll outcome goes through [`ClusterMonitor::apply`], which runs the
//! whole merge under one write lock so readers never observe a half-updated
//! node set. Each applied outcome bumps a revision that renderers can await
//! through [`ClusterMonitor::subscribe`].
//!
//! Outcomes carry the sequence number assigned when their fetch was issued.
//! Anything at or below the last applied sequence is discarded, so a slow
//! response can never overwrite a newer one.
//!
//! A snapshot whose `cluster_id` differs from the previous good one starts a
//! fresh graph: nodes of one cluster are never laid out next to another's.

use std::sync::Arc;
use swarm_types::{ClusterSnapshot, FunctionSummary};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::topology::{reconcile, Position, StalenessPolicy, TopologyGraph};

/// Result of one poll, as delivered to the monitor.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Snapshot(ClusterSnapshot),
    /// No snapshot available: gateway unreachable or response malformed.
    Unavailable(FetchError),
}

/// What [`ClusterMonitor::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    MarkedUnreachable,
    /// Older than an outcome already applied; dropped.
    Stale,
}

/// Consistent copy of everything the monitor tracks.
#[derive(Debug, Clone, Default)]
pub struct MonitorView {
    pub graph: TopologyGraph,
    /// False until the first good snapshot, and after any failed poll.
    pub reachable: bool,
    pub last_error: Option<String>,
    /// Metadata of the last good snapshot.
    pub cluster_id: Option<String>,
    pub captured_at_ms: Option<i64>,
    pub functions: Vec<FunctionSummary>,
    /// Bumped on every applied outcome or manual edit.
    pub revision: u64,
}

/// Online/total node counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterStats {
    pub total: usize,
    pub online: usize,
}

#[derive(Debug, Default)]
struct MonitorState {
    view: MonitorView,
    last_applied_seq: u64,
}

/// Shared handle to the live topology. Cheap to clone.
#[derive(Clone)]
pub struct ClusterMonitor {
    state: Arc<RwLock<MonitorState>>,
    revision_tx: Arc<watch::Sender<u64>>,
    policy: StalenessPolicy,
}

impl Default for ClusterMonitor {
    fn default() -> Self {
        Self::new(StalenessPolicy::retain())
    }
}

impl ClusterMonitor {
    pub fn new(policy: StalenessPolicy) -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(MonitorState::default())),
            revision_tx: Arc::new(revision_tx),
            policy,
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Merge one poll outcome issued with sequence number `seq`.
    pub async fn apply(&self, seq: u64, outcome: PollOutcome) -> ApplyResult {
        let mut state = self.state.write().await;

        if seq <= state.last_applied_seq {
            debug!(
                seq,
                last_applied = state.last_applied_seq,
                "Discarding out-of-order poll result"
            );
            return ApplyResult::Stale;
        }
        state.last_applied_seq = seq;

        let result = match outcome {
            PollOutcome::Snapshot(snapshot) => {
                let mut previous = std::mem::take(&mut state.view.graph);
                if let Some(known) = state.view.cluster_id.as_deref() {
                    if known != snapshot.cluster_id {
                        info!(
                            from = %known,
                            to = %snapshot.cluster_id,
                            "Cluster id changed, starting a new topology"
                        );
                        previous = TopologyGraph::new();
                    }
                }
                let view = &mut state.view;
                view.graph = reconcile(previous, &snapshot, self.policy);
                view.reachable = true;
                view.last_error = None;
                view.cluster_id = Some(snapshot.cluster_id);
                view.captured_at_ms = Some(snapshot.captured_at_ms);
                view.functions = snapshot.functions;
                ApplyResult::Applied
            }
            PollOutcome::Unavailable(error) => {
                warn!(seq, error = %error, "Poll produced no snapshot, keeping last topology");
                state.view.reachable = false;
                state.view.last_error = Some(error.to_string());
                ApplyResult::MarkedUnreachable
            }
        };

        state.view.revision += 1;
        let revision = state.view.revision;
        drop(state);

        self.revision_tx.send_replace(revision);
        result
    }

    /// Forget everything learned so far, e.g. when switching gateways.
    ///
    /// The sequence guard is kept, so results issued before the reset still
    /// count as stale.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let revision = state.view.revision + 1;
        state.view = MonitorView {
            revision,
            ..MonitorView::default()
        };
        drop(state);

        self.revision_tx.send_replace(revision);
    }

    /// Sequence number of the last outcome applied, 0 before the first.
    pub async fn applied_seq(&self) -> u64 {
        self.state.read().await.last_applied_seq
    }

    /// Pin a node at a user-chosen position. Returns false for unknown ids.
    pub async fn move_node(&self, id: &str, position: Position) -> bool {
        let mut state = self.state.write().await;
        if !state.view.graph.move_node(id, position) {
            return false;
        }
        state.view.revision += 1;
        let revision = state.view.revision;
        drop(state);

        self.revision_tx.send_replace(revision);
        true
    }

    pub async fn view(&self) -> MonitorView {
        self.state.read().await.view.clone()
    }

    pub async fn graph(&self) -> TopologyGraph {
        self.state.read().await.view.graph.clone()
    }

    pub async fn is_reachable(&self) -> bool {
        self.state.read().await.view.reachable
    }

    pub async fn stats(&self) -> ClusterStats {
        let state = self.state.read().await;
        ClusterStats {
            total: state.view.graph.nodes.len(),
            online: state.view.graph.online_count(),
        }
    }

    /// Receiver that changes whenever the revision is bumped.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }
}
