//! Snapshot poller - background task feeding the cluster monitor.
//!
//! Ticks on a fixed interval whether or not earlier fetches have finished.
//! Each fetch runs as its own task and carries the sequence number it was
//! issued with; the monitor drops anything older than what it already
//! applied.
//!
//! Stopping is final: [`PollerHandle::stop`] aborts in-flight fetches and
//! returns only after the task has exited, so nothing is applied afterwards.
//! Dropping the handle stops the poller too.
//!
//! Retargeting drops every fetch against the old source, including ones that
//! already finished but were not yet applied, and clears the monitor so the
//! old cluster's nodes never mix with the new one's.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::client::SnapshotSource;
use crate::monitor::{ApplyResult, ClusterMonitor, MonitorView, PollOutcome};

enum Control {
    /// Poll now, outside the regular cadence. The sender, if any, receives
    /// the sequence number of that poll.
    Refresh(Option<oneshot::Sender<u64>>),
    /// Switch to a different gateway.
    Retarget(Arc<dyn SnapshotSource>),
}

/// Periodic fetch loop for one snapshot source.
pub struct Poller {
    source: Arc<dyn SnapshotSource>,
    monitor: ClusterMonitor,
    interval: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn SnapshotSource>, monitor: ClusterMonitor, interval: Duration) -> Self {
        Self {
            source,
            monitor,
            interval,
        }
    }

    /// Start polling on the current runtime. The first poll fires immediately.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let monitor = self.monitor.clone();
        let task = tokio::spawn(self.run(shutdown_rx, control_rx));
        PollerHandle {
            shutdown_tx,
            control_tx,
            monitor,
            task,
        }
    }

    async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut control_rx: mpsc::UnboundedReceiver<Control>,
    ) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: JoinSet<(u64, PollOutcome)> = JoinSet::new();
        let mut next_seq = 0u64;

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Snapshot poller started"
        );

        loop {
            tokio::select! {
                biased;

                // Err means every handle is gone; treat it like a stop.
                _ = shutdown_rx.changed() => break,

                Some((seq, outcome)) = join_next_ok(&mut in_flight) => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if self.monitor.apply(seq, outcome).await == ApplyResult::Stale {
                        debug!(seq, "Poll result arrived after a newer one");
                    }
                }

                Some(control) = control_rx.recv() => match control {
                    Control::Refresh(ack) => {
                        next_seq += 1;
                        self.issue(&mut in_flight, next_seq);
                        if let Some(ack) = ack {
                            let _ = ack.send(next_seq);
                        }
                    }
                    Control::Retarget(source) => {
                        in_flight.shutdown().await;
                        self.monitor.reset().await;
                        self.source = source;
                        next_seq += 1;
                        self.issue(&mut in_flight, next_seq);
                        info!("Snapshot poller retargeted");
                    }
                },

                _ = ticker.tick() => {
                    next_seq += 1;
                    self.issue(&mut in_flight, next_seq);
                }
            }
        }

        in_flight.shutdown().await;
        info!(polls_issued = next_seq, "Snapshot poller stopped");
    }

    fn issue(&self, in_flight: &mut JoinSet<(u64, PollOutcome)>, seq: u64) {
        let source = Arc::clone(&self.source);
        in_flight.spawn(async move {
            let outcome = match source.fetch_snapshot().await {
                Ok(snapshot) => PollOutcome::Snapshot(snapshot),
                Err(error) => PollOutcome::Unavailable(error),
            };
            (seq, outcome)
        });
    }
}

/// Next finished fetch, skipping aborted ones. `None` once the set is empty.
async fn join_next_ok(in_flight: &mut JoinSet<(u64, PollOutcome)>) -> Option<(u64, PollOutcome)> {
    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok(result) => return Some(result),
            Err(e) if e.is_cancelled() => continue,
            Err(e) => warn!(error = %e, "Snapshot fetch task failed"),
        }
    }
    None
}

/// Control handle for a running [`Poller`].
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    control_tx: mpsc::UnboundedSender<Control>,
    monitor: ClusterMonitor,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Trigger an immediate poll, e.g. after a deploy or invoke succeeded.
    pub fn refresh(&self) {
        let _ = self.control_tx.send(Control::Refresh(None));
    }

    /// Poll now and wait until that poll, or a newer one, has been applied.
    ///
    /// Returns the monitor's view at that point. If the poller has already
    /// exited, returns the current view without polling.
    pub async fn refresh_and_wait(&self) -> MonitorView {
        let mut revisions = self.monitor.subscribe();
        let (ack_tx, ack_rx) = oneshot::channel();

        if self.control_tx.send(Control::Refresh(Some(ack_tx))).is_ok() {
            if let Ok(seq) = ack_rx.await {
                while self.monitor.applied_seq().await < seq {
                    if revisions.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
        self.monitor.view().await
    }

    /// Poll a different source from now on. In-flight fetches against the
    /// old source are aborted and the monitor starts from an empty graph.
    pub fn retarget(&self, source: Arc<dyn SnapshotSource>) {
        let _ = self.control_tx.send(Control::Retarget(source));
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling and wait for the task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Snapshot poller task ended abnormally");
        }
    }
}
