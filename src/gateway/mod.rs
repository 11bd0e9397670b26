//! Gateway access: the HTTP client and the snapshot poller built on it.

pub mod client;
pub mod poller;

pub use client::{decode_snapshot, GatewayClient, SnapshotSource};
pub use poller::{Poller, PollerHandle};
