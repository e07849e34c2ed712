use mimble_consensus::StateId;
use serde::{Deserialize, Serialize};

/// Fast-sync window as seen when a body request was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastSyncBoundary {
    pub target: StateId,
    /// Outputs spent below this height may be cut through.
    pub txo_lo: u64,
    pub h0: u64,
}

/// A gap between local state and a known better tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Congestion {
    pub id: StateId,
    pub want_body: bool,
    /// Height of the tip whose sync needs this task.
    pub h_target: u64,
}

/// Local chain state as the scheduler reads it.
pub trait ChainProcessor {
    /// Height up to which bodies are applied.
    fn cursor_height(&self) -> u64;
    fn enum_congestions(&self, f: &mut dyn FnMut(Congestion));
    fn fast_sync(&self) -> Option<FastSyncBoundary>;
}
