use mimble_consensus::StateId;

use crate::processor::FastSyncBoundary;
use crate::protocol::PeerId;

/// Derived order is scheduling priority: headers before bodies, then lower
/// heights first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    pub want_body: bool,
    pub id: StateId,
}

impl TaskKey {
    pub fn header(id: StateId) -> Self {
        Self {
            want_body: false,
            id,
        }
    }

    pub fn body(id: StateId) -> Self {
        Self {
            want_body: true,
            id,
        }
    }

    pub fn height(&self) -> u64 {
        self.id.height
    }
}

/// Stable index into the scheduler's task arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(pub(crate) usize);

/// Marks a task not confirmed by the latest congestion pass.
pub const H_TARGET_STALE: u64 = u64::MAX;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub key: TaskKey,
    pub h_target: u64,
    /// Explicit `request_data` interests not yet released.
    pub refs: u32,
    pub owner: Option<PeerId>,
    pub is_pack: bool,
    /// Fast-sync window captured at assignment.
    pub fast_sync: Option<FastSyncBoundary>,
    pub assigned_ms: u64,
    pub deadline_ms: u64,
    /// Timeouts so far, across every peer that held the task.
    pub timeouts: u32,
}

impl Task {
    pub(crate) fn new(key: TaskKey, h_target: u64) -> Self {
        Self {
            key,
            h_target,
            refs: 0,
            owner: None,
            is_pack: false,
            fast_sync: None,
            assigned_ms: 0,
            deadline_ms: 0,
            timeouts: 0,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.owner.is_some()
    }

    /// Nobody asked for it and the last congestion pass did not confirm it.
    pub fn is_orphan(&self) -> bool {
        self.refs == 0 && self.h_target == H_TARGET_STALE
    }
}
