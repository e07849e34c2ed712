use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncError {
    Unknown,
    /// Peers' clocks disagree with ours beyond the configured limit.
    TimeDiffToLarge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub cursor_height: u64,
    pub target_height: u64,
    pub tasks_unassigned: usize,
    pub tasks_assigned: usize,
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        self.cursor_height >= self.target_height && self.tasks_assigned == 0
    }
}

pub trait SyncObserver {
    fn on_sync_progress(&mut self, _status: &SyncStatus) {}
    fn on_sync_error(&mut self, err: SyncError);
}

/// Reports through `tracing` only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn on_sync_progress(&mut self, status: &SyncStatus) {
        info!(
            cursor = status.cursor_height,
            target = status.target_height,
            pending = status.tasks_unassigned,
            "sync progress"
        );
    }

    fn on_sync_error(&mut self, err: SyncError) {
        warn!(?err, "sync error");
    }
}
