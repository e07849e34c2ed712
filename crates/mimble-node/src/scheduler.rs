//! Download task scheduling across peers.
//!
//! Tasks live in an arena addressed by `TaskHandle`, indexed by key and, while
//! unassigned, by priority. Each assigned task belongs to exactly one peer. All
//! entry points take the current time explicitly; the owner drives
//! `check_timeouts` from its reactor loop and drains `take_outbox`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mimble_consensus::{ErrorCode, StateId, Work};
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, HDR_PACK_MIN_GAP};
use crate::observer::{SyncError, SyncObserver, SyncStatus};
use crate::peer::{Peer, PeerTip};
use crate::processor::{ChainProcessor, FastSyncBoundary};
use crate::protocol::{ByeReason, Message, Outgoing, PeerId};
use crate::rating;
use crate::task::{Task, TaskHandle, TaskKey, H_TARGET_STALE};

pub struct TaskScheduler<O: SyncObserver> {
    cfg: NodeConfig,
    observer: O,
    tasks: Vec<Option<Task>>,
    free: Vec<usize>,
    by_key: BTreeMap<TaskKey, TaskHandle>,
    unassigned: BTreeSet<TaskKey>,
    peers: BTreeMap<PeerId, Peer>,
    /// Survives disconnects: a reconnecting peer stays off the task until expiry.
    backoff: HashMap<(PeerId, TaskKey), u64>,
    outbox: Vec<Outgoing>,
    cursor_height: u64,
    target_height: u64,
    fast_sync: Option<FastSyncBoundary>,
}

impl<O: SyncObserver> TaskScheduler<O> {
    pub fn new(cfg: NodeConfig, observer: O) -> Self {
        Self {
            cfg: cfg.normalized(),
            observer,
            tasks: Vec::new(),
            free: Vec::new(),
            by_key: BTreeMap::new(),
            unassigned: BTreeSet::new(),
            peers: BTreeMap::new(),
            backoff: HashMap::new(),
            outbox: Vec::new(),
            cursor_height: 0,
            target_height: 0,
            fast_sync: None,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.cfg
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn peer_mut(&mut self, id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(&id)
    }

    pub fn task(&self, h: TaskHandle) -> Option<&Task> {
        self.tasks.get(h.0).and_then(Option::as_ref)
    }

    pub fn find_task(&self, key: &TaskKey) -> Option<TaskHandle> {
        self.by_key.get(key).copied()
    }

    pub fn task_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn unassigned(&self) -> impl Iterator<Item = &TaskKey> {
        self.unassigned.iter()
    }

    fn alloc(&mut self, task: Task) -> TaskHandle {
        let key = task.key;
        let h = match self.free.pop() {
            Some(i) => {
                self.tasks[i] = Some(task);
                TaskHandle(i)
            }
            None => {
                self.tasks.push(Some(task));
                TaskHandle(self.tasks.len() - 1)
            }
        };
        self.by_key.insert(key, h);
        self.unassigned.insert(key);
        h
    }

    fn free_task(&mut self, h: TaskHandle) {
        if let Some(task) = self.tasks.get_mut(h.0).and_then(Option::take) {
            self.by_key.remove(&task.key);
            self.unassigned.remove(&task.key);
            self.free.push(h.0);
        }
    }

    /// Registers interest in a header or body. Repeated requests for the same
    /// key share one task and bump its reference count.
    pub fn request_data(
        &mut self,
        id: StateId,
        want_body: bool,
        preferred: Option<PeerId>,
        now_ms: u64,
    ) -> TaskHandle {
        let key = TaskKey { want_body, id };
        if let Some(h) = self.find_task(&key) {
            if let Some(t) = self.tasks[h.0].as_mut() {
                t.refs += 1;
            }
            return h;
        }

        let mut task = Task::new(key, H_TARGET_STALE);
        task.refs = 1;
        let h = self.alloc(task);
        self.try_assign_task(h, preferred, now_ms);
        h
    }

    /// Drops one `request_data` interest. An unassigned task nobody else
    /// needs is deleted. Returns false for an unknown handle.
    pub fn release_interest(&mut self, h: TaskHandle) -> bool {
        let Some(t) = self.tasks.get_mut(h.0).and_then(Option::as_mut) else {
            return false;
        };
        t.refs = t.refs.saturating_sub(1);
        if t.is_orphan() && !t.is_assigned() {
            self.free_task(h);
        }
        true
    }

    /// Cancels a task in any state.
    pub fn abandon_task(&mut self, h: TaskHandle) -> bool {
        if self.task(h).is_none() {
            return false;
        }
        self.detach(h);
        self.free_task(h);
        true
    }

    /// Re-derives the wanted tasks from the local chain: every task is marked
    /// stale, the processor's congestions revive or create tasks, and stale
    /// unassigned ones nobody asked for are pruned.
    pub fn refresh_congestions(&mut self, processor: &dyn ChainProcessor, now_ms: u64) {
        self.cursor_height = processor.cursor_height();
        self.fast_sync = processor.fast_sync();

        for t in self.tasks.iter_mut().flatten() {
            t.h_target = H_TARGET_STALE;
        }

        let mut found = Vec::new();
        processor.enum_congestions(&mut |c| found.push(c));

        let mut target = self.cursor_height;
        for c in found {
            target = target.max(c.h_target);
            let key = TaskKey {
                want_body: c.want_body,
                id: c.id,
            };
            match self.find_task(&key) {
                Some(h) => {
                    if let Some(t) = self.tasks[h.0].as_mut() {
                        t.h_target = c.h_target;
                    }
                }
                None => {
                    self.alloc(Task::new(key, c.h_target));
                }
            }
        }
        self.target_height = target;

        let stale: Vec<TaskHandle> = self
            .unassigned
            .iter()
            .filter_map(|k| self.by_key.get(k).copied())
            .filter(|h| self.task(*h).is_some_and(Task::is_orphan))
            .collect();
        for h in stale {
            self.free_task(h);
        }

        self.assign_pending(now_ms);

        let status = self.sync_status();
        self.observer.on_sync_progress(&status);
    }

    /// Offers every unassigned task, in priority order.
    pub fn assign_pending(&mut self, now_ms: u64) {
        let keys: Vec<TaskKey> = self.unassigned.iter().copied().collect();
        for key in keys {
            if let Some(h) = self.find_task(&key) {
                self.try_assign_task(h, None, now_ms);
            }
        }
    }

    /// Offers every unassigned task to one peer that just became available.
    pub fn take_tasks(&mut self, pid: PeerId, now_ms: u64) -> usize {
        let keys: Vec<TaskKey> = self.unassigned.iter().copied().collect();
        let mut taken = 0;
        for key in keys {
            if let Some(h) = self.find_task(&key) {
                if self.try_assign_to(h, pid, now_ms) {
                    taken += 1;
                }
            }
        }
        taken
    }

    /// Hands an unassigned task to `preferred` if eligible, else to the best
    /// eligible peer.
    pub fn try_assign_task(
        &mut self,
        h: TaskHandle,
        preferred: Option<PeerId>,
        now_ms: u64,
    ) -> bool {
        self.assign_excluding(h, preferred, None, now_ms)
    }

    fn assign_excluding(
        &mut self,
        h: TaskHandle,
        preferred: Option<PeerId>,
        exclude: Option<PeerId>,
        now_ms: u64,
    ) -> bool {
        match self.task(h) {
            Some(t) if !t.is_assigned() => {}
            _ => return false,
        }
        if let Some(p) = preferred {
            if Some(p) != exclude && self.try_assign_to(h, p, now_ms) {
                return true;
            }
        }
        for p in self.peers_by_priority() {
            if Some(p) == preferred || Some(p) == exclude {
                continue;
            }
            if self.try_assign_to(h, p, now_ms) {
                return true;
            }
        }
        false
    }

    /// Best rating first, then heavier tip, then higher id.
    fn peers_by_priority(&self) -> Vec<PeerId> {
        let mut v: Vec<&Peer> = self.peers.values().collect();
        v.sort_by(|a, b| (b.rating, b.tip_work(), b.id).cmp(&(a.rating, a.tip_work(), a.id)));
        v.into_iter().map(|p| p.id).collect()
    }

    fn can_assign(&self, task: &Task, peer: &Peer, now_ms: u64) -> bool {
        let key = &task.key;
        if !peer.authenticated || rating::is_banned(peer.rating) {
            return false;
        }
        if peer.unsent_bytes > self.cfg.choking_bytes {
            return false;
        }
        if !peer.covers(&key.id) || peer.rejected.contains(key) {
            return false;
        }
        if let Some(until) = self.backoff.get(&(peer.id, *key)) {
            if *until > now_ms {
                return false;
            }
        }
        if key.want_body {
            if peer.body_tasks >= self.cfg.max_concurrent_blocks_request {
                return false;
            }
            if let Some(fs) = &self.fast_sync {
                if key.height() > fs.target.height {
                    return false;
                }
            }
        } else if peer.body_tasks > 0 {
            // no header requests while the peer streams bodies
            return false;
        }
        true
    }

    fn try_assign_to(&mut self, h: TaskHandle, pid: PeerId, now_ms: u64) -> bool {
        let (Some(task), Some(peer)) = (self.task(h), self.peers.get(&pid)) else {
            return false;
        };
        if !self.can_assign(task, peer, now_ms) {
            return false;
        }

        let key = task.key;
        let timeout = self.get_adaptive_timeout(pid, key.want_body);
        let fast_sync = if key.want_body { self.fast_sync } else { None };
        let gap = key.height().saturating_sub(self.cursor_height);
        let pack = if gap >= HDR_PACK_MIN_GAP { gap } else { 0 };

        let Some(peer) = self.peers.get_mut(&pid) else {
            return false;
        };
        let (msg, is_pack) = if key.want_body {
            peer.body_tasks += 1;
            if pack > 0 && peer.supports_body_pack && !peer.body_pack_in_flight {
                peer.body_pack_in_flight = true;
                let count = pack.min(self.cfg.body_pack_max as u64) as u32;
                (
                    Message::GetBodyPack {
                        top: key.id,
                        count,
                        fast_sync,
                    },
                    true,
                )
            } else {
                (Message::GetBody { id: key.id }, false)
            }
        } else if pack > 0 && !peer.hdr_pack_in_flight {
            peer.hdr_pack_in_flight = true;
            let count = pack.min(self.cfg.hdr_pack_max as u64) as u32;
            (Message::GetHdrPack { top: key.id, count }, true)
        } else {
            (Message::GetHdr { id: key.id }, false)
        };

        let deadline = now_ms.saturating_add(timeout);
        peer.tasks.push(h);
        peer.timer_ms = Some(peer.timer_ms.map_or(deadline, |t| t.min(deadline)));

        if let Some(t) = self.tasks[h.0].as_mut() {
            t.owner = Some(pid);
            t.is_pack = is_pack;
            t.fast_sync = fast_sync;
            t.assigned_ms = now_ms;
            t.deadline_ms = deadline;
        }
        self.unassigned.remove(&key);
        self.outbox.push(Outgoing { peer: pid, msg });

        debug!(
            peer = pid,
            height = key.height(),
            body = key.want_body,
            pack = is_pack,
            "task assigned"
        );
        true
    }

    /// Unlinks a task from its owner, keeping the task itself.
    fn detach(&mut self, h: TaskHandle) -> Option<PeerId> {
        let task = self.tasks.get_mut(h.0).and_then(Option::as_mut)?;
        let pid = task.owner.take()?;
        let was_pack = std::mem::take(&mut task.is_pack);
        let want_body = task.key.want_body;
        self.unassigned.insert(task.key);

        let tasks = &self.tasks;
        if let Some(peer) = self.peers.get_mut(&pid) {
            peer.tasks.retain(|x| *x != h);
            if want_body {
                peer.body_tasks = peer.body_tasks.saturating_sub(1);
                if was_pack {
                    peer.body_pack_in_flight = false;
                }
            } else if was_pack {
                peer.hdr_pack_in_flight = false;
            }
            peer.timer_ms = peer
                .tasks
                .iter()
                .filter_map(|x| tasks.get(x.0).and_then(Option::as_ref))
                .map(|t| t.deadline_ms)
                .min();
        }
        Some(pid)
    }

    /// Returns a task to the pool and offers it to any peer except `exclude`.
    /// Tasks nobody needs anymore are deleted instead.
    fn release_task(&mut self, h: TaskHandle, exclude: Option<PeerId>, now_ms: u64) {
        self.detach(h);
        if self.task(h).is_some_and(Task::is_orphan) {
            self.free_task(h);
            return;
        }
        self.assign_excluding(h, None, exclude, now_ms);
    }

    /// Takes every task away from `pid` and reassigns them elsewhere.
    pub fn release_tasks(&mut self, pid: PeerId, now_ms: u64) {
        let handles = match self.peers.get(&pid) {
            Some(p) => p.tasks.clone(),
            None => return,
        };
        for h in handles {
            self.release_task(h, Some(pid), now_ms);
        }
    }

    /// Data for an assigned task arrived. Rewards the peer and records its latency.
    pub fn on_task_done(&mut self, pid: PeerId, key: &TaskKey, now_ms: u64) -> bool {
        let Some(h) = self.find_task(key) else {
            return false;
        };
        let Some(task) = self.task(h) else {
            return false;
        };
        if task.owner != Some(pid) {
            return false;
        }
        let elapsed = now_ms.saturating_sub(task.assigned_ms);

        self.detach(h);
        self.free_task(h);

        if let Some(peer) = self.peers.get_mut(&pid) {
            if key.want_body {
                peer.latency_body.add_sample(elapsed);
                rating::inc(&mut peer.rating, rating::REWARD_BLOCK);
            } else {
                peer.latency_hdr.add_sample(elapsed);
                rating::inc(&mut peer.rating, rating::REWARD_HEADER);
            }
        }

        self.assign_pending(now_ms);
        true
    }

    /// The peer does not have what it was asked for.
    pub fn on_data_missing(&mut self, pid: PeerId, key: &TaskKey, now_ms: u64) -> bool {
        let Some(h) = self.find_task(key) else {
            return false;
        };
        if self.task(h).map(|t| t.owner) != Some(Some(pid)) {
            return false;
        }
        if let Some(peer) = self.peers.get_mut(&pid) {
            peer.rejected.insert(*key);
        }
        // outlives the peer entry, so a quick reconnect is not offered it again
        let until = now_ms.saturating_add(self.cfg.reject_backoff_ms);
        self.backoff.insert((pid, *key), until);
        self.release_task(h, Some(pid), now_ms);
        true
    }

    /// Fires `on_request_timeout` for every peer whose earliest deadline passed.
    pub fn check_timeouts(&mut self, now_ms: u64) -> usize {
        let due: Vec<PeerId> = self
            .peers
            .values()
            .filter(|p| p.timer_ms.is_some_and(|t| t <= now_ms))
            .map(|p| p.id)
            .collect();
        for pid in &due {
            self.on_request_timeout(*pid, now_ms);
        }
        due.len()
    }

    /// Penalizes the peer, puts its expired tasks on backoff, disconnects it
    /// and reassigns its tasks. A task over the retry budget is given up and
    /// reported.
    pub fn on_request_timeout(&mut self, pid: PeerId, now_ms: u64) {
        let Some(peer) = self.peers.get_mut(&pid) else {
            return;
        };
        rating::dec(&mut peer.rating, rating::PENALTY_TIMEOUT);

        let expired: Vec<TaskHandle> = peer
            .tasks
            .iter()
            .copied()
            .filter(|h| {
                self.tasks
                    .get(h.0)
                    .and_then(Option::as_ref)
                    .is_some_and(|t| t.deadline_ms <= now_ms)
            })
            .collect();

        let until = now_ms.saturating_add(self.cfg.reject_backoff_ms);
        let mut exhausted = Vec::new();
        for h in expired {
            let Some(t) = self.tasks[h.0].as_mut() else {
                continue;
            };
            t.timeouts += 1;
            self.backoff.insert((pid, t.key), until);
            peer.rejected.insert(t.key);
            if t.timeouts >= self.cfg.task_retry_budget {
                exhausted.push(h);
            }
        }
        warn!(peer = pid, rating = peer.rating, "request timeout");

        for h in exhausted {
            if let Some(t) = self.task(h) {
                warn!(height = t.key.height(), body = t.key.want_body, "task retry budget exhausted");
            }
            self.abandon_task(h);
            self.observer.on_sync_error(SyncError::Unknown);
        }

        self.outbox.push(Outgoing {
            peer: pid,
            msg: Message::Bye {
                reason: ByeReason::Timeout,
            },
        });
        self.on_peer_disconnected(pid, now_ms);
    }

    /// Timeout for a new request to `pid`, from its latency history.
    pub fn get_adaptive_timeout(&self, pid: PeerId, want_body: bool) -> u64 {
        let base = if want_body {
            self.cfg.get_block_ms
        } else {
            self.cfg.get_state_ms
        };
        let Some(peer) = self.peers.get(&pid) else {
            return base;
        };
        match peer.latency(want_body).average() {
            None => base,
            Some(avg) => avg
                .saturating_mul(self.cfg.adaptive_timeout_factor as u64)
                .clamp(self.cfg.adaptive_timeout_min_ms, self.cfg.adaptive_timeout_max_ms),
        }
    }

    /// Evaluated against the current unsent estimate on every call.
    pub fn is_choking(&self, pid: PeerId) -> bool {
        self.peers
            .get(&pid)
            .is_some_and(|p| p.unsent_bytes > self.cfg.choking_bytes)
    }

    /// Updates the peer's unsent-bytes estimate. Crossing the choking
    /// threshold pings the peer; crossing the drown threshold disconnects it.
    pub fn set_unsent_bytes(&mut self, pid: PeerId, unsent: u64, now_ms: u64) {
        let Some(peer) = self.peers.get_mut(&pid) else {
            return;
        };
        peer.unsent_bytes = unsent;

        if unsent > self.cfg.drown_bytes {
            warn!(peer = pid, unsent, "peer drowned");
            self.outbox.push(Outgoing {
                peer: pid,
                msg: Message::Bye {
                    reason: ByeReason::Drown,
                },
            });
            self.on_peer_disconnected(pid, now_ms);
            return;
        }

        let over = unsent > self.cfg.choking_bytes;
        if over && !peer.choking {
            peer.choking = true;
            debug!(peer = pid, unsent, "peer choking");
            self.outbox.push(Outgoing {
                peer: pid,
                msg: Message::Ping,
            });
        } else if !over && peer.choking {
            peer.choking = false;
            self.take_tasks(pid, now_ms);
        }
    }

    pub fn on_peer_connected(&mut self, pid: PeerId) -> bool {
        if self.peers.contains_key(&pid) {
            return false;
        }
        self.peers.insert(pid, Peer::new(pid));
        true
    }

    pub fn on_peer_authenticated(&mut self, pid: PeerId, supports_body_pack: bool, now_ms: u64) {
        let Some(peer) = self.peers.get_mut(&pid) else {
            return;
        };
        peer.authenticated = true;
        peer.supports_body_pack = supports_body_pack;
        info!(peer = pid, "peer authenticated");
        self.take_tasks(pid, now_ms);
    }

    /// Records the peer's advertised tip. Tasks the new tip no longer covers
    /// go back to the pool.
    pub fn on_new_tip(&mut self, pid: PeerId, id: StateId, chain_work: Work, now_ms: u64) {
        let Some(peer) = self.peers.get_mut(&pid) else {
            return;
        };
        peer.tip = Some(PeerTip { id, chain_work });

        let uncovered: Vec<TaskHandle> = peer
            .tasks
            .iter()
            .copied()
            .filter(|h| {
                self.tasks
                    .get(h.0)
                    .and_then(Option::as_ref)
                    .is_some_and(|t| !peer.covers(&t.key.id))
            })
            .collect();
        for h in uncovered {
            self.release_task(h, Some(pid), now_ms);
        }
        self.take_tasks(pid, now_ms);
    }

    /// Drops the peer and reassigns everything it held.
    pub fn on_peer_disconnected(&mut self, pid: PeerId, now_ms: u64) -> bool {
        if !self.peers.contains_key(&pid) {
            return false;
        }
        if let Some(peer) = self.peers.get_mut(&pid) {
            peer.tip = None;
        }
        self.release_tasks(pid, now_ms);
        self.peers.remove(&pid);
        info!(peer = pid, "peer disconnected");
        true
    }

    /// Protocol violation. Insane data bans and disconnects; anything else
    /// costs rating only.
    pub fn on_peer_misbehaved(&mut self, pid: PeerId, insane: bool, now_ms: u64) {
        let Some(peer) = self.peers.get_mut(&pid) else {
            return;
        };
        if !insane {
            rating::dec(&mut peer.rating, rating::PENALTY_NETWORK_ERR);
            return;
        }
        rating::ban(&mut peer.rating);
        warn!(peer = pid, "peer banned");
        self.outbox.push(Outgoing {
            peer: pid,
            msg: Message::Bye {
                reason: ByeReason::Ban,
            },
        });
        self.on_peer_disconnected(pid, now_ms);
    }

    /// Data from `pid` failed validation with `code`. Returns whether the
    /// peer was banned.
    pub fn on_invalid_data(&mut self, pid: PeerId, code: ErrorCode, now_ms: u64) -> bool {
        let insane = code.is_insane();
        debug!(peer = pid, code = code.as_str(), insane, "invalid data from peer");
        self.on_peer_misbehaved(pid, insane, now_ms);
        insane && !self.peers.contains_key(&pid)
    }

    /// Clock sanity check against a peer's reported time, in seconds.
    pub fn on_peer_time(&mut self, pid: PeerId, peer_time_s: u64, local_time_s: u64) -> bool {
        let diff = peer_time_s.abs_diff(local_time_s);
        if diff <= self.cfg.max_time_diff_s {
            return true;
        }
        warn!(peer = pid, diff, "peer clock too far off");
        self.observer.on_sync_error(SyncError::TimeDiffToLarge);
        false
    }

    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus {
            cursor_height: self.cursor_height,
            target_height: self.target_height,
            tasks_unassigned: self.unassigned.len(),
            tasks_assigned: self.by_key.len() - self.unassigned.len(),
        }
    }
}
