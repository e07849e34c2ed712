use std::collections::BTreeSet;

use mimble_consensus::{StateId, Work};

use crate::protocol::PeerId;
use crate::rating;
use crate::task::{TaskHandle, TaskKey};

/// Exponential moving average of response latency, weight 1/8.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Latency {
    avg_ms: u64,
    samples: u32,
}

impl Latency {
    pub fn add_sample(&mut self, ms: u64) {
        self.avg_ms = if self.samples == 0 {
            ms
        } else {
            (self.avg_ms.saturating_mul(7).saturating_add(ms)) / 8
        };
        self.samples = self.samples.saturating_add(1);
    }

    pub fn average(&self) -> Option<u64> {
        (self.samples > 0).then_some(self.avg_ms)
    }
}

#[derive(Clone, Debug)]
pub struct PeerTip {
    pub id: StateId,
    pub chain_work: Work,
}

#[derive(Clone, Debug)]
pub struct Peer {
    pub id: PeerId,
    pub authenticated: bool,
    pub supports_body_pack: bool,
    pub tip: Option<PeerTip>,
    pub rating: u32,
    /// Assigned tasks in assignment order.
    pub tasks: Vec<TaskHandle>,
    /// Tasks this connection refused or failed; cleared on reconnect.
    pub rejected: BTreeSet<TaskKey>,
    pub unsent_bytes: u64,
    pub choking: bool,
    pub hdr_pack_in_flight: bool,
    pub body_pack_in_flight: bool,
    pub body_tasks: u32,
    pub latency_hdr: Latency,
    pub latency_body: Latency,
    /// Earliest deadline among assigned tasks.
    pub timer_ms: Option<u64>,
}

impl Peer {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            authenticated: false,
            supports_body_pack: false,
            tip: None,
            rating: rating::INITIAL,
            tasks: Vec::new(),
            rejected: BTreeSet::new(),
            unsent_bytes: 0,
            choking: false,
            hdr_pack_in_flight: false,
            body_pack_in_flight: false,
            body_tasks: 0,
            latency_hdr: Latency::default(),
            latency_body: Latency::default(),
            timer_ms: None,
        }
    }

    /// Whether the advertised tip can serve `id`. A peer at the same height
    /// must be on the same block.
    pub fn covers(&self, id: &StateId) -> bool {
        match &self.tip {
            None => false,
            Some(t) if t.id.height == id.height => t.id.hash == id.hash,
            Some(t) => t.id.height > id.height,
        }
    }

    pub fn tip_work(&self) -> Work {
        self.tip.as_ref().map(|t| t.chain_work).unwrap_or(Work::ZERO)
    }

    pub fn latency(&self, want_body: bool) -> &Latency {
        if want_body {
            &self.latency_body
        } else {
            &self.latency_hdr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_average_tracks_samples() {
        let mut l = Latency::default();
        assert_eq!(l.average(), None);
        l.add_sample(800);
        assert_eq!(l.average(), Some(800));
        l.add_sample(0);
        assert_eq!(l.average(), Some(700));
    }

    #[test]
    fn tip_coverage() {
        let mut p = Peer::new(1);
        let id = StateId {
            height: 10,
            hash: [1; 32],
        };
        assert!(!p.covers(&id));
        p.tip = Some(PeerTip {
            id,
            chain_work: Work::from_u64(100),
        });
        assert!(p.covers(&id));
        assert!(p.covers(&StateId {
            height: 9,
            hash: [7; 32]
        }));
        assert!(!p.covers(&StateId {
            height: 10,
            hash: [2; 32]
        }));
        assert!(!p.covers(&StateId {
            height: 11,
            hash: [1; 32]
        }));
    }
}
