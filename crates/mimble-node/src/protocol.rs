//! Outbound requests the scheduler emits. Framing and encoding belong to the
//! transport; only the request semantics live here.

use mimble_consensus::StateId;
use serde::{Deserialize, Serialize};

use crate::processor::FastSyncBoundary;

pub type PeerId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByeReason {
    Timeout,
    Drown,
    Ban,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    GetHdr {
        id: StateId,
    },
    /// `count` headers ending at `top`, walking down.
    GetHdrPack {
        top: StateId,
        count: u32,
    },
    GetBody {
        id: StateId,
    },
    GetBodyPack {
        top: StateId,
        count: u32,
        fast_sync: Option<FastSyncBoundary>,
    },
    /// Sent on entering the choking state; the pong shows the queue drained.
    Ping,
    Bye {
        reason: ByeReason,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    pub peer: PeerId,
    pub msg: Message,
}
