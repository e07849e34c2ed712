pub mod chainstate;
pub mod config;
pub mod io_utils;
pub mod observer;
pub mod peer;
pub mod processor;
pub mod protocol;
pub mod rating;
pub mod scheduler;
pub mod task;
pub mod verifier;

pub use chainstate::{
    chain_state_path, load_chain_state, ChainState, ChainStateError, BODY_WINDOW,
    CHAIN_STATE_FILE_NAME,
};
pub use config::{default_node_config, load_node_config, NodeConfig, HDR_PACK_MIN_GAP};
pub use observer::{LogObserver, SyncError, SyncObserver, SyncStatus};
pub use peer::{Latency, Peer, PeerTip};
pub use processor::{ChainProcessor, Congestion, FastSyncBoundary};
pub use protocol::{ByeReason, Message, Outgoing, PeerId};
pub use scheduler::TaskScheduler;
pub use task::{Task, TaskHandle, TaskKey, H_TARGET_STALE};
pub use verifier::VerifierPool;
