use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io_utils::read_json;

pub const DEFAULT_GET_STATE_MS: u64 = 5_000;
pub const DEFAULT_GET_BLOCK_MS: u64 = 30_000;
pub const DEFAULT_ADAPTIVE_TIMEOUT_FACTOR: u32 = 4;
pub const DEFAULT_ADAPTIVE_TIMEOUT_MIN_MS: u64 = 1_000;
pub const DEFAULT_ADAPTIVE_TIMEOUT_MAX_MS: u64 = 120_000;
pub const DEFAULT_MAX_CONCURRENT_BLOCKS_REQUEST: u32 = 5;
pub const DEFAULT_CHOKING_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_DROWN_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_VERIFICATION_THREADS: u32 = 1;
pub const DEFAULT_TASK_RETRY_BUDGET: u32 = 3;
pub const DEFAULT_REJECT_BACKOFF_MS: u64 = 60_000;
pub const DEFAULT_HDR_PACK_MAX: u32 = 128;
pub const DEFAULT_BODY_PACK_MAX: u32 = 16;
pub const DEFAULT_MAX_TIME_DIFF_S: u64 = 60 * 60;

/// Header requests only become packs this far above the cursor.
pub const HDR_PACK_MIN_GAP: u64 = 5;

/// Node runtime knobs. Missing JSON fields take their defaults; zero values are
/// normalized to defaults by `NodeConfig::normalized`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub get_state_ms: u64,
    pub get_block_ms: u64,
    /// Adaptive timeout = average latency times this factor, clamped to the bounds below.
    pub adaptive_timeout_factor: u32,
    pub adaptive_timeout_min_ms: u64,
    pub adaptive_timeout_max_ms: u64,
    pub max_concurrent_blocks_request: u32,
    pub choking_bytes: u64,
    pub drown_bytes: u64,
    pub verification_threads: u32,
    /// Timeouts a single task may suffer, across peers, before it is given up.
    pub task_retry_budget: u32,
    /// How long a peer that failed a task is kept off it, reconnects included.
    pub reject_backoff_ms: u64,
    pub hdr_pack_max: u32,
    pub body_pack_max: u32,
    pub max_time_diff_s: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        default_node_config()
    }
}

pub fn default_node_config() -> NodeConfig {
    NodeConfig {
        get_state_ms: DEFAULT_GET_STATE_MS,
        get_block_ms: DEFAULT_GET_BLOCK_MS,
        adaptive_timeout_factor: DEFAULT_ADAPTIVE_TIMEOUT_FACTOR,
        adaptive_timeout_min_ms: DEFAULT_ADAPTIVE_TIMEOUT_MIN_MS,
        adaptive_timeout_max_ms: DEFAULT_ADAPTIVE_TIMEOUT_MAX_MS,
        max_concurrent_blocks_request: DEFAULT_MAX_CONCURRENT_BLOCKS_REQUEST,
        choking_bytes: DEFAULT_CHOKING_BYTES,
        drown_bytes: DEFAULT_DROWN_BYTES,
        verification_threads: DEFAULT_VERIFICATION_THREADS,
        task_retry_budget: DEFAULT_TASK_RETRY_BUDGET,
        reject_backoff_ms: DEFAULT_REJECT_BACKOFF_MS,
        hdr_pack_max: DEFAULT_HDR_PACK_MAX,
        body_pack_max: DEFAULT_BODY_PACK_MAX,
        max_time_diff_s: DEFAULT_MAX_TIME_DIFF_S,
    }
}

impl NodeConfig {
    pub fn normalized(mut self) -> Self {
        if self.get_state_ms == 0 {
            self.get_state_ms = DEFAULT_GET_STATE_MS;
        }
        if self.get_block_ms == 0 {
            self.get_block_ms = DEFAULT_GET_BLOCK_MS;
        }
        if self.adaptive_timeout_factor == 0 {
            self.adaptive_timeout_factor = DEFAULT_ADAPTIVE_TIMEOUT_FACTOR;
        }
        if self.adaptive_timeout_min_ms == 0 {
            self.adaptive_timeout_min_ms = DEFAULT_ADAPTIVE_TIMEOUT_MIN_MS;
        }
        if self.adaptive_timeout_max_ms == 0 {
            self.adaptive_timeout_max_ms = DEFAULT_ADAPTIVE_TIMEOUT_MAX_MS;
        }
        if self.adaptive_timeout_max_ms < self.adaptive_timeout_min_ms {
            self.adaptive_timeout_max_ms = self.adaptive_timeout_min_ms;
        }
        if self.max_concurrent_blocks_request == 0 {
            self.max_concurrent_blocks_request = DEFAULT_MAX_CONCURRENT_BLOCKS_REQUEST;
        }
        if self.choking_bytes == 0 {
            self.choking_bytes = DEFAULT_CHOKING_BYTES;
        }
        if self.drown_bytes == 0 {
            self.drown_bytes = DEFAULT_DROWN_BYTES;
        }
        if self.drown_bytes < self.choking_bytes {
            self.drown_bytes = self.choking_bytes;
        }
        if self.verification_threads == 0 {
            self.verification_threads = DEFAULT_VERIFICATION_THREADS;
        }
        if self.task_retry_budget == 0 {
            self.task_retry_budget = DEFAULT_TASK_RETRY_BUDGET;
        }
        if self.hdr_pack_max == 0 {
            self.hdr_pack_max = DEFAULT_HDR_PACK_MAX;
        }
        if self.body_pack_max == 0 {
            self.body_pack_max = DEFAULT_BODY_PACK_MAX;
        }
        if self.max_time_diff_s == 0 {
            self.max_time_diff_s = DEFAULT_MAX_TIME_DIFF_S;
        }
        self
    }
}

/// Missing file yields the defaults.
pub fn load_node_config<P: AsRef<Path>>(path: P) -> Result<NodeConfig, String> {
    let cfg: Option<NodeConfig> = read_json(path.as_ref(), "config")?;
    Ok(cfg.map_or_else(default_node_config, NodeConfig::normalized))
}
