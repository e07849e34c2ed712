use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use mimble_consensus::constants::HEIGHT_GENESIS;
use mimble_consensus::merkle::{MemMmr, Mmr, ProofBuilder};
use mimble_consensus::{
    interpret, ChainParams, ChainWorkError, ChainWorkProof, ChainWorkSource, Difficulty, Hash,
    Header, StateId, Work,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::io_utils::{parse_hex32, read_json, write_json_atomic};
use crate::processor::{ChainProcessor, Congestion, FastSyncBoundary};

pub const CHAIN_STATE_FILE_NAME: &str = "headers.json";
const CHAIN_STATE_DISK_VERSION: u32 = 1;

/// Bodies requested ahead of the cursor in one congestion pass.
pub const BODY_WINDOW: u64 = 32;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainStateError {
    #[error("header at height {got} does not extend tip height {expected}")]
    Height { expected: u64, got: u64 },
    #[error("header does not link to the current tip")]
    Link,
    #[error("header fails its self check")]
    Invalid,
    #[error("header chain work does not match its parent")]
    ChainWork,
    #[error("header definition does not commit to the history")]
    Definition,
    #[error("body {0} is not the next one expected")]
    BodyOutOfOrder(u64),
}

/// Header chain with its history MMR and body cursor.
///
/// Serves as the prover's `ChainWorkSource` and as the scheduler's
/// `ChainProcessor`. The live-state roots are taken as given; the body
/// application that produces them lives elsewhere.
#[derive(Clone, Debug)]
pub struct ChainState {
    params: ChainParams,
    headers: Vec<Header>,
    lives: Vec<Hash>,
    mmr: MemMmr,
    body_height: u64,
    remote_tips: BTreeSet<StateId>,
    fast_sync: Option<FastSyncBoundary>,
    proof_cache: Option<(Hash, ChainWorkProof)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChainStateDisk {
    version: u32,
    tip_hash: String,
    body_height: u64,
    headers: Vec<Header>,
    lives: Vec<String>,
}

impl ChainState {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            headers: Vec::new(),
            lives: Vec::new(),
            mmr: MemMmr::new(),
            body_height: 0,
            remote_tips: BTreeSet::new(),
            fast_sync: None,
            proof_cache: None,
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn tip(&self) -> Option<&Header> {
        self.headers.last()
    }

    pub fn tip_height(&self) -> u64 {
        self.tip().map_or(0, Header::height)
    }

    pub fn header_at(&self, height: u64) -> Option<&Header> {
        let i = height.checked_sub(HEIGHT_GENESIS)?;
        self.headers.get(usize::try_from(i).ok()?)
    }

    pub fn body_height(&self) -> u64 {
        self.body_height
    }

    /// MMR root over every header hash so far: what the next header's
    /// definition must commit to.
    pub fn history_root(&self) -> Hash {
        self.mmr.root()
    }

    pub fn append_header(&mut self, header: Header, root_live: Hash) -> Result<(), ChainStateError> {
        let (expected, prev, parent_work) = match self.tip() {
            None => (HEIGHT_GENESIS, [0u8; 32], Work::ZERO),
            Some(t) => (t.height() + 1, t.hash(), t.chain_work()),
        };
        if header.height() != expected {
            return Err(ChainStateError::Height {
                expected,
                got: header.height(),
            });
        }
        if header.prefix.prev != prev {
            return Err(ChainStateError::Link);
        }
        if !header.is_valid(&self.params) {
            return Err(ChainStateError::Invalid);
        }
        let cw = parent_work.checked_add(&header.difficulty().to_raw());
        if cw != Some(header.chain_work()) {
            return Err(ChainStateError::ChainWork);
        }
        if header.element.definition != interpret(&self.mmr.root(), &root_live) {
            return Err(ChainStateError::Definition);
        }

        let id = header.id();
        self.mmr.append(id.hash);
        self.headers.push(header);
        self.lives.push(root_live);
        self.remote_tips.retain(|t| t.height > id.height);
        debug!(
            height = id.height,
            difficulty = header.difficulty().to_float(),
            "header appended"
        );
        Ok(())
    }

    /// Difficulty for the next header, retargeted over the last `window`
    /// headers. `None` until the chain is longer than the window.
    pub fn next_difficulty(&self, window: u64, dt_target_s: u64) -> Option<Difficulty> {
        let tip = self.tip()?;
        let base = self.header_at(tip.height().checked_sub(window)?)?;
        let work = tip.chain_work().checked_sub(&base.chain_work())?;
        let dt = tip.element.timestamp.saturating_sub(base.element.timestamp);
        Some(Difficulty::calculate(&work, window, dt_target_s, dt))
    }

    /// Advances the body cursor past `id`, which must be the next header.
    pub fn on_body_validated(&mut self, id: &StateId) -> Result<(), ChainStateError> {
        let next = self.body_height + 1;
        match self.header_at(next) {
            Some(h) if id.height == next && h.hash() == id.hash => {
                self.body_height = next;
                Ok(())
            }
            _ => Err(ChainStateError::BodyOutOfOrder(id.height)),
        }
    }

    /// Remembers a tip some peer advertised above ours.
    pub fn note_remote_tip(&mut self, id: StateId) -> bool {
        if id.height <= self.tip_height() {
            return false;
        }
        self.remote_tips.insert(id)
    }

    pub fn set_fast_sync(&mut self, boundary: Option<FastSyncBoundary>) {
        self.fast_sync = boundary;
    }

    /// Full proof for the current tip, rebuilt only when the tip moved.
    pub fn build_chain_work_proof(&mut self) -> Result<&ChainWorkProof, ChainWorkError> {
        let tip = *self.tip().ok_or(ChainWorkError::Empty)?;
        let tip_hash = tip.hash();
        let fresh = matches!(&self.proof_cache, Some((h, _)) if *h == tip_hash);
        if !fresh {
            let mut proof = ChainWorkProof::default();
            proof.create(&self.params, &*self, &tip)?;
            info!(
                height = tip.height(),
                heading = proof.heading.elements.len(),
                sparse = proof.arbitrary_states.len(),
                "chain work proof built"
            );
            self.proof_cache = Some((tip_hash, proof));
        }
        match &self.proof_cache {
            Some((_, p)) => Ok(p),
            None => Err(ChainWorkError::Empty),
        }
    }

    /// The cached full proof cropped for a client that already trusts the
    /// chain up to `lower_bound`.
    pub fn chain_work_proof_for(&mut self, lower_bound: Work) -> Result<ChainWorkProof, ChainWorkError> {
        let params = self.params.clone();
        let full = self.build_chain_work_proof()?;
        let mut out = ChainWorkProof::new(lower_bound);
        out.crop_from(&params, full)?;
        Ok(out)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let disk = ChainStateDisk {
            version: CHAIN_STATE_DISK_VERSION,
            tip_hash: hex::encode(self.tip().map_or([0u8; 32], Header::hash)),
            body_height: self.body_height,
            headers: self.headers.clone(),
            lives: self.lives.iter().map(hex::encode).collect(),
        };
        write_json_atomic(path, &disk, "chainstate")
    }
}

pub fn chain_state_path<P: AsRef<Path>>(data_dir: P) -> PathBuf {
    data_dir.as_ref().join(CHAIN_STATE_FILE_NAME)
}

/// Rebuilds the chain by re-appending every stored header, so a file that
/// was tampered with fails to load. A missing file yields an empty chain.
pub fn load_chain_state<P: AsRef<Path>>(path: P, params: ChainParams) -> Result<ChainState, String> {
    let path = path.as_ref();
    let Some(disk) = read_json::<ChainStateDisk>(path, "chainstate")? else {
        return Ok(ChainState::new(params));
    };
    if disk.version != CHAIN_STATE_DISK_VERSION {
        return Err(format!("unsupported chainstate version: {}", disk.version));
    }
    if disk.headers.len() != disk.lives.len() {
        return Err("chainstate: headers and live roots differ in length".to_string());
    }

    let mut cs = ChainState::new(params);
    for (i, (h, live)) in disk.headers.into_iter().zip(disk.lives.iter()).enumerate() {
        let live = parse_hex32(&format!("lives[{i}]"), live)?;
        cs.append_header(h, live)
            .map_err(|e| format!("chainstate header {i}: {e}"))?;
    }

    let tip_hash = parse_hex32("tip_hash", &disk.tip_hash)?;
    if tip_hash != cs.tip().map_or([0u8; 32], Header::hash) {
        return Err("chainstate: tip hash mismatch".to_string());
    }
    if disk.body_height > cs.tip_height() {
        return Err(format!(
            "chainstate: body height {} above header tip {}",
            disk.body_height,
            cs.tip_height()
        ));
    }
    cs.body_height = disk.body_height;
    Ok(cs)
}

impl ChainWorkSource for ChainState {
    fn state_at(&self, work: &Work) -> Option<Header> {
        let i = self.headers.partition_point(|h| h.chain_work() <= *work);
        self.headers.get(i).copied()
    }

    fn proof(&self, builder: &mut dyn ProofBuilder, height: u64) {
        let count = self.tip_height() - HEIGHT_GENESIS;
        self.mmr
            .view(count)
            .proof(builder, height - HEIGHT_GENESIS);
    }

    fn root_live(&self) -> Hash {
        self.lives.last().copied().unwrap_or([0u8; 32])
    }
}

impl ChainProcessor for ChainState {
    fn cursor_height(&self) -> u64 {
        self.body_height
    }

    fn enum_congestions(&self, f: &mut dyn FnMut(Congestion)) {
        let tip = self.tip_height();
        for t in self.remote_tips.iter().filter(|t| t.height > tip) {
            f(Congestion {
                id: *t,
                want_body: false,
                h_target: t.height,
            });
        }

        let first = self.body_height + 1;
        let last = tip.min(self.body_height.saturating_add(BODY_WINDOW));
        for h in first..=last {
            if let Some(hdr) = self.header_at(h) {
                f(Congestion {
                    id: hdr.id(),
                    want_body: true,
                    h_target: tip,
                });
            }
        }
    }

    fn fast_sync(&self) -> Option<FastSyncBoundary> {
        self.fast_sync
    }
}
