use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::HEIGHT_GENESIS;
use crate::difficulty::Difficulty;
use crate::hash::{Hash, Hasher};
use crate::params::ChainParams;
use crate::work::Work;

/// Block identity: height plus header hash. Ordered by height first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId {
    pub height: u64,
    pub hash: Hash,
}

impl Ord for StateId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.height.cmp(&other.height) {
            Ordering::Equal => self.hash.cmp(&other.hash),
            o => o,
        }
    }
}

impl PartialOrd for StateId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Fields a header inherits from its position in the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPrefix {
    pub height: u64,
    pub prev: Hash,
    /// Cumulative work including this header's own difficulty.
    pub chain_work: Work,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoW {
    pub difficulty: Difficulty,
    pub nonce: u64,
}

/// Per-header fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderElement {
    pub kernels: Hash,
    /// `interpret(history_root, live_root)`: commits to every ancestor header.
    pub definition: Hash,
    pub timestamp: u64,
    pub pow: PoW,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub prefix: HeaderPrefix,
    pub element: HeaderElement,
}

impl Header {
    pub fn compose(prefix: HeaderPrefix, element: HeaderElement) -> Self {
        Self { prefix, element }
    }

    pub fn height(&self) -> u64 {
        self.prefix.height
    }

    pub fn chain_work(&self) -> Work {
        self.prefix.chain_work
    }

    pub fn difficulty(&self) -> Difficulty {
        self.element.pow.difficulty
    }

    pub fn hash(&self) -> Hash {
        let p = &self.prefix;
        let e = &self.element;
        Hasher::new(b"mimble/header")
            .u64(p.height)
            .hash(&p.prev)
            .hash(&p.chain_work.to_be_bytes())
            .hash(&e.kernels)
            .hash(&e.definition)
            .u64(e.timestamp)
            .u32(e.pow.difficulty.0)
            .u64(e.pow.nonce)
            .finish()
    }

    pub fn id(&self) -> StateId {
        StateId {
            height: self.prefix.height,
            hash: self.hash(),
        }
    }

    /// Lower edge of the work interval this header covers.
    pub fn work_lo(&self) -> Option<Work> {
        self.prefix
            .chain_work
            .checked_sub(&self.element.pow.difficulty.to_raw())
    }

    /// Turns the prefix into its child's prefix. The caller installs the child
    /// element and adds the child's difficulty to `chain_work`. `None` when
    /// the height would overflow; the header is left untouched then.
    #[must_use]
    pub fn next_prefix(&mut self) -> Option<()> {
        let height = self.prefix.height.checked_add(1)?;
        self.prefix.prev = self.hash();
        self.prefix.height = height;
        Some(())
    }

    /// Structural and proof-of-work self check of a single header.
    pub fn is_valid(&self, params: &ChainParams) -> bool {
        if self.prefix.height < HEIGHT_GENESIS {
            return false;
        }
        let d = self.element.pow.difficulty;
        if !d.is_valid() {
            return false;
        }
        if self.work_lo().is_none() {
            return false;
        }
        params.fake_pow || d.is_target_reached(&self.hash())
    }
}
