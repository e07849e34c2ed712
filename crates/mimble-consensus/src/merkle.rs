//! Merkle Mountain Range over header hashes and the merged multi-element proof
//! codec used by chain-work proofs.
//!
//! Proofs are "hard": the verifier receives only sibling hashes and derives the
//! hashing direction from the element index and the tree size.

use serde::{Deserialize, Serialize};

use crate::hash::{interpret, Hash};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub h: u8,
    pub x: u64,
}

/// A proof step: the sibling hash and whether it sits to the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub on_right: bool,
    pub hash: Hash,
}

pub trait ProofBuilder {
    /// Returns false to stop the walk early.
    fn append_node(&mut self, n: &Node, pos: &Position) -> bool;
}

impl ProofBuilder for Vec<Node> {
    fn append_node(&mut self, n: &Node, _pos: &Position) -> bool {
        self.push(*n);
        true
    }
}

pub fn interpret_node(hash: &Hash, n: &Node) -> Hash {
    if n.on_right {
        interpret(hash, &n.hash)
    } else {
        interpret(&n.hash, hash)
    }
}

pub fn interpret_proof(leaf: &Hash, proof: &[Node]) -> Hash {
    proof.iter().fold(*leaf, |h, n| interpret_node(&h, n))
}

pub trait Mmr {
    fn count(&self) -> u64;
    fn load_element(&self, pos: &Position) -> Hash;

    /// Root over all elements; zero for an empty range.
    fn root(&self) -> Hash {
        self.hash_for_range(0, self.count()).unwrap_or([0u8; 32])
    }

    /// Hash of the peaks covering `[n0, n0 + n)`, folded right to left.
    fn hash_for_range(&self, mut n0: u64, mut n: u64) -> Option<Hash> {
        let mut acc: Option<Hash> = None;
        let mut h = 0u8;
        while n != 0 {
            if n & 1 != 0 {
                let pos = Position {
                    h,
                    x: (n0 + n) ^ 1,
                };
                let hv0 = self.load_element(&pos);
                acc = Some(match acc {
                    None => hv0,
                    Some(hv) => interpret(&hv0, &hv),
                });
            }
            h += 1;
            n >>= 1;
            n0 >>= 1;
        }
        acc
    }

    /// Walks the inclusion proof of element `i`, bottom-up.
    fn proof(&self, builder: &mut dyn ProofBuilder, mut i: u64) -> bool {
        let count = self.count();
        let mut n = count;
        let mut h = 0u8;
        while n != 0 {
            let on_right = i & 1 == 0;
            let pos = Position { h, x: i ^ 1 };
            let mut hash = None;
            let mut full = !on_right;
            let mut skip = false;

            if !full {
                let n0 = pos.x << h;
                if n0 >= count {
                    skip = true;
                } else {
                    let remaining = count - n0;
                    if remaining >> h != 0 {
                        full = true;
                    } else {
                        hash = self.hash_for_range(n0, remaining);
                    }
                }
            }

            if !skip {
                let hash = match (full, hash) {
                    (true, _) => self.load_element(&pos),
                    (false, Some(hv)) => hv,
                    (false, None) => [0u8; 32],
                };
                if !builder.append_node(&Node { on_right, hash }, &pos) {
                    return false;
                }
            }

            h += 1;
            n >>= 1;
            i >>= 1;
        }
        true
    }
}

/// In-memory MMR keeping every node, by height then index.
#[derive(Clone, Debug, Default)]
pub struct MemMmr {
    levels: Vec<Vec<Hash>>,
    count: u64,
}

impl MemMmr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, leaf: Hash) {
        let mut hv = leaf;
        let mut x = self.count;
        let mut h = 0usize;
        loop {
            if self.levels.len() <= h {
                self.levels.push(Vec::new());
            }
            self.levels[h].push(hv);
            if x & 1 == 0 {
                break;
            }
            let left = self.levels[h][(x ^ 1) as usize];
            hv = interpret(&left, &hv);
            h += 1;
            x >>= 1;
        }
        self.count += 1;
    }

    /// Drops every element at index `count` and above.
    pub fn truncate(&mut self, count: u64) {
        if count >= self.count {
            return;
        }
        for (h, level) in self.levels.iter_mut().enumerate() {
            level.truncate((count >> h) as usize);
        }
        self.count = count;
    }

    /// Read-only view of the first `count` elements.
    pub fn view(&self, count: u64) -> MmrView<'_> {
        MmrView {
            mmr: self,
            count: count.min(self.count),
        }
    }
}

impl Mmr for MemMmr {
    fn count(&self) -> u64 {
        self.count
    }

    fn load_element(&self, pos: &Position) -> Hash {
        self.levels
            .get(pos.h as usize)
            .and_then(|l| l.get(pos.x as usize))
            .copied()
            .unwrap_or([0u8; 32])
    }
}

/// Completed MMR nodes never change, so a prefix of the range can be proven
/// from the same storage.
pub struct MmrView<'a> {
    mmr: &'a MemMmr,
    count: u64,
}

impl Mmr for MmrView<'_> {
    fn count(&self) -> u64 {
        self.count
    }

    fn load_element(&self, pos: &Position) -> Hash {
        self.mmr.load_element(pos)
    }
}

/// Inclusion proofs for several elements, merged so that no hash appears twice.
/// Elements are added in a monotonic order; cropping the element sequence is a
/// truncation of `data`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiProof {
    pub data: Vec<Hash>,
}

pub struct MultiProofBuilder<'a> {
    proof: &'a mut MultiProof,
    last: Vec<Position>,
    last_rev: Vec<Position>,
}

impl<'a> MultiProofBuilder<'a> {
    pub fn new(proof: &'a mut MultiProof) -> Self {
        Self {
            proof,
            last: Vec::new(),
            last_rev: Vec::new(),
        }
    }

    /// `get_proof` must walk the standard proof of the element into the builder.
    pub fn add(&mut self, get_proof: impl FnOnce(&mut dyn ProofBuilder)) {
        get_proof(self);
        while let Some(p) = self.last_rev.pop() {
            self.last.push(p);
        }
    }
}

impl ProofBuilder for MultiProofBuilder<'_> {
    fn append_node(&mut self, n: &Node, pos: &Position) -> bool {
        while let Some(pos0) = self.last.last() {
            if pos0.h > pos.h {
                break;
            }
            if pos0 == pos {
                // shared with an earlier element from here up
                return false;
            }
            self.last.pop();
        }
        if pos.h != 0 {
            self.last_rev.push(*pos);
        }
        self.proof.data.push(n.hash);
        true
    }
}

struct CountOnly(u64);

impl Mmr for CountOnly {
    fn count(&self) -> u64 {
        self.0
    }

    fn load_element(&self, _pos: &Position) -> Hash {
        [0u8; 32]
    }
}

#[derive(Clone, Copy)]
struct KnownNode {
    hv: Hash,
    pos: Position,
}

struct VerifierState<'a> {
    data: &'a [Hash],
    cursor: usize,
    last: Vec<KnownNode>,
    last_rev: Vec<KnownNode>,
    hv_pos: Hash,
    verify: bool,
}

impl ProofBuilder for VerifierState<'_> {
    fn append_node(&mut self, n: &Node, pos: &Position) -> bool {
        while let Some(known) = self.last.last() {
            if known.pos.h > pos.h {
                break;
            }
            if known.pos == *pos {
                if self.verify && known.hv != self.hv_pos {
                    self.verify = false;
                }
                return false;
            }
            self.last.pop();
        }

        if pos.h != 0 {
            self.last_rev.push(KnownNode {
                hv: self.hv_pos,
                pos: *pos,
            });
        }

        let Some(sibling) = self.data.get(self.cursor) else {
            self.verify = false;
            return false;
        };
        self.cursor += 1;

        if self.verify {
            self.hv_pos = if n.on_right {
                interpret(&self.hv_pos, sibling)
            } else {
                interpret(sibling, &self.hv_pos)
            };
        }
        true
    }
}

/// Replays a `MultiProof` in the order it was built. Set `hv_pos` to the
/// element hash before each `process`; `verify` drops to false on the first
/// mismatch and stays there.
pub struct MultiProofVerifier<'a, F: FnMut(&Hash) -> bool> {
    state: VerifierState<'a>,
    count: u64,
    is_root_valid: F,
}

impl<'a, F: FnMut(&Hash) -> bool> MultiProofVerifier<'a, F> {
    pub fn new(proof: &'a MultiProof, count: u64, is_root_valid: F) -> Self {
        Self {
            state: VerifierState {
                data: &proof.data,
                cursor: 0,
                last: Vec::new(),
                last_rev: Vec::new(),
                hv_pos: [0u8; 32],
                verify: true,
            },
            count,
            is_root_valid,
        }
    }

    pub fn set_element(&mut self, hv: Hash) {
        self.state.hv_pos = hv;
    }

    pub fn is_verified(&self) -> bool {
        self.state.verify
    }

    /// Number of proof hashes consumed so far.
    pub fn position(&self) -> usize {
        self.state.cursor
    }

    pub fn process(&mut self, i: u64) {
        if i >= self.count {
            self.state.verify = false;
            return;
        }
        let walked_to_root = CountOnly(self.count).proof(&mut self.state, i);
        if walked_to_root && self.state.verify && !(self.is_root_valid)(&self.state.hv_pos) {
            self.state.verify = false;
        }
        while let Some(n) = self.state.last_rev.pop() {
            self.state.last.push(n);
        }
    }
}
