//! Compact proof that a header chain carries the cumulative work it claims.
//!
//! The verifier walks the work axis downward from the tip, sampling one point
//! in each window of `sampling_fraction / 2^16` of the remaining suffix. Every
//! sampled point must fall inside the work interval of a presented header,
//! and each presented header must be committed to by the tip through the
//! header MMR. Headers near the tip typically form one contiguous run (the
//! heading); older ones are sparse (`arbitrary_states`) and need inclusion
//! proofs, merged into one `MultiProof`.
//!
//! Sampling runs downward so a long proof built once can be cropped for each
//! client's `lower_bound` without rebuilding it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constants::HEIGHT_GENESIS;
use crate::error::ChainWorkError;
use crate::hash::{interpret, Hash, Oracle};
use crate::header::{Header, HeaderElement, HeaderPrefix};
use crate::merkle::{MultiProof, MultiProofBuilder, MultiProofVerifier, ProofBuilder};
use crate::params::ChainParams;
use crate::work::Work;

/// Read access to the prover's header chain, relative to its current tip.
pub trait ChainWorkSource {
    /// First header whose cumulative work exceeds `work`.
    fn state_at(&self, work: &Work) -> Option<Header>;
    /// Walks the MMR inclusion proof of the header at `height` into `builder`.
    fn proof(&self, builder: &mut dyn ProofBuilder, height: u64);
    /// Live-state root committed next to the history root in the tip definition.
    fn root_live(&self) -> Hash;
}

/// Contiguous run ending at the tip. `elements[0]` belongs to the tip;
/// `prefix` belongs to the oldest element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub prefix: HeaderPrefix,
    pub elements: Vec<HeaderElement>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainWorkProof {
    pub heading: Heading,
    /// Sampled headers below the heading, in descending height.
    pub arbitrary_states: Vec<Header>,
    pub proof: MultiProof,
    pub root_live: Hash,
    /// Sampling stops below this work. Zero proves the whole chain.
    pub lower_bound: Work,
}

struct Sampler<'a> {
    oracle: Oracle,
    begin: Work,
    end: Work,
    lower_bound: &'a Work,
    fraction: u16,
}

impl<'a> Sampler<'a> {
    /// `None` when the tip's work interval is malformed.
    fn new(tip: &Header, lower_bound: &'a Work, fraction: u16) -> Option<Self> {
        let mut oracle = Oracle::new();
        oracle.absorb(&tip.hash());
        Some(Self {
            oracle,
            begin: tip.work_lo()?,
            end: tip.chain_work(),
            lower_bound,
            fraction,
        })
    }

    /// Rejection sampling: draw, keep the bits of `threshold`, retry above it.
    fn uniform_random(&mut self, threshold: &Work) -> Option<Work> {
        if threshold.is_zero() {
            return None;
        }
        let bits = threshold.bit_len();
        loop {
            let out = Work::from_be_bytes(&self.oracle.squeeze()).low_bits(bits);
            if out < *threshold {
                return Some(out);
            }
        }
    }

    fn sample_point(&mut self) -> Option<Work> {
        let mut range = self.end.wrapping_sub(&self.begin).mul_fraction(self.fraction);
        if range.is_zero() {
            range = Work::from_u64(1);
        }
        let all_covered = range >= self.begin;

        let rnd = self.uniform_random(&range)?;
        // may wrap when the window reaches below zero; the bound checks reject it
        let out = rnd.wrapping_add(&self.begin).wrapping_sub(&range);

        if out < *self.lower_bound || out >= self.begin {
            return None;
        }

        self.begin = if all_covered {
            Work::ZERO
        } else {
            self.begin.wrapping_sub(&range)
        };
        Some(out)
    }

    fn lower_begin(&mut self, lo: Work) {
        if self.begin > lo {
            self.begin = lo;
        }
    }
}

/// Counts stop at the verifier's element index space: heights above genesis.
fn mmr_index(height: u64) -> u64 {
    height - HEIGHT_GENESIS
}

impl ChainWorkProof {
    pub fn new(lower_bound: Work) -> Self {
        Self {
            lower_bound,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.heading.elements.is_empty()
    }

    /// Builds the proof for `tip` from the prover's chain. Keeps `lower_bound`;
    /// everything else is overwritten.
    pub fn create(
        &mut self,
        params: &ChainParams,
        source: &dyn ChainWorkSource,
        tip: &Header,
    ) -> Result<(), ChainWorkError> {
        let lower_bound = self.lower_bound;
        *self = Self::new(lower_bound);
        self.root_live = source.root_live();

        let mut samp = Sampler::new(tip, &lower_bound, params.cwp_sampling_fraction)
            .ok_or(ChainWorkError::WindowOverflow)?;
        let mut bld = MultiProofBuilder::new(&mut self.proof);

        let mut s = *tip;
        loop {
            if self.arbitrary_states.is_empty() {
                self.heading.prefix = s.prefix;
                self.heading.elements.push(s.element);
            }

            let Some(d) = samp.sample_point() else {
                break;
            };

            let h_prev = s.height();
            s = source.state_at(&d).ok_or(ChainWorkError::MissingState {
                index: self.heading.elements.len() + self.arbitrary_states.len(),
            })?;
            if s.height() >= h_prev || s.height() < HEIGHT_GENESIS {
                return Err(ChainWorkError::HeightOrder {
                    index: self.heading.elements.len() + self.arbitrary_states.len(),
                });
            }

            let jump = s.height() + 1 != h_prev;
            if jump {
                let h = s.height();
                bld.add(|b| source.proof(b, h));
            }
            if jump || !self.arbitrary_states.is_empty() {
                self.arbitrary_states.push(s);
            }

            let lo = s.work_lo().ok_or(ChainWorkError::WorkOverflow)?;
            samp.lower_begin(lo);
        }

        trace!(
            contiguous = self.heading.elements.len(),
            arbitrary = self.arbitrary_states.len(),
            hashes = self.proof.data.len(),
            "chain work proof built"
        );
        Ok(())
    }

    /// Full check at the proof's own `lower_bound`. Every state and every
    /// proof hash must be consumed. Returns the reconstructed tip.
    pub fn is_valid(&self, params: &ChainParams) -> Result<Header, ChainWorkError> {
        let (tip, states, hashes) = self.verify_internal(params, &self.lower_bound)?;
        let total = self.arbitrary_states.len() + self.heading.elements.len();
        if states != total || hashes != self.proof.data.len() {
            return Err(ChainWorkError::TrailingData {
                states: total.saturating_sub(states),
                hashes: self.proof.data.len().saturating_sub(hashes),
            });
        }
        Ok(tip)
    }

    /// Replays sampling down to `lower_bound`. Returns how many states and
    /// proof hashes the replay consumed; anything past them is unused.
    pub fn is_valid_internal(
        &self,
        params: &ChainParams,
        lower_bound: &Work,
    ) -> Result<(usize, usize), ChainWorkError> {
        self.verify_internal(params, lower_bound)
            .map(|(_, states, hashes)| (states, hashes))
    }

    /// Tip rebuilt from the heading: the oldest element's prefix walked up.
    fn rebuild_tip(&self, params: &ChainParams) -> Result<Header, ChainWorkError> {
        let elements = &self.heading.elements;
        let last = elements.last().ok_or(ChainWorkError::Empty)?;

        let mut s = Header::compose(self.heading.prefix, *last);
        let mut i = elements.len() - 1;
        loop {
            if !s.is_valid(params) {
                return Err(ChainWorkError::HeaderInvalid { height: s.height() });
            }
            if i == 0 {
                break;
            }
            i -= 1;
            s.next_prefix()
                .ok_or(ChainWorkError::HeaderInvalid { height: s.height() })?;
            s.element = elements[i];
            s.prefix.chain_work = s
                .prefix
                .chain_work
                .checked_add(&s.difficulty().to_raw())
                .ok_or(ChainWorkError::WorkOverflow)?;
        }
        Ok(s)
    }

    fn verify_internal(
        &self,
        params: &ChainParams,
        lower_bound: &Work,
    ) -> Result<(Header, usize, usize), ChainWorkError> {
        let tip = self.rebuild_tip(params)?;

        for s in &self.arbitrary_states {
            if !s.is_valid(params) {
                return Err(ChainWorkError::HeaderInvalid { height: s.height() });
            }
        }

        let definition = tip.element.definition;
        let root_live = self.root_live;
        let mut ver = MultiProofVerifier::new(&self.proof, mmr_index(tip.height()), |root| {
            interpret(root, &root_live) == definition
        });

        let mut samp = Sampler::new(&tip, lower_bound, params.cwp_sampling_fraction)
            .ok_or(ChainWorkError::WindowOverflow)?;
        if samp.begin >= samp.end {
            return Err(ChainWorkError::WindowOverflow);
        }

        let n_contiguous = self.heading.elements.len();
        let mut s = tip;
        let mut lo_prev = samp.begin;
        let mut i_state = 1usize;

        loop {
            let Some(d_samp) = samp.sample_point() else {
                break;
            };

            let s0 = s;
            let contiguous = i_state < n_contiguous;
            if contiguous {
                // only the fields the checks below read
                s.prefix.height -= 1;
                s.prefix.chain_work = lo_prev;
                s.element.pow.difficulty = self.heading.elements[i_state].pow.difficulty;
            } else {
                s = *self
                    .arbitrary_states
                    .get(i_state - n_contiguous)
                    .ok_or(ChainWorkError::MissingState { index: i_state })?;
            }

            if d_samp >= s.chain_work() {
                return Err(ChainWorkError::SampleOutOfRange { index: i_state });
            }
            let lo = s.work_lo().ok_or(ChainWorkError::WorkOverflow)?;
            if d_samp < lo {
                return Err(ChainWorkError::SampleOutOfRange { index: i_state });
            }

            if !contiguous {
                let hv = s.hash();
                ver.set_element(hv);

                if s.height().checked_add(1) == Some(s0.height()) {
                    if s0.prefix.prev != hv || s.chain_work() != lo_prev {
                        return Err(ChainWorkError::ChainLink { index: i_state });
                    }
                } else {
                    if s.height() >= s0.height() || s.chain_work() >= lo_prev {
                        return Err(ChainWorkError::HeightOrder { index: i_state });
                    }
                    if s.height() < HEIGHT_GENESIS {
                        return Err(ChainWorkError::HeaderInvalid { height: s.height() });
                    }
                    ver.process(mmr_index(s.height()));
                    if !ver.is_verified() {
                        return Err(ChainWorkError::ProofInvalid { index: i_state });
                    }
                }
            }

            lo_prev = lo;
            samp.lower_begin(lo);
            i_state += 1;
        }

        Ok((tip, i_state, ver.position()))
    }

    /// Replaces `self` with `src` cropped to `self.lower_bound`: the shortest
    /// prefix of states and proof hashes a verifier at that bound consumes.
    pub fn crop_from(
        &mut self,
        params: &ChainParams,
        src: &ChainWorkProof,
    ) -> Result<(), ChainWorkError> {
        let lower_bound = self.lower_bound;
        let (i_state, i_hash) = src.is_valid_internal(params, &lower_bound)?;

        let n_contiguous = src.heading.elements.len();
        let mut heading = src.heading.clone();
        let mut arbitrary = src.arbitrary_states.clone();

        if i_state >= n_contiguous {
            arbitrary.truncate(i_state - n_contiguous);
        } else {
            arbitrary.clear();

            // the oldest kept element needs its own prefix
            let elements = &src.heading.elements;
            let mut s = Header::compose(src.heading.prefix, elements[n_contiguous - 1]);
            let mut i = n_contiguous - 1;
            while i >= i_state {
                s.next_prefix()
                    .ok_or(ChainWorkError::HeaderInvalid { height: s.height() })?;
                i -= 1;
                s.element = elements[i];
                s.prefix.chain_work = s
                    .prefix
                    .chain_work
                    .checked_add(&s.difficulty().to_raw())
                    .ok_or(ChainWorkError::WorkOverflow)?;
            }
            heading.prefix = s.prefix;
            heading.elements.truncate(i_state);
        }

        let mut proof = src.proof.clone();
        proof.data.truncate(i_hash);

        self.heading = heading;
        self.arbitrary_states = arbitrary;
        self.proof = proof;
        self.root_live = src.root_live;
        Ok(())
    }

    /// In-place `crop_from`. Leaves the proof untouched on failure.
    pub fn crop(&mut self, params: &ChainParams) -> Result<(), ChainWorkError> {
        let src = self.clone();
        self.crop_from(params, &src)
    }
}
