use serde::{Deserialize, Serialize};

use crate::constants::{
    CWP_SAMPLING_FRACTION, EMISSION_DROP0, EMISSION_DROP1, EMISSION_VALUE0, FORK1_HEIGHT,
    HEIGHT_GENESIS, MATURITY_COINBASE,
};
use crate::height::HeightRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusKind {
    Pow,
    /// Finality-voting variant. Blocks carry no coinbase outputs.
    Pbft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    /// Per-block subsidy before the first drop.
    pub value0: u64,
    /// Blocks at full subsidy.
    pub drop0: u64,
    /// Period of every following halving.
    pub drop1: u64,
}

/// Consensus parameters. Built once and passed by reference; there is no
/// process-wide rules instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub fork1_height: u64,
    pub emission: Emission,
    pub maturity_coinbase: u64,
    /// Numerator over 2^16 of the per-step proof sampling window.
    pub cwp_sampling_fraction: u16,
    /// Skips the proof-of-work check on headers. Test networks only.
    pub fake_pow: bool,
    pub consensus: ConsensusKind,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            fork1_height: FORK1_HEIGHT,
            emission: Emission {
                value0: EMISSION_VALUE0,
                drop0: EMISSION_DROP0,
                drop1: EMISSION_DROP1,
            },
            maturity_coinbase: MATURITY_COINBASE,
            cwp_sampling_fraction: CWP_SAMPLING_FRACTION,
            fake_pow: false,
            consensus: ConsensusKind::Pow,
        }
    }
}

impl ChainParams {
    pub fn testnet_fake_pow() -> Self {
        Self {
            fake_pow: true,
            ..Self::default()
        }
    }

    pub fn emission_at(&self, h: u64) -> u64 {
        if h < HEIGHT_GENESIS {
            return 0;
        }
        let n = h - HEIGHT_GENESIS;
        let e = &self.emission;
        if n < e.drop0 {
            return e.value0;
        }
        if e.drop1 == 0 {
            return 0;
        }
        let halvings = 1 + (n - e.drop0) / e.drop1;
        if halvings >= 64 {
            0
        } else {
            e.value0 >> halvings
        }
    }

    /// Last height sharing the subsidy of `h`.
    fn emission_segment_end(&self, h: u64) -> u64 {
        let n = h - HEIGHT_GENESIS;
        let e = &self.emission;
        if n < e.drop0 {
            return HEIGHT_GENESIS.saturating_add(e.drop0 - 1);
        }
        if e.drop1 == 0 {
            return u64::MAX;
        }
        let k = (n - e.drop0) / e.drop1;
        HEIGHT_GENESIS
            .saturating_add(e.drop0)
            .saturating_add((k + 1).saturating_mul(e.drop1))
            .saturating_sub(1)
    }

    /// Total subsidy emitted over an inclusive height range.
    pub fn emission_for_range(&self, hr: &HeightRange) -> u128 {
        let mut total = 0u128;
        if hr.is_empty() {
            return total;
        }
        let mut start = hr.min.max(HEIGHT_GENESIS);
        while start <= hr.max {
            let v = self.emission_at(start);
            if v == 0 {
                break;
            }
            let end = self.emission_segment_end(start).min(hr.max);
            total += v as u128 * (end - start + 1) as u128;
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }
        total
    }
}
