use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::constants::{DIFFICULTY_INF, DIFFICULTY_MANTISSA_BITS, DIFFICULTY_MAX_ORDER};
use crate::hash::Hash;
use crate::work::Work;

/// Packed proof-of-work difficulty: `order << 24 | mantissa`, with an implicit
/// leading mantissa bit. Unpacks to `(1 << 24 | mantissa) << order`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(pub u32);

impl Difficulty {
    pub const INF: Difficulty = Difficulty(DIFFICULTY_INF);

    pub fn is_valid(self) -> bool {
        self.0 <= DIFFICULTY_INF
    }

    pub fn unpack(self) -> (u32, u32) {
        let order = self.0 >> DIFFICULTY_MANTISSA_BITS;
        let lead = 1u32 << DIFFICULTY_MANTISSA_BITS;
        (order, lead | (self.0 & (lead - 1)))
    }

    /// Packs a normalized mantissa; orders above the maximum saturate to INF.
    pub fn from_parts(order: u32, mantissa: u32) -> Difficulty {
        if order > DIFFICULTY_MAX_ORDER {
            return Difficulty::INF;
        }
        let mask = (1u32 << DIFFICULTY_MANTISSA_BITS) - 1;
        Difficulty((mantissa & mask) | (order << DIFFICULTY_MANTISSA_BITS))
    }

    /// Packs `raw` read as a value scaled by 2^24. Returns the difficulty and
    /// whether the encoding is exact. Zero packs to the minimal difficulty.
    pub fn pack_u32(raw: u32) -> (Difficulty, bool) {
        if raw == 0 {
            return (Difficulty(0), false);
        }
        let order = 31 - raw.leading_zeros();
        let exact = order <= DIFFICULTY_MANTISSA_BITS;
        let mantissa = if exact {
            raw << (DIFFICULTY_MANTISSA_BITS - order)
        } else {
            raw >> (order - DIFFICULTY_MANTISSA_BITS)
        };
        (Difficulty::from_parts(order, mantissa), exact)
    }

    /// Packs an arbitrary raw work value, rounding down. Values below the
    /// minimal difficulty clamp to it.
    pub fn pack_raw(raw: &BigUint) -> Difficulty {
        let bits = raw.bits() as u32;
        if bits <= DIFFICULTY_MANTISSA_BITS {
            return Difficulty(0);
        }
        let order = bits - DIFFICULTY_MANTISSA_BITS - 1;
        let mantissa: BigUint = raw >> order;
        let mantissa = mantissa.to_u32_digits().first().copied().unwrap_or(0);
        Difficulty::from_parts(order, mantissa)
    }

    pub fn to_raw(self) -> Work {
        if self.0 >= DIFFICULTY_INF {
            return Work::MAX;
        }
        let (order, mantissa) = self.unpack();
        Work::from_u64(mantissa as u64).shl(order)
    }

    /// `hash * mantissa < 2^(256 + 24 - order)`
    pub fn is_target_reached(self, hash: &Hash) -> bool {
        if !self.is_valid() {
            return false;
        }
        let (order, mantissa) = self.unpack();
        let a = BigUint::from_bytes_be(hash) * BigUint::from(mantissa);
        a.bits() as u32 <= 256 + DIFFICULTY_MANTISSA_BITS - order
    }

    /// Largest hash value that still satisfies the difficulty.
    pub fn target(self) -> Option<Hash> {
        if !self.is_valid() {
            return None;
        }
        let (order, mantissa) = self.unpack();
        let max: BigUint = (BigUint::one() << (256 + 32)) - BigUint::one();
        let div = max / BigUint::from(mantissa);
        let trg: BigUint = div >> (32 - DIFFICULTY_MANTISSA_BITS + order);
        let b = trg.to_bytes_be();
        let mut out = [0u8; 32];
        if b.len() > 32 {
            return Some([0xff; 32]);
        }
        out[32 - b.len()..].copy_from_slice(&b);
        Some(out)
    }

    /// Retarget from `reference` work gathered over `dh` blocks in
    /// `dt_source` seconds: `reference * dt_target / (dt_source * dh)`.
    pub fn calculate(reference: &Work, dh: u64, dt_target: u64, dt_source: u64) -> Difficulty {
        let div = BigUint::from(dt_source) * BigUint::from(dh);
        if div.is_zero() {
            return Difficulty(0);
        }
        let raw = reference.to_biguint() * BigUint::from(dt_target) / div;
        if raw.is_zero() {
            return Difficulty(0);
        }
        Difficulty::pack_raw(&raw)
    }

    pub fn to_float(self) -> f64 {
        let (order, mantissa) = self.unpack();
        mantissa as f64 * 2f64.powi(order as i32 - DIFFICULTY_MANTISSA_BITS as i32)
    }
}
