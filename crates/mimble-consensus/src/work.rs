use core::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 256-bit unsigned work value, big-endian 4-limb representation.
///
/// Accumulation of chain work goes through `checked_add`; the wrapping
/// operations exist for the proof sampler, whose window arithmetic is modular.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Work([u64; 4]);

impl Work {
    pub const ZERO: Work = Work([0; 4]);
    pub const MAX: Work = Work([u64::MAX; 4]);

    pub const fn from_u64(v: u64) -> Self {
        Work([0, 0, 0, v])
    }

    #[allow(clippy::needless_range_loop)]
    pub fn from_be_bytes(b: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut w = [0u8; 8];
            w.copy_from_slice(&b[i * 8..i * 8 + 8]);
            limbs[i] = u64::from_be_bytes(w);
        }
        Work(limbs)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..4 {
            out[i * 8..i * 8 + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    pub fn checked_add(&self, other: &Work) -> Option<Work> {
        let (sum, carry) = self.overflowing_add(other);
        if carry {
            None
        } else {
            Some(sum)
        }
    }

    pub fn checked_sub(&self, other: &Work) -> Option<Work> {
        if self < other {
            return None;
        }
        Some(self.wrapping_sub(other))
    }

    pub fn wrapping_add(&self, other: &Work) -> Work {
        self.overflowing_add(other).0
    }

    pub fn wrapping_sub(&self, other: &Work) -> Work {
        self.wrapping_add(&other.wrapping_neg())
    }

    /// Two's complement negation modulo 2^256.
    pub fn wrapping_neg(&self) -> Work {
        let mut inv = Work([!self.0[0], !self.0[1], !self.0[2], !self.0[3]]);
        inv = inv.wrapping_add(&Work::from_u64(1));
        inv
    }

    fn overflowing_add(&self, other: &Work) -> (Work, bool) {
        let mut out = [0u64; 4];
        let mut carry = 0u128;
        for i in (0..4).rev() {
            let s = self.0[i] as u128 + other.0[i] as u128 + carry;
            out[i] = s as u64;
            carry = s >> 64;
        }
        (Work(out), carry != 0)
    }

    /// `floor(self * num / 2^16)`
    pub fn mul_fraction(&self, num: u16) -> Work {
        let mut low = [0u64; 4];
        let mut carry = 0u128;
        for i in (0..4).rev() {
            let p = self.0[i] as u128 * num as u128 + carry;
            low[i] = p as u64;
            carry = p >> 64;
        }
        let top = carry as u64;
        Work([
            (top << 48) | (low[0] >> 16),
            (low[0] << 48) | (low[1] >> 16),
            (low[1] << 48) | (low[2] >> 16),
            (low[2] << 48) | (low[3] >> 16),
        ])
    }

    /// Left shift; bits pushed past 2^256 are dropped.
    pub fn shl(&self, n: u32) -> Work {
        if n >= 256 {
            return Work::ZERO;
        }
        let limbs = (n / 64) as usize;
        let bits = n % 64;
        let mut out = [0u64; 4];
        for i in 0..4 {
            let src = i + limbs;
            if src >= 4 {
                break;
            }
            out[i] = self.0[src] << bits;
            if bits > 0 && src + 1 < 4 {
                out[i] |= self.0[src + 1] >> (64 - bits);
            }
        }
        Work(out)
    }

    /// Number of significant bits; zero for zero.
    pub fn bit_len(&self) -> u32 {
        for (i, limb) in self.0.iter().enumerate() {
            if *limb != 0 {
                return (4 - i as u32) * 64 - limb.leading_zeros();
            }
        }
        0
    }

    /// Keeps only the lowest `n` bits.
    pub fn low_bits(&self, n: u32) -> Work {
        if n >= 256 {
            return *self;
        }
        let mut out = self.0;
        for (i, limb) in out.iter_mut().enumerate() {
            let lo = (3 - i as u32) * 64;
            if n <= lo {
                *limb = 0;
            } else if n < lo + 64 {
                *limb &= (1u64 << (n - lo)) - 1;
            }
        }
        Work(out)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.to_be_bytes())
    }

    /// None when the value does not fit 256 bits.
    pub fn from_biguint(v: &BigUint) -> Option<Work> {
        let b = v.to_bytes_be();
        if b.len() > 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out[32 - b.len()..].copy_from_slice(&b);
        Some(Work::from_be_bytes(&out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Work, String> {
        let bytes = hex::decode(s).map_err(|e| format!("work: {e}"))?;
        if bytes.len() != 32 {
            return Err(format!("work: expected 32 bytes, got {}", bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Work::from_be_bytes(&out))
    }
}

impl From<u64> for Work {
    fn from(v: u64) -> Self {
        Work::from_u64(v)
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Work({})", self.to_biguint())
    }
}

impl fmt::Display for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl Serialize for Work {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Work {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Work::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Work::MAX.checked_add(&Work::from_u64(1)), None);
        assert_eq!(
            Work::from_u64(u64::MAX).checked_add(&Work::from_u64(1)),
            Some(Work([0, 0, 1, 0]))
        );
    }

    #[test]
    fn wrapping_ops_are_modular() {
        let a = Work::from_u64(5);
        assert_eq!(a.wrapping_add(&a.wrapping_neg()), Work::ZERO);
        assert_eq!(Work::ZERO.wrapping_sub(&Work::from_u64(1)), Work::MAX);
        assert_eq!(Work::ZERO.wrapping_neg(), Work::ZERO);
    }

    #[test]
    fn mul_fraction_matches_bigint() {
        let v = Work([0x1234, 0xdead_beef, u64::MAX, 0x55]);
        let expect = (v.to_biguint() * BigUint::from(635u32)) >> 16u32;
        assert_eq!(v.mul_fraction(635).to_biguint(), expect);
        assert_eq!(Work::from_u64(100).mul_fraction(635), Work::ZERO);
    }

    #[test]
    fn shifts_and_bit_lengths() {
        let one = Work::from_u64(1);
        assert_eq!(one.shl(255).bit_len(), 256);
        assert_eq!(one.shl(70), Work([0, 0, 1 << 6, 0]));
        assert_eq!(Work::ZERO.bit_len(), 0);
        assert_eq!(Work::MAX.low_bits(65), Work([0, 0, 1, u64::MAX]));
        assert_eq!(Work::MAX.low_bits(0), Work::ZERO);
    }

    #[test]
    fn hex_roundtrip_and_serde() {
        let v = Work([1, 2, 3, 4]);
        assert_eq!(Work::from_hex(&v.to_hex()), Ok(v));
        let json = serde_json::to_string(&v).expect("encode");
        let back: Work = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, v);
        assert!(Work::from_hex("00").is_err());
    }
}
