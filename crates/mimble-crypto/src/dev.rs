//! Development-only provider.
//!
//! Points are residues modulo `p = 2^255 - 19` under addition, with `G` and `H`
//! fixed non-zero residues. The group is additively homomorphic, which is all the
//! validation engine needs, but discrete logs are trivial: this is NOT a secure
//! commitment scheme. Range proofs and signatures are SHA3 tags over their inputs.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha3::{Digest, Sha3_256};

use crate::{Commitment, CommitmentProvider, Scalar};

const TAG_GEN_H: &[u8] = b"mimble/dev/H";
const TAG_CONFIDENTIAL: &[u8] = b"mimble/dev/rp-confidential";
const TAG_PUBLIC: &[u8] = b"mimble/dev/rp-public";
const TAG_SIGNATURE: &[u8] = b"mimble/dev/sig";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevPoint(BigUint);

pub struct DevCommitmentProvider {
    p: BigUint,
    g: BigUint,
    h: BigUint,
}

fn tag_hash(tag: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha3_256::new();
    h.update((tag.len() as u32).to_be_bytes());
    h.update(tag);
    for p in parts {
        h.update((p.len() as u32).to_be_bytes());
        h.update(p);
    }
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

fn to_bytes32(v: &BigUint) -> [u8; 32] {
    let b = v.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - b.len()..].copy_from_slice(&b);
    out
}

impl DevCommitmentProvider {
    pub fn new() -> Self {
        let p = (BigUint::one() << 255u32) - BigUint::from(19u32);
        let g = BigUint::from(9u32);
        let mut h = BigUint::from_bytes_be(&tag_hash(TAG_GEN_H, &[])) % &p;
        if h.is_zero() {
            h = BigUint::from(2u32);
        }
        Self { p, g, h }
    }

    fn reduce(&self, k: &Scalar) -> BigUint {
        BigUint::from_bytes_be(k) % &self.p
    }

    pub fn encode(&self, pt: &DevPoint) -> Commitment {
        to_bytes32(&pt.0)
    }

    /// `blind * G + value * H`, encoded.
    pub fn commit(&self, blind: &Scalar, value: u64) -> Commitment {
        let pt = self.add(&self.mul_g(blind), &self.mul_h(value as u128));
        self.encode(&pt)
    }

    pub fn scalar_from_u64(v: u64) -> Scalar {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        out
    }

    pub fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Scalar {
        to_bytes32(&((self.reduce(a) + self.reduce(b)) % &self.p))
    }

    pub fn scalar_neg(&self, a: &Scalar) -> Scalar {
        let v = self.reduce(a);
        if v.is_zero() {
            return [0u8; 32];
        }
        to_bytes32(&(&self.p - v))
    }

    pub fn prove_confidential(&self, c: &Commitment) -> Vec<u8> {
        tag_hash(TAG_CONFIDENTIAL, &[c]).to_vec()
    }

    pub fn prove_public(&self, c: &Commitment, value: u64) -> Vec<u8> {
        tag_hash(TAG_PUBLIC, &[c, &value.to_be_bytes()]).to_vec()
    }

    pub fn sign(&self, pubkey: &Commitment, msg: &[u8; 32]) -> Vec<u8> {
        tag_hash(TAG_SIGNATURE, &[pubkey, msg]).to_vec()
    }
}

impl Default for DevCommitmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitmentProvider for DevCommitmentProvider {
    type Point = DevPoint;

    fn zero(&self) -> DevPoint {
        DevPoint(BigUint::zero())
    }

    fn import_strict(&self, c: &Commitment) -> Option<DevPoint> {
        let v = BigUint::from_bytes_be(c);
        if v.is_zero() || v >= self.p {
            return None;
        }
        Some(DevPoint(v))
    }

    fn add(&self, a: &DevPoint, b: &DevPoint) -> DevPoint {
        DevPoint((&a.0 + &b.0) % &self.p)
    }

    fn neg(&self, a: &DevPoint) -> DevPoint {
        if a.0.is_zero() {
            return a.clone();
        }
        DevPoint(&self.p - &a.0)
    }

    fn mul_g(&self, k: &Scalar) -> DevPoint {
        DevPoint((self.reduce(k) * &self.g) % &self.p)
    }

    fn mul_h(&self, v: u128) -> DevPoint {
        DevPoint((BigUint::from(v) * &self.h) % &self.p)
    }

    fn is_zero(&self, p: &DevPoint) -> bool {
        p.0.is_zero()
    }

    fn verify_confidential(
        &self,
        c: &Commitment,
        proof: &[u8],
        _h_min: u64,
    ) -> Result<bool, String> {
        Ok(proof == self.prove_confidential(c).as_slice())
    }

    fn verify_public(&self, c: &Commitment, value: u64, proof: &[u8]) -> Result<bool, String> {
        Ok(proof == self.prove_public(c, value).as_slice())
    }

    fn verify_signature(
        &self,
        pubkey: &Commitment,
        msg: &[u8; 32],
        sig: &[u8],
    ) -> Result<bool, String> {
        Ok(sig == self.sign(pubkey, msg).as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitments_are_homomorphic() {
        let cp = DevCommitmentProvider::new();
        let r1 = DevCommitmentProvider::scalar_from_u64(11);
        let r2 = DevCommitmentProvider::scalar_from_u64(31);
        let a = cp.import_strict(&cp.commit(&r1, 5)).expect("a");
        let b = cp.import_strict(&cp.commit(&r2, 7)).expect("b");
        let sum = cp.add(&a, &b);
        let r = cp.scalar_add(&r1, &r2);
        let expect = cp.import_strict(&cp.commit(&r, 12)).expect("sum");
        assert_eq!(sum, expect);
        assert!(cp.is_zero(&cp.add(&sum, &cp.neg(&sum))));
    }

    #[test]
    fn import_rejects_identity_and_out_of_range() {
        let cp = DevCommitmentProvider::new();
        assert!(cp.import_strict(&[0u8; 32]).is_none());
        assert!(cp.import_strict(&[0xff; 32]).is_none());
        assert!(cp.import_strict(&DevCommitmentProvider::scalar_from_u64(1)).is_some());
    }

    #[test]
    fn tags_bind_their_inputs() {
        let cp = DevCommitmentProvider::new();
        let c = cp.commit(&DevCommitmentProvider::scalar_from_u64(3), 9);
        let proof = cp.prove_public(&c, 9);
        assert_eq!(cp.verify_public(&c, 9, &proof), Ok(true));
        assert_eq!(cp.verify_public(&c, 10, &proof), Ok(false));
        let sig = cp.sign(&c, &[7u8; 32]);
        assert_eq!(cp.verify_signature(&c, &[7u8; 32], &sig), Ok(true));
        assert_eq!(cp.verify_signature(&c, &[8u8; 32], &sig), Ok(false));
    }
}
