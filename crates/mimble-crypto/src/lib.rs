//! Commitment algebra interface for the mimble node core.
//!
//! Consensus code must depend only on this narrow interface: an additive group of
//! opaque points, two fixed generators `G` (blinding) and `H` (value), strict point
//! import, and black-box verification of range proofs and kernel signatures.

/// Encoded commitment (point) as carried by inputs, outputs and kernel excesses.
pub type Commitment = [u8; 32];

/// Big-endian encoded blinding scalar.
pub type Scalar = [u8; 32];

pub trait CommitmentProvider: Sync {
    type Point: Clone + PartialEq + core::fmt::Debug + Send;

    fn zero(&self) -> Self::Point;

    /// Decodes a commitment. Fails on any non-canonical encoding and on the
    /// identity element, which is never a valid commitment.
    fn import_strict(&self, c: &Commitment) -> Option<Self::Point>;

    fn add(&self, a: &Self::Point, b: &Self::Point) -> Self::Point;
    fn neg(&self, a: &Self::Point) -> Self::Point;

    /// `k * G`
    fn mul_g(&self, k: &Scalar) -> Self::Point;
    /// `v * H`
    fn mul_h(&self, v: u128) -> Self::Point;

    fn is_zero(&self, p: &Self::Point) -> bool;

    fn verify_confidential(
        &self,
        c: &Commitment,
        proof: &[u8],
        h_min: u64,
    ) -> Result<bool, String>;

    fn verify_public(&self, c: &Commitment, value: u64, proof: &[u8]) -> Result<bool, String>;

    fn verify_signature(
        &self,
        pubkey: &Commitment,
        msg: &[u8; 32],
        sig: &[u8],
    ) -> Result<bool, String>;
}

#[cfg(feature = "dev-std")]
mod dev;
#[cfg(feature = "dev-std")]
pub use dev::{DevCommitmentProvider, DevPoint};
