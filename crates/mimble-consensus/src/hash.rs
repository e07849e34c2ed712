use sha3::{Digest, Sha3_256};

pub type Hash = [u8; 32];

pub fn sha3_256(b: &[u8]) -> Hash {
    let mut h = Sha3_256::new();
    h.update(b);
    finalize(h)
}

fn finalize(h: Sha3_256) -> Hash {
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

/// `H(left || right)`, the single combining rule for every Merkle node.
pub fn interpret(left: &Hash, right: &Hash) -> Hash {
    let mut h = Sha3_256::new();
    h.update(left);
    h.update(right);
    finalize(h)
}

/// Deterministic random oracle. Every squeezed value is fed back into the
/// transcript, so prover and verifier derive the same sequence from the seed.
#[derive(Clone)]
pub struct Oracle {
    state: Sha3_256,
}

impl Oracle {
    pub fn new() -> Self {
        Self {
            state: Sha3_256::new(),
        }
    }

    pub fn absorb(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    pub fn squeeze(&mut self) -> Hash {
        let out = finalize(self.state.clone());
        self.state.update(out);
        out
    }
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical field encoder for hashed structures.
pub(crate) struct Hasher(Sha3_256);

impl Hasher {
    pub(crate) fn new(domain: &[u8]) -> Self {
        let mut h = Sha3_256::new();
        h.update(domain);
        Self(h)
    }

    pub(crate) fn u64(mut self, v: u64) -> Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub(crate) fn u32(mut self, v: u32) -> Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub(crate) fn bytes(mut self, b: &[u8]) -> Self {
        self.0.update((b.len() as u64).to_be_bytes());
        self.0.update(b);
        self
    }

    pub(crate) fn hash(mut self, b: &Hash) -> Self {
        self.0.update(b);
        self
    }

    pub(crate) fn finish(self) -> Hash {
        finalize(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_is_deterministic_and_advances() {
        let mut a = Oracle::new();
        let mut b = Oracle::new();
        a.absorb(&[1, 2, 3]);
        b.absorb(&[1, 2, 3]);
        let a1 = a.squeeze();
        assert_eq!(a1, b.squeeze());
        assert_ne!(a1, a.squeeze());
    }

    #[test]
    fn interpret_is_order_sensitive() {
        assert_ne!(interpret(&[1u8; 32], &[2u8; 32]), interpret(&[2u8; 32], &[1u8; 32]));
    }
}
