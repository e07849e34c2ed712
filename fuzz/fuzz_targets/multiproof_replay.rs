#![no_main]

use libfuzzer_sys::fuzz_target;
use mimble_consensus::merkle::{MemMmr, Mmr, MultiProof, MultiProofBuilder, MultiProofVerifier};
use mimble_consensus::sha3_256;

// Merged inclusion proofs for an ascending element subset replay cleanly, and
// every truncation of the proof fails somewhere instead of panicking.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let count = 1 + (data[0] as u64);
    let mut mmr = MemMmr::new();
    let leaves: Vec<_> = (0..count).map(|i| sha3_256(&i.to_le_bytes())).collect();
    for l in &leaves {
        mmr.append(*l);
    }
    let root = mmr.root();

    let mut picks: Vec<u64> = data[1..].iter().map(|b| *b as u64 % count).collect();
    picks.sort_unstable();
    picks.dedup();

    let mut proof = MultiProof::default();
    {
        let mut bld = MultiProofBuilder::new(&mut proof);
        for i in &picks {
            bld.add(|b| {
                mmr.proof(b, *i);
            });
        }
    }

    let mut ver = MultiProofVerifier::new(&proof, count, |r| *r == root);
    for i in &picks {
        ver.set_element(leaves[*i as usize]);
        ver.process(*i);
    }
    assert!(ver.is_verified());
    assert_eq!(ver.position(), proof.data.len());

    if !proof.data.is_empty() {
        let mut short = proof.clone();
        short.data.pop();
        let mut ver = MultiProofVerifier::new(&short, count, |r| *r == root);
        for i in &picks {
            ver.set_element(leaves[*i as usize]);
            ver.process(*i);
        }
        assert!(!ver.is_verified());
    }
});
