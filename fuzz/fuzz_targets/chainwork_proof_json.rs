#![no_main]

use libfuzzer_sys::fuzz_target;
use mimble_consensus::{ChainParams, ChainWorkProof};

// Untrusted proofs must never panic the verifier, and a proof that verifies
// keeps verifying, to the same tip, after cropping.
fuzz_target!(|data: &[u8]| {
    let Ok(proof) = serde_json::from_slice::<ChainWorkProof>(data) else {
        return;
    };
    let params = ChainParams::testnet_fake_pow();
    let Ok(tip) = proof.is_valid(&params) else {
        let mut p = proof.clone();
        let _ = p.crop(&params);
        return;
    };

    let mut cropped = proof.clone();
    cropped.crop(&params).expect("crop of a valid proof");
    assert_eq!(cropped.is_valid(&params).expect("cropped stays valid"), tip);
    assert!(cropped.arbitrary_states.len() <= proof.arbitrary_states.len());
});
