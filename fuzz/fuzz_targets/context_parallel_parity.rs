#![no_main]

use libfuzzer_sys::fuzz_target;
use mimble_consensus::{
    validate_parallel, ChainParams, ContextParams, HeightRange, Input, Output, Transaction,
    TxKernel,
};
use mimble_crypto::{CommitmentProvider, DevCommitmentProvider};

// The verdict of a body does not depend on how many verifiers share it.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::testnet_fake_pow();
    let threads = 2 + (data[0] % 4) as u32;

    let mut tx = Transaction::default();
    for (i, b) in data[1..].iter().take(48).enumerate() {
        let blind = DevCommitmentProvider::scalar_from_u64(*b as u64 + 1);
        let value = (i as u64) * 7;
        match b % 3 {
            0 => tx.inputs.push(Input {
                commitment: cp.commit(&blind, value),
                maturity: (*b as u64) >> 4,
            }),
            1 => {
                let c = cp.commit(&blind, value);
                tx.outputs.push(Output {
                    commitment: c,
                    maturity: 0,
                    coinbase: false,
                    confidential: (b & 8 == 0).then(|| cp.prove_confidential(&c)),
                    public: None,
                });
            }
            _ => {
                let commitment = cp.encode(&cp.mul_g(&blind));
                let mut krn = TxKernel {
                    commitment,
                    signature: Vec::new(),
                    fee: *b as u64,
                    height: HeightRange::new(1 + (*b as u64 >> 5), 1_000),
                    nested: Vec::new(),
                };
                if b & 16 == 0 {
                    krn.signature = cp.sign(&commitment, &krn.id());
                }
                tx.kernels.push(krn);
            }
        }
    }
    if data[0] & 0x80 == 0 {
        tx.normalize();
    }

    let params = ContextParams::default();
    let run = |n: u32| {
        validate_parallel(
            &cp,
            &chain,
            &params,
            HeightRange::full(),
            &tx.base(),
            &tx.reader(),
            n,
        )
        .map(|mut ctx| ctx.is_valid_transaction())
        .map_err(|e| e.code)
    };

    let single = run(1);
    let multi = run(threads);
    assert_eq!(single.is_ok(), multi.is_ok(), "{single:?} vs {multi:?}");
    if let (Ok(a), Ok(b)) = (single, multi) {
        assert_eq!(a, b);
    }
});
