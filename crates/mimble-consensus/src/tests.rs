use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mimble_crypto::{CommitmentProvider, DevCommitmentProvider, Scalar};
use proptest::prelude::*;

use crate::context::{validate_parallel, Context, ContextParams};
use crate::error::{ErrorCode, ValidationError};
use crate::height::HeightRange;
use crate::params::{ChainParams, ConsensusKind};
use crate::tx::{Input, Output, PublicProof, Transaction, TxKernel};

fn blind(n: u64) -> Scalar {
    DevCommitmentProvider::scalar_from_u64(n)
}

fn input(cp: &DevCommitmentProvider, r: u64, v: u64) -> Input {
    Input {
        commitment: cp.commit(&blind(r), v),
        maturity: 0,
    }
}

fn output(cp: &DevCommitmentProvider, r: u64, v: u64) -> Output {
    let c = cp.commit(&blind(r), v);
    Output {
        commitment: c,
        maturity: 0,
        coinbase: false,
        confidential: Some(cp.prove_confidential(&c)),
        public: None,
    }
}

fn coinbase_output(cp: &DevCommitmentProvider, r: u64, v: u64) -> Output {
    let c = cp.commit(&blind(r), v);
    Output {
        commitment: c,
        maturity: 0,
        coinbase: true,
        confidential: None,
        public: Some(PublicProof {
            value: v,
            proof: cp.prove_public(&c, v),
        }),
    }
}

fn signed_kernel(
    cp: &DevCommitmentProvider,
    k: &Scalar,
    fee: u64,
    height: HeightRange,
    nested: Vec<TxKernel>,
) -> TxKernel {
    let commitment = cp.encode(&cp.mul_g(k));
    let mut krn = TxKernel {
        commitment,
        signature: Vec::new(),
        fee,
        height,
        nested,
    };
    krn.signature = cp.sign(&commitment, &krn.id());
    krn
}

/// Balanced body: `kernel_blind + offset = -(sum(out blinds) - sum(in blinds))`.
/// The caller keeps values balanced (`inputs = outputs + fees (+ emission)`).
fn balanced(
    cp: &DevCommitmentProvider,
    inputs: Vec<(u64, Input)>,
    outputs: Vec<(u64, Output)>,
    fee: u64,
    kernel_blind: u64,
    kernel_height: HeightRange,
) -> Transaction {
    let mut delta = [0u8; 32];
    for (r, _) in &outputs {
        delta = cp.scalar_add(&delta, &blind(*r));
    }
    for (r, _) in &inputs {
        delta = cp.scalar_add(&delta, &cp.scalar_neg(&blind(*r)));
    }
    let k = blind(kernel_blind);
    let offset = cp.scalar_neg(&cp.scalar_add(&delta, &k));

    let mut tx = Transaction {
        inputs: inputs.into_iter().map(|(_, i)| i).collect(),
        outputs: outputs.into_iter().map(|(_, o)| o).collect(),
        kernels: vec![signed_kernel(cp, &k, fee, kernel_height, Vec::new())],
        offset,
    };
    tx.normalize();
    tx
}

fn simple_tx(cp: &DevCommitmentProvider) -> Transaction {
    balanced(
        cp,
        vec![(11, input(cp, 11, 1000)), (12, input(cp, 12, 500))],
        vec![(21, output(cp, 21, 1200)), (22, output(cp, 22, 290))],
        10,
        31,
        HeightRange::full(),
    )
}

fn check_tx(
    cp: &DevCommitmentProvider,
    chain: &ChainParams,
    tx: &Transaction,
    params: ContextParams,
) -> Result<(), ValidationError> {
    let mut ctx = Context::new(cp, chain, params);
    let mut r = tx.reader();
    ctx.validate_and_summarize_strict(&tx.base(), &mut r)?;
    ctx.test_transaction()
}

fn block_params() -> ContextParams {
    ContextParams {
        block_mode: true,
        ..ContextParams::default()
    }
}

fn check_block(
    cp: &DevCommitmentProvider,
    chain: &ChainParams,
    body: &Transaction,
    height: HeightRange,
) -> Result<(), ValidationError> {
    let mut ctx = Context::new(cp, chain, block_params());
    ctx.height = height;
    let mut r = body.reader();
    ctx.validate_and_summarize_strict(&body.base(), &mut r)?;
    ctx.test_block()
}

fn coinbase_block(cp: &DevCommitmentProvider, chain: &ChainParams, h: u64) -> Transaction {
    let reward = chain.emission_at(h);
    balanced(
        cp,
        Vec::new(),
        vec![(41, coinbase_output(cp, 41, reward))],
        0,
        43,
        HeightRange::at(h),
    )
}

#[test]
fn balanced_transaction_is_valid() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = simple_tx(&cp);
    check_tx(&cp, &chain, &tx, ContextParams::default()).expect("valid");

    let mut ctx = Context::new(&cp, &chain, ContextParams::default());
    let mut r = tx.reader();
    ctx.validate_and_summarize(&tx.base(), &mut r).expect("summarize");
    assert_eq!(ctx.fee, 10);
    assert!(ctx.is_valid_transaction());
}

#[test]
fn wrong_fee_breaks_balance() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = balanced(
        &cp,
        vec![(11, input(&cp, 11, 1000))],
        vec![(21, output(&cp, 21, 900))],
        99,
        31,
        HeightRange::full(),
    );
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrBalance);
}

#[test]
fn tampered_offset_breaks_balance() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.offset = cp.scalar_add(&tx.offset, &blind(1));
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrBalance);
}

#[test]
fn unsorted_inputs_are_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.inputs.swap(0, 1);
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrOrder);

    let params = ContextParams {
        verify_order: false,
        ..ContextParams::default()
    };
    check_tx(&cp, &chain, &tx, params).expect("order not enforced");
}

fn assert_order_rejected(cp: &DevCommitmentProvider, chain: &ChainParams, tx: &Transaction) {
    for n in [1u32, 3] {
        let err = validate_parallel(
            cp,
            chain,
            &ContextParams::default(),
            HeightRange::full(),
            &tx.base(),
            &tx.reader(),
            n,
        )
        .err()
        .expect("must fail");
        assert_eq!(err.code, ErrorCode::TxErrOrder, "n_threads = {n}");
    }
}

#[test]
fn unsorted_outputs_are_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.outputs.swap(0, 1);
    assert_order_rejected(&cp, &chain, &tx);
}

#[test]
fn unsorted_kernels_are_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.kernels
        .push(signed_kernel(&cp, &blind(32), 0, HeightRange::full(), Vec::new()));
    tx.offset = cp.scalar_add(&tx.offset, &cp.scalar_neg(&blind(32)));
    tx.normalize();
    check_tx(&cp, &chain, &tx, ContextParams::default()).expect("sorted kernels valid");

    tx.kernels.swap(0, 1);
    assert_order_rejected(&cp, &chain, &tx);
}

#[test]
fn unsorted_nested_kernels_are_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut children = vec![
        signed_kernel(&cp, &blind(5), 2, HeightRange::full(), Vec::new()),
        signed_kernel(&cp, &blind(6), 2, HeightRange::full(), Vec::new()),
    ];
    children.sort_by_key(TxKernel::key);
    children.reverse();

    // signed over the unsorted children, so only the order is wrong
    let parent_blind = cp.scalar_add(
        &blind(31),
        &cp.scalar_neg(&cp.scalar_add(&blind(5), &blind(6))),
    );
    let parent = signed_kernel(&cp, &parent_blind, 6, HeightRange::full(), children);
    let mut tx = simple_tx(&cp);
    tx.kernels = vec![parent];
    assert_order_rejected(&cp, &chain, &tx);
}

#[test]
fn duplicate_input_is_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    let dup = tx.inputs[0].clone();
    tx.inputs.insert(0, dup);
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrDuplicate);
}

#[test]
fn input_spending_own_output_is_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.inputs.push(Input {
        commitment: tx.outputs[1].commitment,
        maturity: 7,
    });
    tx.normalize();
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrDuplicate);
}

#[test]
fn duplicate_outputs_pass_only_when_unsigned_allowed() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    let dup = tx.outputs[0].clone();
    tx.outputs.insert(0, dup);
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrDuplicate);

    let params = ContextParams {
        allow_unsigned_outputs: true,
        ..ContextParams::default()
    };
    // passes the scan, fails only on balance
    let err = check_tx(&cp, &chain, &tx, params).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrBalance);
}

#[test]
fn missing_rangeproof_unless_unsigned_allowed() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.outputs[1].confidential = None;
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrMissingRangeproof);
    assert_eq!(err.msg, "Missing rangeproof");

    let params = ContextParams {
        allow_unsigned_outputs: true,
        ..ContextParams::default()
    };
    check_tx(&cp, &chain, &tx, params).expect("unsigned allowed");
}

#[test]
fn bad_rangeproof_is_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.outputs[0].confidential = Some(vec![0u8; 32]);
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrRangeproofInvalid);
}

#[test]
fn invalid_commitment_is_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.inputs.insert(
        0,
        Input {
            commitment: [0u8; 32],
            maturity: 0,
        },
    );
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrCommitmentInvalid);
}

#[test]
fn bad_kernel_signature_is_rejected() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.kernels[0].fee += 1;
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrSignatureInvalid);
}

#[test]
fn coinbase_forbidden_in_transactions() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = balanced(
        &cp,
        vec![(11, input(&cp, 11, 100))],
        vec![(41, coinbase_output(&cp, 41, 100))],
        0,
        31,
        HeightRange::full(),
    );
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrCoinbaseForbidden);
}

#[test]
fn kernel_heights_narrow_transaction_range() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = balanced(
        &cp,
        vec![(11, input(&cp, 11, 100))],
        vec![(21, output(&cp, 21, 100))],
        0,
        31,
        HeightRange::new(50, 80),
    );
    let mut ctx = Context::new(&cp, &chain, ContextParams::default());
    let mut r = tx.reader();
    ctx.validate_and_summarize_strict(&tx.base(), &mut r)
        .expect("valid");
    assert_eq!(ctx.height, HeightRange::new(50, 80));
}

#[test]
fn disjoint_kernel_heights_mismatch() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.kernels[0] = signed_kernel(&cp, &blind(31), 10, HeightRange::new(1, 10), Vec::new());
    let extra = signed_kernel(&cp, &blind(32), 0, HeightRange::new(20, 30), Vec::new());
    tx.offset = cp.scalar_add(&tx.offset, &cp.scalar_neg(&blind(32)));
    tx.kernels.push(extra);
    tx.normalize();
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrHeightMismatch);
    assert_eq!(err.msg, "Height mismatch");
}

#[test]
fn nested_kernels_balance_and_depth_is_bounded() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();

    // split the kernel blind between a parent and one nested child
    let child = signed_kernel(&cp, &blind(5), 4, HeightRange::full(), Vec::new());
    let parent_blind = cp.scalar_add(&blind(31), &cp.scalar_neg(&blind(5)));
    let parent = signed_kernel(&cp, &parent_blind, 6, HeightRange::full(), vec![child.clone()]);
    let mut tx = simple_tx(&cp);
    tx.kernels = vec![parent];
    check_tx(&cp, &chain, &tx, ContextParams::default()).expect("nested valid");

    let grandchild = signed_kernel(&cp, &blind(6), 0, HeightRange::full(), Vec::new());
    let deep_child = signed_kernel(&cp, &blind(5), 4, HeightRange::full(), vec![grandchild]);
    let deep = signed_kernel(&cp, &parent_blind, 6, HeightRange::full(), vec![deep_child]);
    tx.kernels = vec![deep];
    let err = check_tx(&cp, &chain, &tx, ContextParams::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrKernelNesting);
}

#[test]
fn abort_flag_stops_validation() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = simple_tx(&cp);
    let params = ContextParams {
        abort: Some(Arc::new(AtomicBool::new(true))),
        ..ContextParams::default()
    };
    let err = check_tx(&cp, &chain, &tx, params).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrAborted);
    assert!(!err.code.is_insane());
}

#[test]
fn coinbase_block_is_valid() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let body = coinbase_block(&cp, &chain, 10);
    check_block(&cp, &chain, &body, HeightRange::at(10)).expect("valid block");

    let mut ctx = Context::new(&cp, &chain, block_params());
    ctx.height = HeightRange::at(10);
    let mut r = body.reader();
    ctx.validate_and_summarize_strict(&body.base(), &mut r)
        .expect("summarize");
    assert_eq!(ctx.coinbase, chain.emission_at(10) as u128);
    assert!(ctx.is_valid_block());
}

#[test]
fn short_coinbase_is_a_mismatch() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let reward = chain.emission_at(10);
    let body = balanced(
        &cp,
        Vec::new(),
        vec![
            (41, coinbase_output(&cp, 41, reward - 1)),
            (42, output(&cp, 42, 1)),
        ],
        0,
        43,
        HeightRange::at(10),
    );
    let err = check_block(&cp, &chain, &body, HeightRange::at(10)).unwrap_err();
    assert_eq!(err.code, ErrorCode::BlockErrCoinbaseMismatch);
    assert_eq!(err.msg, "Coinbase value mismatch");
}

#[test]
fn over_emission_breaks_block_balance() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let reward = chain.emission_at(10);
    let body = balanced(
        &cp,
        Vec::new(),
        vec![(41, coinbase_output(&cp, 41, reward + 1))],
        0,
        43,
        HeightRange::at(10),
    );
    let err = check_block(&cp, &chain, &body, HeightRange::at(10)).unwrap_err();
    assert_eq!(err.code, ErrorCode::BlockErrBalance);
}

#[test]
fn block_kernel_outside_height_mismatches() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let body = coinbase_block(&cp, &chain, 10);
    let err = check_block(&cp, &chain, &body, HeightRange::at(11)).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrHeightMismatch);
}

#[test]
fn pbft_blocks_carry_no_coinbase() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams {
        consensus: ConsensusKind::Pbft,
        ..ChainParams::default()
    };
    let body = coinbase_block(&cp, &chain, 10);
    let err = check_block(&cp, &chain, &body, HeightRange::at(10)).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrCoinbaseForbidden);
}

#[test]
fn ranges_straddling_fork1() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams {
        fork1_height: 5,
        ..ChainParams::default()
    };
    let body = coinbase_block(&cp, &chain, 4);
    let err = check_block(&cp, &chain, &body, HeightRange::new(3, 8)).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrMixedForks);

    // transactions are clamped below the fork instead
    let tx = balanced(
        &cp,
        vec![(11, input(&cp, 11, 100))],
        vec![(21, output(&cp, 21, 100))],
        0,
        31,
        HeightRange::new(6, 10),
    );
    let mut ctx = Context::new(&cp, &chain, ContextParams::default());
    ctx.height = HeightRange::new(3, 8);
    let mut r = tx.reader();
    let err = ctx
        .validate_and_summarize_strict(&tx.base(), &mut r)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TxErrHeightMismatch);
}

#[test]
fn manual_split_merges_to_same_summary() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let tx = simple_tx(&cp);

    let mut whole = Context::new(&cp, &chain, ContextParams::default());
    let mut r = tx.reader();
    whole
        .validate_and_summarize_strict(&tx.base(), &mut r)
        .expect("whole");

    let n = 3u32;
    let mut merged: Option<Context<'_, DevCommitmentProvider>> = None;
    for i in 0..n {
        let mut part = Context::new(
            &cp,
            &chain,
            ContextParams {
                n_verifiers: n,
                ..ContextParams::default()
            },
        );
        part.i_verifier = i;
        let mut r = tx.reader();
        part.validate_and_summarize_strict(&tx.base(), &mut r)
            .expect("part");
        match merged.as_mut() {
            None => merged = Some(part),
            Some(m) => m.merge(&part).expect("merge"),
        }
    }
    let merged = merged.expect("merged");
    assert_eq!(merged.sigma, whole.sigma);
    assert_eq!(merged.fee, whole.fee);
    assert_eq!(merged.height, whole.height);
}

#[test]
fn parallel_block_validation() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let body = coinbase_block(&cp, &chain, 10);
    for n in 1..=4 {
        let mut ctx = validate_parallel(
            &cp,
            &chain,
            &block_params(),
            HeightRange::at(10),
            &body.base(),
            &body.reader(),
            n,
        )
        .expect("summarize");
        ctx.test_block().expect("valid block");
    }
}

#[test]
fn parallel_reports_real_error_over_abort() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.kernels[0].signature = vec![1, 2, 3];
    let err = validate_parallel(
        &cp,
        &chain,
        &ContextParams::default(),
        HeightRange::full(),
        &tx.base(),
        &tx.reader(),
        4,
    )
    .err()
    .expect("must fail");
    assert_eq!(err.code, ErrorCode::TxErrSignatureInvalid);
}

#[test]
fn single_thread_verifies_every_element() {
    let cp = DevCommitmentProvider::new();
    let chain = ChainParams::default();
    let mut tx = simple_tx(&cp);
    tx.outputs[0].confidential = Some(vec![0u8; 32]);
    let params = ContextParams {
        n_verifiers: 4,
        ..ContextParams::default()
    };
    let err = validate_parallel(
        &cp,
        &chain,
        &params,
        HeightRange::full(),
        &tx.base(),
        &tx.reader(),
        1,
    )
    .err()
    .expect("must fail");
    assert_eq!(err.code, ErrorCode::TxErrRangeproofInvalid);
}

#[derive(Clone, Copy, Debug)]
enum Tamper {
    None,
    Fee,
    SwapOutputs,
    DropProof,
}

fn tamper_strategy() -> impl Strategy<Value = Tamper> {
    prop_oneof![
        Just(Tamper::None),
        Just(Tamper::Fee),
        Just(Tamper::SwapOutputs),
        Just(Tamper::DropProof),
    ]
}

fn verdict(
    cp: &DevCommitmentProvider,
    chain: &ChainParams,
    tx: &Transaction,
    n: u32,
) -> Result<(), ErrorCode> {
    let mut ctx = validate_parallel(
        cp,
        chain,
        &ContextParams::default(),
        HeightRange::full(),
        &tx.base(),
        &tx.reader(),
        n,
    )
    .map_err(|e| e.code)?;
    ctx.test_transaction().map_err(|e| e.code)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sharding_never_changes_the_verdict(
        in_values in prop::collection::vec(1u64..1_000_000, 1..6),
        n_outputs in 1usize..6,
        fee_part in 0u64..100,
        n_threads in 2u32..6,
        tamper in tamper_strategy(),
    ) {
        let cp = DevCommitmentProvider::new();
        let chain = ChainParams::default();

        let total: u64 = in_values.iter().sum();
        let fee = total * fee_part / 100;
        let mut remaining = total - fee;
        let mut outs = Vec::new();
        for j in 0..n_outputs {
            let v = if j + 1 == n_outputs { remaining } else { remaining / 2 };
            remaining -= v;
            let r = 1000 + j as u64;
            outs.push((r, output(&cp, r, v)));
        }
        let ins = in_values
            .iter()
            .enumerate()
            .map(|(i, v)| (100 + i as u64, input(&cp, 100 + i as u64, *v)))
            .collect();
        let mut tx = balanced(&cp, ins, outs, fee, 77, HeightRange::full());

        match tamper {
            Tamper::None => {}
            Tamper::Fee => {
                tx.kernels[0] = signed_kernel(&cp, &blind(77), fee + 1, HeightRange::full(), Vec::new());
            }
            Tamper::SwapOutputs => {
                if tx.outputs.len() > 1 {
                    tx.outputs.swap(0, 1);
                }
            }
            Tamper::DropProof => {
                let last = tx.outputs.len() - 1;
                tx.outputs[last].confidential = None;
            }
        }

        let single = verdict(&cp, &chain, &tx, 1);
        let sharded = verdict(&cp, &chain, &tx, n_threads);
        prop_assert_eq!(single.is_ok(), sharded.is_ok());
        if matches!(tamper, Tamper::None) {
            prop_assert!(single.is_ok());
        }
    }
}
