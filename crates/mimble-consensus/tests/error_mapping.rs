use mimble_consensus::{ChainWorkError, ErrorCode, ValidationError};

#[test]
fn error_code_as_str_covers_all_variants() {
    let cases: &[(ErrorCode, &str)] = &[
        (ErrorCode::TxErrOrder, "TX_ERR_ORDER"),
        (ErrorCode::TxErrDuplicate, "TX_ERR_DUPLICATE"),
        (ErrorCode::TxErrCommitmentInvalid, "TX_ERR_COMMITMENT_INVALID"),
        (ErrorCode::TxErrMissingRangeproof, "TX_ERR_MISSING_RANGEPROOF"),
        (ErrorCode::TxErrRangeproofInvalid, "TX_ERR_RANGEPROOF_INVALID"),
        (ErrorCode::TxErrCoinbaseForbidden, "TX_ERR_COINBASE_FORBIDDEN"),
        (ErrorCode::TxErrKernelInvalid, "TX_ERR_KERNEL_INVALID"),
        (ErrorCode::TxErrKernelNesting, "TX_ERR_KERNEL_NESTING"),
        (ErrorCode::TxErrSignatureInvalid, "TX_ERR_SIGNATURE_INVALID"),
        (ErrorCode::TxErrFeeOverflow, "TX_ERR_FEE_OVERFLOW"),
        (ErrorCode::TxErrHeightMismatch, "TX_ERR_HEIGHT_MISMATCH"),
        (ErrorCode::TxErrMixedForks, "TX_ERR_MIXED_FORKS"),
        (ErrorCode::TxErrBalance, "TX_ERR_BALANCE"),
        (ErrorCode::TxErrAborted, "TX_ERR_ABORTED"),
        (
            ErrorCode::BlockErrCoinbaseMismatch,
            "BLOCK_ERR_COINBASE_MISMATCH",
        ),
        (ErrorCode::BlockErrBalance, "BLOCK_ERR_BALANCE"),
        (ErrorCode::CwpErrEmpty, "CWP_ERR_EMPTY"),
        (ErrorCode::CwpErrHeaderInvalid, "CWP_ERR_HEADER_INVALID"),
        (ErrorCode::CwpErrWindowOverflow, "CWP_ERR_WINDOW_OVERFLOW"),
        (
            ErrorCode::CwpErrSampleOutOfRange,
            "CWP_ERR_SAMPLE_OUT_OF_RANGE",
        ),
        (ErrorCode::CwpErrHeightOrder, "CWP_ERR_HEIGHT_ORDER"),
        (ErrorCode::CwpErrChainLink, "CWP_ERR_CHAIN_LINK"),
        (ErrorCode::CwpErrMissingState, "CWP_ERR_MISSING_STATE"),
        (ErrorCode::CwpErrProofInvalid, "CWP_ERR_PROOF_INVALID"),
        (ErrorCode::CwpErrTrailingData, "CWP_ERR_TRAILING_DATA"),
        (ErrorCode::CwpErrWorkOverflow, "CWP_ERR_WORK_OVERFLOW"),
    ];

    for (code, want) in cases {
        assert_eq!(code.as_str(), *want);
    }
}

#[test]
fn validation_error_display() {
    let e = ValidationError::new(ErrorCode::TxErrBalance, "");
    assert_eq!(e.to_string(), "TX_ERR_BALANCE");
    let e2 = ValidationError::new(ErrorCode::TxErrMissingRangeproof, "Missing rangeproof");
    assert_eq!(e2.to_string(), "TX_ERR_MISSING_RANGEPROOF: Missing rangeproof");
}

#[test]
fn chain_work_error_codes() {
    let cases = [
        (ChainWorkError::Empty, ErrorCode::CwpErrEmpty),
        (
            ChainWorkError::HeaderInvalid { height: 3 },
            ErrorCode::CwpErrHeaderInvalid,
        ),
        (ChainWorkError::WindowOverflow, ErrorCode::CwpErrWindowOverflow),
        (
            ChainWorkError::SampleOutOfRange { index: 1 },
            ErrorCode::CwpErrSampleOutOfRange,
        ),
        (
            ChainWorkError::HeightOrder { index: 1 },
            ErrorCode::CwpErrHeightOrder,
        ),
        (ChainWorkError::ChainLink { index: 1 }, ErrorCode::CwpErrChainLink),
        (
            ChainWorkError::MissingState { index: 1 },
            ErrorCode::CwpErrMissingState,
        ),
        (
            ChainWorkError::ProofInvalid { index: 1 },
            ErrorCode::CwpErrProofInvalid,
        ),
        (
            ChainWorkError::TrailingData {
                states: 1,
                hashes: 0,
            },
            ErrorCode::CwpErrTrailingData,
        ),
        (ChainWorkError::WorkOverflow, ErrorCode::CwpErrWorkOverflow),
    ];
    for (e, code) in cases {
        assert_eq!(e.code(), code);
        assert!(e.to_string().starts_with(code.as_str()));
    }
    assert_eq!(
        ChainWorkError::HeaderInvalid { height: 3 }.to_string(),
        "CWP_ERR_HEADER_INVALID: header at height 3 failed self-check"
    );
}

#[test]
fn only_benign_codes_are_sane() {
    assert!(!ErrorCode::TxErrAborted.is_insane());
    assert!(!ErrorCode::TxErrHeightMismatch.is_insane());
    assert!(!ErrorCode::CwpErrTrailingData.is_insane());
    assert!(ErrorCode::TxErrBalance.is_insane());
    assert!(ErrorCode::CwpErrProofInvalid.is_insane());
}
