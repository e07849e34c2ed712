use core::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TxErrOrder,
    TxErrDuplicate,
    TxErrCommitmentInvalid,
    TxErrMissingRangeproof,
    TxErrRangeproofInvalid,
    TxErrCoinbaseForbidden,
    TxErrKernelInvalid,
    TxErrKernelNesting,
    TxErrSignatureInvalid,
    TxErrFeeOverflow,
    TxErrHeightMismatch,
    TxErrMixedForks,
    TxErrBalance,
    TxErrAborted,

    BlockErrCoinbaseMismatch,
    BlockErrBalance,

    CwpErrEmpty,
    CwpErrHeaderInvalid,
    CwpErrWindowOverflow,
    CwpErrSampleOutOfRange,
    CwpErrHeightOrder,
    CwpErrChainLink,
    CwpErrMissingState,
    CwpErrProofInvalid,
    CwpErrTrailingData,
    CwpErrWorkOverflow,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TxErrOrder => "TX_ERR_ORDER",
            ErrorCode::TxErrDuplicate => "TX_ERR_DUPLICATE",
            ErrorCode::TxErrCommitmentInvalid => "TX_ERR_COMMITMENT_INVALID",
            ErrorCode::TxErrMissingRangeproof => "TX_ERR_MISSING_RANGEPROOF",
            ErrorCode::TxErrRangeproofInvalid => "TX_ERR_RANGEPROOF_INVALID",
            ErrorCode::TxErrCoinbaseForbidden => "TX_ERR_COINBASE_FORBIDDEN",
            ErrorCode::TxErrKernelInvalid => "TX_ERR_KERNEL_INVALID",
            ErrorCode::TxErrKernelNesting => "TX_ERR_KERNEL_NESTING",
            ErrorCode::TxErrSignatureInvalid => "TX_ERR_SIGNATURE_INVALID",
            ErrorCode::TxErrFeeOverflow => "TX_ERR_FEE_OVERFLOW",
            ErrorCode::TxErrHeightMismatch => "TX_ERR_HEIGHT_MISMATCH",
            ErrorCode::TxErrMixedForks => "TX_ERR_MIXED_FORKS",
            ErrorCode::TxErrBalance => "TX_ERR_BALANCE",
            ErrorCode::TxErrAborted => "TX_ERR_ABORTED",

            ErrorCode::BlockErrCoinbaseMismatch => "BLOCK_ERR_COINBASE_MISMATCH",
            ErrorCode::BlockErrBalance => "BLOCK_ERR_BALANCE",

            ErrorCode::CwpErrEmpty => "CWP_ERR_EMPTY",
            ErrorCode::CwpErrHeaderInvalid => "CWP_ERR_HEADER_INVALID",
            ErrorCode::CwpErrWindowOverflow => "CWP_ERR_WINDOW_OVERFLOW",
            ErrorCode::CwpErrSampleOutOfRange => "CWP_ERR_SAMPLE_OUT_OF_RANGE",
            ErrorCode::CwpErrHeightOrder => "CWP_ERR_HEIGHT_ORDER",
            ErrorCode::CwpErrChainLink => "CWP_ERR_CHAIN_LINK",
            ErrorCode::CwpErrMissingState => "CWP_ERR_MISSING_STATE",
            ErrorCode::CwpErrProofInvalid => "CWP_ERR_PROOF_INVALID",
            ErrorCode::CwpErrTrailingData => "CWP_ERR_TRAILING_DATA",
            ErrorCode::CwpErrWorkOverflow => "CWP_ERR_WORK_OVERFLOW",
        }
    }

    /// Violations that honest protocol operation cannot produce. The peer that
    /// delivered such data is banned rather than merely rated down.
    pub fn is_insane(self) -> bool {
        !matches!(
            self,
            ErrorCode::TxErrAborted
                | ErrorCode::TxErrHeightMismatch
                | ErrorCode::TxErrMixedForks
                | ErrorCode::CwpErrTrailingData
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub msg: &'static str,
}

impl ValidationError {
    pub fn new(code: ErrorCode, msg: &'static str) -> Self {
        Self { code, msg }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.msg)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure of a single chain-work proof verification. Never affects local chain
/// validity, only the lightweight verification attempt that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainWorkError {
    #[error("{}: proof heading is empty", ErrorCode::CwpErrEmpty.as_str())]
    Empty,
    #[error("{}: header at height {height} failed self-check", ErrorCode::CwpErrHeaderInvalid.as_str())]
    HeaderInvalid { height: u64 },
    #[error("{}: sampling window overflow", ErrorCode::CwpErrWindowOverflow.as_str())]
    WindowOverflow,
    #[error("{}: sample not covered by state {index}", ErrorCode::CwpErrSampleOutOfRange.as_str())]
    SampleOutOfRange { index: usize },
    #[error("{}: state {index} does not descend", ErrorCode::CwpErrHeightOrder.as_str())]
    HeightOrder { index: usize },
    #[error("{}: state {index} does not link to its successor", ErrorCode::CwpErrChainLink.as_str())]
    ChainLink { index: usize },
    #[error("{}: state {index} missing", ErrorCode::CwpErrMissingState.as_str())]
    MissingState { index: usize },
    #[error("{}: inclusion proof for state {index} rejected", ErrorCode::CwpErrProofInvalid.as_str())]
    ProofInvalid { index: usize },
    #[error("{}: {states} states / {hashes} hashes left unused", ErrorCode::CwpErrTrailingData.as_str())]
    TrailingData { states: usize, hashes: usize },
    #[error("{}: chain work overflow", ErrorCode::CwpErrWorkOverflow.as_str())]
    WorkOverflow,
}

impl ChainWorkError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChainWorkError::Empty => ErrorCode::CwpErrEmpty,
            ChainWorkError::HeaderInvalid { .. } => ErrorCode::CwpErrHeaderInvalid,
            ChainWorkError::WindowOverflow => ErrorCode::CwpErrWindowOverflow,
            ChainWorkError::SampleOutOfRange { .. } => ErrorCode::CwpErrSampleOutOfRange,
            ChainWorkError::HeightOrder { .. } => ErrorCode::CwpErrHeightOrder,
            ChainWorkError::ChainLink { .. } => ErrorCode::CwpErrChainLink,
            ChainWorkError::MissingState { .. } => ErrorCode::CwpErrMissingState,
            ChainWorkError::ProofInvalid { .. } => ErrorCode::CwpErrProofInvalid,
            ChainWorkError::TrailingData { .. } => ErrorCode::CwpErrTrailingData,
            ChainWorkError::WorkOverflow => ErrorCode::CwpErrWorkOverflow,
        }
    }
}
