use core::cmp::Ordering;

use mimble_crypto::{Commitment, CommitmentProvider, Scalar};
use serde::{Deserialize, Serialize};

use crate::constants::KERNEL_MAX_NESTING;
use crate::error::{ErrorCode, ValidationError};
use crate::hash::{Hash, Hasher};
use crate::height::HeightRange;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub commitment: Commitment,
    pub maturity: u64,
}

/// Sort key: commitment, then maturity.
pub type UtxoKey = (Commitment, u64);

impl Input {
    pub fn key(&self) -> UtxoKey {
        (self.commitment, self.maturity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProof {
    pub value: u64,
    pub proof: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub commitment: Commitment,
    pub maturity: u64,
    pub coinbase: bool,
    pub confidential: Option<Vec<u8>>,
    pub public: Option<PublicProof>,
}

impl Output {
    pub fn key(&self) -> UtxoKey {
        (self.commitment, self.maturity)
    }

    pub fn is_signed(&self) -> bool {
        self.confidential.is_some() || self.public.is_some()
    }

    /// Verifies the single range proof against `h_min` and imports the
    /// commitment. Coinbase outputs must disclose their value.
    pub fn verify<P: CommitmentProvider>(
        &self,
        provider: &P,
        h_min: u64,
    ) -> Result<P::Point, ValidationError> {
        let ok = match (&self.confidential, &self.public) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::new(
                    ErrorCode::TxErrRangeproofInvalid,
                    "output carries two range proofs",
                ))
            }
            (None, None) => {
                return Err(ValidationError::new(
                    ErrorCode::TxErrMissingRangeproof,
                    "Missing rangeproof",
                ))
            }
            (Some(_), None) if self.coinbase => {
                return Err(ValidationError::new(
                    ErrorCode::TxErrRangeproofInvalid,
                    "coinbase output must use a public proof",
                ))
            }
            (Some(proof), None) => provider.verify_confidential(&self.commitment, proof, h_min),
            (None, Some(p)) => provider.verify_public(&self.commitment, p.value, &p.proof),
        };
        if !matches!(ok, Ok(true)) {
            return Err(ValidationError::new(
                ErrorCode::TxErrRangeproofInvalid,
                "range proof rejected",
            ));
        }
        import(provider, &self.commitment)
    }
}

pub(crate) fn import<P: CommitmentProvider>(
    provider: &P,
    c: &Commitment,
) -> Result<P::Point, ValidationError> {
    provider.import_strict(c).ok_or(ValidationError::new(
        ErrorCode::TxErrCommitmentInvalid,
        "commitment import failed",
    ))
}

/// Input/output comparison by commitment alone.
pub fn cmp_in_out(i: &Input, o: &Output) -> Ordering {
    i.commitment.cmp(&o.commitment)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxKernel {
    /// Excess: the kernel's public key, value component zero.
    pub commitment: Commitment,
    pub signature: Vec<u8>,
    pub fee: u64,
    pub height: HeightRange,
    pub nested: Vec<TxKernel>,
}

/// Sort key: excess commitment, then kernel id.
pub type KernelKey = (Commitment, Hash);

impl TxKernel {
    /// Signed message. Commits to every field except the signature, nested
    /// kernels included by id.
    pub fn id(&self) -> Hash {
        let mut h = Hasher::new(b"mimble/kernel")
            .hash(&self.commitment)
            .u64(self.fee)
            .u64(self.height.min)
            .u64(self.height.max)
            .u64(self.nested.len() as u64);
        for n in &self.nested {
            h = h.hash(&n.id());
        }
        h.finish()
    }

    pub fn key(&self) -> KernelKey {
        (self.commitment, self.id())
    }

    /// Own height range narrowed by every nested kernel.
    pub fn effective_height(&self) -> HeightRange {
        let mut hr = self.height;
        for n in &self.nested {
            hr.intersect(&n.effective_height());
        }
        hr
    }

    /// Signature, nesting and ordering checks. Adds every excess in the tree to
    /// `sigma` and every fee to `fee`.
    pub fn verify<P: CommitmentProvider>(
        &self,
        provider: &P,
        fee: &mut u128,
        sigma: &mut P::Point,
    ) -> Result<(), ValidationError> {
        self.verify_at(provider, 1, fee, sigma)
    }

    fn verify_at<P: CommitmentProvider>(
        &self,
        provider: &P,
        depth: usize,
        fee: &mut u128,
        sigma: &mut P::Point,
    ) -> Result<(), ValidationError> {
        if depth > KERNEL_MAX_NESTING {
            return Err(ValidationError::new(
                ErrorCode::TxErrKernelNesting,
                "kernel nesting too deep",
            ));
        }
        if self.height.is_empty() {
            return Err(ValidationError::new(
                ErrorCode::TxErrKernelInvalid,
                "kernel height range empty",
            ));
        }

        *fee = fee.checked_add(self.fee as u128).ok_or(ValidationError::new(
            ErrorCode::TxErrFeeOverflow,
            "fee overflow",
        ))?;

        let excess = import(provider, &self.commitment)?;
        let msg = self.id();
        if !matches!(
            provider.verify_signature(&self.commitment, &msg, &self.signature),
            Ok(true)
        ) {
            return Err(ValidationError::new(
                ErrorCode::TxErrSignatureInvalid,
                "kernel signature rejected",
            ));
        }
        *sigma = provider.add(sigma, &excess);

        let mut prev: Option<KernelKey> = None;
        for n in &self.nested {
            let key = n.key();
            if let Some(p) = prev {
                if p >= key {
                    return Err(ValidationError::new(
                        ErrorCode::TxErrOrder,
                        "nested kernels out of order",
                    ));
                }
            }
            prev = Some(key);
            n.verify_at(provider, depth + 1, fee, sigma)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBase {
    pub offset: Scalar,
}

/// Pull cursor over the three sorted element streams of a transaction or block
/// body. Each kind is walked independently; `reset` rewinds all three.
pub trait TxReader {
    fn input(&self) -> Option<&Input>;
    fn output(&self) -> Option<&Output>;
    fn kernel(&self) -> Option<&TxKernel>;
    fn next_input(&mut self);
    fn next_output(&mut self);
    fn next_kernel(&mut self);
    fn reset(&mut self);
    /// Independent cursor over the same elements, positioned at the start.
    fn clone_reader(&self) -> Box<dyn TxReader + Send + '_>;
}

#[derive(Clone, Debug)]
pub struct VecReader<'a> {
    inputs: &'a [Input],
    outputs: &'a [Output],
    kernels: &'a [TxKernel],
    i_in: usize,
    i_out: usize,
    i_krn: usize,
}

impl<'a> VecReader<'a> {
    pub fn new(inputs: &'a [Input], outputs: &'a [Output], kernels: &'a [TxKernel]) -> Self {
        Self {
            inputs,
            outputs,
            kernels,
            i_in: 0,
            i_out: 0,
            i_krn: 0,
        }
    }
}

impl TxReader for VecReader<'_> {
    fn input(&self) -> Option<&Input> {
        self.inputs.get(self.i_in)
    }

    fn output(&self) -> Option<&Output> {
        self.outputs.get(self.i_out)
    }

    fn kernel(&self) -> Option<&TxKernel> {
        self.kernels.get(self.i_krn)
    }

    fn next_input(&mut self) {
        self.i_in += 1;
    }

    fn next_output(&mut self) {
        self.i_out += 1;
    }

    fn next_kernel(&mut self) {
        self.i_krn += 1;
    }

    fn reset(&mut self) {
        self.i_in = 0;
        self.i_out = 0;
        self.i_krn = 0;
    }

    fn clone_reader(&self) -> Box<dyn TxReader + Send + '_> {
        Box::new(VecReader::new(self.inputs, self.outputs, self.kernels))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub kernels: Vec<TxKernel>,
    pub offset: Scalar,
}

impl Transaction {
    /// Sorts every element list into canonical order.
    pub fn normalize(&mut self) {
        self.inputs.sort_by_key(Input::key);
        self.outputs.sort_by_key(Output::key);
        self.kernels.sort_by_cached_key(TxKernel::key);
    }

    pub fn base(&self) -> TxBase {
        TxBase {
            offset: self.offset,
        }
    }

    pub fn reader(&self) -> VecReader<'_> {
        VecReader::new(&self.inputs, &self.outputs, &self.kernels)
    }
}
