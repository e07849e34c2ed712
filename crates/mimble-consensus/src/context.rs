use core::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mimble_crypto::CommitmentProvider;
use tracing::debug;

use crate::error::{ErrorCode, ValidationError};
use crate::height::HeightRange;
use crate::params::{ChainParams, ConsensusKind};
use crate::tx::{cmp_in_out, import, KernelKey, TxBase, TxReader, UtxoKey};

#[derive(Clone, Debug)]
pub struct ContextParams {
    /// Block body rather than a standalone transaction: coinbase outputs are
    /// allowed and element heights are checked, never used to narrow the range.
    pub block_mode: bool,
    pub verify_order: bool,
    /// Accept outputs without range proofs. Restricted operational contexts only.
    pub allow_unsigned_outputs: bool,
    pub n_verifiers: u32,
    pub abort: Option<Arc<AtomicBool>>,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            block_mode: false,
            verify_order: true,
            allow_unsigned_outputs: false,
            n_verifiers: 1,
            abort: None,
        }
    }
}

/// Running homomorphic summary of a transaction or block body.
///
/// Fresh per validation call; `validate_and_summarize_strict` fills it, one of
/// `test_transaction` / `test_block` consumes it. Partial contexts over the same
/// body with distinct `i_verifier` combine through `merge`.
pub struct Context<'a, P: CommitmentProvider> {
    provider: &'a P,
    chain: &'a ChainParams,
    pub params: ContextParams,
    pub sigma: P::Point,
    pub fee: u128,
    pub coinbase: u128,
    pub height: HeightRange,
    /// First element index owned by this verifier; ownership then repeats
    /// every `n_verifiers` elements across inputs, outputs, kernels and the
    /// offset, in that order.
    pub i_verifier: u32,
}

fn fail<T>(code: ErrorCode, msg: &'static str) -> Result<T, ValidationError> {
    Err(ValidationError::new(code, msg))
}

impl<'a, P: CommitmentProvider> Context<'a, P> {
    pub fn new(provider: &'a P, chain: &'a ChainParams, params: ContextParams) -> Self {
        Self {
            provider,
            chain,
            params,
            sigma: provider.zero(),
            fee: 0,
            coinbase: 0,
            height: HeightRange::full(),
            i_verifier: 0,
        }
    }

    pub fn reset(&mut self) {
        self.sigma = self.provider.zero();
        self.fee = 0;
        self.coinbase = 0;
        self.height.reset();
        self.i_verifier = 0;
    }

    /// Round-robin ownership gate. `iv` counts down the elements to skip before
    /// the next owned one.
    pub fn should_verify(&self, iv: &mut u32) -> bool {
        if *iv != 0 {
            *iv -= 1;
            return false;
        }
        *iv = self.params.n_verifiers.max(1) - 1;
        true
    }

    pub fn should_abort(&self) -> bool {
        self.params
            .abort
            .as_ref()
            .is_some_and(|a| a.load(Ordering::Relaxed))
    }

    fn test_abort(&self) -> Result<(), ValidationError> {
        if self.should_abort() {
            return fail(ErrorCode::TxErrAborted, "validation aborted");
        }
        Ok(())
    }

    /// Transactions shrink the permitted range; blocks only check it.
    pub fn handle_element_height(&mut self, hr: &HeightRange) -> bool {
        let mut r = self.height;
        r.intersect(hr);
        if r.is_empty() {
            return false;
        }
        if !self.params.block_mode {
            self.height = r;
        }
        true
    }

    pub fn merge(&mut self, other: &Context<'_, P>) -> Result<(), ValidationError> {
        debug_assert_eq!(self.params.block_mode, other.params.block_mode);
        if !self.handle_element_height(&other.height) {
            return fail(ErrorCode::TxErrHeightMismatch, "Height mismatch");
        }
        self.sigma = self.provider.add(&self.sigma, &other.sigma);
        self.fee = self
            .fee
            .checked_add(other.fee)
            .ok_or(ValidationError::new(ErrorCode::TxErrFeeOverflow, "fee overflow"))?;
        self.coinbase = self.coinbase.checked_add(other.coinbase).ok_or(
            ValidationError::new(ErrorCode::BlockErrCoinbaseMismatch, "coinbase overflow"),
        )?;
        Ok(())
    }

    /// Boundary form of `validate_and_summarize_strict`.
    pub fn validate_and_summarize(
        &mut self,
        base: &TxBase,
        reader: &mut dyn TxReader,
    ) -> Result<(), String> {
        self.validate_and_summarize_strict(base, reader).map_err(|e| {
            debug!(code = e.code.as_str(), verifier = self.i_verifier, "body rejected: {e}");
            e.to_string()
        })
    }

    /// Single pass over inputs, outputs and kernels. Ordering and duplicate
    /// checks run on every element; imports, proofs, signatures and the
    /// running sums only on elements this verifier owns.
    pub fn validate_and_summarize_strict(
        &mut self,
        base: &TxBase,
        reader: &mut dyn TxReader,
    ) -> Result<(), ValidationError> {
        if self.height.is_empty() {
            return fail(ErrorCode::TxErrHeightMismatch, "Height mismatch");
        }

        let fork1 = self.chain.fork1_height;
        if self.height.min < fork1 && self.height.max >= fork1 {
            if self.params.block_mode {
                return fail(ErrorCode::TxErrMixedForks, "range spans fork 1");
            }
            self.height.max = fork1 - 1;
        }

        let provider = self.provider;
        let mut iv = self.i_verifier;

        // inputs: sigma = -(-sigma + inputs)
        self.sigma = provider.neg(&self.sigma);
        reader.reset();
        let mut prev_in: Option<UtxoKey> = None;
        while let Some(inp) = reader.input() {
            self.test_abort()?;
            let inp = inp.clone();
            let key = inp.key();

            if self.params.verify_order {
                if let Some(p) = prev_in {
                    match p.cmp(&key) {
                        CmpOrdering::Greater => return fail(ErrorCode::TxErrOrder, "inputs out of order"),
                        CmpOrdering::Equal => return fail(ErrorCode::TxErrDuplicate, "duplicate input"),
                        CmpOrdering::Less => {}
                    }
                }
                while let Some(out) = reader.output() {
                    match cmp_in_out(&inp, out) {
                        CmpOrdering::Less => break,
                        CmpOrdering::Equal => {
                            return fail(ErrorCode::TxErrDuplicate, "output spent in the same body")
                        }
                        CmpOrdering::Greater => reader.next_output(),
                    }
                }
            }

            if self.should_verify(&mut iv) {
                let pt = import(provider, &inp.commitment)?;
                self.sigma = provider.add(&self.sigma, &pt);
            }

            prev_in = Some(key);
            reader.next_input();
        }
        self.sigma = provider.neg(&self.sigma);

        reader.reset();
        let mut prev_out: Option<UtxoKey> = None;
        while let Some(out) = reader.output() {
            self.test_abort()?;
            let key = out.key();

            if self.params.verify_order {
                if let Some(p) = prev_out {
                    match p.cmp(&key) {
                        CmpOrdering::Greater => return fail(ErrorCode::TxErrOrder, "outputs out of order"),
                        CmpOrdering::Equal if !self.params.allow_unsigned_outputs => {
                            return fail(ErrorCode::TxErrDuplicate, "duplicate output")
                        }
                        _ => {}
                    }
                }
            }

            if self.should_verify(&mut iv) {
                if out.coinbase
                    && (!self.params.block_mode || self.chain.consensus == ConsensusKind::Pbft)
                {
                    return fail(ErrorCode::TxErrCoinbaseForbidden, "coinbase output not allowed");
                }

                let pt = if out.is_signed() {
                    out.verify(provider, self.height.min)?
                } else {
                    if !self.params.allow_unsigned_outputs {
                        return fail(ErrorCode::TxErrMissingRangeproof, "Missing rangeproof");
                    }
                    import(provider, &out.commitment)?
                };
                self.sigma = provider.add(&self.sigma, &pt);

                if out.coinbase {
                    if let Some(p) = &out.public {
                        self.coinbase += p.value as u128;
                    }
                }
            }

            prev_out = Some(key);
            reader.next_output();
        }

        let mut prev_krn: Option<KernelKey> = None;
        while let Some(krn) = reader.kernel() {
            self.test_abort()?;
            let key = krn.key();

            if self.params.verify_order {
                if let Some(p) = prev_krn {
                    match p.cmp(&key) {
                        CmpOrdering::Greater => return fail(ErrorCode::TxErrOrder, "kernels out of order"),
                        CmpOrdering::Equal => return fail(ErrorCode::TxErrDuplicate, "duplicate kernel"),
                        CmpOrdering::Less => {}
                    }
                }
            }

            if self.should_verify(&mut iv) {
                krn.verify(provider, &mut self.fee, &mut self.sigma)?;
                let hr = krn.effective_height();
                if !self.handle_element_height(&hr) {
                    return fail(ErrorCode::TxErrHeightMismatch, "Height mismatch");
                }
            }

            prev_krn = Some(key);
            reader.next_kernel();
        }

        if self.should_verify(&mut iv) && base.offset != [0u8; 32] {
            self.sigma = provider.add(&self.sigma, &provider.mul_g(&base.offset));
        }

        if self.height.is_empty() {
            return fail(ErrorCode::TxErrHeightMismatch, "Height mismatch");
        }
        Ok(())
    }

    /// `sigma + fee * H == 0`
    pub fn test_transaction(&mut self) -> Result<(), ValidationError> {
        if self.coinbase != 0 {
            return fail(ErrorCode::TxErrCoinbaseForbidden, "coinbase in transaction");
        }
        self.sigma = self.provider.add(&self.sigma, &self.provider.mul_h(self.fee));
        if !self.provider.is_zero(&self.sigma) {
            return fail(ErrorCode::TxErrBalance, "balance equation non-zero");
        }
        Ok(())
    }

    pub fn is_valid_transaction(&mut self) -> bool {
        self.test_transaction().is_ok()
    }

    /// `-sigma + emission(height) * H == 0`, plus the coinbase lock: the
    /// subsidy of the last `maturity_coinbase` blocks must still sit in
    /// coinbase outputs.
    pub fn test_block(&mut self) -> Result<(), ValidationError> {
        let total = self.chain.emission_for_range(&self.height);

        self.sigma = self.provider.neg(&self.sigma);
        self.sigma = self.provider.add(&self.sigma, &self.provider.mul_h(total));
        if !self.provider.is_zero(&self.sigma) {
            return fail(ErrorCode::BlockErrBalance, "balance equation non-zero");
        }

        if !self.params.allow_unsigned_outputs {
            let maturity = self.chain.maturity_coinbase;
            let locked = if self.height.max - self.height.min < maturity {
                total
            } else {
                let hr = HeightRange::new(self.height.max - maturity, self.height.max);
                self.chain.emission_for_range(&hr)
            };
            if self.coinbase < locked {
                return fail(ErrorCode::BlockErrCoinbaseMismatch, "Coinbase value mismatch");
            }
        }
        Ok(())
    }

    pub fn is_valid_block(&mut self) -> bool {
        self.test_block().is_ok()
    }
}

/// Validates one body with `n_threads` verifiers, each replaying its own
/// cursor, then merges the partial contexts in verifier order. The first
/// failure raises the shared abort flag so the other workers stop early.
pub fn validate_parallel<'a, P: CommitmentProvider>(
    provider: &'a P,
    chain: &'a ChainParams,
    params: &ContextParams,
    height: HeightRange,
    base: &TxBase,
    reader: &dyn TxReader,
    n_threads: u32,
) -> Result<Context<'a, P>, ValidationError> {
    let n = n_threads.max(1);

    if n == 1 {
        let mut p = params.clone();
        p.n_verifiers = 1;
        let mut ctx = Context::new(provider, chain, p);
        ctx.height = height;
        let mut r = reader.clone_reader();
        ctx.validate_and_summarize_strict(base, r.as_mut())?;
        return Ok(ctx);
    }

    let abort = params
        .abort
        .clone()
        .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
    let readers: Vec<_> = (0..n).map(|_| reader.clone_reader()).collect();

    let results: Vec<Result<Context<'a, P>, ValidationError>> = std::thread::scope(|s| {
        let handles: Vec<_> = readers
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                let mut p = params.clone();
                p.n_verifiers = n;
                p.abort = Some(abort.clone());
                let abort = abort.clone();
                s.spawn(move || {
                    let mut ctx = Context::new(provider, chain, p);
                    ctx.height = height;
                    ctx.i_verifier = i as u32;
                    let res = ctx.validate_and_summarize_strict(base, r.as_mut());
                    if res.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    res.map(|_| ctx)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(ValidationError::new(
                        ErrorCode::TxErrAborted,
                        "verifier thread panicked",
                    ))
                })
            })
            .collect()
    });

    let mut merged: Option<Context<'a, P>> = None;
    let mut first_err: Option<ValidationError> = None;
    for res in results {
        match res {
            Ok(ctx) => match merged.as_mut() {
                None => merged = Some(ctx),
                Some(m) => m.merge(&ctx)?,
            },
            Err(e) => {
                let replace = match &first_err {
                    None => true,
                    Some(prev) => prev.code == ErrorCode::TxErrAborted && e.code != ErrorCode::TxErrAborted,
                };
                if replace {
                    first_err = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_err {
        return Err(e);
    }
    merged.ok_or(ValidationError::new(ErrorCode::TxErrAborted, "no verifier ran"))
}
