//! Body validation entry points used by the node, sized by `verification_threads`.

use mimble_consensus::{validate_parallel, ChainParams, ContextParams, HeightRange, Transaction, ValidationError};
use mimble_crypto::CommitmentProvider;
use tracing::debug;

use crate::config::NodeConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifierPool {
    threads: u32,
}

impl VerifierPool {
    pub fn new(cfg: &NodeConfig) -> Self {
        Self {
            threads: cfg.verification_threads.max(1),
        }
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Full standalone-transaction check. Returns the total fee.
    pub fn validate_transaction<P: CommitmentProvider>(
        &self,
        provider: &P,
        chain: &ChainParams,
        tx: &Transaction,
        height: HeightRange,
    ) -> Result<u128, ValidationError> {
        let params = ContextParams::default();
        let mut ctx = validate_parallel(
            provider,
            chain,
            &params,
            height,
            &tx.base(),
            &tx.reader(),
            self.threads,
        )?;
        ctx.test_transaction()?;
        debug!(fee = ctx.fee as u64, threads = self.threads, "transaction valid");
        Ok(ctx.fee)
    }

    /// Full block-body check at exactly `height`.
    pub fn validate_block<P: CommitmentProvider>(
        &self,
        provider: &P,
        chain: &ChainParams,
        body: &Transaction,
        height: u64,
    ) -> Result<(), ValidationError> {
        let params = ContextParams {
            block_mode: true,
            ..ContextParams::default()
        };
        let mut ctx = validate_parallel(
            provider,
            chain,
            &params,
            HeightRange::at(height),
            &body.base(),
            &body.reader(),
            self.threads,
        )?;
        ctx.test_block()?;
        debug!(height, threads = self.threads, "block body valid");
        Ok(())
    }
}
