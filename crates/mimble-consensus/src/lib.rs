pub mod chainwork;
pub mod constants;
pub mod context;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod header;
pub mod height;
pub mod merkle;
pub mod params;
pub mod tx;
pub mod work;

pub use chainwork::{ChainWorkProof, ChainWorkSource, Heading};
pub use context::{validate_parallel, Context, ContextParams};
pub use difficulty::Difficulty;
pub use error::{ChainWorkError, ErrorCode, ValidationError};
pub use hash::{interpret, sha3_256, Hash, Oracle};
pub use header::{Header, HeaderElement, HeaderPrefix, PoW, StateId};
pub use height::HeightRange;
pub use merkle::{Mmr, MemMmr, MultiProof, ProofBuilder};
pub use params::{ChainParams, ConsensusKind, Emission};
pub use tx::{Input, Output, PublicProof, Transaction, TxBase, TxKernel, TxReader, VecReader};
pub use work::Work;

#[cfg(test)]
mod tests;
