use fuzzchain_core::CoreError;
use thiserror::Error;

/// Errors raised by a node while running the protocol.
///
/// None of these cross node boundaries: a failed round is logged and the
/// node carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("Mining exhausted for block {index} after {attempts} attempts")]
    MiningExhausted { index: u64, attempts: u64 },

    #[error("Chain rejected block: {0}")]
    Chain(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
