use thiserror::Error;

/// Errors from the block and chain model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Wire text that does not parse into a block or chain.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Block {index} does not link to the chain tip (expected {expected}, got {got})")]
    LinkMismatch {
        index: u64,
        expected: String,
        got: String,
    },

    #[error("Block {index} failed validation")]
    InvalidBlock { index: u64 },
}

pub type CoreResult<T> = Result<T, CoreError>;
