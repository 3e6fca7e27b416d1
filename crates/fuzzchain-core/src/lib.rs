pub mod block;
pub mod blockchain;
pub mod error;
pub mod mining;

pub use block::{
    session_commitment, Block, DecryptResult, BLOCK_VALIDITY_DIFFICULTY, GENESIS_PAYLOAD,
    GENESIS_PREVIOUS_REF,
};
pub use blockchain::Blockchain;
pub use error::{CoreError, CoreResult};
pub use mining::{MiningEngine, MiningResult, DEFAULT_DIFFICULTY, DEFAULT_MAX_ATTEMPTS};
