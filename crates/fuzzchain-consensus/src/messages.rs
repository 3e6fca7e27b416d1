//! Typed protocol messages exchanged between nodes.

use serde::{Deserialize, Serialize};

/// Index of a node in the simulated network.
pub type NodeId = usize;

/// A block offered for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProposal {
    /// Block wire form.
    pub block_bytes: String,
    pub proposer_id: NodeId,
    /// Reputation the proposer claims for itself.
    pub proposer_reputation: f64,
    /// Position of this copy in the proposer's broadcast sequence.
    pub send_order: u32,
}

/// A receiver's verdict on a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub block_id: String,
    /// 1 for accept, 0 for reject.
    pub trust_value: u8,
    pub voter_id: NodeId,
}

impl Vote {
    pub fn new(block_id: impl Into<String>, accepted: bool, voter_id: NodeId) -> Self {
        Vote {
            block_id: block_id.into(),
            trust_value: u8::from(accepted),
            voter_id,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.trust_value > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    BlockProposal(BlockProposal),
    Vote(Vote),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::BlockProposal(_) => "BlockProposal",
            Message::Vote(_) => "Vote",
        }
    }
}
