use fuzzchain_consensus::{ConsensusError, NodeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Protocol(#[from] ConsensusError),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Node {0} is not part of the network")]
    UnknownNode(NodeId),

    #[error("Actor for node {node} failed: {reason}")]
    ActorFailed { node: NodeId, reason: String },

    #[error("Event loop task failed: {0}")]
    EventLoopFailed(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
