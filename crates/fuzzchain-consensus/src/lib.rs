pub mod adversary;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod messages;
pub mod node;
pub mod reputation;
pub mod transport;
pub mod validity;
pub mod votes;

pub use adversary::{corrupt_payload, double_spend_payload, BehaviorProfile, CorruptionKind, NodeType};
pub use config::{DelayRange, NodeConfig};
pub use error::{ConsensusError, ConsensusResult};
pub use fuzzy::{Defuzzifier, FuzzySet, FuzzyTrustEngine, TrustEvaluation, DEFAULT_TRUST_THRESHOLD};
pub use messages::{BlockProposal, Message, NodeId, Vote};
pub use node::{Node, NodeReport, NodeStats, ProposalDecision};
pub use reputation::ReputationBook;
pub use transport::Transport;
pub use validity::{assess_block, ValidityReport};
pub use votes::{BlockTally, VoteTally};
