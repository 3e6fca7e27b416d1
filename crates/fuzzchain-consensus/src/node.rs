// FUZZY-TRUST CONSENSUS NODE
// One participant: proposes and mines blocks, evaluates peers' proposals with
// the fuzzy engine, votes, and keeps its own chain and reputation view.
//
// SAFETY INVARIANTS:
// 1. All node state is single-writer: only the node's own handlers mutate it
// 2. Every random draw comes from the node's seeded RNG
// 3. No per-message failure is fatal; malformed input lowers the sender's reputation
// 4. A block enters the local chain only through validated append or
//    longest-valid-chain replacement
// 5. A vote is counted at most once per (block, voter)

use fuzzchain_core::{Block, Blockchain, MiningEngine};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;

use crate::adversary::{bernoulli, corrupt_payload, double_spend_payload, NodeType};
use crate::config::NodeConfig;
use crate::error::{ConsensusError, ConsensusResult};
use crate::fuzzy::{clamp_unit, FuzzyTrustEngine};
use crate::messages::{BlockProposal, Message, NodeId, Vote};
use crate::reputation::ReputationBook;
use crate::transport::Transport;
use crate::validity::assess_block;
use crate::votes::VoteTally;

/// Validity below which a rejected proposal counts as detected misbehavior.
const BYZANTINE_VALIDITY_CUTOFF: f64 = 0.5;

/// Counters kept by every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeStats {
    pub rounds: u64,
    pub blocks_proposed: u64,
    pub blocks_mined: u64,
    pub mining_failures: u64,
    pub mining_attempts: u64,
    pub mining_time_ms: u64,
    pub forged_blocks_sent: u64,
    pub blocks_accepted: u64,
    pub blocks_rejected: u64,
    /// Accepted blocks that did not link onto the local tip.
    pub blocks_orphaned: u64,
    pub byzantine_detected: u64,
    pub malformed_messages: u64,
    /// Proposals for blocks already on the local chain.
    pub duplicate_proposals: u64,
    pub votes_received: u64,
    pub duplicate_votes: u64,
    pub messages_dropped: u64,
}

impl NodeStats {
    /// Accepted share of evaluated proposals, 0 when none were evaluated.
    pub fn acceptance_rate(&self) -> f64 {
        let evaluated = self.blocks_accepted + self.blocks_rejected;
        if evaluated == 0 {
            0.0
        } else {
            self.blocks_accepted as f64 / evaluated as f64
        }
    }
}

/// Outcome of scoring one proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalDecision {
    pub block_id: String,
    pub proposer: NodeId,
    pub validity: f64,
    pub reputation_input: f64,
    pub consensus_input: f64,
    pub trust: f64,
    pub accepted: bool,
}

/// End-of-run summary of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub node_type: NodeType,
    pub chain_length: usize,
    pub chain_valid: bool,
    pub tip: String,
    pub own_reputation: f64,
    pub average_reputation: f64,
    pub stats: NodeStats,
}

pub struct Node {
    id: NodeId,
    node_type: NodeType,
    peers: Vec<NodeId>,
    config: NodeConfig,
    chain: Blockchain,
    miner: MiningEngine,
    engine: FuzzyTrustEngine,
    reputation: ReputationBook,
    votes: VoteTally,
    rng: StdRng,
    round: u64,
    sequence: u64,
    forged: Vec<String>,
    stats: NodeStats,
}

impl Node {
    /// # Arguments
    /// * `id` - This node's identifier
    /// * `node_type` - Honest or one of the Byzantine behaviors
    /// * `peers` - Every other node this one may address
    /// * `config` - Protocol constants
    /// * `seed` - Seed for the node's private RNG
    pub fn new(
        id: NodeId,
        node_type: NodeType,
        peers: Vec<NodeId>,
        config: NodeConfig,
        seed: u64,
    ) -> Self {
        let chain = Blockchain::with_params(config.difficulty, config.hash_algorithm);
        let miner = MiningEngine::new(config.difficulty, config.max_mining_attempts)
            .with_algorithm(config.hash_algorithm);
        let engine = FuzzyTrustEngine::new().with_defuzzifier(config.defuzzifier);
        let reputation = ReputationBook::new(
            config.initial_reputation,
            config.reputation_reward,
            config.reputation_penalty,
        )
        .with_nodes(peers.iter().copied().chain(std::iter::once(id)));

        Node {
            id,
            node_type,
            peers,
            config,
            chain,
            miner,
            engine,
            reputation,
            votes: VoteTally::new(),
            rng: StdRng::seed_from_u64(seed),
            round: 0,
            sequence: 0,
            forged: Vec::new(),
            stats: NodeStats::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn reputation(&self) -> &ReputationBook {
        &self.reputation
    }

    pub fn reputation_of(&self, node: NodeId) -> f64 {
        self.reputation.get(node)
    }

    pub fn votes(&self) -> &VoteTally {
        &self.votes
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Identifiers of every forged block this node has broadcast.
    pub fn forged_blocks(&self) -> &[String] {
        &self.forged
    }

    /// Logical clock: number of timer rounds seen so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    fn network_size(&self) -> usize {
        self.peers.len() + 1
    }

    /// Schedule the first proposal round.
    pub fn start(&mut self, transport: &mut dyn Transport) {
        let delay = self.config.first_round_delay(&mut self.rng);
        debug!("Node {} ({}) first round in {:?}", self.id, self.node_type, delay);
        transport.schedule_timer(self.id, delay);
    }

    /// Run one proposal round and schedule the next.
    pub fn on_timer(&mut self, transport: &mut dyn Transport) {
        self.round += 1;
        self.stats.rounds += 1;

        if self.node_type.should_participate(&mut self.rng) {
            self.sequence += 1;
            let payload = format!(
                "FuzzyBFT_Block_N{}_T{}_Data[Transaction_{}]",
                self.id, self.round, self.sequence
            );
            self.propose(&payload, transport);
        } else {
            debug!("Node {} ({}) sits out round {}", self.id, self.node_type, self.round);
        }

        let next = self.config.next_round_delay(&mut self.rng);
        transport.schedule_timer(self.id, next);
    }

    /// Dispatch an incoming message.
    pub fn on_message(&mut self, message: Message, transport: &mut dyn Transport) {
        if self.node_type.should_drop_message(&mut self.rng) {
            self.stats.messages_dropped += 1;
            debug!("Node {} ({}) dropped a {}", self.id, self.node_type, message.kind());
            return;
        }

        match message {
            Message::BlockProposal(proposal) => self.handle_proposal(proposal, transport),
            Message::Vote(vote) => self.handle_vote(vote),
        }
    }

    /// Propose `payload`, honestly or not depending on the node's behavior.
    ///
    /// # Returns
    /// Identifiers of the blocks that were built for broadcast.
    pub fn propose(&mut self, payload: &str, transport: &mut dyn Transport) -> Vec<String> {
        if self.node_type.should_send_invalid_block(&mut self.rng) {
            return self.propose_invalid(payload, transport);
        }

        // Byzantine nodes that skip forging this round mine an honest block.
        match self.propose_honest(payload, transport) {
            Ok(id) => vec![id],
            Err(e) => {
                warn!("Node {} skipped round {}: {}", self.id, self.round, e);
                Vec::new()
            }
        }
    }

    /// Build, mine, append and broadcast a block for `payload`.
    ///
    /// # Returns
    /// - `Ok(identifier)` once the block is on the local chain
    /// - `Err(MiningExhausted)` if no nonce was found within the bound
    pub fn propose_honest(
        &mut self,
        payload: &str,
        transport: &mut dyn Transport,
    ) -> ConsensusResult<String> {
        let index = self.chain.next_index();
        let mut block = Block::create(
            index,
            payload,
            self.chain.latest_block().identifier(),
            &mut self.rng,
        );
        self.stats.blocks_proposed += 1;

        let result = self.miner.mine(&mut block);
        self.stats.mining_attempts += result.attempts;
        self.stats.mining_time_ms += result.elapsed_ms;
        if !result.success {
            self.stats.mining_failures += 1;
            return Err(ConsensusError::MiningExhausted {
                index,
                attempts: result.attempts,
            });
        }
        self.stats.blocks_mined += 1;

        let id = block.identifier();
        let wire = block.serialize();
        self.chain.add_block(block)?;
        self.reputation.endorse(self.id);

        info!(
            "Node {} proposed block {} ({}) after {} attempts",
            self.id, index, id, result.attempts
        );
        self.broadcast(wire, transport);
        Ok(id)
    }

    fn propose_invalid(&mut self, payload: &str, transport: &mut dyn Transport) -> Vec<String> {
        let double_spend = match self.node_type {
            NodeType::DoubleSpend => true,
            NodeType::Random => self.rng.gen_bool(0.5),
            _ => false,
        };

        if double_spend {
            (0..2)
                .map(|_| {
                    self.sequence += 1;
                    let forged = double_spend_payload(self.id, self.sequence, self.round);
                    self.broadcast_forged(&forged, transport)
                })
                .collect()
        } else {
            let (kind, forged) = corrupt_payload(payload, self.id, self.round, &mut self.rng);
            debug!("Node {} forging payload with {:?}", self.id, kind);
            vec![self.broadcast_forged(&forged, transport)]
        }
    }

    /// Broadcast an unmined block for `payload` on top of the local tip,
    /// without appending it locally. The node's own reputation drops.
    pub fn broadcast_forged(&mut self, payload: &str, transport: &mut dyn Transport) -> String {
        let block = Block::create(
            self.chain.next_index(),
            payload,
            self.chain.latest_block().identifier(),
            &mut self.rng,
        );
        let id = block.identifier();

        self.reputation.penalize(self.id);
        self.stats.blocks_proposed += 1;
        self.stats.forged_blocks_sent += 1;
        info!(
            "Node {} ({}) broadcasting forged block {}",
            self.id, self.node_type, id
        );

        self.broadcast(block.serialize(), transport);
        self.forged.push(id.clone());
        id
    }

    /// Send `block_bytes` to up to `max_broadcasts_per_round` random peers,
    /// spaced by `send_spacing_ms` per position.
    fn broadcast(&mut self, block_bytes: String, transport: &mut dyn Transport) -> usize {
        let byzantine = self.node_type.is_byzantine();
        let probability = if byzantine {
            self.config.byzantine_broadcast_probability
        } else {
            self.config.honest_broadcast_probability
        };
        if !bernoulli(&mut self.rng, probability) {
            debug!("Node {} withheld its broadcast this round", self.id);
            return 0;
        }

        let own = self.reputation.get(self.id);
        let claimed = self.node_type.misreport_reputation(own, &mut self.rng);

        let targets: Vec<NodeId> = self
            .peers
            .choose_multiple(&mut self.rng, self.config.max_broadcasts_per_round)
            .copied()
            .collect();

        for (order, to) in targets.iter().enumerate() {
            let mut delay = Duration::from_millis(self.config.send_spacing_ms * order as u64);
            if self.node_type.should_delay_message(&mut self.rng) {
                delay += self.config.adversarial_delay.sample(&mut self.rng);
            }

            let proposal = BlockProposal {
                block_bytes: block_bytes.clone(),
                proposer_id: self.id,
                proposer_reputation: claimed,
                send_order: order as u32,
            };
            transport.send(self.id, *to, Message::BlockProposal(proposal), delay);
        }

        targets.len()
    }

    /// Score a proposal for `block`.
    ///
    /// Validity comes from [`assess_block`]; reputation blends the locally
    /// observed score with the proposer's claim; consensus comes from the
    /// vote tally. A Byzantine evaluator distorts its inputs first.
    pub fn evaluate_proposal(&mut self, block: &Block, proposal: &BlockProposal) -> ProposalDecision {
        let block_id = block.identifier();
        let report = assess_block(block, self.config.difficulty, self.config.hash_algorithm);

        let observed = self.reputation.get(proposal.proposer_id);
        let weight = self.config.self_report_weight;
        let mut reputation_input = clamp_unit(
            (1.0 - weight) * observed + weight * clamp_unit(proposal.proposer_reputation),
        );
        let mut validity = report.score;
        let consensus_input = self.votes.consensus_estimate(
            &block_id,
            self.network_size(),
            self.config.consensus_sample_fraction,
        );

        if self.node_type.is_byzantine() {
            reputation_input = self
                .node_type
                .misreport_reputation(reputation_input, &mut self.rng);
            validity = self.node_type.misreport_validity(validity, &mut self.rng);
        }

        let trust = self.engine.evaluate(reputation_input, validity, consensus_input);
        let accepted = trust >= self.config.trust_threshold;

        debug!(
            "Node {} on {} from {}: validity={:.3} (pow={}, markers={:?}) rep={:.3} cons={:.3} trust={:.3}",
            self.id,
            block_id,
            proposal.proposer_id,
            validity,
            report.proof_of_work,
            report.markers,
            reputation_input,
            consensus_input,
            trust
        );

        ProposalDecision {
            block_id,
            proposer: proposal.proposer_id,
            validity,
            reputation_input,
            consensus_input,
            trust,
            accepted,
        }
    }

    fn handle_proposal(&mut self, proposal: BlockProposal, transport: &mut dyn Transport) {
        let block = match Block::deserialize(&proposal.block_bytes) {
            Ok(block) => block,
            Err(e) => {
                warn!(
                    "Node {} rejected proposal from {}: {}",
                    self.id, proposal.proposer_id, e
                );
                self.stats.malformed_messages += 1;
                self.stats.blocks_rejected += 1;
                self.stats.byzantine_detected += 1;
                self.reputation.penalize(proposal.proposer_id);
                return;
            }
        };

        if self.chain.contains(&block.identifier()) {
            self.stats.duplicate_proposals += 1;
            debug!(
                "Node {} already holds {} from {}, not voting",
                self.id,
                block.identifier(),
                proposal.proposer_id
            );
            return;
        }

        let decision = self.evaluate_proposal(&block, &proposal);

        if decision.accepted {
            self.stats.blocks_accepted += 1;
            let score = self.reputation.endorse(decision.proposer);
            info!(
                "Node {} ACCEPTED {} from {} (trust {:.3}, reputation -> {:.2})",
                self.id, decision.block_id, decision.proposer, decision.trust, score
            );

            if let Err(e) = self.chain.add_block(block) {
                self.stats.blocks_orphaned += 1;
                debug!("Node {} could not append {}: {}", self.id, decision.block_id, e);
            }
        } else {
            self.stats.blocks_rejected += 1;
            if decision.validity < BYZANTINE_VALIDITY_CUTOFF {
                self.stats.byzantine_detected += 1;
            }
            let score = self.reputation.penalize(decision.proposer);
            info!(
                "Node {} REJECTED {} from {} (trust {:.3}, reputation -> {:.2})",
                self.id, decision.block_id, decision.proposer, decision.trust, score
            );
        }

        self.send_votes(&decision.block_id, decision.accepted, transport);
    }

    fn send_votes(&mut self, block_id: &str, accepted: bool, transport: &mut dyn Transport) {
        let targets: Vec<NodeId> = self
            .peers
            .choose_multiple(&mut self.rng, self.config.vote_fanout)
            .copied()
            .collect();

        for to in targets {
            let delay = self.config.vote_delay.sample(&mut self.rng);
            let vote = Vote::new(block_id, accepted, self.id);
            transport.send(self.id, to, Message::Vote(vote), delay);
        }
    }

    fn handle_vote(&mut self, vote: Vote) {
        self.stats.votes_received += 1;
        if !self.votes.record(&vote) {
            self.stats.duplicate_votes += 1;
            debug!(
                "Node {} ignored duplicate vote from {} on {}",
                self.id, vote.voter_id, vote.block_id
            );
        }
    }

    /// Offer a peer's chain in wire form; adopted iff strictly longer and valid.
    pub fn offer_chain(&mut self, chain_bytes: &str) -> bool {
        match Blockchain::deserialize(chain_bytes) {
            Ok(blocks) => self.chain.replace_chain(blocks),
            Err(e) => {
                warn!("Node {} ignored offered chain: {}", self.id, e);
                false
            }
        }
    }

    pub fn report(&self) -> NodeReport {
        NodeReport {
            id: self.id,
            node_type: self.node_type,
            chain_length: self.chain.len(),
            chain_valid: self.chain.is_chain_valid(),
            tip: self.chain.latest_block().identifier(),
            own_reputation: self.reputation.get(self.id),
            average_reputation: self.reputation.average(),
            stats: self.stats.clone(),
        }
    }
}
