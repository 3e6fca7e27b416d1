//! End-of-run summary shared by both runtimes.

use fuzzchain_consensus::{Node, NodeId, NodeReport};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::RuntimeKind;

/// Delivery counters kept by a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub timers_fired: u64,
    pub messages_delivered: u64,
    /// Simulated time of the last processed event.
    pub last_event_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub runtime: RuntimeKind,
    pub seed: u64,
    pub duration_ms: u64,
    pub delivery: DeliveryStats,
    /// Chains adopted during the closing sync pass.
    pub chains_adopted: usize,
    /// Mean reputation honest nodes hold for honest peers.
    pub honest_view_of_honest: f64,
    /// Mean reputation honest nodes hold for Byzantine peers.
    pub honest_view_of_byzantine: f64,
    pub nodes: Vec<NodeReport>,
}

impl SimulationReport {
    pub fn from_nodes(
        runtime: RuntimeKind,
        seed: u64,
        duration_ms: u64,
        delivery: DeliveryStats,
        chains_adopted: usize,
        nodes: &[Node],
    ) -> Self {
        let byzantine: Vec<NodeId> = nodes
            .iter()
            .filter(|n| n.node_type().is_byzantine())
            .map(|n| n.id())
            .collect();
        let honest: Vec<&Node> = nodes.iter().filter(|n| !n.node_type().is_byzantine()).collect();

        let mut honest_scores = Vec::new();
        let mut byzantine_scores = Vec::new();
        for observer in &honest {
            for (peer, score) in observer.reputation().iter() {
                if peer == observer.id() {
                    continue;
                }
                if byzantine.contains(&peer) {
                    byzantine_scores.push(score);
                } else {
                    honest_scores.push(score);
                }
            }
        }

        SimulationReport {
            runtime,
            seed,
            duration_ms,
            delivery,
            chains_adopted,
            honest_view_of_honest: mean(&honest_scores),
            honest_view_of_byzantine: mean(&byzantine_scores),
            nodes: nodes.iter().map(Node::report).collect(),
        }
    }

    pub fn honest_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| !n.node_type.is_byzantine())
    }

    pub fn byzantine_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| n.node_type.is_byzantine())
    }

    pub fn longest_chain(&self) -> usize {
        self.nodes.iter().map(|n| n.chain_length).max().unwrap_or(0)
    }

    /// Share of honest nodes whose tip is the most common honest tip.
    pub fn honest_agreement(&self) -> f64 {
        let mut tips: HashMap<&str, usize> = HashMap::new();
        let mut total = 0;
        for node in self.honest_nodes() {
            *tips.entry(node.tip.as_str()).or_default() += 1;
            total += 1;
        }
        match tips.values().max() {
            Some(best) if total > 0 => *best as f64 / total as f64,
            _ => 0.0,
        }
    }

    pub fn all_chains_valid(&self) -> bool {
        self.nodes.iter().all(|n| n.chain_valid)
    }

    pub fn total_accepted(&self) -> u64 {
        self.nodes.iter().map(|n| n.stats.blocks_accepted).sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.nodes.iter().map(|n| n.stats.blocks_rejected).sum()
    }

    pub fn total_byzantine_detected(&self) -> u64 {
        self.nodes.iter().map(|n| n.stats.byzantine_detected).sum()
    }

    pub fn total_forged_blocks(&self) -> u64 {
        self.nodes.iter().map(|n| n.stats.forged_blocks_sent).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FuzzChain run: runtime={} seed={} simulated={}ms timers={} messages={}",
            self.runtime,
            self.seed,
            self.duration_ms,
            self.delivery.timers_fired,
            self.delivery.messages_delivered
        )?;
        writeln!(
            f,
            "{:>4}  {:<13} {:>5} {:>5} {:>6} {:>6} {:>6} {:>6} {:>6} {:>7}",
            "node", "type", "chain", "valid", "mined", "forged", "accept", "reject", "detect", "own_rep"
        )?;
        for n in &self.nodes {
            writeln!(
                f,
                "{:>4}  {:<13} {:>5} {:>5} {:>6} {:>6} {:>6} {:>6} {:>6} {:>7.2}",
                n.id,
                n.node_type.as_str(),
                n.chain_length,
                if n.chain_valid { "yes" } else { "NO" },
                n.stats.blocks_mined,
                n.stats.forged_blocks_sent,
                n.stats.blocks_accepted,
                n.stats.blocks_rejected,
                n.stats.byzantine_detected,
                n.own_reputation
            )?;
        }
        writeln!(
            f,
            "longest chain {} | honest tip agreement {:.0}% | chains adopted at sync {}",
            self.longest_chain(),
            self.honest_agreement() * 100.0,
            self.chains_adopted
        )?;
        write!(
            f,
            "accepted {} | rejected {} | byzantine detections {} | honest view: honest {:.3}, byzantine {:.3}",
            self.total_accepted(),
            self.total_rejected(),
            self.total_byzantine_detected(),
            self.honest_view_of_honest,
            self.honest_view_of_byzantine
        )
    }
}
