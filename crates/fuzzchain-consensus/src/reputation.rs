//! Per-peer reputation as observed by one node.

use std::collections::BTreeMap;

use crate::fuzzy::clamp_unit;
use crate::messages::NodeId;

/// Starting score for every peer.
pub const INITIAL_REPUTATION: f64 = 0.5;
/// Increment for endorsed behavior.
pub const REPUTATION_REWARD: f64 = 0.03;
/// Decrement for rejected or faulty behavior.
pub const REPUTATION_PENALTY: f64 = 0.08;

/// Scores in [0, 1], keyed by node. Unknown peers read as the initial score.
#[derive(Debug, Clone)]
pub struct ReputationBook {
    scores: BTreeMap<NodeId, f64>,
    initial: f64,
    reward: f64,
    penalty: f64,
}

impl Default for ReputationBook {
    fn default() -> Self {
        Self::new(INITIAL_REPUTATION, REPUTATION_REWARD, REPUTATION_PENALTY)
    }
}

impl ReputationBook {
    pub fn new(initial: f64, reward: f64, penalty: f64) -> Self {
        ReputationBook {
            scores: BTreeMap::new(),
            initial: clamp_unit(initial),
            reward,
            penalty,
        }
    }

    /// Seed an entry for each of `nodes` at the initial score.
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        for node in nodes {
            self.scores.entry(node).or_insert(self.initial);
        }
        self
    }

    pub fn get(&self, node: NodeId) -> f64 {
        self.scores.get(&node).copied().unwrap_or(self.initial)
    }

    /// Raise `node` by the reward; returns the new score.
    pub fn endorse(&mut self, node: NodeId) -> f64 {
        self.adjust(node, self.reward)
    }

    /// Lower `node` by the penalty; returns the new score.
    pub fn penalize(&mut self, node: NodeId) -> f64 {
        self.adjust(node, -self.penalty)
    }

    fn adjust(&mut self, node: NodeId, delta: f64) -> f64 {
        let score = self.scores.entry(node).or_insert(self.initial);
        *score = clamp_unit(*score + delta);
        *score
    }

    /// Mean over tracked peers, or the initial score if none are tracked.
    pub fn average(&self) -> f64 {
        if self.scores.is_empty() {
            return self.initial;
        }
        self.scores.values().sum::<f64>() / self.scores.len() as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.scores.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
