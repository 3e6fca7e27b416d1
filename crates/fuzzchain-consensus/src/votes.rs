//! Vote bookkeeping and the network-consensus estimate derived from it.

use std::collections::{HashMap, HashSet};

use crate::messages::{NodeId, Vote};

/// Consensus value when nothing is known about a block.
pub const NEUTRAL_CONSENSUS: f64 = 0.5;

/// Votes seen for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTally {
    pub positive: u32,
    pub total: u32,
    voters: HashSet<NodeId>,
}

impl BlockTally {
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.positive) / f64::from(self.total))
    }

    pub fn has_voted(&self, voter: NodeId) -> bool {
        self.voters.contains(&voter)
    }
}

/// Tallies keyed by block identifier, at most one vote per (block, voter).
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    tallies: HashMap<String, BlockTally>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `vote` unless its voter already voted on that block.
    ///
    /// # Returns
    /// `true` if the vote was counted, `false` for a duplicate.
    pub fn record(&mut self, vote: &Vote) -> bool {
        let tally = self.tallies.entry(vote.block_id.clone()).or_default();
        if !tally.voters.insert(vote.voter_id) {
            return false;
        }
        tally.total += 1;
        if vote.is_positive() {
            tally.positive += 1;
        }
        true
    }

    pub fn tally(&self, block_id: &str) -> Option<&BlockTally> {
        self.tallies.get(block_id)
    }

    /// Number of blocks with at least one vote.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Confidence-weighted agreement on `block_id`.
    ///
    /// `ratio * conf + 0.5 * (1 - conf)` with
    /// `conf = min(1, total / (network_size * sample_fraction))`.
    /// A block with no votes yields 0.5.
    pub fn consensus_estimate(&self, block_id: &str, network_size: usize, sample_fraction: f64) -> f64 {
        let Some(tally) = self.tally(block_id) else {
            return NEUTRAL_CONSENSUS;
        };
        let Some(ratio) = tally.ratio() else {
            return NEUTRAL_CONSENSUS;
        };

        let expected = network_size as f64 * sample_fraction;
        let confidence = if expected > 0.0 {
            (f64::from(tally.total) / expected).min(1.0)
        } else {
            1.0
        };

        ratio * confidence + NEUTRAL_CONSENSUS * (1.0 - confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_duplicate_vote_counted_once() {
        let mut votes = VoteTally::new();
        assert!(votes.record(&Vote::new("1_5_abc", true, 3)));
        assert!(!votes.record(&Vote::new("1_5_abc", true, 3)));
        assert!(!votes.record(&Vote::new("1_5_abc", false, 3)));

        let tally = votes.tally("1_5_abc").unwrap();
        assert_eq!(tally.total, 1);
        assert_eq!(tally.positive, 1);
        assert!(tally.has_voted(3));
    }

    #[test]
    fn test_same_voter_different_blocks() {
        let mut votes = VoteTally::new();
        assert!(votes.record(&Vote::new("a", true, 1)));
        assert!(votes.record(&Vote::new("b", false, 1)));
        assert_eq!(votes.len(), 2);
    }

    #[test]
    fn test_consensus_without_votes_is_neutral() {
        let votes = VoteTally::new();
        assert_eq!(votes.consensus_estimate("missing", 20, 0.1), 0.5);
    }

    #[test]
    fn test_consensus_confidence_weighting() {
        let mut votes = VoteTally::new();
        votes.record(&Vote::new("b", true, 1));
        // One of the two expected votes: conf = 0.5.
        assert_abs_diff_eq!(votes.consensus_estimate("b", 20, 0.1), 0.75, epsilon = 1e-12);

        votes.record(&Vote::new("b", false, 2));
        votes.record(&Vote::new("b", true, 4));
        // Full confidence, ratio 2/3.
        assert_abs_diff_eq!(votes.consensus_estimate("b", 20, 0.1), 2.0 / 3.0, epsilon = 1e-12);
    }
}
