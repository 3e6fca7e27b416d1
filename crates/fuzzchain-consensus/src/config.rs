//! Protocol constants for a single node.

use fuzzchain_core::{DEFAULT_DIFFICULTY, DEFAULT_MAX_ATTEMPTS};
use fuzzchain_crypto::{HashAlgorithm, DIGEST_HEX_LEN};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConsensusError, ConsensusResult};
use crate::fuzzy::{Defuzzifier, DEFAULT_TRUST_THRESHOLD};
use crate::reputation::{INITIAL_REPUTATION, REPUTATION_PENALTY, REPUTATION_REWARD};

/// Uniform delay window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        DelayRange { min_ms, max_ms }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Minimum defuzzified trust to accept a block.
    pub trust_threshold: f64,
    pub defuzzifier: Defuzzifier,

    /// Leading hex zeros required of a mining hash.
    pub difficulty: usize,
    pub max_mining_attempts: u64,
    pub hash_algorithm: HashAlgorithm,

    /// Nominal time between proposal rounds.
    pub mining_interval_ms: u64,
    /// Extra delay before the first round, on top of one interval.
    pub startup_delay: DelayRange,
    /// Each subsequent interval is scaled by a factor drawn from this range.
    pub interval_jitter_min: f64,
    pub interval_jitter_max: f64,

    pub max_broadcasts_per_round: usize,
    /// Spacing between successive copies of one broadcast.
    pub send_spacing_ms: u64,
    pub honest_broadcast_probability: f64,
    pub byzantine_broadcast_probability: f64,
    /// Extra delay when the adversary model delays a send.
    pub adversarial_delay: DelayRange,

    /// Peers each verdict is sent to.
    pub vote_fanout: usize,
    pub vote_delay: DelayRange,
    /// Fraction of the network whose votes give full confidence.
    pub consensus_sample_fraction: f64,

    /// Weight of the proposer's self-reported reputation in the fuzzy input.
    pub self_report_weight: f64,
    pub initial_reputation: f64,
    pub reputation_reward: f64,
    pub reputation_penalty: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            trust_threshold: DEFAULT_TRUST_THRESHOLD,
            defuzzifier: Defuzzifier::Centroid,
            difficulty: DEFAULT_DIFFICULTY,
            max_mining_attempts: DEFAULT_MAX_ATTEMPTS,
            hash_algorithm: HashAlgorithm::Sha256,
            mining_interval_ms: 10_000,
            startup_delay: DelayRange::new(2_000, 8_000),
            interval_jitter_min: 0.7,
            interval_jitter_max: 1.3,
            max_broadcasts_per_round: 8,
            send_spacing_ms: 500,
            honest_broadcast_probability: 0.8,
            byzantine_broadcast_probability: 0.6,
            adversarial_delay: DelayRange::new(100, 300),
            vote_fanout: 2,
            vote_delay: DelayRange::new(100, 300),
            consensus_sample_fraction: 0.1,
            self_report_weight: 0.2,
            initial_reputation: INITIAL_REPUTATION,
            reputation_reward: REPUTATION_REWARD,
            reputation_penalty: REPUTATION_PENALTY,
        }
    }
}

impl NodeConfig {
    /// Reject settings the protocol cannot run with.
    pub fn validate(&self) -> ConsensusResult<()> {
        let unit_fields = [
            ("trust_threshold", self.trust_threshold),
            ("honest_broadcast_probability", self.honest_broadcast_probability),
            ("byzantine_broadcast_probability", self.byzantine_broadcast_probability),
            ("self_report_weight", self.self_report_weight),
            ("initial_reputation", self.initial_reputation),
            ("reputation_reward", self.reputation_reward),
            ("reputation_penalty", self.reputation_penalty),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConsensusError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.difficulty == 0 || self.difficulty > DIGEST_HEX_LEN {
            return Err(ConsensusError::InvalidConfig(format!(
                "difficulty must be in 1..={}, got {}",
                DIGEST_HEX_LEN, self.difficulty
            )));
        }
        if self.mining_interval_ms == 0 {
            return Err(ConsensusError::InvalidConfig(
                "mining_interval_ms must be positive".to_string(),
            ));
        }
        if !(self.interval_jitter_min > 0.0 && self.interval_jitter_min <= self.interval_jitter_max) {
            return Err(ConsensusError::InvalidConfig(format!(
                "interval jitter range [{}, {}] is invalid",
                self.interval_jitter_min, self.interval_jitter_max
            )));
        }
        if self.consensus_sample_fraction <= 0.0 {
            return Err(ConsensusError::InvalidConfig(
                "consensus_sample_fraction must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before a node's first round.
    pub fn first_round_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.startup_delay.sample(rng) + Duration::from_millis(self.mining_interval_ms)
    }

    /// Jittered delay until the next round.
    pub fn next_round_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let factor = if self.interval_jitter_max > self.interval_jitter_min {
            rng.gen_range(self.interval_jitter_min..self.interval_jitter_max)
        } else {
            self.interval_jitter_min
        };
        Duration::from_millis(self.mining_interval_ms).mul_f64(factor)
    }
}
