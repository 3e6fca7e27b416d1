// PROOF-OF-WORK MINING ENGINE
// Bounded linear nonce search over the block's mining hash.
//
// SAFETY CONSTRAINTS:
// 1. The search is bounded by max_attempts; it never loops forever
// 2. The block's nonce is written only on success
// 3. Elapsed time is measured for statistics only and never drives scheduling

use fuzzchain_crypto::{hash_rate, is_hash_valid, target, HashAlgorithm};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::block::Block;

/// Default difficulty in leading hex zeros.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Default upper bound on nonces tried per mining call.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 100_000;

/// Attempts between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 5_000;

/// Outcome of one mining call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    pub success: bool,
    /// Winning nonce, or the last nonce tried on failure.
    pub nonce: u64,
    /// Digest at `nonce`.
    pub digest: String,
    pub attempts: u64,
    pub elapsed_ms: u64,
    /// Hashes per second over the whole call.
    pub hash_rate: f64,
}

/// Proof-of-work search at a fixed difficulty.
#[derive(Debug, Clone)]
pub struct MiningEngine {
    difficulty: usize,
    max_attempts: u64,
    algorithm: HashAlgorithm,
}

impl Default for MiningEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY, DEFAULT_MAX_ATTEMPTS)
    }
}

impl MiningEngine {
    /// # Arguments
    /// * `difficulty` - Required leading zeros in the hex digest
    /// * `max_attempts` - Upper bound on nonces tried per call
    pub fn new(difficulty: usize, max_attempts: u64) -> Self {
        MiningEngine {
            difficulty,
            max_attempts,
            algorithm: HashAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn max_attempts(&self) -> u64 {
        self.max_attempts
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Target string for the configured difficulty.
    pub fn target(&self) -> String {
        target(self.difficulty)
    }

    /// Search nonces `0..max_attempts` for a digest meeting the difficulty.
    ///
    /// # Returns
    /// A `MiningResult`; on success the winning nonce has been written to `block`.
    pub fn mine(&self, block: &mut Block) -> MiningResult {
        let started = Instant::now();
        let prefix = block.mining_preimage_prefix();
        let mut digest = String::new();
        let mut nonce = 0u64;
        let mut attempts = 0u64;

        debug!(
            "Mining block {} at difficulty {} (target {})",
            block.index(),
            self.difficulty,
            self.target()
        );

        while attempts < self.max_attempts {
            nonce = attempts;
            digest = self
                .algorithm
                .digest_hex(format!("{}{}", prefix, nonce).as_bytes());
            attempts += 1;

            if is_hash_valid(&digest, self.difficulty) {
                block.set_nonce(nonce);
                let result = self.result(true, nonce, digest, attempts, started);
                info!(
                    "Block {} mined: nonce={}, attempts={}, {:.0} H/s, hash={}",
                    block.index(),
                    nonce,
                    attempts,
                    result.hash_rate,
                    &result.digest[..16]
                );
                return result;
            }

            if attempts % PROGRESS_INTERVAL == 0 {
                debug!("Mining block {}: {} attempts", block.index(), attempts);
            }
        }

        warn!(
            "Mining exhausted for block {} after {} attempts at difficulty {}",
            block.index(),
            attempts,
            self.difficulty
        );
        self.result(false, nonce, digest, attempts, started)
    }

    /// Recompute the digest at the block's stored nonce and check the difficulty.
    pub fn validate_mined_block(&self, block: &Block) -> bool {
        is_hash_valid(&block.mining_hash_with(self.algorithm), self.difficulty)
    }

    fn result(
        &self,
        success: bool,
        nonce: u64,
        digest: String,
        attempts: u64,
        started: Instant,
    ) -> MiningResult {
        let elapsed = started.elapsed();
        MiningResult {
            success,
            nonce,
            digest,
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
            hash_rate: hash_rate(attempts, elapsed.as_secs_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mine_low_difficulty() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut block = Block::create(1, "payload", "0", &mut rng);
        let engine = MiningEngine::new(2, 100_000);

        let result = engine.mine(&mut block);
        assert!(result.success);
        assert_eq!(block.nonce(), result.nonce);
        assert!(result.digest.starts_with("00"));
        assert_eq!(result.digest, block.mining_hash());
        assert_eq!(result.attempts, result.nonce + 1);
        assert!(engine.validate_mined_block(&block));
    }

    #[test]
    fn test_mine_exhaustion_leaves_nonce() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut block = Block::create(1, "payload", "0", &mut rng);
        // 64 leading zeros is unreachable.
        let engine = MiningEngine::new(64, 50);

        let result = engine.mine(&mut block);
        assert!(!result.success);
        assert_eq!(result.attempts, 50);
        assert_eq!(result.nonce, 49);
        assert_eq!(block.nonce(), 0);
    }

    #[test]
    fn test_zero_attempts() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut block = Block::create(1, "payload", "0", &mut rng);
        let result = MiningEngine::new(1, 0).mine(&mut block);
        assert!(!result.success);
        assert_eq!(result.attempts, 0);
    }

    #[test]
    fn test_sha3_engine_agrees_with_block_hash() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut block = Block::create(2, "sha3 payload", "0", &mut rng);
        let engine = MiningEngine::new(2, 100_000).with_algorithm(HashAlgorithm::Sha3_256);

        let result = engine.mine(&mut block);
        assert!(result.success);
        assert_eq!(result.digest, block.mining_hash_with(HashAlgorithm::Sha3_256));
        assert!(engine.validate_mined_block(&block));
    }

    #[test]
    fn test_default_target() {
        let engine = MiningEngine::default();
        assert!(engine.target().starts_with("0000f"));
        assert_eq!(engine.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }
}
