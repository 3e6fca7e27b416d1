//! Block validity score fed into the fuzzy engine.

use fuzzchain_core::{Block, DecryptResult};
use fuzzchain_crypto::{is_hash_valid, HashAlgorithm};
use serde::Serialize;

use crate::fuzzy::clamp_unit;

/// Multiplier when the mining hash misses the difficulty.
pub const POW_FAILURE_FACTOR: f64 = 0.1;

/// Multiplier for a block that carries no payload.
pub const EMPTY_PAYLOAD_FACTOR: f64 = 0.4;

/// Plaintext markers left by forged payloads, with their multipliers.
pub const CONTENT_MARKERS: [(&str, f64); 5] = [
    ("CORRUPT", 0.1),
    ("MALICIOUS", 0.1),
    ("FAKE", 0.0),
    ("DOUBLE_SPEND", 0.0),
    ("SCRAMBLED", 0.2),
];

/// Breakdown of a validity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidityReport {
    pub score: f64,
    pub well_formed: bool,
    pub proof_of_work: bool,
    /// Markers found in the plaintext; empty when the plaintext is unreadable.
    pub markers: Vec<&'static str>,
}

/// Score `block` in [0, 1].
///
/// A malformed envelope scores 0. Otherwise the score starts at 1 and is
/// multiplied by each applicable factor: missing PoW, empty payload, and
/// (when the plaintext can be read) every content marker present.
pub fn assess_block(block: &Block, difficulty: usize, algorithm: HashAlgorithm) -> ValidityReport {
    if !block.has_well_formed_envelope() {
        return ValidityReport {
            score: 0.0,
            well_formed: false,
            proof_of_work: false,
            markers: Vec::new(),
        };
    }

    let mut score = 1.0;

    let proof_of_work = is_hash_valid(&block.mining_hash_with(algorithm), difficulty);
    if !proof_of_work {
        score *= POW_FAILURE_FACTOR;
    }

    if block.ciphertext().is_empty() {
        score *= EMPTY_PAYLOAD_FACTOR;
    }

    let mut markers = Vec::new();
    if let DecryptResult::Ok(text) = block.data() {
        for (marker, factor) in CONTENT_MARKERS {
            if text.contains(marker) {
                markers.push(marker);
                score *= factor;
            }
        }
    }

    ValidityReport {
        score: clamp_unit(score),
        well_formed: true,
        proof_of_work,
        markers,
    }
}
