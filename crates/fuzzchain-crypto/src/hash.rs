//! Hex-digest hashing and proof-of-work target helpers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;

/// Length of every supported digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// Digest algorithm behind [`hash`]. Both variants produce 64 hex characters,
/// so difficulty targets are interchangeable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha3_256,
}

impl HashAlgorithm {
    /// Lowercase hex digest of `data`.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Sha3_256 => hex::encode(Sha3_256::digest(data)),
        }
    }
}

/// Hash with the default algorithm (SHA-256).
pub fn hash(data: impl AsRef<[u8]>) -> String {
    HashAlgorithm::default().digest_hex(data.as_ref())
}

/// True iff the first `difficulty` characters of `digest` are all `'0'`.
/// A digest shorter than the difficulty never qualifies.
pub fn is_hash_valid(digest: &str, difficulty: usize) -> bool {
    digest.len() >= difficulty && digest.bytes().take(difficulty).all(|b| b == b'0')
}

/// Human-readable target: `difficulty` zeros padded with `f` to digest length.
pub fn target(difficulty: usize) -> String {
    let zeros = difficulty.min(DIGEST_HEX_LEN);
    format!("{}{}", "0".repeat(zeros), "f".repeat(DIGEST_HEX_LEN - zeros))
}

/// Hashes per second; zero when no time has elapsed.
pub fn hash_rate(attempts: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        attempts as f64 / seconds
    } else {
        0.0
    }
}
