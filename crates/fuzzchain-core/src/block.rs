// ENCRYPTED BLOCK MODEL
// A block carries only ciphertext on the wire; plaintext is recoverable solely
// by the process that created it and still holds the key pair.
//
// SAFETY INVARIANTS:
// 1. The ciphertext decrypts, under the originating key pair, to the payload
// 2. The wire form never carries plaintext, the private exponent or the session value
// 3. The identifier depends only on wire fields, so it survives re-serialization
// 4. The nonce is written only by the mining engine

use fuzzchain_crypto::{
    decrypt, encrypt, hash, is_hash_valid, random_in_range, Ciphertext, HashAlgorithm, KeyPair,
    PublicKey, DIGEST_HEX_LEN,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Payload of block 0.
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// Previous-reference sentinel carried by block 0.
pub const GENESIS_PREVIOUS_REF: &str = "0";

/// Difficulty used by [`Block::is_valid`].
pub const BLOCK_VALIDITY_DIFFICULTY: usize = 4;

/// Seed of the genesis key pair. Every node derives the same genesis block,
/// so blocks proposed anywhere link onto any honest chain.
const GENESIS_SEED: u64 = 0x4655_5a5a_5942_4654;

const SESSION_SALT: &str = "salt";
const SESSION_MARGIN: u64 = 100;
const IDENTIFIER_PREFIX_CHARS: usize = 20;
const WIRE_FIELDS: usize = 6;

/// Outcome of reading a block's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptResult {
    Ok(String),
    /// The block arrived over the wire and has no key pair.
    Unavailable,
    /// Key material is present but the ciphertext does not decode.
    Malformed(String),
}

/// Key material that exists only in the process that created the block.
#[derive(Clone)]
struct LocalSecrets {
    key_pair: KeyPair,
    session_value: u64,
}

/// One ledger entry.
#[derive(Clone)]
pub struct Block {
    pub(crate) index: u64,
    pub(crate) nonce: u64,
    pub(crate) ciphertext: Ciphertext,
    pub(crate) previous_ref: String,
    pub(crate) public_key: PublicKey,
    pub(crate) session_key_hash: String,
    secrets: Option<LocalSecrets>,
}

/// Hex commitment to a block's session value.
pub fn session_commitment(session_value: u64, index: u64) -> String {
    hash(format!("{}_{}_{}", session_value, index, SESSION_SALT))
}

impl Block {
    /// Create a block with a fresh key pair and session value.
    ///
    /// # Arguments
    /// * `index` - Height the block is meant for
    /// * `payload` - Plaintext to encrypt
    /// * `previous_ref` - Identifier of the block this one extends
    /// * `rng` - Caller-owned randomness source
    pub fn create<R: Rng + ?Sized>(
        index: u64,
        payload: &str,
        previous_ref: impl Into<String>,
        rng: &mut R,
    ) -> Self {
        let key_pair = KeyPair::generate(rng);
        let public_key = key_pair.public_key();
        let session_value =
            random_in_range(rng, SESSION_MARGIN, public_key.p - SESSION_MARGIN);
        let ciphertext = encrypt(payload.as_bytes(), session_value, &public_key);

        Block {
            index,
            nonce: 0,
            ciphertext,
            previous_ref: previous_ref.into(),
            public_key,
            session_key_hash: session_commitment(session_value, index),
            secrets: Some(LocalSecrets {
                key_pair,
                session_value,
            }),
        }
    }

    /// Block 0, identical on every node.
    pub fn genesis() -> Self {
        let mut rng = StdRng::seed_from_u64(GENESIS_SEED);
        Self::create(0, GENESIS_PAYLOAD, GENESIS_PREVIOUS_REF, &mut rng)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn previous_ref(&self) -> &str {
        &self.previous_ref
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn session_key_hash(&self) -> &str {
        &self.session_key_hash
    }

    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    /// Ciphertext in wire form.
    pub fn encrypted_payload(&self) -> String {
        self.ciphertext.to_string()
    }

    /// True if this process created the block and can read it.
    pub fn is_local(&self) -> bool {
        self.secrets.is_some()
    }

    /// Decrypt the payload with the block's own key pair.
    pub fn data(&self) -> DecryptResult {
        let Some(secrets) = &self.secrets else {
            return DecryptResult::Unavailable;
        };

        match decrypt(&self.ciphertext, &secrets.key_pair) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => DecryptResult::Ok(text),
                Err(e) => DecryptResult::Malformed(e.to_string()),
            },
            Err(e) => DecryptResult::Malformed(e.to_string()),
        }
    }

    /// Check the stored commitment against the session value. Foreign blocks
    /// cannot be checked and return `false`.
    pub fn verify_session_commitment(&self) -> bool {
        self.secrets
            .as_ref()
            .map(|s| session_commitment(s.session_value, self.index) == self.session_key_hash)
            .unwrap_or(false)
    }

    /// Identifier `"{index}_{nonce}_{first 20 chars of ciphertext}"`.
    pub fn identifier(&self) -> String {
        let prefix: String = self
            .encrypted_payload()
            .chars()
            .take(IDENTIFIER_PREFIX_CHARS)
            .collect();
        format!("{}_{}_{}", self.index, self.nonce, prefix)
    }

    /// Everything the mining hash covers except the nonce.
    pub fn mining_preimage_prefix(&self) -> String {
        format!(
            "{}|{}|{}|{}|",
            self.index, self.ciphertext, self.previous_ref, self.public_key
        )
    }

    /// Hash of `index|ciphertext|previous_ref|e1:e2:p|nonce` (SHA-256).
    pub fn mining_hash(&self) -> String {
        self.mining_hash_with(HashAlgorithm::default())
    }

    pub fn mining_hash_with(&self, algorithm: HashAlgorithm) -> String {
        let preimage = format!("{}{}", self.mining_preimage_prefix(), self.nonce);
        algorithm.digest_hex(preimage.as_bytes())
    }

    /// Well-formedness checks that need no key material.
    pub fn is_structurally_sound(&self) -> bool {
        !self.ciphertext.is_empty() && self.has_well_formed_envelope()
    }

    /// Structural checks other than payload presence: a link reference, a
    /// 64-hex session commitment, a sound public key and in-range ciphertext.
    pub fn has_well_formed_envelope(&self) -> bool {
        let p = self.public_key.p;
        !self.previous_ref.is_empty()
            && self.session_key_hash.len() == DIGEST_HEX_LEN
            && self.session_key_hash.bytes().all(|b| b.is_ascii_hexdigit())
            && self.public_key.is_well_formed()
            && self.ciphertext.blocks().iter().all(|b| b.in_range(p))
    }

    /// Validity at the default difficulty of 4.
    pub fn is_valid(&self) -> bool {
        self.is_valid_with(BLOCK_VALIDITY_DIFFICULTY, HashAlgorithm::default())
    }

    /// Validity predicate.
    ///
    /// Local blocks: payload decrypts to non-empty text, and either the nonce
    /// is still 0 or the mining hash meets `difficulty`.
    /// Foreign blocks: structurally sound and the mining hash meets
    /// `difficulty`, with no exemption for nonce 0.
    pub fn is_valid_with(&self, difficulty: usize, algorithm: HashAlgorithm) -> bool {
        let pow_ok = || is_hash_valid(&self.mining_hash_with(algorithm), difficulty);

        if self.is_local() {
            let readable = matches!(self.data(), DecryptResult::Ok(ref text) if !text.is_empty());
            readable && !self.ciphertext.is_empty() && (self.nonce == 0 || pow_ok())
        } else {
            self.is_structurally_sound() && pow_ok()
        }
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    /// Wire form `index|nonce|ciphertext|previous_ref|e1:e2:p|session_key_hash`.
    pub fn serialize(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.index,
            self.nonce,
            self.ciphertext,
            self.previous_ref,
            self.public_key,
            self.session_key_hash
        )
    }

    /// Parse the wire form. The result is a foreign block with no key pair.
    ///
    /// # Returns
    /// - `Err(MalformedMessage)` on a wrong field count or an unparsable field
    pub fn deserialize(text: &str) -> CoreResult<Self> {
        let fields: Vec<&str> = text.split('|').collect();
        if fields.len() != WIRE_FIELDS {
            return Err(CoreError::MalformedMessage(format!(
                "block has {} fields, expected {}",
                fields.len(),
                WIRE_FIELDS
            )));
        }

        let parse_u64 = |field: &str, name: &str| {
            field.parse::<u64>().map_err(|_| {
                CoreError::MalformedMessage(format!("{} is not an integer: {:?}", name, field))
            })
        };

        let ciphertext = fields[2]
            .parse::<Ciphertext>()
            .map_err(|e| CoreError::MalformedMessage(e.to_string()))?;
        let public_key = fields[4]
            .parse::<PublicKey>()
            .map_err(|e| CoreError::MalformedMessage(e.to_string()))?;

        Ok(Block {
            index: parse_u64(fields[0], "index")?,
            nonce: parse_u64(fields[1], "nonce")?,
            ciphertext,
            previous_ref: fields[3].to_string(),
            public_key,
            session_key_hash: fields[5].to_string(),
            secrets: None,
        })
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("index", &self.index)
            .field("nonce", &self.nonce)
            .field("identifier", &self.identifier())
            .field("previous_ref", &self.previous_ref)
            .field("public_key", &self.public_key)
            .field("local", &self.is_local())
            .finish()
    }
}
