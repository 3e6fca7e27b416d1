// ELGAMAL-STYLE BLOCK ENCRYPTION
// Per-byte multiplicative ElGamal over a prime modulus from the pool.
//
// SAFETY CONSTRAINTS:
// 1. The private exponent never leaves KeyPair (no Serialize, redacted Debug)
// 2. The private exponent is zeroized when the KeyPair is dropped
// 3. Only PublicKey and Ciphertext have a wire form
// 4. This is a simulation cipher: parameters are far too small for real secrecy

use crate::error::{CryptoError, CryptoResult};
use crate::modmath::{mod_inverse, mod_mul, mod_pow, random_in_range};
use crate::primes::{is_prime, random_prime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed generator used for every key pair.
pub const GENERATOR: u64 = 2;

/// Smallest modulus that can carry one byte per cipher block.
const MIN_MODULUS: u64 = 256;

/// Full key material for one block.
///
/// SAFETY: Owned by exactly one block. Cloning is allowed so a block can be
/// cloned, but the type is never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    modulus: u64,
    generator: u64,
    public_value: u64,
    private_exponent: u64,
}

impl KeyPair {
    /// Generate a fresh key pair: modulus from the pool, generator 2,
    /// private exponent uniform in `[2, p-2]`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let modulus = random_prime(rng);
        let private_exponent = random_in_range(rng, 2, modulus - 2);
        Self::derive(modulus, GENERATOR, private_exponent)
    }

    /// Build a key pair from explicit parameters.
    ///
    /// # Returns
    /// - `Err(InvalidKeyParameters)` if the modulus is not a prime above 255,
    ///   the generator is outside `(1, p)` or the exponent is outside `[1, p-2]`
    pub fn from_parts(modulus: u64, generator: u64, private_exponent: u64) -> CryptoResult<Self> {
        if modulus < MIN_MODULUS || !is_prime(modulus) {
            return Err(CryptoError::InvalidKeyParameters(format!(
                "modulus {} must be a prime of at least {}",
                modulus, MIN_MODULUS
            )));
        }
        if generator <= 1 || generator >= modulus {
            return Err(CryptoError::InvalidKeyParameters(format!(
                "generator {} outside (1, {})",
                generator, modulus
            )));
        }
        if private_exponent == 0 || private_exponent > modulus - 2 {
            return Err(CryptoError::InvalidKeyParameters(
                "private exponent outside [1, p-2]".to_string(),
            ));
        }
        Ok(Self::derive(modulus, generator, private_exponent))
    }

    fn derive(modulus: u64, generator: u64, private_exponent: u64) -> Self {
        KeyPair {
            modulus,
            generator,
            public_value: mod_pow(generator, private_exponent, modulus),
            private_exponent,
        }
    }

    /// Projection onto the transmissible half of the key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            e1: self.generator,
            e2: self.public_value,
            p: self.modulus,
        }
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus", &self.modulus)
            .field("generator", &self.generator)
            .field("public_value", &self.public_value)
            .field("private_exponent", &"<redacted>")
            .finish()
    }
}

/// Public half of a key pair. Wire form `e1:e2:p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    pub e1: u64,
    pub e2: u64,
    pub p: u64,
}

impl PublicKey {
    /// Structural sanity: prime modulus wide enough for bytes, generator and
    /// public value inside the group.
    pub fn is_well_formed(&self) -> bool {
        self.p >= MIN_MODULUS
            && self.e1 > 1
            && self.e1 < self.p
            && self.e2 > 0
            && self.e2 < self.p
            && is_prime(self.p)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.e1, self.e2, self.p)
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(CryptoError::MalformedPublicKey(format!(
                "expected 3 fields, got {}",
                parts.len()
            )));
        }

        let parse = |field: &str, name: &str| {
            field.parse::<u64>().map_err(|_| {
                CryptoError::MalformedPublicKey(format!("{} is not an integer: {:?}", name, field))
            })
        };

        Ok(PublicKey {
            e1: parse(parts[0], "e1")?,
            e2: parse(parts[1], "e2")?,
            p: parse(parts[2], "p")?,
        })
    }
}

/// One encrypted byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherBlock {
    pub c1: u64,
    pub c2: u64,
}

impl CipherBlock {
    /// Both components are residues of `modulus`; `c1` is additionally non-zero.
    pub fn in_range(&self, modulus: u64) -> bool {
        self.c1 > 0 && self.c1 < modulus && self.c2 < modulus
    }
}

/// Encrypted payload. Wire form `c1,c2;c1,c2;...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ciphertext(pub Vec<CipherBlock>);

impl Ciphertext {
    pub fn blocks(&self) -> &[CipherBlock] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{},{}", block.c1, block.c2)?;
        }
        Ok(())
    }
}

impl FromStr for Ciphertext {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Ciphertext::default());
        }

        s.split(';')
            .map(|pair| {
                let (c1, c2) = pair.split_once(',').ok_or_else(|| {
                    CryptoError::MalformedCiphertext(format!("missing ',' in {:?}", pair))
                })?;
                let c1 = c1.parse::<u64>().map_err(|_| {
                    CryptoError::MalformedCiphertext(format!("bad c1 {:?}", c1))
                })?;
                let c2 = c2.parse::<u64>().map_err(|_| {
                    CryptoError::MalformedCiphertext(format!("bad c2 {:?}", c2))
                })?;
                Ok(CipherBlock { c1, c2 })
            })
            .collect::<CryptoResult<Vec<_>>>()
            .map(Ciphertext)
    }
}

/// Encrypt `payload` byte by byte. Byte `i` uses ephemeral exponent `r + i`:
/// `c1 = e1^(r+i)`, `c2 = m * e2^(r+i)` (mod p).
pub fn encrypt(payload: &[u8], r: u64, key: &PublicKey) -> Ciphertext {
    let blocks = payload
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let k = r.wrapping_add(i as u64);
            CipherBlock {
                c1: mod_pow(key.e1, k, key.p),
                c2: mod_mul(m as u64, mod_pow(key.e2, k, key.p), key.p),
            }
        })
        .collect();
    Ciphertext(blocks)
}

/// Decrypt with the originating key pair: `m = c2 * (c1^d)^-1 (mod p)`.
///
/// # Returns
/// - `Err(ComponentOutOfRange)` if a component is not a residue of `p`
/// - `Err(KeyMismatch)` if a recovered symbol does not fit a byte
pub fn decrypt(ciphertext: &Ciphertext, key: &KeyPair) -> CryptoResult<Vec<u8>> {
    let p = key.modulus;
    let mut out = Vec::with_capacity(ciphertext.len());

    for block in ciphertext.blocks() {
        if !block.in_range(p) {
            let value = if block.c1 == 0 || block.c1 >= p { block.c1 } else { block.c2 };
            return Err(CryptoError::ComponentOutOfRange { value, modulus: p });
        }

        let shared = mod_pow(block.c1, key.private_exponent, p);
        let inverse = mod_inverse(shared, p)
            .ok_or(CryptoError::NotInvertible { value: shared, modulus: p })?;
        let symbol = mod_mul(block.c2, inverse, p);

        let byte = u8::try_from(symbol).map_err(|_| CryptoError::KeyMismatch { symbol })?;
        out.push(byte);
    }

    Ok(out)
}
