pub mod elgamal;
pub mod error;
pub mod hash;
pub mod modmath;
pub mod primes;

pub use elgamal::{decrypt, encrypt, CipherBlock, Ciphertext, KeyPair, PublicKey, GENERATOR};
pub use error::{CryptoError, CryptoResult};
pub use hash::{hash, hash_rate, is_hash_valid, target, HashAlgorithm, DIGEST_HEX_LEN};
pub use modmath::{mod_inverse, mod_mul, mod_pow, random_in_range};
pub use primes::{is_prime, random_prime, PRIME_POOL};
