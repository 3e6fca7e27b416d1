use thiserror::Error;

/// Errors raised by the block cryptography layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Invalid key parameters: {0}")]
    InvalidKeyParameters(String),

    /// A cipher component does not lie in the residue range of the modulus.
    #[error("Cipher component {value} out of range for modulus {modulus}")]
    ComponentOutOfRange { value: u64, modulus: u64 },

    #[error("Value {value} has no inverse modulo {modulus}")]
    NotInvertible { value: u64, modulus: u64 },

    /// A recovered symbol did not fit in a byte, so the key pair is not the
    /// one that produced the ciphertext.
    #[error("Decrypted symbol {symbol} is outside the byte range (key mismatch)")]
    KeyMismatch { symbol: u64 },
}

pub type CryptoResult<T> = Result<T, CryptoError>;
