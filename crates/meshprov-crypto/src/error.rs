//! Crypto error types.

use thiserror::Error;

/// Errors from provisioning cryptography.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// A public key had the wrong length.
    #[error("public key must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// The public key is not a point on P-256.
    #[error("public key is not a valid P-256 point")]
    InvalidPublicKey,

    /// The private scalar is zero or not below the curve order.
    #[error("private key is not a valid P-256 scalar")]
    InvalidPrivateKey,

    /// A MAC key could not be constructed.
    #[error("MAC key rejected")]
    InvalidMacKey,

    /// AEAD tag verification failed.
    #[error("authentication tag mismatch")]
    Authentication,

    /// A random, confirmation or auth value had the wrong width.
    #[error("value must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Width required by the algorithm.
        expected: usize,
        /// Width received.
        actual: usize,
    },

    /// An OOB string or number cannot be represented as an auth value.
    #[error("invalid auth value: {0}")]
    InvalidAuthValue(&'static str),
}
