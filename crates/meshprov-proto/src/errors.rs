//! Decode errors.

use thiserror::Error;

use crate::PduType;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Reasons a byte buffer could not be turned into a [`crate::PduFrame`].
///
/// Decoding never yields a partial frame: any of these rejects the whole
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer was zero-length.
    #[error("empty PDU")]
    Empty,

    /// The discriminant byte does not name a known PDU type.
    #[error("unknown PDU type {0:#04x}")]
    UnknownType(u8),

    /// A fixed-size payload had the wrong length.
    #[error("{pdu} payload must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// PDU whose payload was malformed.
        pdu: PduType,
        /// Required payload length (minimum for variable-size PDUs).
        expected: usize,
        /// Payload length received.
        actual: usize,
    },

    /// The Start PDU named an authentication method outside 0..=3.
    #[error("invalid authentication method {0}")]
    InvalidAuthMethod(u8),

    /// The authentication action is not valid for the selected method.
    #[error("invalid authentication action {action} for method {method}")]
    InvalidAuthAction {
        /// Authentication method byte.
        method: u8,
        /// Offending action byte.
        action: u8,
    },

    /// The authentication size is not valid for the selected method.
    #[error("invalid authentication size {size} for method {method}")]
    InvalidAuthSize {
        /// Authentication method byte.
        method: u8,
        /// Offending size byte.
        size: u8,
    },

    /// The Start PDU named an algorithm this codec does not know.
    #[error("unknown provisioning algorithm {0}")]
    UnknownAlgorithm(u8),

    /// The Start PDU named a public key type outside 0..=1.
    #[error("invalid public key type {0}")]
    InvalidPublicKeyType(u8),

    /// Decrypted provisioning data had the wrong length.
    #[error("provisioning data must be {expected} bytes, got {actual}")]
    InvalidProvisioningData {
        /// Required length.
        expected: usize,
        /// Length received.
        actual: usize,
    },
}
