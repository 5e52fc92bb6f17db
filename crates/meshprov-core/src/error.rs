//! Error types for the provisioning core.

use meshprov_crypto::CryptoError;
use meshprov_proto::{Algorithm, AuthenticationMethod, DecodeError, ErrorCode, PduType};
use thiserror::Error;

use crate::provisionee::ProvisioningState;

/// Machine-readable reason a session ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// A PDU with an unknown discriminant arrived mid-handshake.
    UnknownPdu,
    /// A PDU was malformed or had a field of the wrong width.
    MalformedPdu,
    /// A PDU arrived that is not valid in the current state.
    InvalidState,
    /// The provisioner selected an algorithm that was not advertised.
    UnsupportedAlgorithm,
    /// The provisioner selected an authentication method that was not advertised.
    UnsupportedAuthMethod,
    /// The peer public key was rejected.
    KeyAgreementFailed,
    /// The peer confirmation did not match its revealed random.
    ConfirmationMismatch,
    /// The provisioning data MIC did not verify.
    DecryptionFailed,
    /// The decrypted provisioning data had the wrong layout.
    InvalidProvisioningData,
    /// The bearer closed before the handshake finished.
    TransportClosed,
    /// A cryptographic primitive failed unexpectedly.
    Internal,
}

impl FailureReason {
    /// Error code for the Failed PDU sent to the peer, if one can be sent.
    pub fn error_code(self) -> Option<ErrorCode> {
        match self {
            Self::UnknownPdu => Some(ErrorCode::InvalidPdu),
            Self::MalformedPdu | Self::UnsupportedAlgorithm | Self::UnsupportedAuthMethod => {
                Some(ErrorCode::InvalidFormat)
            },
            Self::InvalidState => Some(ErrorCode::UnexpectedPdu),
            Self::ConfirmationMismatch => Some(ErrorCode::ConfirmationFailed),
            Self::DecryptionFailed => Some(ErrorCode::DecryptionFailed),
            Self::InvalidProvisioningData => Some(ErrorCode::InvalidData),
            Self::KeyAgreementFailed | Self::Internal => Some(ErrorCode::UnexpectedError),
            Self::TransportClosed => None,
        }
    }

    /// Whether this failure points at a forged or tampered peer rather than a
    /// transport or sequencing problem.
    pub fn is_security_relevant(self) -> bool {
        matches!(
            self,
            Self::ConfirmationMismatch | Self::DecryptionFailed | Self::KeyAgreementFailed
        )
    }
}

/// Errors from the key exchange engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Key generation was requested for an algorithm other than the negotiated one.
    #[error("algorithm {requested:?} requested, {negotiated:?} negotiated")]
    UnsupportedAlgorithm {
        /// Algorithm passed to the call.
        requested: Algorithm,
        /// Algorithm fixed by the Start PDU.
        negotiated: Algorithm,
    },

    /// An operation ran before the value it depends on existed.
    #[error("{operation} called before {missing}")]
    InvalidState {
        /// Operation that was called.
        operation: &'static str,
        /// Value that was not yet available.
        missing: &'static str,
    },

    /// A write-once value was assigned twice.
    #[error("{0} already set")]
    AlreadySet(&'static str),

    /// Confirmation inputs were appended after a confirmation was computed.
    #[error("confirmation inputs are sealed")]
    InputsSealed,

    /// A value had the wrong width for the negotiated algorithm.
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Field that was malformed.
        field: &'static str,
        /// Required width.
        expected: usize,
        /// Width received.
        actual: usize,
    },

    /// The peer public key is not usable.
    #[error("key agreement failed: {0}")]
    KeyAgreementFailed(CryptoError),

    /// The peer public key equals the device's own key.
    #[error("peer reflected the device public key")]
    ReflectedPublicKey,

    /// The peer confirmation does not match its random.
    #[error("confirmation mismatch")]
    ConfirmationMismatch,

    /// The provisioning data failed authentication.
    #[error("provisioning data decryption failed")]
    DecryptionFailed,

    /// Any other crypto failure.
    #[error("crypto: {0}")]
    Crypto(CryptoError),
}

impl ExchangeError {
    /// Failure reason for a session that hit this error.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::UnsupportedAlgorithm { .. } => FailureReason::UnsupportedAlgorithm,
            Self::InvalidState { .. } | Self::AlreadySet(_) | Self::InputsSealed => {
                FailureReason::InvalidState
            },
            Self::InvalidLength { .. } => FailureReason::MalformedPdu,
            Self::KeyAgreementFailed(_) | Self::ReflectedPublicKey => {
                FailureReason::KeyAgreementFailed
            },
            Self::ConfirmationMismatch => FailureReason::ConfirmationMismatch,
            Self::DecryptionFailed => FailureReason::DecryptionFailed,
            Self::Crypto(_) => FailureReason::Internal,
        }
    }
}

/// Errors from the provisioning state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    /// The frame could not be decoded.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    /// The bearer delivered a message it could not turn into a PDU.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The frame is not valid in the current state.
    #[error("{pdu} not allowed in state {state:?}")]
    InvalidState {
        /// State when the frame arrived.
        state: ProvisioningState,
        /// Type of the offending frame.
        pdu: PduType,
    },

    /// The Start PDU selected an algorithm that was not advertised.
    #[error("algorithm {0:?} was not advertised")]
    UnsupportedAlgorithm(Algorithm),

    /// The Start PDU selected an authentication method that was not advertised.
    #[error("authentication method {0:?} was not advertised")]
    UnsupportedAuthMethod(AuthenticationMethod),

    /// The Start PDU asked for an out-of-band device public key.
    #[error("out-of-band public key was not advertised")]
    UnsupportedPublicKeyType,

    /// Key exchange failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// The decrypted provisioning data is malformed.
    #[error("provisioning data: {0}")]
    InvalidProvisioningData(DecodeError),

    /// `set_auth_value` was called while no auth value was requested.
    #[error("no auth value is pending in state {0:?}")]
    NotAwaitingAuthValue(ProvisioningState),

    /// The auth value supplied by the host was rejected.
    #[error("auth value rejected: {0}")]
    InvalidAuthValue(ExchangeError),

    /// The bearer closed mid-handshake.
    #[error("bearer closed mid-handshake")]
    TransportClosed,
}

impl ProvisioningError {
    /// Machine-readable failure reason.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Decode(DecodeError::UnknownType(_)) => FailureReason::UnknownPdu,
            Self::Decode(_) | Self::MalformedFrame(_) | Self::InvalidAuthValue(_) => {
                FailureReason::MalformedPdu
            },
            Self::InvalidState { .. } | Self::NotAwaitingAuthValue(_) => {
                FailureReason::InvalidState
            },
            Self::UnsupportedAlgorithm(_) => FailureReason::UnsupportedAlgorithm,
            Self::UnsupportedAuthMethod(_) | Self::UnsupportedPublicKeyType => {
                FailureReason::UnsupportedAuthMethod
            },
            Self::Exchange(err) => err.reason(),
            Self::InvalidProvisioningData(_) => FailureReason::InvalidProvisioningData,
            Self::TransportClosed => FailureReason::TransportClosed,
        }
    }
}

/// Invalid provisionee configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A node has at least one element.
    #[error("element count must be at least 1")]
    NoElements,

    /// At least one algorithm must be advertised.
    #[error("no provisioning algorithm advertised")]
    NoAlgorithms,

    /// Static OOB value is neither 16 nor 32 bytes, or too short for HMAC.
    #[error("static OOB value of {0} bytes does not fit the advertised algorithms")]
    StaticOobLength(usize),

    /// OOB actions advertised with a size outside 1..=8, or a size without actions.
    #[error("{direction} OOB size {size} invalid for advertised actions")]
    OobSize {
        /// `"output"` or `"input"`.
        direction: &'static str,
        /// Advertised size.
        size: u8,
    },
}
