//! Provisioning PDUs.
//!
//! [`PduFrame`] is a sum type with one variant per discriminant. Each variant
//! carries only its own fields, so a decoded frame can never hold fields from
//! two PDU kinds at once.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Algorithm, AuthenticationMethod, Capabilities, DecodeError, PduType, PublicKeyType, Result,
};

/// Size of the Start payload.
pub const START_SIZE: usize = 5;

/// Size of the message integrity check trailing a Data PDU.
pub const MIC_SIZE: usize = 8;

/// Parameters selected by the provisioner in the Start PDU.
///
/// ```text
/// ┌─────────┬─────────┬────────┬────────┬──────┐
/// │algorithm│ pub key │ method │ action │ size │
/// └─────────┴─────────┴────────┴────────┴──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartParams {
    /// Selected algorithm.
    pub algorithm: Algorithm,
    /// Whether the device public key travels in-band.
    pub public_key_type: PublicKeyType,
    /// Selected authentication method.
    pub auth_method: AuthenticationMethod,
}

impl StartParams {
    /// Parse the 5-byte payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        let [algorithm, public_key_type, method, action, size] =
            <[u8; START_SIZE]>::try_from(payload).map_err(|_| DecodeError::InvalidLength {
                pdu: PduType::Start,
                expected: START_SIZE,
                actual: payload.len(),
            })?;

        Ok(Self {
            algorithm: Algorithm::from_u8(algorithm)?,
            public_key_type: PublicKeyType::from_u8(public_key_type)?,
            auth_method: AuthenticationMethod::from_wire(method, action, size)?,
        })
    }

    /// Serialize to the 5-byte payload.
    pub fn to_bytes(&self) -> [u8; START_SIZE] {
        let [method, action, size] = self.auth_method.to_wire();
        [self.algorithm.to_u8(), self.public_key_type.to_u8(), method, action, size]
    }
}

/// Reason code carried by a Failed PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Reserved for future use.
    Prohibited,
    /// The PDU is not recognized.
    InvalidPdu,
    /// The PDU fields are outside the expected range or the length is wrong.
    InvalidFormat,
    /// The PDU was not expected at this point of the exchange.
    UnexpectedPdu,
    /// The computed confirmation value did not match.
    ConfirmationFailed,
    /// The provisioning protocol cannot continue due to lack of resources.
    OutOfResources,
    /// The provisioning data could not be decrypted.
    DecryptionFailed,
    /// An unexpected error occurred that may not be recoverable.
    UnexpectedError,
    /// The device cannot assign consecutive unicast addresses.
    CannotAssignAddresses,
    /// The data block contains values that cannot be accepted.
    InvalidData,
    /// A code this codec does not name; kept so it re-encodes unchanged.
    Other(u8),
}

impl ErrorCode {
    /// Map a wire byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Prohibited,
            1 => Self::InvalidPdu,
            2 => Self::InvalidFormat,
            3 => Self::UnexpectedPdu,
            4 => Self::ConfirmationFailed,
            5 => Self::OutOfResources,
            6 => Self::DecryptionFailed,
            7 => Self::UnexpectedError,
            8 => Self::CannotAssignAddresses,
            9 => Self::InvalidData,
            other => Self::Other(other),
        }
    }

    /// Wire byte.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Prohibited => 0,
            Self::InvalidPdu => 1,
            Self::InvalidFormat => 2,
            Self::UnexpectedPdu => 3,
            Self::ConfirmationFailed => 4,
            Self::OutOfResources => 5,
            Self::DecryptionFailed => 6,
            Self::UnexpectedError => 7,
            Self::CannotAssignAddresses => 8,
            Self::InvalidData => 9,
            Self::Other(value) => value,
        }
    }
}

/// A decoded provisioning PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduFrame {
    /// Provisioner invites the device.
    Invite {
        /// Attention timer in seconds.
        attention_duration: u8,
    },
    /// Device capabilities.
    Capabilities(Capabilities),
    /// Algorithm and authentication selection.
    Start(StartParams),
    /// P-256 public key; length is checked by the state machine.
    PublicKey {
        /// Raw key bytes as received.
        key: Vec<u8>,
    },
    /// Confirmation value; length is checked by the state machine.
    Confirmation {
        /// Raw confirmation bytes as received.
        value: Vec<u8>,
    },
    /// Random value; length is checked by the state machine.
    Random {
        /// Raw random bytes as received.
        value: Vec<u8>,
    },
    /// Encrypted provisioning data.
    Data {
        /// Ciphertext without the MIC.
        encrypted: Vec<u8>,
        /// Trailing message integrity check.
        mic: [u8; MIC_SIZE],
    },
    /// Provisioning succeeded.
    Complete,
    /// Provisioning failed.
    Failed {
        /// Reason reported by the sender.
        error_code: ErrorCode,
    },
}

impl PduFrame {
    /// Discriminant of this frame.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Self::Invite { .. } => PduType::Invite,
            Self::Capabilities(_) => PduType::Capabilities,
            Self::Start(_) => PduType::Start,
            Self::PublicKey { .. } => PduType::PublicKey,
            Self::Confirmation { .. } => PduType::Confirmation,
            Self::Random { .. } => PduType::Random,
            Self::Data { .. } => PduType::Data,
            Self::Complete => PduType::Complete,
            Self::Failed { .. } => PduType::Failed,
        }
    }

    /// Decode one whole PDU.
    ///
    /// # Errors
    ///
    /// - `Empty` for a zero-length buffer
    /// - `UnknownType` if the discriminant is not 0..=8
    /// - `InvalidLength` if a fixed-size payload has the wrong length, or a
    ///   Data payload is shorter than the MIC
    /// - Start field errors from [`StartParams::from_bytes`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&discriminant, payload) = bytes.split_first().ok_or(DecodeError::Empty)?;
        let pdu = PduType::from_u8(discriminant).ok_or(DecodeError::UnknownType(discriminant))?;

        if let Some(expected) = pdu.fixed_payload_len()
            && payload.len() != expected
        {
            return Err(DecodeError::InvalidLength { pdu, expected, actual: payload.len() });
        }

        match pdu {
            PduType::Invite => {
                let [attention_duration] = single_byte(pdu, payload)?;
                Ok(Self::Invite { attention_duration })
            },
            PduType::Capabilities => Ok(Self::Capabilities(Capabilities::from_bytes(payload)?)),
            PduType::Start => Ok(Self::Start(StartParams::from_bytes(payload)?)),
            PduType::PublicKey => Ok(Self::PublicKey { key: payload.to_vec() }),
            PduType::Confirmation => Ok(Self::Confirmation { value: payload.to_vec() }),
            PduType::Random => Ok(Self::Random { value: payload.to_vec() }),
            PduType::Data => {
                let split = payload.len().checked_sub(MIC_SIZE).ok_or(
                    DecodeError::InvalidLength { pdu, expected: MIC_SIZE, actual: payload.len() },
                )?;
                let (encrypted, mic) = payload.split_at(split);
                let mic = <[u8; MIC_SIZE]>::try_from(mic).map_err(|_| {
                    DecodeError::InvalidLength { pdu, expected: MIC_SIZE, actual: mic.len() }
                })?;
                Ok(Self::Data { encrypted: encrypted.to_vec(), mic })
            },
            PduType::Complete => Ok(Self::Complete),
            PduType::Failed => {
                let [code] = single_byte(pdu, payload)?;
                Ok(Self::Failed { error_code: ErrorCode::from_u8(code) })
            },
        }
    }

    /// Encode to wire bytes: discriminant followed by the payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.payload_len());
        buf.put_u8(self.pdu_type().to_u8());

        match self {
            Self::Invite { attention_duration } => buf.put_u8(*attention_duration),
            Self::Capabilities(caps) => buf.put_slice(&caps.to_bytes()),
            Self::Start(params) => buf.put_slice(&params.to_bytes()),
            Self::PublicKey { key } => buf.put_slice(key),
            Self::Confirmation { value } | Self::Random { value } => buf.put_slice(value),
            Self::Data { encrypted, mic } => {
                buf.put_slice(encrypted);
                buf.put_slice(mic);
            },
            Self::Complete => {},
            Self::Failed { error_code } => buf.put_u8(error_code.to_u8()),
        }

        buf.freeze()
    }

    fn payload_len(&self) -> usize {
        match self {
            Self::Invite { .. } | Self::Failed { .. } => 1,
            Self::Capabilities(_) => crate::capabilities::CAPABILITIES_SIZE,
            Self::Start(_) => START_SIZE,
            Self::PublicKey { key } => key.len(),
            Self::Confirmation { value } | Self::Random { value } => value.len(),
            Self::Data { encrypted, .. } => encrypted.len() + MIC_SIZE,
            Self::Complete => 0,
        }
    }
}

fn single_byte(pdu: PduType, payload: &[u8]) -> Result<[u8; 1]> {
    <[u8; 1]>::try_from(payload).map_err(|_| DecodeError::InvalidLength {
        pdu,
        expected: 1,
        actual: payload.len(),
    })
}
