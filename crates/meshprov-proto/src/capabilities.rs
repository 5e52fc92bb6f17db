//! Device capabilities advertised in the Capabilities PDU.
//!
//! The 11-byte payload is a fixed big-endian layout. It is serialized
//! verbatim into the frame and the same bytes are fed into the confirmation
//! inputs, so encoding must be bit-exact on every host.
//!
//! ```text
//! 0        1          3        4         5          6            8         9           11
//! ┌────────┬──────────┬────────┬─────────┬──────────┬────────────┬─────────┬───────────┐
//! │elements│algorithms│pub key │static   │output    │output      │input    │input      │
//! │        │(u16 BE)  │type    │OOB type │OOB size  │actions(BE) │OOB size │actions(BE)│
//! └────────┴──────────┴────────┴─────────┴──────────┴────────────┴─────────┴───────────┘
//! ```

use bitflags::bitflags;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::network_endian::U16,
};

use crate::{
    Algorithm, AuthenticationMethod, DecodeError, InputAction, OutputAction, PduType,
    PublicKeyType, Result,
};

/// Size of the Capabilities payload.
pub const CAPABILITIES_SIZE: usize = 11;

bitflags! {
    /// Supported provisioning algorithms.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Algorithms: u16 {
        /// P-256 ECDH with AES-CMAC confirmation.
        const P256_CMAC_AES128 = 1 << 0;
        /// P-256 ECDH with HMAC-SHA-256 confirmation.
        const P256_HMAC_SHA256 = 1 << 1;
    }
}

bitflags! {
    /// Supported public key types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PublicKeyTypes: u8 {
        /// Device public key is available out of band.
        const OOB_PUBLIC_KEY = 1 << 0;
    }
}

bitflags! {
    /// Supported static OOB types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StaticOobTypes: u8 {
        /// Static OOB information is available.
        const STATIC_OOB = 1 << 0;
    }
}

bitflags! {
    /// Supported output OOB actions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputOobActions: u16 {
        /// Blink.
        const BLINK = 1 << 0;
        /// Beep.
        const BEEP = 1 << 1;
        /// Vibrate.
        const VIBRATE = 1 << 2;
        /// Output numeric.
        const NUMERIC = 1 << 3;
        /// Output alphanumeric.
        const ALPHANUMERIC = 1 << 4;
    }
}

bitflags! {
    /// Supported input OOB actions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputOobActions: u16 {
        /// Push.
        const PUSH = 1 << 0;
        /// Twist.
        const TWIST = 1 << 1;
        /// Input numeric.
        const NUMERIC = 1 << 2;
        /// Input alphanumeric.
        const ALPHANUMERIC = 1 << 3;
    }
}

impl From<OutputAction> for OutputOobActions {
    fn from(action: OutputAction) -> Self {
        match action {
            OutputAction::Blink => Self::BLINK,
            OutputAction::Beep => Self::BEEP,
            OutputAction::Vibrate => Self::VIBRATE,
            OutputAction::OutputNumeric => Self::NUMERIC,
            OutputAction::OutputAlphanumeric => Self::ALPHANUMERIC,
        }
    }
}

impl From<InputAction> for InputOobActions {
    fn from(action: InputAction) -> Self {
        match action {
            InputAction::Push => Self::PUSH,
            InputAction::Twist => Self::TWIST,
            InputAction::InputNumeric => Self::NUMERIC,
            InputAction::InputAlphanumeric => Self::ALPHANUMERIC,
        }
    }
}

impl From<Algorithm> for Algorithms {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::P256CmacAes128 => Self::P256_CMAC_AES128,
            Algorithm::P256HmacSha256 => Self::P256_HMAC_SHA256,
        }
    }
}

/// On-wire layout of the Capabilities payload.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct CapabilitiesWire {
    element_count: u8,
    algorithms: U16,
    public_key_type: u8,
    static_oob_type: u8,
    output_oob_size: u8,
    output_oob_actions: U16,
    input_oob_size: u8,
    input_oob_actions: U16,
}

/// Capabilities of the unprovisioned device.
///
/// Created once per session from configuration. Reserved bits are retained
/// on decode so that a decoded frame re-encodes to the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Number of elements on the device (at least 1).
    pub element_count: u8,
    /// Supported algorithms.
    pub algorithms: Algorithms,
    /// Supported public key types.
    pub public_key_types: PublicKeyTypes,
    /// Supported static OOB types.
    pub static_oob_types: StaticOobTypes,
    /// Maximum output OOB size.
    pub output_oob_size: u8,
    /// Supported output OOB actions.
    pub output_oob_actions: OutputOobActions,
    /// Maximum input OOB size.
    pub input_oob_size: u8,
    /// Supported input OOB actions.
    pub input_oob_actions: InputOobActions,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            element_count: 1,
            algorithms: Algorithms::P256_CMAC_AES128,
            public_key_types: PublicKeyTypes::empty(),
            static_oob_types: StaticOobTypes::empty(),
            output_oob_size: 0,
            output_oob_actions: OutputOobActions::empty(),
            input_oob_size: 0,
            input_oob_actions: InputOobActions::empty(),
        }
    }
}

impl Capabilities {
    /// Parse the 11-byte payload (without the discriminant).
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        let wire = CapabilitiesWire::read_from_bytes(payload).map_err(|_| {
            DecodeError::InvalidLength {
                pdu: PduType::Capabilities,
                expected: CAPABILITIES_SIZE,
                actual: payload.len(),
            }
        })?;

        Ok(Self {
            element_count: wire.element_count,
            algorithms: Algorithms::from_bits_retain(wire.algorithms.get()),
            public_key_types: PublicKeyTypes::from_bits_retain(wire.public_key_type),
            static_oob_types: StaticOobTypes::from_bits_retain(wire.static_oob_type),
            output_oob_size: wire.output_oob_size,
            output_oob_actions: OutputOobActions::from_bits_retain(wire.output_oob_actions.get()),
            input_oob_size: wire.input_oob_size,
            input_oob_actions: InputOobActions::from_bits_retain(wire.input_oob_actions.get()),
        })
    }

    /// Serialize to the 11-byte payload (without the discriminant).
    pub fn to_bytes(&self) -> [u8; CAPABILITIES_SIZE] {
        let wire = CapabilitiesWire {
            element_count: self.element_count,
            algorithms: U16::new(self.algorithms.bits()),
            public_key_type: self.public_key_types.bits(),
            static_oob_type: self.static_oob_types.bits(),
            output_oob_size: self.output_oob_size,
            output_oob_actions: U16::new(self.output_oob_actions.bits()),
            input_oob_size: self.input_oob_size,
            input_oob_actions: U16::new(self.input_oob_actions.bits()),
        };

        let mut out = [0u8; CAPABILITIES_SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }

    /// Whether `algorithm` was advertised.
    pub fn supports_algorithm(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(algorithm.into())
    }

    /// Whether `public_key` was advertised.
    pub fn supports_public_key(&self, public_key: PublicKeyType) -> bool {
        match public_key {
            PublicKeyType::InBand => true,
            PublicKeyType::OutOfBand => {
                self.public_key_types.contains(PublicKeyTypes::OOB_PUBLIC_KEY)
            },
        }
    }

    /// Whether `method` fits inside what was advertised.
    pub fn supports_auth(&self, method: &AuthenticationMethod) -> bool {
        match *method {
            AuthenticationMethod::NoOob => true,
            AuthenticationMethod::StaticOob => {
                self.static_oob_types.contains(StaticOobTypes::STATIC_OOB)
            },
            AuthenticationMethod::OutputOob { action, size } => {
                self.output_oob_actions.contains(action.into()) && size <= self.output_oob_size
            },
            AuthenticationMethod::InputOob { action, size } => {
                self.input_oob_actions.contains(action.into()) && size <= self.input_oob_size
            },
        }
    }
}
