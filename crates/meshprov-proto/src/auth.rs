//! Algorithm and authentication selectors carried by the Start PDU.

use crate::{DecodeError, Result};

/// Provisioning algorithm selected by the provisioner.
///
/// Both algorithms use P-256 ECDH and AES-CCM for the provisioning data; they
/// differ in the confirmation MAC and therefore in random, confirmation and
/// auth value widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// `BTM_ECDH_P256_CMAC_AES128_AES_CCM`: 16-byte values.
    P256CmacAes128,
    /// `BTM_ECDH_P256_HMAC_SHA256_AES_CCM`: 32-byte values.
    P256HmacSha256,
}

impl Algorithm {
    /// Map the Start PDU algorithm byte.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::P256CmacAes128),
            1 => Ok(Self::P256HmacSha256),
            other => Err(DecodeError::UnknownAlgorithm(other)),
        }
    }

    /// Start PDU algorithm byte.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::P256CmacAes128 => 0,
            Self::P256HmacSha256 => 1,
        }
    }

    /// Width of Random, Confirmation and AuthValue for this algorithm.
    pub fn value_len(self) -> usize {
        match self {
            Self::P256CmacAes128 => 16,
            Self::P256HmacSha256 => 32,
        }
    }
}

/// Whether the device public key is exchanged in-band or out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyType {
    /// Public key travels in a PublicKey PDU.
    InBand,
    /// Public key was obtained out of band by the provisioner.
    OutOfBand,
}

impl PublicKeyType {
    /// Map the Start PDU public key byte.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::InBand),
            1 => Ok(Self::OutOfBand),
            other => Err(DecodeError::InvalidPublicKeyType(other)),
        }
    }

    /// Start PDU public key byte.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::InBand => 0,
            Self::OutOfBand => 1,
        }
    }
}

/// Action the device performs to output an OOB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputAction {
    /// Blink a light `n` times.
    Blink = 0,
    /// Beep `n` times.
    Beep = 1,
    /// Vibrate `n` times.
    Vibrate = 2,
    /// Display a number.
    OutputNumeric = 3,
    /// Display an alphanumeric string.
    OutputAlphanumeric = 4,
}

impl OutputAction {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Blink),
            1 => Some(Self::Beep),
            2 => Some(Self::Vibrate),
            3 => Some(Self::OutputNumeric),
            4 => Some(Self::OutputAlphanumeric),
            _ => None,
        }
    }
}

/// Action the user performs on the device to input an OOB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputAction {
    /// Push a button `n` times.
    Push = 0,
    /// Twist a knob `n` times.
    Twist = 1,
    /// Enter a number.
    InputNumeric = 2,
    /// Enter an alphanumeric string.
    InputAlphanumeric = 3,
}

impl InputAction {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Push),
            1 => Some(Self::Twist),
            2 => Some(Self::InputNumeric),
            3 => Some(Self::InputAlphanumeric),
            _ => None,
        }
    }
}

/// Authentication method selected in the Start PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    /// No OOB authentication; the auth value is all zeros.
    NoOob,
    /// Static OOB value known to both sides.
    StaticOob,
    /// Device outputs a value the user enters on the provisioner.
    OutputOob {
        /// How the device outputs the value.
        action: OutputAction,
        /// Number of digits or characters (1..=8).
        size: u8,
    },
    /// Provisioner outputs a value the user enters on the device.
    InputOob {
        /// How the user inputs the value.
        action: InputAction,
        /// Number of digits or characters (1..=8).
        size: u8,
    },
}

/// Largest OOB size a Start PDU may select.
pub const MAX_OOB_SIZE: u8 = 8;

impl AuthenticationMethod {
    /// Parse the `method · action · size` triple of a Start PDU.
    pub fn from_wire(method: u8, action: u8, size: u8) -> Result<Self> {
        match method {
            0 | 1 => {
                if action != 0 {
                    return Err(DecodeError::InvalidAuthAction { method, action });
                }
                if size != 0 {
                    return Err(DecodeError::InvalidAuthSize { method, size });
                }
                Ok(if method == 0 { Self::NoOob } else { Self::StaticOob })
            },
            2 => {
                let action = OutputAction::from_u8(action)
                    .ok_or(DecodeError::InvalidAuthAction { method, action })?;
                Ok(Self::OutputOob { action, size: check_size(method, size)? })
            },
            3 => {
                let action = InputAction::from_u8(action)
                    .ok_or(DecodeError::InvalidAuthAction { method, action })?;
                Ok(Self::InputOob { action, size: check_size(method, size)? })
            },
            other => Err(DecodeError::InvalidAuthMethod(other)),
        }
    }

    /// Encode as the `method · action · size` triple.
    pub fn to_wire(self) -> [u8; 3] {
        match self {
            Self::NoOob => [0, 0, 0],
            Self::StaticOob => [1, 0, 0],
            Self::OutputOob { action, size } => [2, action as u8, size],
            Self::InputOob { action, size } => [3, action as u8, size],
        }
    }
}

fn check_size(method: u8, size: u8) -> Result<u8> {
    if (1..=MAX_OOB_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(DecodeError::InvalidAuthSize { method, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_actions_beyond_four_rejected() {
        assert!(AuthenticationMethod::from_wire(2, 4, 1).is_ok());
        assert_eq!(
            AuthenticationMethod::from_wire(2, 5, 1),
            Err(DecodeError::InvalidAuthAction { method: 2, action: 5 })
        );
    }

    #[test]
    fn input_actions_beyond_three_rejected() {
        assert!(AuthenticationMethod::from_wire(3, 3, 4).is_ok());
        assert_eq!(
            AuthenticationMethod::from_wire(3, 4, 4),
            Err(DecodeError::InvalidAuthAction { method: 3, action: 4 })
        );
    }

    #[test]
    fn no_oob_requires_zero_action_and_size() {
        assert_eq!(AuthenticationMethod::from_wire(0, 0, 0), Ok(AuthenticationMethod::NoOob));
        assert!(AuthenticationMethod::from_wire(0, 1, 0).is_err());
        assert!(AuthenticationMethod::from_wire(1, 0, 2).is_err());
    }

    #[test]
    fn oob_size_bounds() {
        assert!(AuthenticationMethod::from_wire(2, 0, 0).is_err());
        assert!(AuthenticationMethod::from_wire(2, 0, 8).is_ok());
        assert!(AuthenticationMethod::from_wire(3, 0, 9).is_err());
    }

    #[test]
    fn unknown_method_rejected() {
        assert_eq!(
            AuthenticationMethod::from_wire(4, 0, 0),
            Err(DecodeError::InvalidAuthMethod(4))
        );
    }

    #[test]
    fn algorithm_widths() {
        assert_eq!(Algorithm::P256CmacAes128.value_len(), 16);
        assert_eq!(Algorithm::P256HmacSha256.value_len(), 32);
        assert_eq!(Algorithm::from_u8(2), Err(DecodeError::UnknownAlgorithm(2)));
    }
}
