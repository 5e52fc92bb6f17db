//! Authentication values.
//!
//! The auth value is mixed into both confirmations, so an attacker who does
//! not know it cannot produce a matching confirmation. How it is obtained
//! depends on the negotiated method:
//!
//! - No OOB: all zeros
//! - Static OOB: a provisioned secret of the algorithm's width
//! - Numeric OOB: the number as a big-endian integer, left-padded with zeros
//! - Alphanumeric OOB: the ASCII string, right-padded with zeros

use std::fmt;

use meshprov_proto::Algorithm;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Largest number representable by an 8-digit numeric OOB action.
pub const MAX_NUMERIC: u32 = 99_999_999;

/// Longest alphanumeric OOB string.
pub const MAX_ALPHANUMERIC_LEN: usize = 8;

/// Authentication value sized for one algorithm.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthValue(Zeroizing<Vec<u8>>);

impl AuthValue {
    /// All-zero value used by the No OOB method.
    pub fn zero(algorithm: Algorithm) -> Self {
        Self(Zeroizing::new(vec![0u8; algorithm.value_len()]))
    }

    /// Static OOB value; must match the algorithm width exactly.
    pub fn from_static(algorithm: Algorithm, value: &[u8]) -> Result<Self, CryptoError> {
        let expected = algorithm.value_len();
        if value.len() != expected {
            return Err(CryptoError::InvalidLength { expected, actual: value.len() });
        }
        Ok(Self(Zeroizing::new(value.to_vec())))
    }

    /// Numeric OOB value (blink, beep, vibrate, push, twist or digits).
    pub fn from_numeric(algorithm: Algorithm, number: u32) -> Result<Self, CryptoError> {
        if number > MAX_NUMERIC {
            return Err(CryptoError::InvalidAuthValue("numeric OOB value exceeds 8 digits"));
        }

        let mut value = Zeroizing::new(vec![0u8; algorithm.value_len()]);
        let be = number.to_be_bytes();
        let start = value.len().saturating_sub(be.len());
        if let Some(tail) = value.get_mut(start..) {
            tail.copy_from_slice(&be);
        }
        Ok(Self(value))
    }

    /// Alphanumeric OOB value.
    pub fn from_alphanumeric(algorithm: Algorithm, text: &str) -> Result<Self, CryptoError> {
        if text.is_empty() || text.len() > MAX_ALPHANUMERIC_LEN {
            return Err(CryptoError::InvalidAuthValue("alphanumeric OOB must be 1..=8 characters"));
        }
        if !text.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
            return Err(CryptoError::InvalidAuthValue(
                "alphanumeric OOB allows only digits and uppercase letters",
            ));
        }

        let mut value = Zeroizing::new(vec![0u8; algorithm.value_len()]);
        if let Some(head) = value.get_mut(..text.len()) {
            head.copy_from_slice(text.as_bytes());
        }
        Ok(Self(value))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Width in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the value has no bytes (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthValue(<{} bytes redacted>)", self.len())
    }
}
