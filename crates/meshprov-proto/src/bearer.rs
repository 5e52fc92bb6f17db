//! Proxy PDU header used when provisioning runs over GATT.
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────┬───────────────────────┐
//! │  SAR  │     message type      │
//! └───────┴───────────────────────┘
//! ```
//!
//! Only unsegmented provisioning messages are handled here. Reassembly of
//! segmented proxy PDUs belongs to the GATT transport.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Proxy message type carrying provisioning PDUs.
pub const PROVISIONING_MESSAGE_TYPE: u8 = 0x03;

const MESSAGE_TYPE_MASK: u8 = 0x3F;

/// Segmentation and reassembly marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sar {
    /// Whole message in one PDU.
    Complete,
    /// First segment.
    First,
    /// Continuation segment.
    Continuation,
    /// Last segment.
    Last,
}

impl Sar {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Complete,
            0b01 => Self::First,
            0b10 => Self::Continuation,
            _ => Self::Last,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Complete => 0b00,
            Self::First => 0b01,
            Self::Continuation => 0b10,
            Self::Last => 0b11,
        }
    }
}

/// Errors from stripping the proxy header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BearerError {
    /// The proxy PDU had no header byte.
    #[error("empty proxy PDU")]
    Empty,

    /// The PDU is a segment; reassembly is not supported.
    #[error("segmented proxy PDU ({0:?}) not supported")]
    Segmented(Sar),

    /// The PDU carries something other than provisioning.
    #[error("unexpected proxy message type {0:#04x}")]
    UnexpectedMessageType(u8),
}

/// Decoded proxy header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHeader {
    /// Segmentation marker.
    pub sar: Sar,
    /// Six-bit message type.
    pub message_type: u8,
}

impl ProxyHeader {
    /// Header for a complete provisioning PDU.
    pub const PROVISIONING: Self =
        Self { sar: Sar::Complete, message_type: PROVISIONING_MESSAGE_TYPE };

    /// Parse a header byte.
    pub fn from_u8(byte: u8) -> Self {
        Self { sar: Sar::from_bits(byte >> 6), message_type: byte & MESSAGE_TYPE_MASK }
    }

    /// Header byte.
    pub fn to_u8(self) -> u8 {
        (self.sar.bits() << 6) | (self.message_type & MESSAGE_TYPE_MASK)
    }

    /// Prefix a provisioning PDU with the proxy header.
    pub fn wrap(pdu: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + pdu.len());
        buf.put_u8(Self::PROVISIONING.to_u8());
        buf.put_slice(pdu);
        buf.freeze()
    }

    /// Strip the proxy header, accepting only complete provisioning PDUs.
    pub fn strip(proxy_pdu: &Bytes) -> Result<Bytes, BearerError> {
        let (&byte, _) = proxy_pdu.split_first().ok_or(BearerError::Empty)?;
        let header = Self::from_u8(byte);

        if header.sar != Sar::Complete {
            return Err(BearerError::Segmented(header.sar));
        }
        if header.message_type != PROVISIONING_MESSAGE_TYPE {
            return Err(BearerError::UnexpectedMessageType(header.message_type));
        }

        Ok(proxy_pdu.slice(1..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_header_byte() {
        assert_eq!(ProxyHeader::PROVISIONING.to_u8(), 0x03);
        assert_eq!(ProxyHeader::wrap(&[0x00, 0x05]).as_ref(), &[0x03, 0x00, 0x05]);
    }

    #[test]
    fn strip_removes_header() {
        let pdu = Bytes::from_static(&[0x03, 0x07]);
        assert_eq!(ProxyHeader::strip(&pdu).unwrap().as_ref(), &[0x07]);
    }

    #[test]
    fn segments_rejected() {
        let pdu = Bytes::from_static(&[0x43, 0x00]);
        assert_eq!(ProxyHeader::strip(&pdu), Err(BearerError::Segmented(Sar::First)));
    }

    #[test]
    fn other_message_types_rejected() {
        let pdu = Bytes::from_static(&[0x01, 0x00]);
        assert_eq!(ProxyHeader::strip(&pdu), Err(BearerError::UnexpectedMessageType(0x01)));
        assert_eq!(ProxyHeader::strip(&Bytes::new()), Err(BearerError::Empty));
    }
}
