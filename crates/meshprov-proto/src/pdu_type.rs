//! PDU discriminants.

use std::fmt;

/// Discriminant byte of a provisioning PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    /// Provisioner invites the device to provision.
    Invite = 0,
    /// Device advertises its capabilities.
    Capabilities = 1,
    /// Provisioner selects algorithm and authentication method.
    Start = 2,
    /// Either side's P-256 public key.
    PublicKey = 3,
    /// Confirmation commitment.
    Confirmation = 4,
    /// Random revealing the commitment.
    Random = 5,
    /// Encrypted provisioning data.
    Data = 6,
    /// Device acknowledges successful provisioning.
    Complete = 7,
    /// Provisioning failed.
    Failed = 8,
}

impl PduType {
    /// Map a wire byte to a PDU type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Invite),
            1 => Some(Self::Capabilities),
            2 => Some(Self::Start),
            3 => Some(Self::PublicKey),
            4 => Some(Self::Confirmation),
            5 => Some(Self::Random),
            6 => Some(Self::Data),
            7 => Some(Self::Complete),
            8 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Wire byte for this PDU type.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Exact payload length for fixed-size PDUs, `None` for variable ones.
    pub fn fixed_payload_len(self) -> Option<usize> {
        match self {
            Self::Invite | Self::Failed => Some(1),
            Self::Capabilities => Some(crate::capabilities::CAPABILITIES_SIZE),
            Self::Start => Some(crate::pdu::START_SIZE),
            Self::Complete => Some(0),
            Self::PublicKey | Self::Confirmation | Self::Random | Self::Data => None,
        }
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invite => "Invite",
            Self::Capabilities => "Capabilities",
            Self::Start => "Start",
            Self::PublicKey => "PublicKey",
            Self::Confirmation => "Confirmation",
            Self::Random => "Random",
            Self::Data => "Data",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}
