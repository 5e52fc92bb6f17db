//! Decrypted provisioning data.
//!
//! ```text
//! 0             16         18      19         23        25
//! ┌─────────────┬──────────┬───────┬──────────┬─────────┐
//! │ network key │key index │ flags │ IV index │ unicast │
//! │ (16)        │(u16 BE)  │ (1)   │ (u32 BE) │(u16 BE) │
//! └─────────────┴──────────┴───────┴──────────┴─────────┘
//! ```

use std::fmt;

use bitflags::bitflags;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::network_endian::{U16, U32},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{DecodeError, Result};

/// Size of the provisioning data plaintext.
pub const PROVISIONING_DATA_SIZE: usize = 25;

bitflags! {
    /// Flags field of the provisioning data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProvisioningFlags: u8 {
        /// Key refresh phase 2 is in progress.
        const KEY_REFRESH = 1 << 0;
        /// IV update is active.
        const IV_UPDATE = 1 << 1;
    }
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct ProvisioningDataWire {
    network_key: [u8; 16],
    key_index: U16,
    flags: u8,
    iv_index: U32,
    unicast_address: U16,
}

/// Network configuration delivered to a provisioned device.
///
/// The network key is wiped when the value is dropped and never shows up in
/// `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ProvisioningData {
    /// Primary network key.
    pub network_key: [u8; 16],
    /// Global index of the network key.
    pub key_index: u16,
    /// Key refresh and IV update flags.
    #[zeroize(skip)]
    pub flags: ProvisioningFlags,
    /// Current IV index.
    pub iv_index: u32,
    /// Unicast address of the primary element.
    pub unicast_address: u16,
}

impl ProvisioningData {
    /// Parse a 25-byte plaintext.
    pub fn from_bytes(plaintext: &[u8]) -> Result<Self> {
        let wire = ProvisioningDataWire::read_from_bytes(plaintext).map_err(|_| {
            DecodeError::InvalidProvisioningData {
                expected: PROVISIONING_DATA_SIZE,
                actual: plaintext.len(),
            }
        })?;

        Ok(Self {
            network_key: wire.network_key,
            key_index: wire.key_index.get(),
            flags: ProvisioningFlags::from_bits_retain(wire.flags),
            iv_index: wire.iv_index.get(),
            unicast_address: wire.unicast_address.get(),
        })
    }

    /// Serialize to the 25-byte plaintext.
    pub fn to_bytes(&self) -> [u8; PROVISIONING_DATA_SIZE] {
        let wire = ProvisioningDataWire {
            network_key: self.network_key,
            key_index: U16::new(self.key_index),
            flags: self.flags.bits(),
            iv_index: U32::new(self.iv_index),
            unicast_address: U16::new(self.unicast_address),
        };

        let mut out = [0u8; PROVISIONING_DATA_SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }
}

impl fmt::Debug for ProvisioningData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningData")
            .field("network_key", &"<redacted>")
            .field("key_index", &self.key_index)
            .field("flags", &self.flags)
            .field("iv_index", &self.iv_index)
            .field("unicast_address", &format_args!("{:#06x}", self.unicast_address))
            .finish()
    }
}
