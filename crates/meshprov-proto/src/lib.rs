//! Wire format for the mesh provisioning protocol.
//!
//! Every provisioning PDU is a single discriminant byte followed by a
//! variant-specific payload. Lengths are implicit: the bearer delivers whole
//! PDUs, so the codec sees exactly one frame per buffer and never has to
//! search for boundaries.
//!
//! ```text
//! ┌──────────────┬────────────────────────────────────┐
//! │ type (1 byte)│ payload (0..N bytes, per PDU type) │
//! └──────────────┴────────────────────────────────────┘
//! ```
//!
//! The codec is a pure transform: it knows nothing about protocol state, and
//! the responder state machine in `meshprov-core` decides whether a decoded
//! frame is acceptable right now.
//!
//! # Security
//!
//! PDUs arrive over an attacker-writable GATT characteristic. Decoding fails
//! closed: an unknown discriminant, a fixed-size payload of the wrong length
//! or an out-of-range field rejects the whole frame. Fixed layouts are parsed
//! through `zerocopy` structs so there is no hand-written offset arithmetic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod bearer;
pub mod capabilities;
pub mod errors;
pub mod pdu;
pub mod pdu_type;
pub mod provisioning_data;

pub use auth::{Algorithm, AuthenticationMethod, InputAction, OutputAction, PublicKeyType};
pub use bearer::{BearerError, ProxyHeader, Sar};
pub use capabilities::{
    Algorithms, Capabilities, InputOobActions, OutputOobActions, PublicKeyTypes, StaticOobTypes,
};
pub use errors::{DecodeError, Result};
pub use pdu::{ErrorCode, MIC_SIZE, PduFrame, StartParams};
pub use pdu_type::PduType;
pub use provisioning_data::{PROVISIONING_DATA_SIZE, ProvisioningData, ProvisioningFlags};

/// Size of an uncompressed P-256 public key on the wire (`X ‖ Y`).
pub const PUBLIC_KEY_SIZE: usize = 64;
