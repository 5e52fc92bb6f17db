//! Cryptography for the responder side of mesh provisioning.
//!
//! Both parties run P-256 ECDH, commit to a random with a confirmation MAC,
//! reveal the randoms, and finally derive a session key that protects the
//! provisioning data with AES-CCM. The two supported algorithms differ only in
//! the confirmation MAC:
//!
//! | Algorithm        | Salt | Confirmation key           | Value width |
//! |------------------|------|----------------------------|-------------|
//! | P-256 / CMAC     | `s1` | `k1(ECDH, salt, "prck")`   | 16 bytes    |
//! | P-256 / HMAC-256 | `s2` | `k5(ECDH‖Auth, salt, "prck256")` | 32 bytes |
//!
//! # Security
//!
//! Secret material (private keys, ECDH output, auth values, session keys) is
//! held in zeroizing containers and wiped on drop. Confirmation values are
//! compared in constant time.

#![forbid(unsafe_code)]

pub mod auth_value;
pub mod confirmation;
pub mod ecdh;
pub mod error;
pub mod provider;
pub mod session;
pub mod toolbox;

pub use auth_value::AuthValue;
pub use confirmation::{compute_confirmation, confirmation_salt, confirmations_match};
pub use ecdh::{KeyPair, SharedSecret};
pub use error::CryptoError;
pub use provider::{CryptoProvider, MeshCrypto};
pub use session::{NONCE_SIZE, SessionKeys};
