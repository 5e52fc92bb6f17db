//! Deterministic test harness for the mesh provisioning engine.
//!
//! Everything here is seeded: the same seed produces the same keys, randoms
//! and transcript, so a failing scenario reproduces exactly.
//!
//! - [`SimProvisioner`]: the initiator side of the handshake, just enough of
//!   it to drive a device through every state
//! - [`LoopbackBearer`]: in-memory bearer pair for driver tests
//! - [`scenario`]: scenario builder with a mandatory oracle

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loopback;
pub mod scenario;
pub mod sim_crypto;
pub mod sim_provisioner;

pub use loopback::{LoopbackBearer, loopback};
pub use sim_crypto::{SimCrypto, seeded_crypto};
pub use sim_provisioner::SimProvisioner;
