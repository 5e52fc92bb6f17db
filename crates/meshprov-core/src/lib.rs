//! Responder-side mesh provisioning engine.
//!
//! Pure protocol logic for the unprovisioned-device role, decoupled from I/O.
//!
//! # Architecture
//!
//! The state machine consumes whole PDUs and produces declarative actions
//! (send a frame, request an auth value, deliver the result). It never
//! touches the bearer, the clock or the host UI itself. The async
//! [`Driver`] is one interpreter of those actions; the test harness is
//! another.
//!
//! All cryptographic state for a session is owned by the phase of the state
//! machine that needs it. Failing, completing or resetting a session drops
//! that state, and every secret in it is zeroed on drop.
//!
//! # Components
//!
//! - [`inputs`]: ordered confirmation input accumulator
//! - [`exchange`]: key exchange engine (ECDH, confirmation, decryption)
//! - [`provisionee`]: provisioning state machine
//! - [`registry`]: independent machines keyed by peer
//! - [`transport`]: bearer abstraction and proxy framing
//! - [`driver`]: async driver executing actions over a bearer
//! - [`config`]: advertised capabilities and static OOB
//! - [`error`]: error types and failure reasons

#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod error;
pub mod exchange;
pub mod inputs;
pub mod ports;
pub mod provisionee;
pub mod registry;
pub mod transport;

pub use config::ProvisioneeConfig;
pub use driver::{AuthValueHandle, Driver, DriverError};
pub use error::{ConfigError, ExchangeError, FailureReason, ProvisioningError};
pub use exchange::{DecryptedPayload, KeyExchange};
pub use inputs::{CONFIRMATION_INPUTS_SIZE, ConfirmationInputs};
pub use ports::{NoOobRequester, OobRequester, ProvisioningSink};
pub use provisionee::{Provisionee, ProvisioningAction, ProvisioningOutcome, ProvisioningState};
pub use registry::SessionRegistry;
pub use transport::{Bearer, ProxyFraming};
