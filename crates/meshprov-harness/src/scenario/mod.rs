//! Scenario tests with a mandatory oracle.
//!
//! A scenario describes one handshake (device configuration, what the
//! provisioner selects, which faults to inject) and cannot be run until an
//! oracle is attached. After the handshake has run as far as the device lets
//! it, the oracle inspects the [`World`] and decides pass or fail.
//!
//! ```ignore
//! Scenario::new("no oob")
//!     .oracle(oracle::all_of(vec![oracle::provisioned(), oracle::device_keys_match()]))
//!     .run()?;
//! ```

mod builder;
pub mod oracle;
mod world;

pub use builder::{Fault, RunnableScenario, Scenario, sample_data};
pub use world::{DEVICE, PROVISIONER, World};

/// Verification run against the final world.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
