//! Confirmation input accumulator.
//!
//! Both peers must feed byte-identical inputs into their confirmation, so the
//! buffer is a plain concatenation of PDU payloads (discriminant stripped) in
//! protocol order:
//!
//! ```text
//! Invite(1) ‖ Capabilities(11) ‖ Start(5) ‖ ProvisionerKey(64) ‖ DeviceKey(64)
//! ```
//!
//! Ordering is the state machine's job; it calls `accumulate` only from the
//! matching transitions. The buffer seals the first time it is read for a
//! confirmation and rejects appends after that.

use zeroize::Zeroizing;

use crate::ExchangeError;

/// Size of the fully accumulated inputs for an in-band key exchange.
pub const CONFIRMATION_INPUTS_SIZE: usize = 1 + 11 + 5 + 64 + 64;

/// Ordered confirmation inputs owned by one session.
#[derive(Default)]
pub struct ConfirmationInputs {
    buffer: Zeroizing<Vec<u8>>,
    sealed: bool,
}

impl ConfirmationInputs {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self { buffer: Zeroizing::new(Vec::with_capacity(CONFIRMATION_INPUTS_SIZE)), sealed: false }
    }

    /// Append one PDU payload.
    pub fn accumulate(&mut self, payload: &[u8]) -> Result<(), ExchangeError> {
        if self.sealed {
            return Err(ExchangeError::InputsSealed);
        }
        self.buffer.extend_from_slice(payload);
        Ok(())
    }

    /// Seal the buffer and return its contents.
    pub fn snapshot(&mut self) -> &[u8] {
        self.sealed = true;
        &self.buffer
    }

    /// Contents, once sealed.
    pub fn sealed_bytes(&self) -> Option<&[u8]> {
        self.sealed.then_some(self.buffer.as_slice())
    }

    /// Whether a confirmation has been computed over these inputs.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl std::fmt::Debug for ConfirmationInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationInputs")
            .field("len", &self.buffer.len())
            .field("sealed", &self.sealed)
            .finish()
    }
}
