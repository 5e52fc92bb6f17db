//! World state for scenario execution.
//!
//! The World owns the device under test and the simulated provisioner,
//! routes frames between them, and records everything an oracle may want to
//! check afterwards: the transcript in both directions, delivered results,
//! rejected frames and auth value requests.

use std::collections::HashMap;

use meshprov_core::{
    Provisionee, ProvisioningAction, ProvisioningError, ProvisioningOutcome, ProvisioningState,
};
use meshprov_crypto::AuthValue;
use meshprov_proto::{AuthenticationMethod, PduFrame, PduType};

use crate::{SimCrypto, SimProvisioner};

/// Actor name of the device under test.
pub const DEVICE: &str = "device";

/// Actor name of the simulated provisioner.
pub const PROVISIONER: &str = "provisioner";

/// Devices and provisioner plus everything observed between them.
pub struct World {
    device: Provisionee<SimCrypto>,
    provisioner: SimProvisioner,
    device_sent: Vec<PduFrame>,
    provisioner_sent: Vec<PduFrame>,
    delivered: Vec<ProvisioningOutcome>,
    errors: Vec<ProvisioningError>,
    auth_requests: Vec<AuthenticationMethod>,
    frames_sent: HashMap<&'static str, usize>,
    frames_received: HashMap<&'static str, usize>,
    bearer_closed: bool,
}

impl World {
    /// World around a device and its provisioner.
    pub fn new(device: Provisionee<SimCrypto>, provisioner: SimProvisioner) -> Self {
        Self {
            device,
            provisioner,
            device_sent: Vec::new(),
            provisioner_sent: Vec::new(),
            delivered: Vec::new(),
            errors: Vec::new(),
            auth_requests: Vec::new(),
            frames_sent: HashMap::new(),
            frames_received: HashMap::new(),
            bearer_closed: false,
        }
    }

    /// Device under test.
    pub fn device(&self) -> &Provisionee<SimCrypto> {
        &self.device
    }

    /// Device state.
    pub fn device_state(&self) -> ProvisioningState {
        self.device.state()
    }

    /// Simulated provisioner.
    pub fn provisioner(&self) -> &SimProvisioner {
        &self.provisioner
    }

    /// Mutable simulated provisioner.
    pub fn provisioner_mut(&mut self) -> &mut SimProvisioner {
        &mut self.provisioner
    }

    /// Send a frame from the provisioner to the device.
    ///
    /// Returns the frames the device sent back. A rejected frame is recorded
    /// in [`World::errors`] and returned as the error.
    pub fn deliver(&mut self, frame: PduFrame) -> Result<Vec<PduFrame>, ProvisioningError> {
        let bytes = frame.encode();
        self.provisioner_sent.push(frame);
        self.deliver_raw(&bytes)
    }

    /// Send raw bytes to the device, bypassing the encoder.
    pub fn deliver_raw(&mut self, bytes: &[u8]) -> Result<Vec<PduFrame>, ProvisioningError> {
        self.record(PROVISIONER, DEVICE);
        let result = self.device.handle_frame(bytes);
        self.settle(result)
    }

    /// Play the host answering the device's auth value request.
    pub fn supply_auth_value(
        &mut self,
        value: AuthValue,
    ) -> Result<Vec<PduFrame>, ProvisioningError> {
        let result = self.device.set_auth_value(value);
        self.settle(result)
    }

    /// Drop the link between the two actors.
    pub fn close_bearer(&mut self) {
        self.bearer_closed = true;
        self.device.on_bearer_closed();
    }

    fn settle(
        &mut self,
        result: Result<Vec<ProvisioningAction>, ProvisioningError>,
    ) -> Result<Vec<PduFrame>, ProvisioningError> {
        let actions = result.inspect_err(|err| {
            tracing::debug!(error = %err, state = ?self.device.state(), "device rejected input");
            self.errors.push(err.clone());
        })?;

        let mut replies = Vec::new();
        for action in actions {
            match action {
                ProvisioningAction::SendFrame(frame) => {
                    self.record(DEVICE, PROVISIONER);
                    self.device_sent.push(frame.clone());
                    replies.push(frame);
                },
                ProvisioningAction::RequestAuthValue { method, .. } => {
                    self.auth_requests.push(method);
                },
                ProvisioningAction::Provisioned(outcome) => self.delivered.push(outcome),
            }
        }
        Ok(replies)
    }

    fn record(&mut self, from: &'static str, to: &'static str) {
        *self.frames_sent.entry(from).or_insert(0) += 1;
        *self.frames_received.entry(to).or_insert(0) += 1;
    }

    /// Frames the device sent, in order.
    pub fn device_sent(&self) -> &[PduFrame] {
        &self.device_sent
    }

    /// Frames the provisioner sent, in order.
    pub fn provisioner_sent(&self) -> &[PduFrame] {
        &self.provisioner_sent
    }

    /// Whether the device ever sent a frame of type `pdu`.
    pub fn device_sent_type(&self, pdu: PduType) -> bool {
        self.device_sent.iter().any(|frame| frame.pdu_type() == pdu)
    }

    /// Results handed to the consumer.
    pub fn delivered(&self) -> &[ProvisioningOutcome] {
        &self.delivered
    }

    /// Errors the device returned.
    pub fn errors(&self) -> &[ProvisioningError] {
        &self.errors
    }

    /// Auth value requests the device raised.
    pub fn auth_requests(&self) -> &[AuthenticationMethod] {
        &self.auth_requests
    }

    /// Whether the scenario closed the bearer.
    pub fn bearer_closed(&self) -> bool {
        self.bearer_closed
    }

    /// Get number of frames sent by an actor.
    pub fn frames_sent(&self, actor: &str) -> usize {
        self.frames_sent.get(actor).copied().unwrap_or(0)
    }

    /// Get number of frames received by an actor.
    pub fn frames_received(&self, actor: &str) -> usize {
        self.frames_received.get(actor).copied().unwrap_or(0)
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("device", &self.device)
            .field("device_sent", &self.device_sent)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}
