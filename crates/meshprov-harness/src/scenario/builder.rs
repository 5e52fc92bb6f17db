//! Scenario builder API.
//!
//! Provides a declarative API for constructing handshake scenarios that
//! enforce the Oracle Pattern.

use meshprov_core::{Provisionee, ProvisioneeConfig, ProvisioningState};
use meshprov_crypto::AuthValue;
use meshprov_proto::{
    Algorithm, AuthenticationMethod, PduFrame, PduType, ProvisioningData, ProvisioningFlags,
};

use crate::{
    SimProvisioner,
    scenario::{OracleFn, World},
    seeded_crypto,
};

/// Misbehaviour injected into a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Send Start without an Invite first.
    SkipInvite,
    /// Send a second Invite once Capabilities arrived.
    InviteTwice,
    /// Drop the last byte of the provisioner public key.
    TruncatePublicKey,
    /// Flip a bit of the Data MIC.
    CorruptMic,
    /// Close the bearer right after the provisioner sent this PDU type.
    CloseAfter(PduType),
}

/// Scenario builder.
///
/// Must call `.oracle()` to get a [`RunnableScenario`] that can be executed.
pub struct Scenario {
    name: String,
    config: ProvisioneeConfig,
    algorithm: Algorithm,
    auth_method: AuthenticationMethod,
    device_auth: Option<AuthValue>,
    provisioner_auth: Option<AuthValue>,
    defer_auth_value: bool,
    faults: Vec<Fault>,
    data: ProvisioningData,
    seed: u64,
}

impl Scenario {
    /// No-OOB handshake with the default device configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ProvisioneeConfig::default(),
            algorithm: Algorithm::P256CmacAes128,
            auth_method: AuthenticationMethod::NoOob,
            device_auth: None,
            provisioner_auth: None,
            defer_auth_value: false,
            faults: Vec::new(),
            data: sample_data(),
            seed: 0,
        }
    }

    /// Device configuration.
    pub fn config(mut self, config: ProvisioneeConfig) -> Self {
        self.config = config;
        self
    }

    /// Algorithm the provisioner selects.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// OOB method the provisioner selects, and the value both sides agree on.
    ///
    /// For output/input OOB the device side receives `value` through its auth
    /// value request; for static OOB the device uses its configured value.
    pub fn auth(mut self, method: AuthenticationMethod, value: AuthValue) -> Self {
        self.auth_method = method;
        self.device_auth = Some(value);
        self
    }

    /// Auth value the provisioner uses, overriding the agreed one.
    pub fn provisioner_auth(mut self, value: AuthValue) -> Self {
        self.provisioner_auth = Some(value);
        self
    }

    /// Answer the device's auth value request only after the provisioner's
    /// Confirmation has arrived.
    pub fn defer_auth_value(mut self) -> Self {
        self.defer_auth_value = true;
        self
    }

    /// Inject a fault.
    pub fn fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Provisioning data the provisioner sends.
    pub fn data(mut self, data: ProvisioningData) -> Self {
        self.data = data;
        self
    }

    /// Seed for both actors' randomness.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Runs the handshake until the device completes, rejects a frame, or a
    /// fault closes the bearer, then runs the oracle. Harness-level problems
    /// (the device replied with an unexpected frame) fail the scenario before
    /// the oracle runs.
    pub fn run(self) -> Result<(), String> {
        let name = &self.scenario.name;
        let device =
            Provisionee::new(self.scenario.config.clone(), seeded_crypto(self.scenario.seed))
                .map_err(|e| format!("Scenario '{name}': invalid device config: {e}"))?;
        let provisioner = SimProvisioner::new(
            self.scenario.seed ^ 0x5EED,
            self.scenario.algorithm,
            self.scenario.auth_method,
            self.provisioner_auth()?,
        );

        let mut world = World::new(device, provisioner);
        self.drive(&mut world).map_err(|e| format!("Scenario '{name}': {e}"))?;
        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': {e}"))
    }

    fn provisioner_auth(&self) -> Result<AuthValue, String> {
        let scenario = &self.scenario;
        if let Some(value) = scenario.provisioner_auth.as_ref().or(scenario.device_auth.as_ref()) {
            return Ok(value.clone());
        }
        match scenario.auth_method {
            AuthenticationMethod::StaticOob => scenario
                .config
                .static_auth_value(scenario.algorithm)
                .unwrap_or_else(|| Ok(AuthValue::zero(scenario.algorithm)))
                .map_err(|e| e.to_string()),
            _ => Ok(AuthValue::zero(scenario.algorithm)),
        }
    }

    /// Deliver `frame`, honouring `CloseAfter`. `None` means the handshake
    /// stopped here.
    fn send(&self, world: &mut World, frame: PduFrame) -> Option<Vec<PduFrame>> {
        let pdu = frame.pdu_type();
        let replies = world.deliver(frame).ok()?;
        if self.scenario.has(Fault::CloseAfter(pdu)) {
            world.close_bearer();
            return None;
        }
        Some(replies)
    }

    fn drive(&self, world: &mut World) -> Result<(), String> {
        let scenario = &self.scenario;

        if scenario.has(Fault::SkipInvite) {
            let start = world.provisioner_mut().start();
            let _ = world.deliver(start);
            return Ok(());
        }

        let invite = world.provisioner_mut().invite(0);
        let Some(replies) = self.send(world, invite) else { return Ok(()) };
        world.provisioner_mut().on_capabilities(single(&replies, PduType::Capabilities)?)?;

        if scenario.has(Fault::InviteTwice) {
            let _ = world.deliver(PduFrame::Invite { attention_duration: 0 });
            return Ok(());
        }

        let start = world.provisioner_mut().start();
        let Some(replies) = self.send(world, start) else { return Ok(()) };
        none(&replies, PduType::Start)?;

        let mut public_key = world.provisioner_mut().public_key()?;
        if scenario.has(Fault::TruncatePublicKey)
            && let PduFrame::PublicKey { key } = &mut public_key
        {
            key.pop();
        }
        let Some(replies) = self.send(world, public_key) else { return Ok(()) };
        world.provisioner_mut().on_public_key(single(&replies, PduType::PublicKey)?)?;

        let mut deferred = None;
        if world.device_state() == ProvisioningState::AwaitingAuthValue {
            let value = scenario
                .device_auth
                .clone()
                .ok_or("device requested an auth value but the scenario has none")?;
            if scenario.defer_auth_value {
                deferred = Some(value);
            } else {
                let replies = world.supply_auth_value(value).map_err(|e| e.to_string())?;
                none(&replies, PduType::PublicKey)?;
            }
        }

        let confirmation = world.provisioner_mut().confirmation()?;
        let Some(mut replies) = self.send(world, confirmation) else { return Ok(()) };
        if let Some(value) = deferred {
            none(&replies, PduType::Confirmation)?;
            replies = world.supply_auth_value(value).map_err(|e| e.to_string())?;
        }
        world.provisioner_mut().on_confirmation(single(&replies, PduType::Confirmation)?)?;

        let random = world.provisioner().random()?;
        let Some(replies) = self.send(world, random) else { return Ok(()) };
        world.provisioner_mut().on_random(single(&replies, PduType::Random)?)?;

        let mut data = world.provisioner().data(&scenario.data)?;
        if scenario.has(Fault::CorruptMic)
            && let PduFrame::Data { mic, .. } = &mut data
            && let Some(byte) = mic.first_mut()
        {
            *byte ^= 0x01;
        }
        let Some(replies) = self.send(world, data) else { return Ok(()) };
        single(&replies, PduType::Complete)?;
        Ok(())
    }
}

/// The only reply must be a `pdu`.
fn single(replies: &[PduFrame], pdu: PduType) -> Result<&PduFrame, String> {
    match replies {
        [frame] if frame.pdu_type() == pdu => Ok(frame),
        other => Err(format!("expected a single {pdu} reply, got {other:?}")),
    }
}

/// There must be no reply to a `pdu`.
fn none(replies: &[PduFrame], pdu: PduType) -> Result<(), String> {
    if replies.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no reply to {pdu}, got {replies:?}"))
    }
}

/// Provisioning data used when a scenario does not set its own.
pub fn sample_data() -> ProvisioningData {
    ProvisioningData {
        network_key: [
            0xef, 0xb2, 0x25, 0x5e, 0x64, 0x22, 0xd3, 0x30, 0x08, 0x8e, 0x09, 0xbb, 0x01, 0x5e,
            0xd7, 0x07,
        ],
        key_index: 0x0567,
        flags: ProvisioningFlags::empty(),
        iv_index: 0x0102_0304,
        unicast_address: 0x0b0c,
    }
}
