//! Responder-side provisioning state machine.
//!
//! # Architecture: Action-Based State Machine
//!
//! [`Provisionee::handle_frame`] takes one whole PDU and returns the actions
//! the driver must execute (send a frame, ask the host for an auth value,
//! hand over the provisioning result). The machine performs no I/O and never
//! waits; the only suspension point is between frames.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ Invite ┌──────────────────┐ Start ┌────────────────┐ Data ┌──────────┐
//! │ Idle │───────>│ CapabilitiesSent │──────>│ Authenticating │─────>│ Complete │
//! └──────┘        └──────────────────┘       └────────────────┘      └──────────┘
//!                                              │            ^
//!                                  own PublicKey│            │set_auth_value
//!                                   (input/output OOB)       │
//!                                              v            │
//!                                           ┌───────────────────┐
//!                                           │ AwaitingAuthValue │
//!                                           └───────────────────┘
//! ```
//!
//! Every non-terminal state falls into `Failed(reason)` on a bad frame. The
//! session data lives inside the phase it belongs to, so leaving a phase
//! drops (and zeroes) everything the session held.
//!
//! Inside `Authenticating` the handshake advances through PublicKey,
//! Confirmation, Random and Data in that order. A Random is accepted only
//! after the device sent its own confirmation, and Data only after the
//! provisioner's confirmation validated.

use std::{fmt, mem};

use meshprov_crypto::{AuthValue, CryptoProvider};
use meshprov_proto::{
    Algorithm, AuthenticationMethod, MIC_SIZE, PduFrame, PduType, ProvisioningData,
    PublicKeyType, StartParams,
};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    ConfigError, ConfirmationInputs, ExchangeError, FailureReason, KeyExchange,
    ProvisioneeConfig, ProvisioningError,
};

/// Externally visible protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    /// No session; waiting for an Invite.
    Idle,
    /// Capabilities sent, waiting for Start.
    CapabilitiesSent,
    /// Key exchange and authentication in progress.
    Authenticating,
    /// Waiting for the host to supply an OOB auth value.
    AwaitingAuthValue,
    /// Provisioning data received and delivered.
    Complete,
    /// The last session failed.
    Failed(FailureReason),
}

impl ProvisioningState {
    /// Whether a session is in flight.
    pub fn is_handshaking(self) -> bool {
        matches!(self, Self::CapabilitiesSent | Self::Authenticating | Self::AwaitingAuthValue)
    }
}

/// Actions for the driver to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningAction {
    /// Send this PDU to the provisioner.
    SendFrame(PduFrame),

    /// The session is suspended until [`Provisionee::set_auth_value`] is called.
    RequestAuthValue {
        /// Negotiated algorithm; fixes the auth value width.
        algorithm: Algorithm,
        /// Selected OOB method.
        method: AuthenticationMethod,
    },

    /// Provisioning succeeded; hand the result to the consumer.
    Provisioned(ProvisioningOutcome),
}

/// Result of a completed session.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    /// Decrypted provisioning data.
    pub data: ProvisioningData,
    /// Device key derived during the exchange.
    pub device_key: Zeroizing<[u8; 16]>,
}

impl fmt::Debug for ProvisioningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningOutcome")
            .field("data", &self.data)
            .field("device_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AwaitingPublicKey,
    AwaitingConfirmation,
    /// Peer confirmation stored while the auth value was pending.
    ConfirmationReceived,
    AwaitingRandom,
    AwaitingData,
}

#[derive(Debug)]
struct Session {
    start: StartParams,
    exchange: KeyExchange,
    step: Step,
}

enum Phase {
    Idle,
    CapabilitiesSent { inputs: ConfirmationInputs },
    Authenticating(Box<Session>),
    AwaitingAuthValue(Box<Session>),
    Complete,
    Failed(FailureReason),
}

type Transition = Result<(Phase, Vec<ProvisioningAction>), ProvisioningError>;

/// Provisioning state machine for one peer.
pub struct Provisionee<P> {
    config: ProvisioneeConfig,
    crypto: P,
    phase: Phase,
}

impl<P: CryptoProvider> Provisionee<P> {
    /// Machine in `Idle`.
    ///
    /// # Errors
    ///
    /// The configuration failed [`ProvisioneeConfig::validate`].
    pub fn new(config: ProvisioneeConfig, crypto: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config, crypto))
    }

    pub(crate) fn from_validated(config: ProvisioneeConfig, crypto: P) -> Self {
        Self { config, crypto, phase: Phase::Idle }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ProvisioningState {
        match &self.phase {
            Phase::Idle => ProvisioningState::Idle,
            Phase::CapabilitiesSent { .. } => ProvisioningState::CapabilitiesSent,
            Phase::Authenticating(_) => ProvisioningState::Authenticating,
            Phase::AwaitingAuthValue(_) => ProvisioningState::AwaitingAuthValue,
            Phase::Complete => ProvisioningState::Complete,
            Phase::Failed(reason) => ProvisioningState::Failed(*reason),
        }
    }

    /// Configuration this machine advertises.
    pub fn config(&self) -> &ProvisioneeConfig {
        &self.config
    }

    /// Process one inbound PDU.
    ///
    /// # Errors
    ///
    /// Any error returned while a session is in flight has already moved the
    /// machine to `Failed(err.reason())`. In `Idle`, `Failed` and `Complete` a
    /// frame that does not decode is returned as an error without a state
    /// change, and `Complete` rejects every frame the same way.
    pub fn handle_frame(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<ProvisioningAction>, ProvisioningError> {
        let state = self.state();

        let frame = match PduFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(err) => return Err(self.reject_undecodable(ProvisioningError::Decode(err))),
        };

        let pdu = frame.pdu_type();
        if state == ProvisioningState::Complete {
            return Err(ProvisioningError::InvalidState { state, pdu });
        }

        let phase = mem::replace(&mut self.phase, Phase::Idle);
        let transition = self.dispatch(phase, frame, state, pdu);
        self.apply(state, transition)
    }

    /// The bearer received a message that is not a PDU at all, such as a
    /// segmented proxy message or a line that is not hex.
    ///
    /// Handled like a PDU that fails to decode: an in-flight session fails
    /// with `MalformedPdu`, otherwise the message is dropped. Returns the
    /// error to report.
    pub fn on_malformed_frame(&mut self, detail: impl Into<String>) -> ProvisioningError {
        self.reject_undecodable(ProvisioningError::MalformedFrame(detail.into()))
    }

    /// Supply the OOB auth value requested by
    /// [`ProvisioningAction::RequestAuthValue`].
    ///
    /// # Errors
    ///
    /// - `NotAwaitingAuthValue` if no value was requested; the state is kept
    /// - `InvalidAuthValue` if the value has the wrong width; the machine keeps
    ///   waiting
    pub fn set_auth_value(
        &mut self,
        value: AuthValue,
    ) -> Result<Vec<ProvisioningAction>, ProvisioningError> {
        let state = self.state();
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AwaitingAuthValue(mut session) => {
                if let Err(err) = session.exchange.set_auth_value(value) {
                    self.phase = Phase::AwaitingAuthValue(session);
                    return Err(ProvisioningError::InvalidAuthValue(err));
                }
                let transition = self.resume(session);
                self.apply(state, transition)
            },
            other => {
                self.phase = other;
                Err(ProvisioningError::NotAwaitingAuthValue(state))
            },
        }
    }

    /// The bearer went away. Fails an in-flight session.
    pub fn on_bearer_closed(&mut self) {
        if self.state().is_handshaking() {
            self.fail(&ProvisioningError::TransportClosed);
        }
    }

    /// Discard any session and return to `Idle`.
    pub fn reset(&mut self) {
        let state = self.state();
        self.phase = Phase::Idle;
        debug!(from = ?state, "reset to idle");
    }

    fn reject_undecodable(&mut self, err: ProvisioningError) -> ProvisioningError {
        let state = self.state();
        if state.is_handshaking() {
            self.fail(&err);
        } else {
            debug!(?state, error = %err, "dropping undecodable frame");
        }
        err
    }

    fn dispatch(
        &mut self,
        phase: Phase,
        frame: PduFrame,
        state: ProvisioningState,
        pdu: PduType,
    ) -> Transition {
        match (phase, frame) {
            (Phase::Idle | Phase::Failed(_), PduFrame::Invite { attention_duration }) => {
                self.on_invite(attention_duration)
            },
            (Phase::CapabilitiesSent { inputs }, PduFrame::Start(params)) => {
                self.on_start(inputs, params)
            },
            (Phase::Authenticating(session), frame) => self.on_handshake_frame(session, frame),
            (Phase::AwaitingAuthValue(mut session), PduFrame::Confirmation { value })
                if session.step == Step::AwaitingConfirmation =>
            {
                session.exchange.accept_peer_confirmation(&value)?;
                session.step = Step::ConfirmationReceived;
                Ok((Phase::AwaitingAuthValue(session), Vec::new()))
            },
            _ => Err(ProvisioningError::InvalidState { state, pdu }),
        }
    }

    fn on_invite(&mut self, attention_duration: u8) -> Transition {
        let capabilities = self.config.capabilities();

        let mut inputs = ConfirmationInputs::new();
        inputs.accumulate(&[attention_duration])?;
        inputs.accumulate(&capabilities.to_bytes())?;

        debug!(attention_duration, "invited");
        Ok((
            Phase::CapabilitiesSent { inputs },
            vec![ProvisioningAction::SendFrame(PduFrame::Capabilities(capabilities))],
        ))
    }

    fn on_start(&mut self, mut inputs: ConfirmationInputs, start: StartParams) -> Transition {
        let capabilities = self.config.capabilities();
        if !capabilities.supports_algorithm(start.algorithm) {
            return Err(ProvisioningError::UnsupportedAlgorithm(start.algorithm));
        }
        if start.public_key_type != PublicKeyType::InBand {
            return Err(ProvisioningError::UnsupportedPublicKeyType);
        }
        if !capabilities.supports_auth(&start.auth_method) {
            return Err(ProvisioningError::UnsupportedAuthMethod(start.auth_method));
        }

        inputs.accumulate(&start.to_bytes())?;
        let mut exchange = KeyExchange::new(start.algorithm, inputs);

        match start.auth_method {
            AuthenticationMethod::NoOob => {
                exchange.set_auth_value(AuthValue::zero(start.algorithm))?;
            },
            AuthenticationMethod::StaticOob => {
                let value = self
                    .config
                    .static_auth_value(start.algorithm)
                    .ok_or(ProvisioningError::UnsupportedAuthMethod(start.auth_method))?
                    .map_err(ExchangeError::Crypto)?;
                exchange.set_auth_value(value)?;
            },
            AuthenticationMethod::OutputOob { .. } | AuthenticationMethod::InputOob { .. } => {},
        }

        debug!(algorithm = ?start.algorithm, method = ?start.auth_method, "start accepted");
        let session = Session { start, exchange, step: Step::AwaitingPublicKey };
        Ok((Phase::Authenticating(Box::new(session)), Vec::new()))
    }

    fn on_handshake_frame(&mut self, mut session: Box<Session>, frame: PduFrame) -> Transition {
        let state = ProvisioningState::Authenticating;
        match (session.step, frame) {
            (Step::AwaitingPublicKey, PduFrame::PublicKey { key }) => {
                self.on_public_key(session, &key)
            },
            (Step::AwaitingConfirmation, PduFrame::Confirmation { value }) => {
                session.exchange.accept_peer_confirmation(&value)?;
                let reply = self.send_own_confirmation(&mut session)?;
                Ok((Phase::Authenticating(session), vec![reply]))
            },
            (Step::AwaitingRandom, PduFrame::Random { value }) => {
                session.exchange.accept_peer_random(&value)?;
                if let Err(err) = session.exchange.validate_peer_confirmation(&self.crypto) {
                    if err == ExchangeError::ConfirmationMismatch {
                        warn!(security = true, "provisioner confirmation did not validate");
                    }
                    return Err(err.into());
                }
                let random = session.exchange.own_random()?.to_vec();
                session.step = Step::AwaitingData;
                debug!("provisioner confirmation validated");
                Ok((
                    Phase::Authenticating(session),
                    vec![ProvisioningAction::SendFrame(PduFrame::Random { value: random })],
                ))
            },
            (Step::AwaitingData, PduFrame::Data { encrypted, mic }) => {
                self.on_data(&session, &encrypted, &mic)
            },
            (_, frame) => Err(ProvisioningError::InvalidState { state, pdu: frame.pdu_type() }),
        }
    }

    fn on_public_key(&mut self, mut session: Box<Session>, peer_key: &[u8]) -> Transition {
        let algorithm = session.start.algorithm;
        let exchange = &mut session.exchange;

        let own_key = exchange.generate_key_pair(&mut self.crypto, algorithm)?;
        exchange.derive_shared_secret(&self.crypto, peer_key)?;
        exchange.accumulate(peer_key)?;
        exchange.accumulate(&own_key)?;

        session.step = Step::AwaitingConfirmation;
        let mut actions =
            vec![ProvisioningAction::SendFrame(PduFrame::PublicKey { key: own_key.to_vec() })];

        if session.exchange.has_auth_value() {
            return Ok((Phase::Authenticating(session), actions));
        }

        debug!(method = ?session.start.auth_method, "waiting for OOB auth value");
        actions.push(ProvisioningAction::RequestAuthValue {
            algorithm,
            method: session.start.auth_method,
        });
        Ok((Phase::AwaitingAuthValue(session), actions))
    }

    fn on_data(
        &mut self,
        session: &Session,
        encrypted: &[u8],
        mic: &[u8; MIC_SIZE],
    ) -> Transition {
        let payload = session.exchange.decrypt_payload(&self.crypto, encrypted, mic)?;
        let data = ProvisioningData::from_bytes(&payload.plaintext)
            .map_err(ProvisioningError::InvalidProvisioningData)?;

        info!(
            unicast_address = data.unicast_address,
            key_index = data.key_index,
            iv_index = data.iv_index,
            "provisioning complete"
        );
        let outcome = ProvisioningOutcome { data, device_key: payload.device_key };
        Ok((
            Phase::Complete,
            vec![
                ProvisioningAction::Provisioned(outcome),
                ProvisioningAction::SendFrame(PduFrame::Complete),
            ],
        ))
    }

    fn resume(&mut self, mut session: Box<Session>) -> Transition {
        if session.step != Step::ConfirmationReceived {
            return Ok((Phase::Authenticating(session), Vec::new()));
        }
        let reply = self.send_own_confirmation(&mut session)?;
        Ok((Phase::Authenticating(session), vec![reply]))
    }

    fn send_own_confirmation(
        &mut self,
        session: &mut Session,
    ) -> Result<ProvisioningAction, ProvisioningError> {
        let value = session.exchange.compute_own_confirmation(&mut self.crypto)?;
        session.step = Step::AwaitingRandom;
        Ok(ProvisioningAction::SendFrame(PduFrame::Confirmation { value }))
    }

    fn apply(
        &mut self,
        from: ProvisioningState,
        transition: Transition,
    ) -> Result<Vec<ProvisioningAction>, ProvisioningError> {
        match transition {
            Ok((next, actions)) => {
                self.phase = next;
                let to = self.state();
                if to != from {
                    debug!(?from, ?to, "state transition");
                }
                Ok(actions)
            },
            Err(err) => {
                self.fail(&err);
                Err(err)
            },
        }
    }

    fn fail(&mut self, err: &ProvisioningError) {
        let reason = err.reason();
        let from = self.state();
        self.phase = Phase::Failed(reason);
        warn!(
            ?from,
            ?reason,
            security = reason.is_security_relevant(),
            error = %err,
            "provisioning failed"
        );
    }
}

impl<P> fmt::Debug for Provisionee<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &self.phase {
            Phase::Idle => "Idle",
            Phase::CapabilitiesSent { .. } => "CapabilitiesSent",
            Phase::Authenticating(_) => "Authenticating",
            Phase::AwaitingAuthValue(_) => "AwaitingAuthValue",
            Phase::Complete => "Complete",
            Phase::Failed(_) => "Failed",
        };
        f.debug_struct("Provisionee").field("config", &self.config).field("phase", &phase).finish()
    }
}

#[cfg(test)]
mod tests {
    use meshprov_crypto::MeshCrypto;
    use meshprov_proto::{DecodeError, ErrorCode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn provisionee() -> Provisionee<MeshCrypto<ChaCha20Rng>> {
        Provisionee::new(
            ProvisioneeConfig::default(),
            MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(7)),
        )
        .unwrap()
    }

    fn start_no_oob() -> Vec<u8> {
        PduFrame::Start(StartParams {
            algorithm: Algorithm::P256CmacAes128,
            public_key_type: PublicKeyType::InBand,
            auth_method: AuthenticationMethod::NoOob,
        })
        .encode()
        .to_vec()
    }

    #[test]
    fn invite_sends_capabilities() {
        let mut device = provisionee();
        let actions = device.handle_frame(&[0x00, 0x05]).unwrap();

        assert_eq!(device.state(), ProvisioningState::CapabilitiesSent);
        assert_eq!(
            actions,
            vec![ProvisioningAction::SendFrame(PduFrame::Capabilities(
                ProvisioneeConfig::default().capabilities()
            ))]
        );
    }

    #[test]
    fn start_in_idle_fails_without_reply() {
        let mut device = provisionee();
        let err = device.handle_frame(&start_no_oob()).unwrap_err();

        assert_eq!(
            err,
            ProvisioningError::InvalidState {
                state: ProvisioningState::Idle,
                pdu: PduType::Start
            }
        );
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::InvalidState));
    }

    #[test]
    fn second_invite_mid_handshake_fails() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        assert!(device.handle_frame(&[0x00, 0x00]).is_err());
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::InvalidState));
    }

    #[test]
    fn invite_restarts_after_failure() {
        let mut device = provisionee();
        device.handle_frame(&start_no_oob()).unwrap_err();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        assert_eq!(device.state(), ProvisioningState::CapabilitiesSent);
    }

    #[test]
    fn garbage_in_idle_keeps_state() {
        let mut device = provisionee();
        assert_eq!(
            device.handle_frame(&[]).unwrap_err(),
            ProvisioningError::Decode(DecodeError::Empty)
        );
        assert_eq!(
            device.handle_frame(&[0xEE]).unwrap_err(),
            ProvisioningError::Decode(DecodeError::UnknownType(0xEE))
        );
        assert_eq!(device.state(), ProvisioningState::Idle);
    }

    #[test]
    fn garbage_mid_handshake_fails_session() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        let err = device.handle_frame(&[0x42]).unwrap_err();

        assert_eq!(err.reason(), FailureReason::UnknownPdu);
        assert_eq!(err.reason().error_code(), Some(ErrorCode::InvalidPdu));
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::UnknownPdu));
    }

    #[test]
    fn malformed_bearer_message_follows_decode_rules() {
        let mut device = provisionee();
        let err = device.on_malformed_frame("segmented");
        assert_eq!(err, ProvisioningError::MalformedFrame("segmented".into()));
        assert_eq!(device.state(), ProvisioningState::Idle);

        device.handle_frame(&[0x00, 0x00]).unwrap();
        let err = device.on_malformed_frame("segmented");
        assert_eq!(err.reason().error_code(), Some(ErrorCode::InvalidFormat));
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::MalformedPdu));
    }

    #[test]
    fn start_with_unadvertised_algorithm_rejected() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        let start = PduFrame::Start(StartParams {
            algorithm: Algorithm::P256HmacSha256,
            public_key_type: PublicKeyType::InBand,
            auth_method: AuthenticationMethod::NoOob,
        });

        let err = device.handle_frame(&start.encode()).unwrap_err();
        assert_eq!(err, ProvisioningError::UnsupportedAlgorithm(Algorithm::P256HmacSha256));
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::UnsupportedAlgorithm));
    }

    #[test]
    fn start_with_oob_public_key_rejected() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        let start = PduFrame::Start(StartParams {
            algorithm: Algorithm::P256CmacAes128,
            public_key_type: PublicKeyType::OutOfBand,
            auth_method: AuthenticationMethod::NoOob,
        });

        device.handle_frame(&start.encode()).unwrap_err();
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::UnsupportedAuthMethod));
    }

    #[test]
    fn random_before_confirmation_rejected() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        device.handle_frame(&start_no_oob()).unwrap();

        let random = PduFrame::Random { value: vec![0; 16] }.encode();
        let err = device.handle_frame(&random).unwrap_err();
        assert_eq!(
            err,
            ProvisioningError::InvalidState {
                state: ProvisioningState::Authenticating,
                pdu: PduType::Random
            }
        );
    }

    #[test]
    fn short_public_key_fails_as_malformed() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();
        device.handle_frame(&start_no_oob()).unwrap();

        let key = PduFrame::PublicKey { key: vec![0x11; 63] }.encode();
        device.handle_frame(&key).unwrap_err();
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::MalformedPdu));
    }

    #[test]
    fn complete_rejects_without_state_change() {
        let mut device = provisionee();
        device.phase = Phase::Complete;

        let err = device.handle_frame(&[0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ProvisioningError::InvalidState { .. }));
        assert_eq!(device.state(), ProvisioningState::Complete);

        device.reset();
        assert_eq!(device.state(), ProvisioningState::Idle);
    }

    #[test]
    fn auth_value_outside_request_is_host_error() {
        let mut device = provisionee();
        device.handle_frame(&[0x00, 0x00]).unwrap();

        let err = device.set_auth_value(AuthValue::zero(Algorithm::P256CmacAes128)).unwrap_err();
        assert_eq!(
            err,
            ProvisioningError::NotAwaitingAuthValue(ProvisioningState::CapabilitiesSent)
        );
        assert_eq!(device.state(), ProvisioningState::CapabilitiesSent);
    }

    #[test]
    fn bearer_close_fails_only_in_flight_sessions() {
        let mut device = provisionee();
        device.on_bearer_closed();
        assert_eq!(device.state(), ProvisioningState::Idle);

        device.handle_frame(&[0x00, 0x00]).unwrap();
        device.on_bearer_closed();
        assert_eq!(device.state(), ProvisioningState::Failed(FailureReason::TransportClosed));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ProvisioneeConfig { element_count: 0, ..Default::default() };
        assert_eq!(
            Provisionee::new(config, MeshCrypto::new()).unwrap_err(),
            ConfigError::NoElements
        );
    }
}
