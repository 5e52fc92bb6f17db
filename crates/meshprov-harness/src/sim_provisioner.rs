//! Simulated provisioner.
//!
//! Builds the initiator's half of the transcript and checks the device's
//! replies with the same crypto the device uses. Methods are called in
//! protocol order by the scenario runner or by a test; calling them out of
//! order returns an error string instead of panicking.

use meshprov_crypto::{
    AuthValue, CryptoProvider, KeyPair, SessionKeys, SharedSecret, confirmations_match,
};
use meshprov_proto::{
    Algorithm, AuthenticationMethod, PduFrame, ProvisioningData, PublicKeyType, StartParams,
};
use zeroize::Zeroizing;

use crate::{SimCrypto, seeded_crypto};

/// Initiator side of one handshake.
pub struct SimProvisioner {
    crypto: SimCrypto,
    start: StartParams,
    auth_value: AuthValue,
    inputs: Vec<u8>,
    key_pair: Option<KeyPair>,
    secret: Option<SharedSecret>,
    random: Option<Zeroizing<Vec<u8>>>,
    device_confirmation: Option<Vec<u8>>,
    session: Option<SessionKeys>,
}

impl SimProvisioner {
    /// Provisioner that will select `algorithm` and `auth_method` and
    /// authenticate with `auth_value`.
    pub fn new(
        seed: u64,
        algorithm: Algorithm,
        auth_method: AuthenticationMethod,
        auth_value: AuthValue,
    ) -> Self {
        Self {
            crypto: seeded_crypto(seed),
            start: StartParams { algorithm, public_key_type: PublicKeyType::InBand, auth_method },
            auth_value,
            inputs: Vec::new(),
            key_pair: None,
            secret: None,
            random: None,
            device_confirmation: None,
            session: None,
        }
    }

    /// No-OOB provisioner for `algorithm`.
    pub fn no_oob(seed: u64, algorithm: Algorithm) -> Self {
        Self::new(seed, algorithm, AuthenticationMethod::NoOob, AuthValue::zero(algorithm))
    }

    /// Selected parameters.
    pub fn start_params(&self) -> StartParams {
        self.start
    }

    /// Confirmation inputs accumulated so far.
    pub fn inputs(&self) -> &[u8] {
        &self.inputs
    }

    /// Own public key, once generated.
    pub fn own_public_key(&self) -> Option<&[u8; 64]> {
        self.key_pair.as_ref().map(KeyPair::public_key)
    }

    /// Invite PDU.
    pub fn invite(&mut self, attention_duration: u8) -> PduFrame {
        self.inputs.push(attention_duration);
        PduFrame::Invite { attention_duration }
    }

    /// Record the device's Capabilities.
    pub fn on_capabilities(&mut self, frame: &PduFrame) -> Result<(), String> {
        let PduFrame::Capabilities(caps) = frame else {
            return Err(format!("expected Capabilities, got {}", frame.pdu_type()));
        };
        self.inputs.extend_from_slice(&caps.to_bytes());
        Ok(())
    }

    /// Start PDU.
    pub fn start(&mut self) -> PduFrame {
        self.inputs.extend_from_slice(&self.start.to_bytes());
        PduFrame::Start(self.start)
    }

    /// Generate the provisioner key pair and return its PublicKey PDU.
    pub fn public_key(&mut self) -> Result<PduFrame, String> {
        if self.key_pair.is_some() {
            return Err("provisioner key pair already generated".into());
        }
        let key_pair =
            self.crypto.generate_key_pair(self.start.algorithm).map_err(|e| e.to_string())?;
        let key = key_pair.public_key().to_vec();
        self.inputs.extend_from_slice(&key);
        self.key_pair = Some(key_pair);
        Ok(PduFrame::PublicKey { key })
    }

    /// Record the device's PublicKey and run ECDH.
    pub fn on_public_key(&mut self, frame: &PduFrame) -> Result<(), String> {
        let PduFrame::PublicKey { key } = frame else {
            return Err(format!("expected PublicKey, got {}", frame.pdu_type()));
        };
        let own = self.key_pair.as_ref().ok_or("device key before provisioner key")?;
        let secret = self.crypto.ecdh(own, key).map_err(|e| e.to_string())?;
        self.inputs.extend_from_slice(key);
        self.secret = Some(secret);
        Ok(())
    }

    /// Draw the provisioner random and return the Confirmation PDU.
    pub fn confirmation(&mut self) -> Result<PduFrame, String> {
        let secret = self.secret.as_ref().ok_or("confirmation before ECDH")?;
        let random = self.crypto.random(self.start.algorithm.value_len());
        let value = self
            .crypto
            .confirmation(self.start.algorithm, &self.inputs, secret, &random, &self.auth_value)
            .map_err(|e| e.to_string())?;
        self.random = Some(random);
        Ok(PduFrame::Confirmation { value })
    }

    /// Record the device's Confirmation.
    pub fn on_confirmation(&mut self, frame: &PduFrame) -> Result<(), String> {
        let PduFrame::Confirmation { value } = frame else {
            return Err(format!("expected Confirmation, got {}", frame.pdu_type()));
        };
        self.device_confirmation = Some(value.clone());
        Ok(())
    }

    /// Random PDU revealing the provisioner random.
    pub fn random(&self) -> Result<PduFrame, String> {
        let random = self.random.as_ref().ok_or("random before confirmation")?;
        Ok(PduFrame::Random { value: random.to_vec() })
    }

    /// Check the device's Random against its Confirmation and derive the
    /// session keys.
    pub fn on_random(&mut self, frame: &PduFrame) -> Result<(), String> {
        let PduFrame::Random { value: device_random } = frame else {
            return Err(format!("expected Random, got {}", frame.pdu_type()));
        };
        let secret = self.secret.as_ref().ok_or("random before ECDH")?;
        let own_random = self.random.as_ref().ok_or("device random before own random")?;
        let committed =
            self.device_confirmation.as_deref().ok_or("device random before confirmation")?;

        let algorithm = self.start.algorithm;
        let expected = self
            .crypto
            .confirmation(algorithm, &self.inputs, secret, device_random, &self.auth_value)
            .map_err(|e| e.to_string())?;
        if !confirmations_match(&expected, committed) {
            return Err("device confirmation does not match its random".into());
        }

        let session = self
            .crypto
            .session_keys(algorithm, &self.inputs, secret, own_random, device_random)
            .map_err(|e| e.to_string())?;
        self.session = Some(session);
        Ok(())
    }

    /// Encrypted Data PDU carrying `data`.
    pub fn data(&self, data: &ProvisioningData) -> Result<PduFrame, String> {
        let session = self.session.as_ref().ok_or("data before session keys")?;
        let (encrypted, mic) = session.encrypt(&data.to_bytes()).map_err(|e| e.to_string())?;
        Ok(PduFrame::Data { encrypted, mic })
    }

    /// Device key, once the session keys exist.
    pub fn device_key(&self) -> Option<[u8; 16]> {
        self.session.as_ref().map(|session| *session.device_key())
    }
}

impl std::fmt::Debug for SimProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimProvisioner")
            .field("start", &self.start)
            .field("inputs_len", &self.inputs.len())
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}
