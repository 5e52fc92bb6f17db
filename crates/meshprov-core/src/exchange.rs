//! Key exchange engine.
//!
//! Sequences the cryptography of one session and enforces that every value
//! is written once and only used after the values it depends on exist:
//!
//! ```text
//! generate_key_pair ─> derive_shared_secret ─┐
//!                      set_auth_value ───────┼─> compute_own_confirmation
//!                      accept_peer_confirmation ─┘          │
//!                                                           v
//!                 accept_peer_random ─> validate_peer_confirmation ─> decrypt_payload
//! ```
//!
//! Primitive operations are delegated to a [`CryptoProvider`] passed into each
//! call, so one provider (and its RNG) can serve many sessions.

use meshprov_crypto::{
    AuthValue, CryptoError, CryptoProvider, KeyPair, SharedSecret, confirmations_match,
};
use meshprov_proto::{Algorithm, MIC_SIZE, PUBLIC_KEY_SIZE};
use zeroize::Zeroizing;

use crate::{ConfirmationInputs, ExchangeError};

/// Plaintext and device key recovered from the Data PDU.
pub struct DecryptedPayload {
    /// Decrypted provisioning data.
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Device key derived alongside the session key.
    pub device_key: Zeroizing<[u8; 16]>,
}

/// Key exchange state for one session.
pub struct KeyExchange {
    algorithm: Algorithm,
    inputs: ConfirmationInputs,
    key_pair: Option<KeyPair>,
    shared_secret: Option<SharedSecret>,
    auth_value: Option<AuthValue>,
    own_random: Option<Zeroizing<Vec<u8>>>,
    own_confirmation: Option<Vec<u8>>,
    peer_confirmation: Option<Vec<u8>>,
    peer_random: Option<Vec<u8>>,
    confirmed: bool,
}

impl KeyExchange {
    /// Engine for `algorithm`, continuing the inputs accumulated so far.
    pub fn new(algorithm: Algorithm, inputs: ConfirmationInputs) -> Self {
        Self {
            algorithm,
            inputs,
            key_pair: None,
            shared_secret: None,
            auth_value: None,
            own_random: None,
            own_confirmation: None,
            peer_confirmation: None,
            peer_random: None,
            confirmed: false,
        }
    }

    /// Negotiated algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Append a PDU payload to the confirmation inputs.
    pub fn accumulate(&mut self, payload: &[u8]) -> Result<(), ExchangeError> {
        self.inputs.accumulate(payload)
    }

    /// Confirmation inputs accumulated so far.
    pub fn inputs(&self) -> &ConfirmationInputs {
        &self.inputs
    }

    /// Own public key, once generated.
    pub fn public_key(&self) -> Option<&[u8; PUBLIC_KEY_SIZE]> {
        self.key_pair.as_ref().map(KeyPair::public_key)
    }

    /// Whether an auth value has been supplied.
    pub fn has_auth_value(&self) -> bool {
        self.auth_value.is_some()
    }

    /// Whether the peer confirmation has been validated.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Generate the session key pair and return the public key.
    pub fn generate_key_pair<P: CryptoProvider>(
        &mut self,
        crypto: &mut P,
        algorithm: Algorithm,
    ) -> Result<[u8; PUBLIC_KEY_SIZE], ExchangeError> {
        if algorithm != self.algorithm {
            return Err(ExchangeError::UnsupportedAlgorithm {
                requested: algorithm,
                negotiated: self.algorithm,
            });
        }
        if self.key_pair.is_some() {
            return Err(ExchangeError::AlreadySet("key pair"));
        }

        let key_pair = crypto.generate_key_pair(algorithm).map_err(ExchangeError::Crypto)?;
        let public = *key_pair.public_key();
        self.key_pair = Some(key_pair);
        Ok(public)
    }

    /// ECDH with the peer public key.
    pub fn derive_shared_secret<P: CryptoProvider>(
        &mut self,
        crypto: &P,
        peer_public_key: &[u8],
    ) -> Result<(), ExchangeError> {
        let own = self.key_pair.as_ref().ok_or(ExchangeError::InvalidState {
            operation: "derive_shared_secret",
            missing: "own key pair",
        })?;
        if self.shared_secret.is_some() {
            return Err(ExchangeError::AlreadySet("shared secret"));
        }
        if peer_public_key.len() != PUBLIC_KEY_SIZE {
            return Err(ExchangeError::InvalidLength {
                field: "public key",
                expected: PUBLIC_KEY_SIZE,
                actual: peer_public_key.len(),
            });
        }
        if peer_public_key == own.public_key().as_slice() {
            return Err(ExchangeError::ReflectedPublicKey);
        }

        let secret =
            crypto.ecdh(own, peer_public_key).map_err(ExchangeError::KeyAgreementFailed)?;
        self.shared_secret = Some(secret);
        Ok(())
    }

    /// Store the auth value for this session.
    pub fn set_auth_value(&mut self, value: AuthValue) -> Result<(), ExchangeError> {
        self.check_width("auth value", value.len())?;
        if self.auth_value.is_some() {
            return Err(ExchangeError::AlreadySet("auth value"));
        }
        self.auth_value = Some(value);
        Ok(())
    }

    /// Draw the own random and compute the confirmation sent to the peer.
    ///
    /// Seals the confirmation inputs.
    pub fn compute_own_confirmation<P: CryptoProvider>(
        &mut self,
        crypto: &mut P,
    ) -> Result<Vec<u8>, ExchangeError> {
        if self.own_confirmation.is_some() {
            return Err(ExchangeError::AlreadySet("own confirmation"));
        }
        let secret = self.shared_secret.as_ref().ok_or(ExchangeError::InvalidState {
            operation: "compute_own_confirmation",
            missing: "shared secret",
        })?;
        let auth = self.auth_value.as_ref().ok_or(ExchangeError::InvalidState {
            operation: "compute_own_confirmation",
            missing: "auth value",
        })?;

        let random = crypto.random(self.algorithm.value_len());
        let confirmation = crypto
            .confirmation(self.algorithm, self.inputs.snapshot(), secret, &random, auth)
            .map_err(ExchangeError::Crypto)?;

        self.own_random = Some(random);
        self.own_confirmation = Some(confirmation.clone());
        Ok(confirmation)
    }

    /// Store the peer confirmation.
    pub fn accept_peer_confirmation(&mut self, value: &[u8]) -> Result<(), ExchangeError> {
        self.check_width("confirmation", value.len())?;
        if self.peer_confirmation.is_some() {
            return Err(ExchangeError::AlreadySet("peer confirmation"));
        }
        self.peer_confirmation = Some(value.to_vec());
        Ok(())
    }

    /// Store the peer random. Only valid once the own confirmation was sent.
    pub fn accept_peer_random(&mut self, value: &[u8]) -> Result<(), ExchangeError> {
        if self.own_confirmation.is_none() {
            return Err(ExchangeError::InvalidState {
                operation: "accept_peer_random",
                missing: "own confirmation",
            });
        }
        self.check_width("random", value.len())?;
        if self.peer_random.is_some() {
            return Err(ExchangeError::AlreadySet("peer random"));
        }
        self.peer_random = Some(value.to_vec());
        Ok(())
    }

    /// Recompute the peer confirmation from its random and compare.
    ///
    /// # Errors
    ///
    /// `ConfirmationMismatch` if the values differ, or if the peer echoed the
    /// device's own confirmation back.
    pub fn validate_peer_confirmation<P: CryptoProvider>(
        &mut self,
        crypto: &P,
    ) -> Result<(), ExchangeError> {
        const OP: &str = "validate_peer_confirmation";

        if self.confirmed {
            return Err(ExchangeError::AlreadySet("validated confirmation"));
        }
        let peer_confirmation = self
            .peer_confirmation
            .as_deref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "peer confirmation" })?;
        let peer_random = self
            .peer_random
            .as_deref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "peer random" })?;
        let own_confirmation = self
            .own_confirmation
            .as_deref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "own confirmation" })?;
        let secret = self
            .shared_secret
            .as_ref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "shared secret" })?;
        let auth = self
            .auth_value
            .as_ref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "auth value" })?;

        if confirmations_match(own_confirmation, peer_confirmation) {
            return Err(ExchangeError::ConfirmationMismatch);
        }

        let expected = crypto
            .confirmation(self.algorithm, self.inputs.snapshot(), secret, peer_random, auth)
            .map_err(ExchangeError::Crypto)?;
        if !confirmations_match(&expected, peer_confirmation) {
            return Err(ExchangeError::ConfirmationMismatch);
        }

        self.confirmed = true;
        Ok(())
    }

    /// Own random, revealed only after the peer confirmation validated.
    pub fn own_random(&self) -> Result<&[u8], ExchangeError> {
        if !self.confirmed {
            return Err(ExchangeError::InvalidState {
                operation: "own_random",
                missing: "validated peer confirmation",
            });
        }
        self.own_random.as_deref().map(Vec::as_slice).ok_or(ExchangeError::InvalidState {
            operation: "own_random",
            missing: "own random",
        })
    }

    /// Derive the session keys and decrypt the provisioning data.
    pub fn decrypt_payload<P: CryptoProvider>(
        &self,
        crypto: &P,
        ciphertext: &[u8],
        mic: &[u8; MIC_SIZE],
    ) -> Result<DecryptedPayload, ExchangeError> {
        const OP: &str = "decrypt_payload";

        if !self.confirmed {
            return Err(ExchangeError::InvalidState {
                operation: OP,
                missing: "validated peer confirmation",
            });
        }
        let inputs = self
            .inputs
            .sealed_bytes()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "sealed inputs" })?;
        let secret = self
            .shared_secret
            .as_ref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "shared secret" })?;
        let peer_random = self
            .peer_random
            .as_deref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "peer random" })?;
        let own_random = self
            .own_random
            .as_deref()
            .ok_or(ExchangeError::InvalidState { operation: OP, missing: "own random" })?;

        let keys = crypto
            .session_keys(self.algorithm, inputs, secret, peer_random, own_random)
            .map_err(ExchangeError::Crypto)?;
        let plaintext = crypto.decrypt(&keys, ciphertext, mic).map_err(|err| match err {
            CryptoError::Authentication => ExchangeError::DecryptionFailed,
            other => ExchangeError::Crypto(other),
        })?;

        Ok(DecryptedPayload { plaintext, device_key: Zeroizing::new(*keys.device_key()) })
    }

    fn check_width(&self, field: &'static str, actual: usize) -> Result<(), ExchangeError> {
        let expected = self.algorithm.value_len();
        if actual == expected {
            Ok(())
        } else {
            Err(ExchangeError::InvalidLength { field, expected, actual })
        }
    }
}

impl std::fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyExchange")
            .field("algorithm", &self.algorithm)
            .field("inputs", &self.inputs)
            .field("has_key_pair", &self.key_pair.is_some())
            .field("has_shared_secret", &self.shared_secret.is_some())
            .field("has_auth_value", &self.auth_value.is_some())
            .field("confirmed", &self.confirmed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use meshprov_crypto::{MeshCrypto, compute_confirmation};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    const ALG: Algorithm = Algorithm::P256CmacAes128;

    fn crypto(seed: u64) -> MeshCrypto<ChaCha20Rng> {
        MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn engine() -> KeyExchange {
        let mut inputs = ConfirmationInputs::new();
        inputs.accumulate(b"invite caps start").unwrap();
        KeyExchange::new(ALG, inputs)
    }

    /// Engine through ECDH plus the provisioner's key pair.
    fn keyed(device: &mut MeshCrypto<ChaCha20Rng>) -> (KeyExchange, KeyPair) {
        let mut peer_crypto = crypto(99);
        let peer = peer_crypto.generate_key_pair(ALG).unwrap();

        let mut exchange = engine();
        exchange.accumulate(peer.public_key()).unwrap();
        let own = exchange.generate_key_pair(device, ALG).unwrap();
        exchange.derive_shared_secret(device, peer.public_key()).unwrap();
        exchange.accumulate(&own).unwrap();
        (exchange, peer)
    }

    #[test]
    fn key_generation_rejects_other_algorithm() {
        let mut device = crypto(1);
        let mut exchange = engine();
        assert_eq!(
            exchange.generate_key_pair(&mut device, Algorithm::P256HmacSha256),
            Err(ExchangeError::UnsupportedAlgorithm {
                requested: Algorithm::P256HmacSha256,
                negotiated: ALG,
            })
        );
    }

    #[test]
    fn key_pair_is_write_once() {
        let mut device = crypto(1);
        let mut exchange = engine();
        exchange.generate_key_pair(&mut device, ALG).unwrap();
        assert_eq!(
            exchange.generate_key_pair(&mut device, ALG),
            Err(ExchangeError::AlreadySet("key pair"))
        );
    }

    #[test]
    fn shared_secret_requires_key_pair() {
        let device = crypto(1);
        let mut exchange = engine();
        assert!(matches!(
            exchange.derive_shared_secret(&device, &[0u8; 64]),
            Err(ExchangeError::InvalidState { missing: "own key pair", .. })
        ));
    }

    #[test]
    fn reflected_public_key_rejected() {
        let mut device = crypto(1);
        let mut exchange = engine();
        let own = exchange.generate_key_pair(&mut device, ALG).unwrap();
        assert_eq!(
            exchange.derive_shared_secret(&device, &own),
            Err(ExchangeError::ReflectedPublicKey)
        );
    }

    #[test]
    fn off_curve_key_fails_agreement() {
        let mut device = crypto(1);
        let mut exchange = engine();
        exchange.generate_key_pair(&mut device, ALG).unwrap();
        assert!(matches!(
            exchange.derive_shared_secret(&device, &[0x11; 64]),
            Err(ExchangeError::KeyAgreementFailed(_))
        ));
    }

    #[test]
    fn confirmation_requires_auth_value() {
        let mut device = crypto(2);
        let (mut exchange, _) = keyed(&mut device);
        assert!(matches!(
            exchange.compute_own_confirmation(&mut device),
            Err(ExchangeError::InvalidState { missing: "auth value", .. })
        ));
    }

    #[test]
    fn own_confirmation_seals_inputs() {
        let mut device = crypto(3);
        let (mut exchange, _) = keyed(&mut device);
        exchange.set_auth_value(AuthValue::zero(ALG)).unwrap();
        exchange.compute_own_confirmation(&mut device).unwrap();
        assert!(exchange.inputs().is_sealed());
        assert_eq!(exchange.accumulate(&[0]), Err(ExchangeError::InputsSealed));
    }

    #[test]
    fn peer_random_before_own_confirmation_rejected() {
        let mut device = crypto(4);
        let (mut exchange, _) = keyed(&mut device);
        assert!(matches!(
            exchange.accept_peer_random(&[0; 16]),
            Err(ExchangeError::InvalidState { missing: "own confirmation", .. })
        ));
    }

    #[test]
    fn decrypt_before_validation_rejected() {
        let device = crypto(5);
        let exchange = engine();
        assert!(matches!(
            exchange.decrypt_payload(&device, &[0; 25], &[0; 8]),
            Err(ExchangeError::InvalidState { missing: "validated peer confirmation", .. })
        ));
    }

    #[test]
    fn honest_peer_validates_and_wrong_random_does_not() {
        for tamper in [false, true] {
            let mut device = crypto(6);
            let (mut exchange, peer) = keyed(&mut device);
            let auth = AuthValue::zero(ALG);
            exchange.set_auth_value(auth.clone()).unwrap();

            let peer_secret = peer.agree(exchange.public_key().unwrap()).unwrap();
            let peer_random = [0x42u8; 16];
            let inputs = exchange.inputs.snapshot().to_vec();
            let peer_confirmation =
                compute_confirmation(ALG, &inputs, &peer_secret, &peer_random, &auth).unwrap();

            exchange.accept_peer_confirmation(&peer_confirmation).unwrap();
            exchange.compute_own_confirmation(&mut device).unwrap();

            let mut revealed = peer_random;
            if tamper {
                revealed[0] ^= 1;
            }
            exchange.accept_peer_random(&revealed).unwrap();

            let result = exchange.validate_peer_confirmation(&device);
            if tamper {
                assert_eq!(result, Err(ExchangeError::ConfirmationMismatch));
                assert!(exchange.own_random().is_err());
            } else {
                assert_eq!(result, Ok(()));
                assert_eq!(exchange.own_random().unwrap().len(), 16);
            }
        }
    }

    #[test]
    fn echoed_confirmation_rejected() {
        let mut device = crypto(7);
        let (mut exchange, _) = keyed(&mut device);
        exchange.set_auth_value(AuthValue::zero(ALG)).unwrap();
        let own = exchange.compute_own_confirmation(&mut device).unwrap();
        exchange.accept_peer_confirmation(&own).unwrap();
        exchange.accept_peer_random(&[0; 16]).unwrap();
        assert_eq!(
            exchange.validate_peer_confirmation(&device),
            Err(ExchangeError::ConfirmationMismatch)
        );
    }

    #[test]
    fn wrong_width_values_rejected() {
        let mut exchange = engine();
        assert_eq!(
            exchange.accept_peer_confirmation(&[0; 32]),
            Err(ExchangeError::InvalidLength { field: "confirmation", expected: 16, actual: 32 })
        );
        assert!(exchange.set_auth_value(AuthValue::zero(Algorithm::P256HmacSha256)).is_err());
    }
}
