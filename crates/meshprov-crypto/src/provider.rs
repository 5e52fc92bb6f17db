//! Crypto provider seam.
//!
//! The key exchange engine only talks to [`CryptoProvider`]. Randomness is the
//! one thing a provider must supply; the deterministic primitives have
//! default implementations that providers rarely need to override.

use meshprov_proto::{Algorithm, MIC_SIZE};
use rand::{CryptoRng, RngCore, rngs::OsRng};
use zeroize::Zeroizing;

use crate::{AuthValue, CryptoError, KeyPair, SessionKeys, SharedSecret, compute_confirmation};

/// Cryptographic operations used during provisioning.
pub trait CryptoProvider {
    /// Generate an ephemeral key pair for `algorithm`.
    fn generate_key_pair(&mut self, algorithm: Algorithm) -> Result<KeyPair, CryptoError>;

    /// Produce `len` fresh random bytes.
    fn random(&mut self, len: usize) -> Zeroizing<Vec<u8>>;

    /// ECDH between the own key pair and a peer public key.
    fn ecdh(&self, own: &KeyPair, peer: &[u8]) -> Result<SharedSecret, CryptoError> {
        own.agree(peer)
    }

    /// Confirmation value over `random`.
    fn confirmation(
        &self,
        algorithm: Algorithm,
        inputs: &[u8],
        secret: &SharedSecret,
        random: &[u8],
        auth: &AuthValue,
    ) -> Result<Vec<u8>, CryptoError> {
        compute_confirmation(algorithm, inputs, secret, random, auth)
    }

    /// Session key, nonce and device key.
    fn session_keys(
        &self,
        algorithm: Algorithm,
        inputs: &[u8],
        secret: &SharedSecret,
        provisioner_random: &[u8],
        device_random: &[u8],
    ) -> Result<SessionKeys, CryptoError> {
        SessionKeys::derive(algorithm, inputs, secret, provisioner_random, device_random)
    }

    /// Authenticated decryption of the provisioning data.
    fn decrypt(
        &self,
        keys: &SessionKeys,
        ciphertext: &[u8],
        mic: &[u8; MIC_SIZE],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        keys.decrypt(ciphertext, mic)
    }
}

/// Default provider over any cryptographically secure RNG.
#[derive(Debug, Clone)]
pub struct MeshCrypto<R = OsRng> {
    rng: R,
}

impl MeshCrypto<OsRng> {
    /// Provider backed by the operating system RNG.
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for MeshCrypto<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> MeshCrypto<R> {
    /// Provider backed by `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore + CryptoRng> CryptoProvider for MeshCrypto<R> {
    fn generate_key_pair(&mut self, _algorithm: Algorithm) -> Result<KeyPair, CryptoError> {
        // Both algorithms run ECDH on P-256.
        KeyPair::generate(&mut self.rng)
    }

    fn random(&mut self, len: usize) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(vec![0u8; len]);
        self.rng.fill_bytes(&mut bytes);
        bytes
    }
}
