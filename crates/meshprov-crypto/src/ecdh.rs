//! P-256 key pairs and ECDH.
//!
//! Public keys travel as 64 bytes `X ‖ Y` without the SEC1 `0x04` prefix.

use std::fmt;

use meshprov_proto::PUBLIC_KEY_SIZE;
use p256::{PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::CryptoError;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Ephemeral P-256 key pair for one provisioning session.
///
/// The secret scalar is zeroized on drop by `p256`.
pub struct KeyPair {
    secret: SecretKey,
    public: [u8; PUBLIC_KEY_SIZE],
}

impl KeyPair {
    /// Generate a fresh key pair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        Self::from_secret(SecretKey::random(rng))
    }

    /// Rebuild a key pair from a 32-byte private scalar.
    pub fn from_private_bytes(private: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::from_slice(private).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_secret(secret)
    }

    fn from_secret(secret: SecretKey) -> Result<Self, CryptoError> {
        let point = secret.public_key().to_encoded_point(false);
        let (_, xy) = point.as_bytes().split_first().ok_or(CryptoError::InvalidPublicKey)?;
        let public = <[u8; PUBLIC_KEY_SIZE]>::try_from(xy)
            .map_err(|_| CryptoError::InvalidPublicKey)?;

        Ok(Self { secret, public })
    }

    /// Public key as `X ‖ Y`.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// ECDH with a peer public key given as `X ‖ Y`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if `peer` is not 64 bytes
    /// - `InvalidPublicKey` if `peer` is not a point on the curve
    pub fn agree(&self, peer: &[u8]) -> Result<SharedSecret, CryptoError> {
        let peer = parse_public_key(peer)?;
        let shared = p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());

        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(shared.raw_secret_bytes());
        Ok(SharedSecret(bytes))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("secret", &"<redacted>").finish_non_exhaustive()
    }
}

/// Check that `bytes` is a 64-byte `X ‖ Y` encoding of a P-256 point.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_SIZE,
            actual: bytes.len(),
        });
    }

    let mut sec1 = [0u8; PUBLIC_KEY_SIZE + 1];
    let (tag, xy) = sec1.split_at_mut(1);
    tag.fill(SEC1_UNCOMPRESSED_TAG);
    xy.copy_from_slice(bytes);

    PublicKey::from_sec1_bytes(&sec1).map_err(|_| CryptoError::InvalidPublicKey)
}

/// ECDH output (the x-coordinate of the shared point).
pub struct SharedSecret(Zeroizing<[u8; 32]>);

impl SharedSecret {
    /// Raw 32-byte secret.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn both_sides_agree() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let device = KeyPair::generate(&mut rng).unwrap();
        let provisioner = KeyPair::generate(&mut rng).unwrap();

        let a = device.agree(provisioner.public_key()).unwrap();
        let b = provisioner.agree(device.public_key()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn wrong_length_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let device = KeyPair::generate(&mut rng).unwrap();
        assert_eq!(
            device.agree(&[0u8; 65]).unwrap_err(),
            CryptoError::InvalidKeyLength { expected: 64, actual: 65 }
        );
    }

    #[test]
    fn off_curve_point_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let device = KeyPair::generate(&mut rng).unwrap();
        let mut bogus = [0u8; 64];
        bogus[63] = 1;
        assert_eq!(device.agree(&bogus).unwrap_err(), CryptoError::InvalidPublicKey);
    }

    #[test]
    fn debug_hides_secret() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let device = KeyPair::generate(&mut rng).unwrap();
        assert!(format!("{device:?}").contains("<redacted>"));
    }
}
