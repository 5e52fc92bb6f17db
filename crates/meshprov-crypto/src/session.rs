//! Session key derivation and provisioning data encryption.
//!
//! ```text
//! ProvisioningSalt = s1(ConfirmationSalt ‖ RandomProvisioner ‖ RandomDevice)
//! SessionKey       = k1(ECDH, ProvisioningSalt, "prsk")
//! SessionNonce     = k1(ECDH, ProvisioningSalt, "prsn")[3..16]
//! DeviceKey        = k1(ECDH, ProvisioningSalt, "prdk")
//! ```
//!
//! Provisioning data is sealed with AES-CCM, 13-byte nonce, 8-byte MIC and
//! no associated data.

use std::fmt;

use aes::Aes128;
use ccm::{
    Ccm,
    aead::{AeadInPlace, KeyInit},
    consts::{U8, U13},
};
use meshprov_proto::{Algorithm, MIC_SIZE};
use zeroize::Zeroizing;

use crate::{
    CryptoError, SharedSecret,
    confirmation::confirmation_salt,
    toolbox::{k1, s1},
};

/// AES-CCM nonce width.
pub const NONCE_SIZE: usize = 13;

type ProvisioningCcm = Ccm<Aes128, U8, U13>;

/// Keys derived once both randoms are known.
pub struct SessionKeys {
    session_key: Zeroizing<[u8; 16]>,
    nonce: Zeroizing<[u8; NONCE_SIZE]>,
    device_key: Zeroizing<[u8; 16]>,
}

impl SessionKeys {
    /// Derive session key, nonce and device key.
    ///
    /// `inputs` is the full confirmation inputs buffer; the confirmation salt is
    /// recomputed from it for the selected algorithm.
    pub fn derive(
        algorithm: Algorithm,
        inputs: &[u8],
        secret: &SharedSecret,
        provisioner_random: &[u8],
        device_random: &[u8],
    ) -> Result<Self, CryptoError> {
        let confirmation_salt = confirmation_salt(algorithm, inputs)?;

        let mut salt_input = Vec::with_capacity(
            confirmation_salt.len() + provisioner_random.len() + device_random.len(),
        );
        salt_input.extend_from_slice(&confirmation_salt);
        salt_input.extend_from_slice(provisioner_random);
        salt_input.extend_from_slice(device_random);
        let provisioning_salt = s1(&salt_input);

        let ecdh = secret.as_bytes();
        let session_key = Zeroizing::new(k1(ecdh, &provisioning_salt, b"prsk"));
        let nonce_material = Zeroizing::new(k1(ecdh, &provisioning_salt, b"prsn"));
        let device_key = Zeroizing::new(k1(ecdh, &provisioning_salt, b"prdk"));

        let mut nonce = Zeroizing::new([0u8; NONCE_SIZE]);
        let (_, tail) = nonce_material.split_at(nonce_material.len() - NONCE_SIZE);
        nonce.copy_from_slice(tail);

        Ok(Self { session_key, nonce, device_key })
    }

    /// Device key handed to the node once provisioning completes.
    pub fn device_key(&self) -> &[u8; 16] {
        &self.device_key
    }

    /// Session nonce.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Decrypt and authenticate provisioning data.
    ///
    /// # Errors
    ///
    /// `Authentication` if the MIC does not verify; no plaintext is returned.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        mic: &[u8; MIC_SIZE],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let cipher = self.cipher();
        let nonce: &[u8; NONCE_SIZE] = &self.nonce;

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        cipher
            .decrypt_in_place_detached(nonce.into(), &[], &mut buffer, mic.into())
            .map_err(|_| CryptoError::Authentication)?;

        Ok(buffer)
    }

    /// Encrypt provisioning data, returning ciphertext and MIC.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; MIC_SIZE]), CryptoError> {
        let cipher = self.cipher();
        let nonce: &[u8; NONCE_SIZE] = &self.nonce;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce.into(), &[], &mut buffer)
            .map_err(|_| CryptoError::Authentication)?;

        let mut mic = [0u8; MIC_SIZE];
        mic.copy_from_slice(&tag);
        Ok((buffer, mic))
    }

    fn cipher(&self) -> ProvisioningCcm {
        let key: &[u8; 16] = &self.session_key;
        <ProvisioningCcm as KeyInit>::new(key.into())
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::KeyPair;

    fn secret() -> SharedSecret {
        let device = KeyPair::from_private_bytes(&hex!(
            "529aa0670d72cd6497502ed473502b037e8803b5c60829a5a3caa219505530ba"
        ))
        .unwrap();
        let provisioner = KeyPair::from_private_bytes(&hex!(
            "06a516693c9aa31a6084545d0c5db641b48572b97203ddffb7ac73f7d0457663"
        ))
        .unwrap();
        device.agree(provisioner.public_key()).unwrap()
    }

    fn keys(device_random: [u8; 16]) -> SessionKeys {
        SessionKeys::derive(
            Algorithm::P256CmacAes128,
            b"inputs",
            &secret(),
            &[1; 16],
            &device_random,
        )
        .unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let keys = keys([2; 16]);
        let (ciphertext, mic) = keys.encrypt(&[0xAB; 25]).unwrap();
        assert_ne!(ciphertext, vec![0xAB; 25]);
        assert_eq!(keys.decrypt(&ciphertext, &mic).unwrap().as_slice(), &[0xAB; 25]);
    }

    #[test]
    fn flipped_mic_bit_fails() {
        let keys = keys([2; 16]);
        let (ciphertext, mut mic) = keys.encrypt(&[0x11; 25]).unwrap();
        mic[0] ^= 0x01;
        assert_eq!(keys.decrypt(&ciphertext, &mic).unwrap_err(), CryptoError::Authentication);
    }

    #[test]
    fn randoms_bind_the_session() {
        let a = keys([2; 16]);
        let b = keys([3; 16]);
        assert_ne!(a.device_key(), b.device_key());
        assert_ne!(a.nonce(), b.nonce());
    }
}
