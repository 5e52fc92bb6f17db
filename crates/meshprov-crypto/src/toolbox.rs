//! Mesh security toolbox functions.
//!
//! `s1`/`k1` are built on AES-CMAC, `s2`/`k5` on HMAC-SHA-256. All
//! provisioning keys come out of these four functions.

use aes::Aes128;
use cmac::Cmac;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::CryptoError;

/// AES-CMAC tag width.
pub const CMAC_SIZE: usize = 16;

/// HMAC-SHA-256 tag width.
pub const HMAC_SIZE: usize = 32;

/// AES-CMAC over `message` with a 128-bit key.
pub fn aes_cmac(key: &[u8; CMAC_SIZE], message: &[u8]) -> [u8; CMAC_SIZE] {
    let mut mac = <Cmac<Aes128> as Mac>::new(key.into());
    mac.update(message);

    let mut out = [0u8; CMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// HMAC-SHA-256 over `message`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidMacKey)?;
    mac.update(message);

    let mut out = [0u8; HMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Salt generation: `AES-CMAC` keyed with zeros.
pub fn s1(message: &[u8]) -> [u8; CMAC_SIZE] {
    aes_cmac(&[0u8; CMAC_SIZE], message)
}

/// Key derivation: `AES-CMAC_T(P)` where `T = AES-CMAC_SALT(N)`.
pub fn k1(n: &[u8], salt: &[u8; CMAC_SIZE], p: &[u8]) -> [u8; CMAC_SIZE] {
    let t = aes_cmac(salt, n);
    aes_cmac(&t, p)
}

/// Salt generation: `HMAC-SHA-256` keyed with zeros.
pub fn s2(message: &[u8]) -> Result<[u8; HMAC_SIZE], CryptoError> {
    hmac_sha256(&[0u8; HMAC_SIZE], message)
}

/// Key derivation: `HMAC-SHA-256_T(P)` where `T = HMAC-SHA-256_SALT(N)`.
pub fn k5(n: &[u8], salt: &[u8; HMAC_SIZE], p: &[u8]) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let t = hmac_sha256(salt, n)?;
    hmac_sha256(&t, p)
}
