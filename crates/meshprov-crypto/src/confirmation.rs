//! Confirmation values.
//!
//! A confirmation commits a party to its random before either random is
//! revealed:
//!
//! ```text
//! CMAC:  salt = s1(inputs)   key = k1(ECDH, salt, "prck")
//!        conf = AES-CMAC_key(Random ‖ AuthValue)
//!
//! HMAC:  salt = s2(inputs)   key = k5(ECDH ‖ AuthValue, salt, "prck256")
//!        conf = HMAC-SHA-256_key(Random)
//! ```

use meshprov_proto::Algorithm;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    AuthValue, CryptoError, SharedSecret,
    toolbox::{aes_cmac, hmac_sha256, k1, k5, s1, s2},
};

/// Salt over the confirmation inputs: `s1` (16 bytes) or `s2` (32 bytes).
pub fn confirmation_salt(algorithm: Algorithm, inputs: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        Algorithm::P256CmacAes128 => Ok(s1(inputs).to_vec()),
        Algorithm::P256HmacSha256 => Ok(s2(inputs)?.to_vec()),
    }
}

/// Confirmation over `random` for the given session material.
///
/// # Errors
///
/// `InvalidLength` if `random` or `auth` does not match the algorithm width.
pub fn compute_confirmation(
    algorithm: Algorithm,
    inputs: &[u8],
    secret: &SharedSecret,
    random: &[u8],
    auth: &AuthValue,
) -> Result<Vec<u8>, CryptoError> {
    check_width(algorithm, random.len())?;
    check_width(algorithm, auth.len())?;

    match algorithm {
        Algorithm::P256CmacAes128 => {
            let salt = s1(inputs);
            let key = Zeroizing::new(k1(secret.as_bytes(), &salt, b"prck"));

            let mut message = Zeroizing::new(Vec::with_capacity(random.len() + auth.len()));
            message.extend_from_slice(random);
            message.extend_from_slice(auth.as_bytes());
            Ok(aes_cmac(&key, &message).to_vec())
        },
        Algorithm::P256HmacSha256 => {
            let salt = s2(inputs)?;

            let mut ikm = Zeroizing::new(Vec::with_capacity(32 + auth.len()));
            ikm.extend_from_slice(secret.as_bytes());
            ikm.extend_from_slice(auth.as_bytes());
            let key = Zeroizing::new(k5(&ikm, &salt, b"prck256")?);

            Ok(hmac_sha256(key.as_slice(), random)?.to_vec())
        },
    }
}

/// Constant-time equality of two confirmation values.
pub fn confirmations_match(expected: &[u8], received: &[u8]) -> bool {
    expected.len() == received.len() && bool::from(expected.ct_eq(received))
}

fn check_width(algorithm: Algorithm, actual: usize) -> Result<(), CryptoError> {
    let expected = algorithm.value_len();
    if actual == expected { Ok(()) } else { Err(CryptoError::InvalidLength { expected, actual }) }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::KeyPair;

    fn shared_secret(seed: u64) -> SharedSecret {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let a = KeyPair::generate(&mut rng).unwrap();
        let b = KeyPair::generate(&mut rng).unwrap();
        a.agree(b.public_key()).unwrap()
    }

    #[test]
    fn widths_follow_algorithm() {
        let secret = shared_secret(1);
        let cmac = compute_confirmation(
            Algorithm::P256CmacAes128,
            b"inputs",
            &secret,
            &[7u8; 16],
            &AuthValue::zero(Algorithm::P256CmacAes128),
        )
        .unwrap();
        let hmac = compute_confirmation(
            Algorithm::P256HmacSha256,
            b"inputs",
            &secret,
            &[7u8; 32],
            &AuthValue::zero(Algorithm::P256HmacSha256),
        )
        .unwrap();
        assert_eq!(cmac.len(), 16);
        assert_eq!(hmac.len(), 32);
    }

    #[test]
    fn different_random_changes_confirmation() {
        let secret = shared_secret(2);
        let auth = AuthValue::zero(Algorithm::P256CmacAes128);
        let a = compute_confirmation(Algorithm::P256CmacAes128, b"x", &secret, &[1; 16], &auth)
            .unwrap();
        let b = compute_confirmation(Algorithm::P256CmacAes128, b"x", &secret, &[2; 16], &auth)
            .unwrap();
        assert!(!confirmations_match(&a, &b));
    }

    #[test]
    fn wrong_random_width_rejected() {
        let secret = shared_secret(3);
        let auth = AuthValue::zero(Algorithm::P256CmacAes128);
        assert_eq!(
            compute_confirmation(Algorithm::P256CmacAes128, b"x", &secret, &[1; 32], &auth),
            Err(CryptoError::InvalidLength { expected: 16, actual: 32 })
        );
    }

    #[test]
    fn length_mismatch_never_matches() {
        assert!(!confirmations_match(&[0; 16], &[0; 15]));
        assert!(confirmations_match(&[5; 16], &[5; 16]));
    }
}
