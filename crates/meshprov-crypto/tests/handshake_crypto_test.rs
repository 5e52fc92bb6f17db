//! Both halves of the provisioning crypto, exercised the way the two peers
//! would run them.

use meshprov_crypto::{
    AuthValue, CryptoError, CryptoProvider, MeshCrypto, compute_confirmation,
    confirmations_match,
};
use meshprov_proto::Algorithm;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const INPUTS: &[u8] = b"invite|capabilities|start|provisioner key|device key";

fn algorithm_strategy() -> impl Strategy<Value = Algorithm> {
    prop_oneof![Just(Algorithm::P256CmacAes128), Just(Algorithm::P256HmacSha256)]
}

#[test]
fn confirmation_matches_across_peers() {
    for algorithm in [Algorithm::P256CmacAes128, Algorithm::P256HmacSha256] {
        let mut device = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(1));
        let mut provisioner = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(2));

        let device_keys = device.generate_key_pair(algorithm).unwrap();
        let provisioner_keys = provisioner.generate_key_pair(algorithm).unwrap();

        let device_secret = device.ecdh(&device_keys, provisioner_keys.public_key()).unwrap();
        let provisioner_secret =
            provisioner.ecdh(&provisioner_keys, device_keys.public_key()).unwrap();

        let auth = AuthValue::from_numeric(algorithm, 123_456).unwrap();
        let provisioner_random = provisioner.random(algorithm.value_len());

        // Provisioner commits, device recomputes from the revealed random.
        let committed = provisioner
            .confirmation(algorithm, INPUTS, &provisioner_secret, &provisioner_random, &auth)
            .unwrap();
        let recomputed = device
            .confirmation(algorithm, INPUTS, &device_secret, &provisioner_random, &auth)
            .unwrap();
        assert!(confirmations_match(&committed, &recomputed));
    }
}

#[test]
fn session_keys_match_across_peers() {
    let algorithm = Algorithm::P256HmacSha256;
    let mut device = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(3));
    let mut provisioner = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(4));

    let device_keys = device.generate_key_pair(algorithm).unwrap();
    let provisioner_keys = provisioner.generate_key_pair(algorithm).unwrap();
    let device_secret = device.ecdh(&device_keys, provisioner_keys.public_key()).unwrap();
    let provisioner_secret = provisioner.ecdh(&provisioner_keys, device_keys.public_key()).unwrap();

    let random_p = provisioner.random(32);
    let random_d = device.random(32);

    let sealed = provisioner
        .session_keys(algorithm, INPUTS, &provisioner_secret, &random_p, &random_d)
        .unwrap();
    let opened =
        device.session_keys(algorithm, INPUTS, &device_secret, &random_p, &random_d).unwrap();

    let (ciphertext, mic) = sealed.encrypt(&[0x5A; 25]).unwrap();
    assert_eq!(device.decrypt(&opened, &ciphertext, &mic).unwrap().as_slice(), &[0x5A; 25]);
    assert_eq!(sealed.device_key(), opened.device_key());
}

proptest! {
    #[test]
    fn prop_wrong_random_never_validates(
        algorithm in algorithm_strategy(),
        seed in any::<u64>(),
        flip in any::<prop::sample::Index>(),
    ) {
        let mut crypto = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(seed));
        let own = crypto.generate_key_pair(algorithm).unwrap();
        let peer = crypto.generate_key_pair(algorithm).unwrap();
        let secret = crypto.ecdh(&own, peer.public_key()).unwrap();
        let auth = AuthValue::zero(algorithm);

        let random = crypto.random(algorithm.value_len());
        let committed = compute_confirmation(algorithm, INPUTS, &secret, &random, &auth).unwrap();

        let mut revealed = random.to_vec();
        let at = flip.index(revealed.len());
        revealed[at] ^= 0x80;
        let recomputed =
            compute_confirmation(algorithm, INPUTS, &secret, &revealed, &auth).unwrap();

        prop_assert!(!confirmations_match(&committed, &recomputed));
    }

    #[test]
    fn prop_any_bit_flip_fails_decryption(
        seed in any::<u64>(),
        bit in 0usize..(33 * 8),
    ) {
        let algorithm = Algorithm::P256CmacAes128;
        let mut crypto = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(seed));
        let own = crypto.generate_key_pair(algorithm).unwrap();
        let peer = crypto.generate_key_pair(algorithm).unwrap();
        let secret = crypto.ecdh(&own, peer.public_key()).unwrap();
        let keys = crypto.session_keys(algorithm, INPUTS, &secret, &[1; 16], &[2; 16]).unwrap();

        let (mut ciphertext, mut mic) = keys.encrypt(&[0xC3; 25]).unwrap();
        let (byte, mask) = (bit / 8, 1u8 << (bit % 8));
        if byte < ciphertext.len() {
            ciphertext[byte] ^= mask;
        } else {
            mic[byte - ciphertext.len()] ^= mask;
        }

        prop_assert_eq!(
            crypto.decrypt(&keys, &ciphertext, &mic).unwrap_err(),
            CryptoError::Authentication
        );
    }
}
