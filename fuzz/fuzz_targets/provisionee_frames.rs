//! Feed a sequence of arbitrary frames to a fresh device.
//!
//! Input layout: `seed(8) · (len(1) · frame(len))*`. The device must never
//! panic and must never complete from unauthenticated input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use meshprov_core::{Provisionee, ProvisioneeConfig, ProvisioningAction, ProvisioningState};
use meshprov_crypto::MeshCrypto;
use meshprov_proto::{Algorithms, OutputOobActions};
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};

fuzz_target!(|data: &[u8]| {
    let Some((seed, mut rest)) = data.split_first_chunk::<8>() else { return };

    let config = ProvisioneeConfig {
        algorithms: Algorithms::P256_CMAC_AES128 | Algorithms::P256_HMAC_SHA256,
        output_oob_size: 4,
        output_oob_actions: OutputOobActions::NUMERIC,
        ..Default::default()
    };
    let crypto = MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(u64::from_le_bytes(*seed)));
    let Ok(mut device) = Provisionee::new(config, crypto) else { return };

    while let Some((&len, tail)) = rest.split_first() {
        let len = usize::from(len).min(tail.len());
        let (frame, next) = tail.split_at(len);
        rest = next;

        if let Ok(actions) = device.handle_frame(frame) {
            assert!(!actions.iter().any(|a| matches!(a, ProvisioningAction::Provisioned(_))));
        }
        assert_ne!(device.state(), ProvisioningState::Complete);
    }
});
