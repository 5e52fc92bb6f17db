//! Seeded crypto providers.

use meshprov_crypto::MeshCrypto;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Crypto provider over a seeded ChaCha20 stream.
pub type SimCrypto = MeshCrypto<ChaCha20Rng>;

/// Provider whose keys and randoms are a pure function of `seed`.
pub fn seeded_crypto(seed: u64) -> SimCrypto {
    MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(seed))
}
