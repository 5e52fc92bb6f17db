//! Independent provisioning sessions keyed by peer identity.
//!
//! Each peer gets its own [`Provisionee`] with its own crypto provider, so
//! concurrent handshakes share nothing. Machines are created on the first
//! frame from a peer and removed when the peer's link closes or the host
//! drains finished sessions.

use std::{collections::HashMap, hash::Hash};

use meshprov_crypto::{AuthValue, CryptoProvider};

use crate::{
    ConfigError, Provisionee, ProvisioneeConfig, ProvisioningAction, ProvisioningError,
    ProvisioningState,
};

/// Per-peer provisioning machines.
pub struct SessionRegistry<K, P, F> {
    config: ProvisioneeConfig,
    new_crypto: F,
    sessions: HashMap<K, Provisionee<P>>,
}

impl<K, P, F> SessionRegistry<K, P, F>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    P: CryptoProvider,
    F: FnMut() -> P,
{
    /// Registry creating machines from `config` and a fresh provider per peer.
    ///
    /// # Errors
    ///
    /// The configuration failed validation.
    pub fn new(config: ProvisioneeConfig, new_crypto: F) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, new_crypto, sessions: HashMap::new() })
    }

    /// Feed a frame from `peer` into its machine, creating one if needed.
    pub fn handle_frame(
        &mut self,
        peer: &K,
        bytes: &[u8],
    ) -> Result<Vec<ProvisioningAction>, ProvisioningError> {
        let machine = self.sessions.entry(peer.clone()).or_insert_with(|| {
            tracing::debug!(?peer, "new provisioning session");
            Provisionee::from_validated(self.config.clone(), (self.new_crypto)())
        });
        machine.handle_frame(bytes)
    }

    /// Supply an auth value for `peer`.
    pub fn set_auth_value(
        &mut self,
        peer: &K,
        value: AuthValue,
    ) -> Result<Vec<ProvisioningAction>, ProvisioningError> {
        match self.sessions.get_mut(peer) {
            Some(machine) => machine.set_auth_value(value),
            None => Err(ProvisioningError::NotAwaitingAuthValue(ProvisioningState::Idle)),
        }
    }

    /// The link to `peer` closed; fail and forget its session.
    ///
    /// Returns the final state, if the peer had a session.
    pub fn on_bearer_closed(&mut self, peer: &K) -> Option<ProvisioningState> {
        let mut machine = self.sessions.remove(peer)?;
        machine.on_bearer_closed();
        Some(machine.state())
    }

    /// State of `peer`'s session.
    pub fn state(&self, peer: &K) -> Option<ProvisioningState> {
        self.sessions.get(peer).map(Provisionee::state)
    }

    /// Drop every session that completed or failed, returning each peer
    /// with its final state.
    ///
    /// A dropped peer that sends a new Invite gets a fresh machine.
    pub fn drain_finished(&mut self) -> Vec<(K, ProvisioningState)> {
        let mut finished = Vec::new();
        self.sessions.retain(|peer, machine| {
            let state = machine.state();
            let done = matches!(state, ProvisioningState::Complete | ProvisioningState::Failed(_));
            if done {
                finished.push((peer.clone(), state));
            }
            !done
        });
        finished
    }

    /// Number of tracked peers.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no peer is tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use meshprov_crypto::MeshCrypto;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::FailureReason;

    type Crypto = MeshCrypto<ChaCha20Rng>;

    fn registry() -> SessionRegistry<u32, Crypto, impl FnMut() -> Crypto> {
        let mut seed = 0;
        SessionRegistry::new(ProvisioneeConfig::default(), move || {
            seed += 1;
            MeshCrypto::with_rng(ChaCha20Rng::seed_from_u64(seed))
        })
        .unwrap()
    }

    #[test]
    fn peers_are_isolated() {
        let mut sessions = registry();
        sessions.handle_frame(&1, &[0x00, 0x00]).unwrap();
        sessions.handle_frame(&2, &[0x02, 0, 0, 0, 0, 0]).unwrap_err();

        assert_eq!(sessions.state(&1), Some(ProvisioningState::CapabilitiesSent));
        assert_eq!(
            sessions.state(&2),
            Some(ProvisioningState::Failed(FailureReason::InvalidState))
        );
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn closing_a_peer_forgets_it() {
        let mut sessions = registry();
        sessions.handle_frame(&7, &[0x00, 0x00]).unwrap();

        assert_eq!(
            sessions.on_bearer_closed(&7),
            Some(ProvisioningState::Failed(FailureReason::TransportClosed))
        );
        assert!(sessions.is_empty());
        assert_eq!(sessions.on_bearer_closed(&7), None);
    }

    #[test]
    fn drain_drops_failed_sessions() {
        let mut sessions = registry();
        sessions.handle_frame(&1, &[0x02, 0, 0, 0, 0, 0]).unwrap_err();
        sessions.handle_frame(&2, &[0x00, 0x00]).unwrap();

        assert_eq!(
            sessions.drain_finished(),
            vec![(1, ProvisioningState::Failed(FailureReason::InvalidState))]
        );
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.state(&1), None);
        assert!(sessions.drain_finished().is_empty());

        sessions.handle_frame(&1, &[0x00, 0x00]).unwrap();
        assert_eq!(sessions.state(&1), Some(ProvisioningState::CapabilitiesSent));
    }

    #[test]
    fn auth_value_for_unknown_peer_rejected() {
        let mut sessions = registry();
        let value = AuthValue::zero(meshprov_proto::Algorithm::P256CmacAes128);
        assert!(matches!(
            sessions.set_auth_value(&3, value),
            Err(ProvisioningError::NotAwaitingAuthValue(ProvisioningState::Idle))
        ));
    }
}
