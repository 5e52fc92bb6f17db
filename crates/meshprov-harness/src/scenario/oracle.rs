//! Reusable oracles.

use meshprov_core::{FailureReason, ProvisioningState};
use meshprov_proto::PduType;

use crate::scenario::OracleFn;

/// Device reached `Complete` and delivered exactly one result.
pub fn provisioned() -> OracleFn {
    Box::new(|world| {
        if world.device_state() != ProvisioningState::Complete {
            return Err(format!("device should be Complete, got {:?}", world.device_state()));
        }
        match world.delivered().len() {
            1 => Ok(()),
            n => Err(format!("expected exactly one delivered result, got {n}")),
        }
    })
}

/// Device ended in `Failed(reason)`.
pub fn failed_with(reason: FailureReason) -> OracleFn {
    Box::new(move |world| {
        let expected = ProvisioningState::Failed(reason);
        if world.device_state() == expected {
            Ok(())
        } else {
            Err(format!("device should be {expected:?}, got {:?}", world.device_state()))
        }
    })
}

/// Nothing reached the provisioning result consumer.
pub fn nothing_delivered() -> OracleFn {
    Box::new(|world| {
        if world.delivered().is_empty() {
            Ok(())
        } else {
            Err(format!("{} result(s) delivered after a failed handshake", world.delivered().len()))
        }
    })
}

/// The device never sent a frame of type `pdu`.
pub fn device_never_sent(pdu: PduType) -> OracleFn {
    Box::new(move |world| {
        if world.device_sent_type(pdu) {
            Err(format!("device sent {pdu} but should not have"))
        } else {
            Ok(())
        }
    })
}

/// Both sides derived the same device key.
pub fn device_keys_match() -> OracleFn {
    Box::new(|world| {
        let provisioner = world.provisioner().device_key().ok_or("provisioner has no device key")?;
        let outcome = world.delivered().first().ok_or("device delivered no result")?;
        if *outcome.device_key == provisioner {
            Ok(())
        } else {
            Err("device keys differ".into())
        }
    })
}

/// Every oracle in `oracles` must pass.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| oracles.iter().try_for_each(|oracle| oracle(world)))
}
