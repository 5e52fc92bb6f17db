//! Host-side collaborators the driver reports to.

use meshprov_proto::{Algorithm, AuthenticationMethod};

use crate::{AuthValueHandle, ProvisioningOutcome};

/// Receives the result of a successful session.
pub trait ProvisioningSink: Send {
    /// Called once, before the Complete PDU is sent.
    fn provisioned(&mut self, outcome: ProvisioningOutcome);
}

impl<F> ProvisioningSink for F
where
    F: FnMut(ProvisioningOutcome) + Send,
{
    fn provisioned(&mut self, outcome: ProvisioningOutcome) {
        self(outcome);
    }
}

/// Resolves OOB auth values.
///
/// For output OOB the implementation picks a value, shows it to the user
/// (blink, beep, display) and submits it right away. For input OOB it submits
/// whatever the user enters, possibly much later and from another task.
pub trait OobRequester: Send {
    /// A session is waiting for an auth value of `algorithm`'s width.
    fn request_auth_value(
        &mut self,
        algorithm: Algorithm,
        method: AuthenticationMethod,
        reply: AuthValueHandle,
    );
}

/// Requester for devices that only advertise no-OOB or static OOB.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOobRequester;

impl OobRequester for NoOobRequester {
    fn request_auth_value(
        &mut self,
        _algorithm: Algorithm,
        method: AuthenticationMethod,
        _reply: AuthValueHandle,
    ) {
        tracing::warn!(?method, "auth value requested but no OOB requester is installed");
    }
}
