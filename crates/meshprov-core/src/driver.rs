//! Async driver running one provisioning session over a [`Bearer`].
//!
//! The driver owns the state machine and executes its actions: frames go out
//! over the bearer, auth value requests go to the [`OobRequester`] and the
//! result goes to the [`ProvisioningSink`]. Auth values come back through an
//! [`AuthValueHandle`] and are fed to the machine between frames, so the
//! machine never sees two events at once.
//!
//! A failed session does not stop the driver; the provisioner may send a
//! fresh Invite on the same link. The driver returns once provisioning
//! completes or the bearer closes.

use std::io;

use bytes::Bytes;
use meshprov_crypto::{AuthValue, CryptoProvider};
use meshprov_proto::PduFrame;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::{
    Bearer, OobRequester, Provisionee, ProvisioningAction, ProvisioningError, ProvisioningSink,
    ProvisioningState,
};

/// Errors that stop the driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The bearer closed before provisioning completed.
    #[error("bearer closed in state {0:?}")]
    BearerClosed(ProvisioningState),

    /// The bearer failed.
    #[error("bearer I/O: {0}")]
    Io(#[from] io::Error),
}

/// Sender half for OOB auth values.
#[derive(Debug, Clone)]
pub struct AuthValueHandle {
    tx: mpsc::UnboundedSender<AuthValue>,
}

impl AuthValueHandle {
    /// Deliver an auth value to the session.
    ///
    /// Returns `false` if the driver has already stopped.
    pub fn submit(&self, value: AuthValue) -> bool {
        self.tx.send(value).is_ok()
    }
}

enum Event {
    Frame(io::Result<Option<Bytes>>),
    AuthValue(AuthValue),
}

/// Runs a [`Provisionee`] against a bearer.
pub struct Driver<B, P, S, O> {
    machine: Provisionee<P>,
    bearer: B,
    sink: S,
    oob: O,
    auth_tx: mpsc::UnboundedSender<AuthValue>,
    auth_rx: mpsc::UnboundedReceiver<AuthValue>,
}

impl<B, P, S, O> Driver<B, P, S, O>
where
    B: Bearer,
    P: CryptoProvider,
    S: ProvisioningSink,
    O: OobRequester,
{
    /// Driver for `machine` over `bearer`.
    pub fn new(machine: Provisionee<P>, bearer: B, sink: S, oob: O) -> Self {
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        Self { machine, bearer, sink, oob, auth_tx, auth_rx }
    }

    /// Handle for submitting auth values from another task.
    pub fn auth_value_handle(&self) -> AuthValueHandle {
        AuthValueHandle { tx: self.auth_tx.clone() }
    }

    /// The state machine being driven.
    pub fn machine(&self) -> &Provisionee<P> {
        &self.machine
    }

    /// Consume the driver, returning the machine and bearer.
    pub fn into_parts(self) -> (Provisionee<P>, B) {
        (self.machine, self.bearer)
    }

    /// Run until provisioning completes.
    ///
    /// # Errors
    ///
    /// - `BearerClosed` if the link closed first; an in-flight session is
    ///   failed with `TransportClosed`
    /// - `Io` if the bearer failed; an in-flight session is failed with
    ///   `TransportClosed`
    ///
    /// A message the bearer reports as `InvalidData` is not an error here. It
    /// is handled like a PDU that fails to decode.
    pub async fn run(&mut self) -> Result<(), DriverError> {
        loop {
            let event = tokio::select! {
                frame = self.bearer.recv() => Event::Frame(frame),
                Some(value) = self.auth_rx.recv() => Event::AuthValue(value),
            };

            let before = self.machine.state();
            let result = match event {
                Event::Frame(Ok(Some(bytes))) => {
                    trace!(len = bytes.len(), "frame received");
                    self.machine.handle_frame(&bytes)
                },
                Event::Frame(Ok(None)) => {
                    self.machine.on_bearer_closed();
                    let state = self.machine.state();
                    debug!(?state, "bearer closed");
                    return Err(DriverError::BearerClosed(state));
                },
                Event::Frame(Err(err)) if err.kind() == io::ErrorKind::InvalidData => {
                    Err(self.machine.on_malformed_frame(err.to_string()))
                },
                Event::Frame(Err(err)) => {
                    self.machine.on_bearer_closed();
                    warn!(state = ?self.machine.state(), error = %err, "bearer failed");
                    return Err(DriverError::Io(err));
                },
                Event::AuthValue(value) => self.machine.set_auth_value(value),
            };

            match result {
                Ok(actions) => self.execute(actions).await?,
                Err(err) => self.report_failure(before, &err).await?,
            }

            if self.machine.state() == ProvisioningState::Complete {
                return Ok(());
            }
        }
    }

    async fn execute(&mut self, actions: Vec<ProvisioningAction>) -> Result<(), DriverError> {
        for action in actions {
            match action {
                ProvisioningAction::SendFrame(frame) => self.send(&frame).await?,
                ProvisioningAction::RequestAuthValue { algorithm, method } => {
                    let reply = self.auth_value_handle();
                    self.oob.request_auth_value(algorithm, method, reply);
                },
                ProvisioningAction::Provisioned(outcome) => self.sink.provisioned(outcome),
            }
        }
        Ok(())
    }

    /// Tell the provisioner why its session died, if it just did.
    async fn report_failure(
        &mut self,
        before: ProvisioningState,
        err: &ProvisioningError,
    ) -> Result<(), DriverError> {
        let after = self.machine.state();
        let reason = match after {
            ProvisioningState::Failed(reason) if before != after => reason,
            _ => {
                warn!(state = ?after, error = %err, "event rejected");
                return Ok(());
            },
        };

        match reason.error_code() {
            Some(error_code) if self.bearer.is_open() => {
                self.send(&PduFrame::Failed { error_code }).await
            },
            _ => Ok(()),
        }
    }

    async fn send(&mut self, frame: &PduFrame) -> Result<(), DriverError> {
        trace!(pdu = %frame.pdu_type(), "sending frame");
        self.bearer.send(frame.encode()).await?;
        Ok(())
    }
}

impl<B, P, S, O> std::fmt::Debug for Driver<B, P, S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("machine", &self.machine).finish_non_exhaustive()
    }
}
