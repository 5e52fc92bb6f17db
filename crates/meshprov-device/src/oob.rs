//! OOB auth values for the command-line device.
//!
//! Output OOB values are drawn at random and logged for the operator to relay
//! to the provisioner. Input OOB values come from `--input-value`.

use meshprov_core::{AuthValueHandle, OobRequester};
use meshprov_crypto::{AuthValue, CryptoError};
use meshprov_proto::{Algorithm, AuthenticationMethod, InputAction, OutputAction};
use rand::{CryptoRng, Rng, RngCore, rngs::OsRng, seq::SliceRandom};
use tracing::{error, info, warn};

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// What the operator sees or types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OobValue {
    /// A number of blinks, beeps, pushes, or a displayed number.
    Numeric(u32),
    /// A displayed or typed string.
    Alphanumeric(String),
}

impl OobValue {
    fn auth_value(&self, algorithm: Algorithm) -> Result<AuthValue, CryptoError> {
        match self {
            Self::Numeric(number) => AuthValue::from_numeric(algorithm, *number),
            Self::Alphanumeric(text) => AuthValue::from_alphanumeric(algorithm, text),
        }
    }
}

/// Random output value for `action` with `size` digits or characters.
///
/// Counted actions (blink, beep, vibrate) and displayed numbers are never
/// zero.
pub fn output_value<R: RngCore + CryptoRng>(
    rng: &mut R,
    action: OutputAction,
    size: u8,
) -> OobValue {
    let size = size.clamp(1, 8);
    match action {
        OutputAction::OutputAlphanumeric => OobValue::Alphanumeric(
            (0..size)
                .filter_map(|_| ALPHANUMERIC.choose(&mut *rng).copied().map(char::from))
                .collect(),
        ),
        OutputAction::Blink
        | OutputAction::Beep
        | OutputAction::Vibrate
        | OutputAction::OutputNumeric => {
            OobValue::Numeric(rng.gen_range(1..10u32.pow(u32::from(size))))
        },
    }
}

/// Parse what the operator typed for an input action.
pub fn input_value(action: InputAction, text: &str) -> Option<OobValue> {
    let text = text.trim();
    match action {
        InputAction::InputAlphanumeric => Some(OobValue::Alphanumeric(text.to_ascii_uppercase())),
        InputAction::Push | InputAction::Twist | InputAction::InputNumeric => {
            text.parse().ok().map(OobValue::Numeric)
        },
    }
}

/// [`OobRequester`] for the command-line device.
#[derive(Debug)]
pub struct CliOob<R = OsRng> {
    rng: R,
    input: Option<String>,
}

impl CliOob<OsRng> {
    /// Requester answering input requests with `input`.
    pub fn new(input: Option<String>) -> Self {
        Self { rng: OsRng, input }
    }
}

impl<R: RngCore + CryptoRng> CliOob<R> {
    fn resolve(&mut self, method: AuthenticationMethod) -> Option<OobValue> {
        match method {
            AuthenticationMethod::OutputOob { action, size } => {
                let value = output_value(&mut self.rng, action, size);
                match &value {
                    OobValue::Numeric(number) => info!(?action, value = number, "output OOB"),
                    OobValue::Alphanumeric(text) => info!(?action, value = %text, "output OOB"),
                }
                Some(value)
            },
            AuthenticationMethod::InputOob { action, .. } => {
                let Some(text) = self.input.as_deref() else {
                    warn!(?action, "input OOB requested but --input-value was not given");
                    return None;
                };
                let value = input_value(action, text);
                if value.is_none() {
                    warn!(?action, "--input-value does not fit the requested action");
                }
                value
            },
            AuthenticationMethod::NoOob | AuthenticationMethod::StaticOob => None,
        }
    }
}

impl<R: RngCore + CryptoRng + Send> OobRequester for CliOob<R> {
    fn request_auth_value(
        &mut self,
        algorithm: Algorithm,
        method: AuthenticationMethod,
        reply: AuthValueHandle,
    ) {
        let Some(value) = self.resolve(method) else { return };
        match value.auth_value(algorithm) {
            Ok(auth) => {
                if !reply.submit(auth) {
                    warn!("session ended before the auth value was submitted");
                }
            },
            Err(err) => error!(error = %err, "unusable OOB value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn numeric_output_fits_size() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for size in 1..=8u8 {
            for _ in 0..50 {
                let OobValue::Numeric(n) = output_value(&mut rng, OutputAction::OutputNumeric, size)
                else {
                    panic!("expected a number");
                };
                assert!(n >= 1 && n < 10u32.pow(u32::from(size)), "{n} for size {size}");
            }
        }
    }

    #[test]
    fn alphanumeric_output_uses_upper_case_and_digits() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let OobValue::Alphanumeric(text) =
            output_value(&mut rng, OutputAction::OutputAlphanumeric, 6)
        else {
            panic!("expected text");
        };
        assert_eq!(text.len(), 6);
        assert!(text.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
        assert!(AuthValue::from_alphanumeric(Algorithm::P256CmacAes128, &text).is_ok());
    }

    #[test]
    fn input_parsing_follows_action() {
        assert_eq!(input_value(InputAction::Push, " 3 "), Some(OobValue::Numeric(3)));
        assert_eq!(input_value(InputAction::InputNumeric, "abc"), None);
        assert_eq!(
            input_value(InputAction::InputAlphanumeric, "k3y"),
            Some(OobValue::Alphanumeric("K3Y".into()))
        );
    }

    #[test]
    fn missing_input_value_is_not_submitted() {
        let mut oob = CliOob { rng: ChaCha20Rng::seed_from_u64(3), input: None };
        let method = AuthenticationMethod::InputOob { action: InputAction::Push, size: 1 };
        assert_eq!(oob.resolve(method), None);
    }
}
