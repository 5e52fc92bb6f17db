//! Provisionee configuration.

use std::fmt;

use meshprov_crypto::{AuthValue, CryptoError};
use meshprov_proto::{
    Algorithm, Algorithms, Capabilities, InputOobActions, OutputOobActions, PublicKeyTypes,
    StaticOobTypes, auth::MAX_OOB_SIZE,
};
use zeroize::Zeroizing;

use crate::ConfigError;

/// What the device advertises in its Capabilities PDU, plus the static OOB
/// secret if it has one.
#[derive(Clone)]
pub struct ProvisioneeConfig {
    /// Number of elements on the device.
    pub element_count: u8,
    /// Algorithms the device supports.
    pub algorithms: Algorithms,
    /// Static OOB value (16 or 32 bytes); `Some` advertises static OOB.
    pub static_oob: Option<Zeroizing<Vec<u8>>>,
    /// Maximum output OOB size.
    pub output_oob_size: u8,
    /// Supported output OOB actions.
    pub output_oob_actions: OutputOobActions,
    /// Maximum input OOB size.
    pub input_oob_size: u8,
    /// Supported input OOB actions.
    pub input_oob_actions: InputOobActions,
}

impl Default for ProvisioneeConfig {
    fn default() -> Self {
        Self {
            element_count: 1,
            algorithms: Algorithms::P256_CMAC_AES128,
            static_oob: None,
            output_oob_size: 0,
            output_oob_actions: OutputOobActions::empty(),
            input_oob_size: 0,
            input_oob_actions: InputOobActions::empty(),
        }
    }
}

impl ProvisioneeConfig {
    /// Check the configuration is advertisable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.element_count == 0 {
            return Err(ConfigError::NoElements);
        }
        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }

        if let Some(value) = &self.static_oob {
            let needs_long = self.algorithms.contains(Algorithms::P256_HMAC_SHA256);
            match value.len() {
                32 => {},
                16 if !needs_long => {},
                other => return Err(ConfigError::StaticOobLength(other)),
            }
        }

        check_oob_size("output", self.output_oob_size, !self.output_oob_actions.is_empty())?;
        check_oob_size("input", self.input_oob_size, !self.input_oob_actions.is_empty())?;
        Ok(())
    }

    /// Capabilities PDU contents.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            element_count: self.element_count,
            algorithms: self.algorithms,
            public_key_types: PublicKeyTypes::empty(),
            static_oob_types: if self.static_oob.is_some() {
                StaticOobTypes::STATIC_OOB
            } else {
                StaticOobTypes::empty()
            },
            output_oob_size: self.output_oob_size,
            output_oob_actions: self.output_oob_actions,
            input_oob_size: self.input_oob_size,
            input_oob_actions: self.input_oob_actions,
        }
    }

    /// Auth value for static OOB under `algorithm`.
    ///
    /// A 32-byte value is truncated to its first 16 bytes for the CMAC
    /// algorithm.
    pub fn static_auth_value(
        &self,
        algorithm: Algorithm,
    ) -> Option<Result<AuthValue, CryptoError>> {
        let value = self.static_oob.as_ref()?;
        let width = algorithm.value_len().min(value.len());
        Some(AuthValue::from_static(algorithm, value.get(..width).unwrap_or_default()))
    }
}

fn check_oob_size(direction: &'static str, size: u8, has_actions: bool) -> Result<(), ConfigError> {
    let valid = if has_actions { (1..=MAX_OOB_SIZE).contains(&size) } else { size == 0 };
    if valid { Ok(()) } else { Err(ConfigError::OobSize { direction, size }) }
}

impl fmt::Debug for ProvisioneeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioneeConfig")
            .field("element_count", &self.element_count)
            .field("algorithms", &self.algorithms)
            .field("static_oob", &self.static_oob.as_ref().map(|_| "<redacted>"))
            .field("output_oob_size", &self.output_oob_size)
            .field("output_oob_actions", &self.output_oob_actions)
            .field("input_oob_size", &self.input_oob_size)
            .field("input_oob_actions", &self.input_oob_actions)
            .finish()
    }
}
