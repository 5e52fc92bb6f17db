//! Command-line arguments.

use clap::{Parser, ValueEnum};
use meshprov_core::ProvisioneeConfig;
use meshprov_proto::{Algorithms, InputOobActions, OutputOobActions};
use zeroize::Zeroizing;

use crate::DeviceError;

/// Mesh provisioning responder.
///
/// Reads provisioning PDUs from stdin and writes replies to stdout, one
/// hex-encoded PDU per line. Logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "meshprov-device", version)]
pub struct Cli {
    /// Number of elements the device exposes.
    #[arg(long, default_value_t = 1)]
    pub elements: u8,

    /// Also advertise P-256 with HMAC-SHA-256.
    #[arg(long)]
    pub hmac: bool,

    /// Static OOB value, hex encoded (16 bytes, or 32 with --hmac).
    #[arg(long, value_name = "HEX")]
    pub static_oob: Option<String>,

    /// Output OOB actions the device can perform.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub output_oob: Vec<OutputKind>,

    /// Maximum output OOB size (1..=8).
    #[arg(long, default_value_t = 0)]
    pub output_oob_size: u8,

    /// Input OOB actions the device accepts.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub input_oob: Vec<InputKind>,

    /// Maximum input OOB size (1..=8).
    #[arg(long, default_value_t = 0)]
    pub input_oob_size: u8,

    /// Value to answer an input OOB request with.
    #[arg(long, value_name = "VALUE")]
    pub input_value: Option<String>,

    /// Expect and emit the GATT proxy header on every PDU.
    #[arg(long)]
    pub proxy: bool,

    /// Log filter directives; overrides `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

/// Output OOB action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Blink a light.
    Blink,
    /// Beep.
    Beep,
    /// Vibrate.
    Vibrate,
    /// Display a number.
    Numeric,
    /// Display letters and digits.
    Alphanumeric,
}

impl OutputKind {
    fn flag(self) -> OutputOobActions {
        match self {
            Self::Blink => OutputOobActions::BLINK,
            Self::Beep => OutputOobActions::BEEP,
            Self::Vibrate => OutputOobActions::VIBRATE,
            Self::Numeric => OutputOobActions::NUMERIC,
            Self::Alphanumeric => OutputOobActions::ALPHANUMERIC,
        }
    }
}

/// Input OOB action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    /// Push a button.
    Push,
    /// Twist a knob.
    Twist,
    /// Enter a number.
    Numeric,
    /// Enter letters and digits.
    Alphanumeric,
}

impl InputKind {
    fn flag(self) -> InputOobActions {
        match self {
            Self::Push => InputOobActions::PUSH,
            Self::Twist => InputOobActions::TWIST,
            Self::Numeric => InputOobActions::NUMERIC,
            Self::Alphanumeric => InputOobActions::ALPHANUMERIC,
        }
    }
}

impl Cli {
    /// Device configuration described by the arguments.
    pub fn config(&self) -> Result<ProvisioneeConfig, DeviceError> {
        let mut algorithms = Algorithms::P256_CMAC_AES128;
        if self.hmac {
            algorithms |= Algorithms::P256_HMAC_SHA256;
        }

        let static_oob =
            self.static_oob.as_deref().map(hex::decode).transpose()?.map(Zeroizing::new);

        let config = ProvisioneeConfig {
            element_count: self.elements,
            algorithms,
            static_oob,
            output_oob_size: self.output_oob_size,
            output_oob_actions: self
                .output_oob
                .iter()
                .fold(OutputOobActions::empty(), |acc, kind| acc | kind.flag()),
            input_oob_size: self.input_oob_size,
            input_oob_actions: self
                .input_oob
                .iter()
                .fold(InputOobActions::empty(), |acc, kind| acc | kind.flag()),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use meshprov_core::ConfigError;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("meshprov-device").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_are_no_oob() {
        let config = parse(&[]).config().unwrap();
        assert_eq!(config.element_count, 1);
        assert_eq!(config.algorithms, Algorithms::P256_CMAC_AES128);
        assert!(config.static_oob.is_none());
        assert!(config.output_oob_actions.is_empty());
    }

    #[test]
    fn oob_actions_are_comma_separated() {
        let config =
            parse(&["--output-oob", "blink,numeric", "--output-oob-size", "4"]).config().unwrap();
        assert_eq!(config.output_oob_actions, OutputOobActions::BLINK | OutputOobActions::NUMERIC);
        assert_eq!(config.output_oob_size, 4);
    }

    #[test]
    fn static_oob_is_hex() {
        let config = parse(&["--static-oob", &"ab".repeat(16)]).config().unwrap();
        assert_eq!(config.static_oob.as_deref().map(Vec::as_slice), Some(&[0xAB; 16][..]));

        assert!(matches!(parse(&["--static-oob", "xyz"]).config(), Err(DeviceError::Hex(_))));
    }

    #[test]
    fn hmac_needs_long_static_value() {
        let result = parse(&["--hmac", "--static-oob", &"00".repeat(16)]).config();
        assert!(matches!(result, Err(DeviceError::Config(ConfigError::StaticOobLength(16)))));
    }

    #[test]
    fn actions_without_size_rejected() {
        let result = parse(&["--input-oob", "push"]).config();
        assert!(matches!(result, Err(DeviceError::Config(ConfigError::OobSize { .. }))));
    }
}
