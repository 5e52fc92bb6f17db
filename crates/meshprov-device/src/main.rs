//! Mesh provisioning responder
//!
//! Runs one provisioning session as the device side over a line-oriented
//! stdio bearer:
//! - Capabilities and OOB support come from the command line
//! - Output OOB values are logged for the operator
//! - The provisioning result is logged without key material
//!
//! Logs go to stderr; stdout carries only PDUs.

use std::process::ExitCode;

use clap::Parser;
use meshprov_core::{
    Bearer, ConfigError, Driver, DriverError, Provisionee, ProvisioningOutcome, ProxyFraming,
};
use meshprov_crypto::MeshCrypto;
use thiserror::Error;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod oob;
mod stdio;

use cli::Cli;
use oob::CliOob;
use stdio::LineBearer;

/// Reasons the device exits with a failure.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// `--static-oob` was not valid hex.
    #[error("static OOB value: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The arguments describe capabilities the device cannot advertise.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// The session did not complete.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "device stopped");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(directives: Option<&str>) {
    let filter = directives
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run(cli: Cli) -> Result<(), DeviceError> {
    let config = cli.config()?;
    let capabilities = config.capabilities();
    info!(
        elements = capabilities.element_count,
        algorithms = ?capabilities.algorithms,
        static_oob = config.static_oob.is_some(),
        output_oob = ?capabilities.output_oob_actions,
        input_oob = ?capabilities.input_oob_actions,
        proxy = cli.proxy,
        "waiting for invite"
    );

    let machine = Provisionee::new(config, MeshCrypto::new())?;
    let bearer = LineBearer::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let oob = CliOob::new(cli.input_value);

    if cli.proxy {
        serve(machine, ProxyFraming::new(bearer), oob).await
    } else {
        serve(machine, bearer, oob).await
    }
}

async fn serve<B: Bearer>(
    machine: Provisionee<MeshCrypto>,
    bearer: B,
    oob: CliOob,
) -> Result<(), DeviceError> {
    let mut driver = Driver::new(machine, bearer, report, oob);
    driver.run().await?;
    Ok(())
}

fn report(outcome: ProvisioningOutcome) {
    let data = &outcome.data;
    info!(
        unicast_address = format_args!("{:#06x}", data.unicast_address),
        key_index = data.key_index,
        iv_index = data.iv_index,
        flags = ?data.flags,
        "provisioned"
    );
}
