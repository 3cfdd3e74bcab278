use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod doctor;
pub mod envinfo;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agent loop against a hub.
    Run(RunArgs),
    /// Parse a captured response stream and print the frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Device id registered with the hub (max 8 characters).
    #[arg(long, env = "IORELAY_DEVICE_ID")]
    pub device: String,
    /// Shared secret for the device (max 8 characters).
    #[arg(long, env = "IORELAY_SHARED_SECRET")]
    pub secret: String,
    /// Hub host name.
    #[arg(long, default_value = "hub.iorelay.dev")]
    pub host: String,
    /// Hub TCP port.
    #[arg(long, default_value = "80")]
    pub port: u16,
    /// Request path sent in the POST preamble.
    #[arg(long, default_value = "/v1/relay_hub")]
    pub api_path: String,
    /// Stop after this many completed poll cycles (0 = run forever).
    #[arg(long, default_value = "0")]
    pub cycles: u64,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file holding the raw response bytes; stdin when omitted.
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}
