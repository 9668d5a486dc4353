use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use fl_domain::config::SessionEndpoint;

/// flctl: register devices and sensors, link them, and upload readings.
#[derive(Debug, Parser)]
#[command(name = "flctl", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Give up on a send or receive after this many seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct EndpointArgs {
    /// Server host name or IPv4 address.
    #[arg(long, global = true)]
    pub address: Option<String>,
    /// Server TCP port.
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// PEM client certificate chain.
    #[arg(long = "cert", global = true)]
    pub certificate: Option<PathBuf>,
    /// PEM private key for `--cert`.
    #[arg(long = "key", global = true)]
    pub private_key: Option<PathBuf>,
    /// PEM bundle of trusted CAs.
    #[arg(long = "ca", global = true)]
    pub ca_bundle: Option<PathBuf>,
}

impl EndpointArgs {
    /// Missing flags become empty values; [`SessionEndpoint::validate`]
    /// reports them before any network activity.
    pub fn to_endpoint(&self) -> SessionEndpoint {
        SessionEndpoint {
            address: self.address.clone().unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            certificate: self.certificate.clone().unwrap_or_default(),
            private_key: self.private_key.clone().unwrap_or_default(),
            ca_bundle: self.ca_bundle.clone().unwrap_or_default(),
        }
    }
}

impl Cli {
    pub fn io_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a device and print its id.
    RegisterDevice {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
    },
    /// Register a sensor with its reporting range and print its id.
    RegisterSensor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        /// Lowest value the sensor reports.
        #[arg(long, allow_negative_numbers = true)]
        floor: f64,
        /// Highest value the sensor reports.
        #[arg(long, allow_negative_numbers = true)]
        ceiling: f64,
    },
    /// Attach a peripheral (e.g. a sensor) to a parent device.
    SetOwnership {
        #[arg(long)]
        peripheral_id: u64,
        #[arg(long)]
        parent_id: u64,
    },
    /// Upload one reading and print the stored measurement id.
    SendMeasurement {
        #[arg(long)]
        sensor_id: u64,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
    },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegisterDevice { .. } => "register-device",
            Command::RegisterSensor { .. } => "register-sensor",
            Command::SetOwnership { .. } => "set-ownership",
            Command::SendMeasurement { .. } => "send-measurement",
        }
    }
}
