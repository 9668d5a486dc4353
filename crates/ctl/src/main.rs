//! `flctl` — one-shot control client.
//!
//! Opens a mutual-TLS connection, sends `Hello`, performs exactly one
//! action and exits.  Exit status is non-zero on any failure, including a
//! server-side error code for `set-ownership`.
//!
//! ```text
//! flctl --address hub.local --port 5000 \
//!       --cert client.pem --key client.key --ca ca.pem \
//!       register-sensor --name soil-1 --location bed-1 --floor 0 --ceiling 3.3
//! ```

mod cli;

use anyhow::Context;
use clap::Parser;
use fl_client::{RpcClient, RpcOptions, TlsTransport};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    let endpoint = cli.endpoint.to_endpoint();
    endpoint.validate().context("invalid endpoint")?;
    let transport = TlsTransport::from_endpoint(&endpoint)?;
    let options = RpcOptions {
        io_timeout: cli.io_timeout(),
    };

    let mut client = RpcClient::create(&transport, &endpoint, &options)
        .await
        .with_context(|| format!("connecting to {}", endpoint.authority()))?;

    tracing::info!(authority = %endpoint.authority(), "connected");

    let action = cli.command.name();
    let outcome = dispatch(&mut client, cli.command).await;
    client.close().await;

    match outcome {
        Ok(line) => {
            tracing::info!(action, result = %line, "action complete");
            println!("{line}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(action, error = %e, "action failed");
            Err(e)
        }
    }
}

/// Run one action and render its result for stdout.
async fn dispatch(client: &mut RpcClient, command: Command) -> anyhow::Result<String> {
    match command {
        Command::RegisterDevice { name, location } => {
            let id = client
                .register_device(name, location)
                .await
                .context("register-device failed")?;
            Ok(format!("id={id}"))
        }
        Command::RegisterSensor {
            name,
            location,
            floor,
            ceiling,
        } => {
            if floor > ceiling {
                anyhow::bail!("floor {floor} is above ceiling {ceiling}");
            }
            let id = client
                .register_sensor(name, location, floor, ceiling)
                .await
                .context("register-sensor failed")?;
            Ok(format!("id={id}"))
        }
        Command::SetOwnership {
            peripheral_id,
            parent_id,
        } => {
            let resp = client
                .set_ownership(peripheral_id, parent_id)
                .await
                .context("set-ownership failed")?;
            if !resp.is_ok() {
                tracing::warn!(
                    peripheral_id,
                    parent_id,
                    code = resp.code,
                    "server rejected ownership change"
                );
                anyhow::bail!(
                    "set-ownership rejected: code={} {}",
                    resp.code,
                    resp.message.unwrap_or_default()
                );
            }
            Ok(format!("code={}", resp.code))
        }
        Command::SendMeasurement { sensor_id, value } => {
            let id = client
                .send_measurement(sensor_id, value)
                .await
                .context("send-measurement failed")?;
            Ok(format!("id={id}"))
        }
    }
}

/// Compact stderr logging so stdout carries only the result line.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
