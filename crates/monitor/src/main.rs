//! `fl-monitor` — telemetry daemon.
//!
//! Samples the ADC channels listed in the config file and uploads one
//! measurement per channel every `measurement_period_secs`, reconnecting
//! every `retry_period_secs` while the server is unreachable.  Runs until
//! Ctrl-C.
//!
//! # Config (JSON)
//!
//! | Key                       | Description                              | Default                              |
//! |---------------------------|------------------------------------------|--------------------------------------|
//! | `endpoint`                | address, port and PEM paths              | (required)                           |
//! | `channels`                | ADC channel (0-3) → sensor id            | (required)                           |
//! | `retry_period_secs`       | wait after a failure                     | `5`                                  |
//! | `measurement_period_secs` | wait after a complete pass               | `600`                                |
//! | `rpc_timeout_secs`        | bound on each frame read/write           | unbounded                            |
//! | `iio_device`              | IIO sysfs directory of the ADC           | `/sys/bus/iio/devices/iio:device0`   |
//!
//! Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fl_client::SessionBuilder;
use fl_domain::config::MonitorConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Sensor telemetry daemon.
#[derive(Debug, Parser)]
#[command(name = "fl-monitor", version, about)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, default_value = "/etc/fieldlink/monitor.json")]
    config: PathBuf,
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    log_json: bool,
    /// Validate the config file and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = MonitorConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if cli.check {
        println!(
            "{}: ok ({} channels, server {})",
            cli.config.display(),
            config.channels.len(),
            config.endpoint.authority()
        );
        return Ok(());
    }

    let mut session = SessionBuilder::from_config(&config).build()?;

    // ── Run ──────────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();

    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Ctrl-C received, shutting down");
        shutdown_clone.cancel();
    });

    tracing::info!(
        config = %cli.config.display(),
        device_id = ?config.device_id,
        iio_device = %config.iio_device.display(),
        "starting fl-monitor"
    );

    session.run(shutdown).await;
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fl_client=debug"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
