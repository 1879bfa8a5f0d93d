//! cm4fan CLI
//!
//! Command-line interface for the EMC2301 fan controller.

use anyhow::Result;
use clap::Parser;
use cm4fan_hardware::LinuxI2cBus;
use cm4fanctl::cli::{run, simulated_bus, Cli, OutputFormat};
use cm4fanctl::config::{default_config_path, CliConfig};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Build configuration using priority chain: defaults → file → env → CLI args
fn build_config(cli: &Cli, config_path: &Path) -> Result<CliConfig> {
    let mut builder = CliConfig::builder();

    // Apply CLI argument overrides first (highest priority)
    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }
    if let Some(address) = cli.address {
        builder = builder.with_device_address(address)?;
    }

    // Apply environment variable overrides
    builder = builder.with_env_overrides();

    // Load config file (unless --no-config is specified)
    if !cli.no_config {
        builder = builder.with_config_file(config_path)?;
    }

    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = match build_config(&cli, &config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    debug!(
        "Config: {} (address 0x{:02X}, format {:?})",
        config_path.display(),
        config.device_address,
        output_format
    );

    let result = if cli.mock {
        debug!("Using simulated bus");
        run(
            &simulated_bus(),
            cli.command,
            &config,
            &config_path,
            &output_format,
        )
        .await
    } else {
        run(
            &LinuxI2cBus::new(config.device_address),
            cli.command,
            &config,
            &config_path,
            &output_format,
        )
        .await
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
