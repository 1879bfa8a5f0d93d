//! Command execution handlers

use anyhow::{Context, Result};
use cm4fan_core::BusIndex;
use cm4fan_hardware::{locate, BusConnection, FanController, MockBus, MockChip, RegisterBus};
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::format::{
    format_config, format_duty, format_locate, format_rpm, format_status, format_success,
    format_watch_sample,
};

use super::commands::*;

/// Full speed of the fan simulated by `--mock`
const SIMULATED_MAX_RPM: u32 = 5000;

/// Bus topology used by `--mock`
///
/// Bus 0 has an unrelated device that NACKs the identity read, the fan
/// controller sits on bus 1.
pub fn simulated_bus() -> MockBus {
    MockBus::new()
        .with_chip(BusIndex(0), MockChip::blank().failing_read(0xFD))
        .with_chip(
            BusIndex(1),
            MockChip::emc2301().with_simulated_fan(SIMULATED_MAX_RPM),
        )
}

fn open_controller<B: RegisterBus>(bus: &B) -> Result<FanController<B::Connection>> {
    FanController::open(bus).context("Failed to open fan controller")
}

/// Dispatch a parsed command against a bus
///
/// Commands that talk to the device bind a controller for the duration of
/// the command and release it before returning.
pub async fn run<B: RegisterBus>(
    bus: &B,
    command: Commands,
    config: &CliConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        Commands::Locate => handle_locate(bus, format),
        Commands::Status => handle_status(&mut open_controller(bus)?, format),
        Commands::Duty { command } => handle_duty(&mut open_controller(bus)?, command, format),
        Commands::Rpm => handle_rpm(&mut open_controller(bus)?, format),
        Commands::Watch { interval_ms, count } => {
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(config.watch_interval_ms));
            let mut controller = open_controller(bus)?;
            handle_watch(&mut controller, interval, count, format).await?;
            Ok(())
        }
        Commands::Config { command } => handle_config(command, config, config_path, format),
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    }
}

/// Handle locate command
pub fn handle_locate<B: RegisterBus>(bus: &B, format: &OutputFormat) -> Result<()> {
    let index = locate(bus)?;
    println!("{}", format_locate(index, &format.into())?);
    Ok(())
}

/// Handle status command
pub fn handle_status<C: BusConnection>(
    controller: &mut FanController<C>,
    format: &OutputFormat,
) -> Result<()> {
    let status = controller.status()?;
    println!("{}", format_status(&status, &format.into())?);
    Ok(())
}

/// Handle duty commands
pub fn handle_duty<C: BusConnection>(
    controller: &mut FanController<C>,
    command: DutyCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        DutyCommands::Get => {
            let duty = controller.get_duty_cycle()?;
            println!("{}", format_duty(duty, &format.into())?);
        }
        DutyCommands::Set { percent } => {
            controller.set_duty_cycle(percent)?;

            match format {
                OutputFormat::Json => {
                    let response = serde_json::json!({
                        "bus": controller.bus_index(),
                        "duty_cycle": percent
                    });
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                OutputFormat::Table => {
                    println!(
                        "{}",
                        format_success(&format!("Set duty cycle to {}%", percent))
                    );
                }
            }
        }
    }

    Ok(())
}

/// Handle rpm command
pub fn handle_rpm<C: BusConnection>(
    controller: &mut FanController<C>,
    format: &OutputFormat,
) -> Result<()> {
    let rpm = controller.get_rpm()?;
    println!("{}", format_rpm(&rpm, &format.into())?);
    Ok(())
}

/// Handle watch command
///
/// Samples immediately, then once per `interval`, until Ctrl-C or until
/// `count` samples have been printed. Returns the number of samples taken.
pub async fn handle_watch<C: BusConnection>(
    controller: &mut FanController<C>,
    interval: Duration,
    count: Option<u64>,
    format: &OutputFormat,
) -> Result<u64> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    debug!("Watching bus {} every {:?}", controller.bus_index(), interval);

    let mut samples = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = controller.status()?;
                samples += 1;
                println!("{}", format_watch_sample(samples, &status, &format.into())?);

                if count.is_some_and(|limit| samples >= limit) {
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted after {} samples", samples);
                break;
            }
        }
    }

    Ok(samples)
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", format_config(current_config, &format.into())?);
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                return Err(anyhow::anyhow!(
                    "Config file {} already exists (use --force to overwrite)",
                    config_path.display()
                ));
            }

            CliConfig::default()
                .save_to(config_path)
                .with_context(|| format!("Failed to initialize {}", config_path.display()))?;
            println!(
                "{}",
                format_success(&format!("Wrote defaults to {}", config_path.display()))
            );
        }
        ConfigCommands::Path => match format {
            OutputFormat::Json => {
                let response = serde_json::json!({ "path": config_path });
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            OutputFormat::Table => println!("{}", config_path.display()),
        },
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
