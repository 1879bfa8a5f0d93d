//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use cm4fan_core::{BusIndex, DutyCycle, FanStatus, RpmReading};
use colored::*;

use crate::config::CliConfig;

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

fn colored_rpm(rpm: &RpmReading) -> String {
    match rpm {
        RpmReading::Measured { .. } => rpm.to_string().green().to_string(),
        RpmReading::Stopped => rpm.to_string().dimmed().to_string(),
        RpmReading::Undefined => rpm.to_string().yellow().to_string(),
    }
}

fn colored_duty(duty: DutyCycle) -> String {
    if duty.is_off() {
        duty.to_string().dimmed().to_string()
    } else {
        duty.to_string().cyan().to_string()
    }
}

/// Format the result of a device search
pub fn format_locate(bus: BusIndex, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "bus": bus
        }))?),
        OutputFormat::Table => Ok(format!(
            "Fan controller found on bus {}",
            bus.to_string().cyan()
        )),
    }
}

/// Format a full fan status snapshot
pub fn format_status(status: &FanStatus, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct StatusRow {
                #[tabled(rename = "Bus")]
                bus: String,
                #[tabled(rename = "Duty Cycle")]
                duty: String,
                #[tabled(rename = "Speed")]
                rpm: String,
            }

            let rows = vec![StatusRow {
                bus: status.bus.to_string(),
                duty: colored_duty(status.duty_cycle),
                rpm: colored_rpm(&status.rpm),
            }];

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Fan Status:".bold(), table))
        }
    }
}

/// Format a duty cycle reading
pub fn format_duty(duty: DutyCycle, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "duty_cycle": duty
        }))?),
        OutputFormat::Table => Ok(format!("Duty cycle: {}", colored_duty(duty))),
    }
}

/// Format an RPM reading
pub fn format_rpm(rpm: &RpmReading, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rpm)?),
        OutputFormat::Table => Ok(format!("Fan speed: {}", colored_rpm(rpm))),
    }
}

/// Format one `watch` sample
///
/// JSON samples are single-line so the stream can be consumed line by line.
pub fn format_watch_sample(
    sample: u64,
    status: &FanStatus,
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&serde_json::json!({
            "sample": sample,
            "status": status
        }))?),
        OutputFormat::Table => Ok(format!(
            "[{:>4}] bus {}  duty {}  speed {}",
            sample,
            status.bus,
            colored_duty(status.duty_cycle),
            colored_rpm(&status.rpm)
        )),
    }
}

/// Format the effective CLI configuration
pub fn format_config(config: &CliConfig, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct SettingRow {
                #[tabled(rename = "Setting")]
                key: &'static str,
                #[tabled(rename = "Value")]
                value: String,
            }

            let rows = vec![
                SettingRow {
                    key: "Output Format",
                    value: config.output_format.clone(),
                },
                SettingRow {
                    key: "Verbose",
                    value: config.verbose.to_string(),
                },
                SettingRow {
                    key: "Device Address",
                    value: format!("0x{:02X}", config.device_address),
                },
                SettingRow {
                    key: "Watch Interval",
                    value: format!("{} ms", config.watch_interval_ms),
                },
            ];

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "CLI Configuration:".bold(), table))
        }
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_status(rpm: RpmReading) -> FanStatus {
        FanStatus {
            bus: BusIndex(3),
            duty_cycle: DutyCycle::new(40).unwrap(),
            rpm,
        }
    }

    #[test]
    fn test_format_success() {
        let message = format_success("Operation completed");
        assert!(message.contains("✓"));
        assert!(message.contains("Operation completed"));
    }

    #[test]
    fn test_format_locate_json() {
        let result = format_locate(BusIndex(4), &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value["bus"], 4);
    }

    #[test]
    fn test_format_status_json() {
        let status = sample_status(RpmReading::Measured { rpm: 2200 });
        let result = format_status(&status, &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&result).unwrap();

        assert_eq!(value["bus"], 3);
        assert_eq!(value["duty_cycle"], 40);
        assert_eq!(value["rpm"]["state"], "measured");
        assert_eq!(value["rpm"]["rpm"], 2200);
    }

    #[test]
    fn test_format_status_table() {
        colored::control::set_override(false);
        let status = sample_status(RpmReading::Undefined);
        let result = format_status(&status, &OutputFormat::Table).unwrap();

        assert!(result.contains("Fan Status:"));
        assert!(result.contains("40%"));
        assert!(result.contains("undefined"));
    }

    #[test]
    fn test_format_duty() {
        let duty = DutyCycle::new(75).unwrap();
        let json = format_duty(duty, &OutputFormat::Json).unwrap();
        assert!(json.contains("\"duty_cycle\": 75"));

        colored::control::set_override(false);
        let table = format_duty(duty, &OutputFormat::Table).unwrap();
        assert_eq!(table, "Duty cycle: 75%");
    }

    #[test]
    fn test_format_rpm_states() {
        let stopped = format_rpm(&RpmReading::Stopped, &OutputFormat::Json).unwrap();
        assert!(stopped.contains("\"state\": \"stopped\""));
        assert!(!stopped.contains("\"rpm\""));

        colored::control::set_override(false);
        let measured =
            format_rpm(&RpmReading::Measured { rpm: 1500 }, &OutputFormat::Table).unwrap();
        assert_eq!(measured, "Fan speed: 1500 RPM");
    }

    #[test]
    fn test_format_watch_sample_json_is_single_line() {
        let status = sample_status(RpmReading::Stopped);
        let line = format_watch_sample(7, &status, &OutputFormat::Json).unwrap();

        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["sample"], 7);
        assert_eq!(value["status"]["rpm"]["state"], "stopped");
    }

    #[test]
    fn test_format_config() {
        let config = CliConfig::default();
        let json = format_config(&config, &OutputFormat::Json).unwrap();
        assert!(json.contains("\"device_address\": 47"));

        let table = format_config(&config, &OutputFormat::Table).unwrap();
        assert!(table.contains("0x2F"));
        assert!(table.contains("2000 ms"));
    }
}
