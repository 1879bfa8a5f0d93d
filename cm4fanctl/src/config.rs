//! CLI configuration management
//!
//! Handles loading and saving CLI-specific configuration.

use anyhow::{Context, Result};
use cm4fan_core::Emc2301;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shortest accepted watch interval in milliseconds
pub const MIN_WATCH_INTERVAL_MS: u64 = 100;

/// Longest accepted watch interval in milliseconds
pub const MAX_WATCH_INTERVAL_MS: u64 = 60_000;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// 7-bit SMBus address of the fan controller
    pub device_address: u8,

    /// Sampling interval for `watch` in milliseconds
    pub watch_interval_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: "table".to_string(),
            verbose: false,
            device_address: Emc2301::DEFAULT_ADDRESS,
            watch_interval_ms: 2000,
        }
    }
}

impl CliConfig {
    /// Load configuration from a file
    ///
    /// Returns `None` if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CLI config file {}", path.display()))?;

        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse CLI config file {}", path.display()))?;

        Ok(Some(config))
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;

        std::fs::write(path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Default configuration file path
///
/// Uses the XDG config directory if available:
/// - Linux: `~/.config/cm4fan/cli.toml`
/// - Fallback: `/etc/cm4fan/cli.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("cm4fan")
        .join("cli.toml")
}

/// Parse a device address given as decimal or `0x`-prefixed hex
pub fn parse_address(value: &str) -> Result<u8> {
    let value = value.trim();
    let address = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    }
    .with_context(|| format!("Invalid device address '{}'", value))?;

    ConfigBuilder::validate_address(address)?;
    Ok(address)
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Higher layers must be applied first: each setter only fills values that
/// are still unset.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    output_format: Option<String>,
    verbose: Option<bool>,
    device_address: Option<u8>,
    watch_interval_ms: Option<u64>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set device address (with validation)
    pub fn with_device_address(mut self, address: u8) -> Result<Self> {
        Self::validate_address(address)?;
        self.device_address = Some(address);
        Ok(self)
    }

    /// Set watch interval (with validation)
    pub fn with_watch_interval_ms(mut self, interval_ms: u64) -> Result<Self> {
        Self::validate_watch_interval(interval_ms)?;
        self.watch_interval_ms = Some(interval_ms);
        Ok(self)
    }

    /// Fill unset values from a config file
    ///
    /// A missing file leaves the builder unchanged; an unreadable or
    /// malformed file is an error.
    pub fn with_config_file(self, path: &Path) -> Result<Self> {
        let Some(config) = CliConfig::load_from(path)? else {
            return Ok(self);
        };

        let builder = self;
        // Only use file values if they weren't already set (preserving priority)
        Ok(Self {
            output_format: builder.output_format.or(Some(config.output_format)),
            verbose: builder.verbose.or(Some(config.verbose)),
            device_address: builder.device_address.or(Some(config.device_address)),
            watch_interval_ms: builder.watch_interval_ms.or(Some(config.watch_interval_ms)),
        })
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        // Only apply env vars if values weren't already set (preserving priority)
        if self.output_format.is_none() {
            if let Ok(format) = std::env::var("CM4FAN_FORMAT") {
                // Validate before applying
                if Self::validate_output_format(&format).is_ok() {
                    self.output_format = Some(format);
                }
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var("CM4FAN_VERBOSE") {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        if self.device_address.is_none() {
            if let Ok(address) = std::env::var("CM4FAN_ADDRESS") {
                if let Ok(address) = parse_address(&address) {
                    self.device_address = Some(address);
                }
            }
        }

        if self.watch_interval_ms.is_none() {
            if let Ok(interval) = std::env::var("CM4FAN_WATCH_INTERVAL_MS") {
                if let Ok(interval) = interval.parse() {
                    if Self::validate_watch_interval(interval).is_ok() {
                        self.watch_interval_ms = Some(interval);
                    }
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let device_address = self.device_address.unwrap_or(defaults.device_address);
        let watch_interval_ms = self.watch_interval_ms.unwrap_or(defaults.watch_interval_ms);

        // Validate final values
        Self::validate_output_format(&output_format)?;
        Self::validate_address(device_address)?;
        Self::validate_watch_interval(watch_interval_ms)?;

        Ok(CliConfig {
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            device_address,
            watch_interval_ms,
        })
    }

    /// Validate output format
    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    /// Validate a 7-bit, non-reserved device address
    fn validate_address(address: u8) -> Result<()> {
        if !(0x08..=0x77).contains(&address) {
            return Err(anyhow::anyhow!(
                "Device address 0x{:02X} is outside 0x08-0x77",
                address
            ));
        }

        Ok(())
    }

    /// Validate watch interval
    fn validate_watch_interval(interval_ms: u64) -> Result<()> {
        if !(MIN_WATCH_INTERVAL_MS..=MAX_WATCH_INTERVAL_MS).contains(&interval_ms) {
            return Err(anyhow::anyhow!(
                "Watch interval must be {}-{} ms, got {}",
                MIN_WATCH_INTERVAL_MS,
                MAX_WATCH_INTERVAL_MS,
                interval_ms
            ));
        }

        Ok(())
    }
}
